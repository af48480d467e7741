//! Posterized turns text and screenshots into roasts, and roasts into memes.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the message model, the provider contract, the
//!   [`core::manager::LlmManager`] request state and configuration.
//! - [`providers`] implements the contract for OpenAI Chat Completions and
//!   Gemini, including SSE streaming.
//! - [`image`] runs Replicate predictions (create, poll, download) with
//!   bounded retries.
//! - [`roast`] builds prompts and ties text, images, usage limits and
//!   history together in [`roast::RoastService`].
//! - [`store`] keeps usage counters and roast history as local JSON files.
//! - [`api`] defines the vendor wire payloads.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod image;
pub mod providers;
pub mod roast;
pub mod store;
pub mod utils;
