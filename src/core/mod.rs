pub mod builtin_providers;
pub mod chat_stream;
pub mod config;
pub mod error;
pub mod manager;
pub mod message;
pub mod provider;
