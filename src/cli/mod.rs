//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod auth;
pub mod history;
pub mod provider_list;
pub mod roast;
pub mod settings;
pub mod usage;


use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::auth::{remove_token, set_token, show_auth_status};
use crate::cli::history::{clear_history, delete_session, list_history};
use crate::cli::provider_list::list_providers;
use crate::cli::roast::{run_roast, RoastArgs};
use crate::cli::settings::{set_value, unset_value};
use crate::cli::usage::show_usage;
use crate::core::config::Config;
use crate::roast::{MemeStyle, RoastStyle};
use crate::utils::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "posterized")]
#[command(about = "Roast text and screenshots, then turn the roast into a meme")]
#[command(
    long_about = "Posterized sends text (or the text of a screenshot) to a language model \
for a roast, and can turn the roast into a meme image with Replicate.\n\n\
Authentication:\n\
  Use 'posterized auth set <provider>' to store an API token in your system keyring.\n\n\
Environment Variables (fallback if no token is stored):\n\
  OPENAI_API_KEY        OpenAI API key\n\
  GEMINI_API_KEY        Gemini API key\n\
  REPLICATE_API_TOKEN   Replicate API token (meme images)\n\
  POSTERIZED_LOG        Log filter, e.g. 'posterized=debug' (falls back to RUST_LOG)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Text provider to use instead of the configured default
    #[arg(short = 'p', long, global = true, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Roast some text or a screenshot
    Roast {
        /// Text to roast
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
        /// Roast style (savage, playful, wholesome, corporate)
        #[arg(short, long)]
        style: Option<RoastStyle>,
        /// Screenshot image to roast; its text goes in the positional argument
        #[arg(long, value_name = "FILE")]
        screenshot: Option<PathBuf>,
        /// Print the roast only after it is complete
        #[arg(long)]
        no_stream: bool,
    },
    /// Roast some text and render the roast as a meme image
    Meme {
        /// Text to roast
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
        /// Roast style (savage, playful, wholesome, corporate)
        #[arg(short, long)]
        style: Option<RoastStyle>,
        /// Meme style (classic, deep-fried, minimal, poster)
        #[arg(short, long)]
        meme_style: Option<MemeStyle>,
        /// Screenshot image to roast; its text goes in the positional argument
        #[arg(long, value_name = "FILE")]
        screenshot: Option<PathBuf>,
    },
    /// Show or manage past roasts
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Show today's roast allowance
    Usage,
    /// Manage API tokens
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// List built-in providers and whether a token is available
    Providers,
    /// Show the current configuration
    Config,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key (e.g. "openai gpt-4o" for default-model)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
        /// Provider, for default-model
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum HistoryAction {
    /// List past roasts, newest first
    List {
        /// Show at most this many sessions
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Delete one session and its image
    Delete { id: String },
    /// Delete every session and image
    Clear,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum AuthAction {
    /// Store a token in the system keyring (read from stdin when omitted)
    Set {
        provider: String,
        token: Option<String>,
    },
    /// Remove a stored token
    Remove { provider: String },
    /// Show where each provider's token comes from
    Status,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let provider = args.provider;

    match args.command {
        Commands::Roast {
            text,
            style,
            screenshot,
            no_stream,
        } => {
            run_roast(RoastArgs {
                text,
                style,
                screenshot,
                meme_style: None,
                stream: !no_stream,
                provider,
            })
            .await
        }
        Commands::Meme {
            text,
            style,
            meme_style,
            screenshot,
        } => {
            let config = Config::load()?;
            let meme_style = match meme_style {
                Some(style) => style,
                None => match config.meme_style.as_deref() {
                    Some(name) => name.parse::<MemeStyle>()?,
                    None => MemeStyle::default(),
                },
            };
            run_roast(RoastArgs {
                text,
                style,
                screenshot,
                meme_style: Some(meme_style),
                stream: true,
                provider,
            })
            .await
        }
        Commands::History { action } => match action.unwrap_or(HistoryAction::List { limit: None }) {
            HistoryAction::List { limit } => list_history(limit),
            HistoryAction::Delete { id } => delete_session(&id),
            HistoryAction::Clear => clear_history(),
        },
        Commands::Usage => show_usage(),
        Commands::Auth { action } => match action {
            AuthAction::Set { provider, token } => set_token(&provider, token),
            AuthAction::Remove { provider } => remove_token(&provider),
            AuthAction::Status => show_auth_status(),
        },
        Commands::Providers => list_providers(),
        Commands::Config => {
            Config::load()?.print_all();
            Ok(())
        }
        Commands::Set { key, value } => set_value(&key, &value),
        Commands::Unset { key, value } => unset_value(&key, value.as_deref()),
    }
}
