//! Command-line definitions for the chatlog binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{APP_NAME, DEFAULT_ENDPOINT, DEFAULT_MODEL, VERSION};

/// Ask an LLM questions and keep a searchable local history of the answers
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version = VERSION)]
pub struct Cli {
    /// Path to the history database
    #[arg(long, global = true, env = "CHATLOG_DB")]
    pub db: Option<PathBuf>,

    /// Chat completions endpoint
    #[arg(long, global = true, env = "CHATLOG_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Model to request answers from
    #[arg(long, global = true, env = "CHATLOG_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// API key sent as a bearer token
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Ask a single question and print the answer
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List saved exchanges
    List(FilterArgs),
    /// Delete a saved exchange by id
    Delete { id: i64 },
    /// Print saved exchanges as Markdown
    Export(FilterArgs),
    /// Interactive session (default)
    Shell,
}

impl Commands {
    pub fn needs_api_key(&self) -> bool {
        matches!(self, Commands::Ask { .. } | Commands::Shell)
    }
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterArgs {
    /// Only include exchanges whose question contains this text (case-insensitive)
    #[arg(short, long)]
    pub search: Option<String>,
}

/// One line of input in the interactive shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Ask(String),
    Search(String),
    List,
    /// `None` when the id is missing or not a number.
    Delete(Option<i64>),
    /// Resend the draft kept after a failed ask.
    Retry,
    Help,
    Quit,
    Empty,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return ShellCommand::Empty;
        }

        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return ShellCommand::Ask(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "search" | "s" => ShellCommand::Search(arg.to_string()),
            "list" | "ls" => ShellCommand::List,
            "delete" | "rm" => ShellCommand::Delete(arg.parse().ok()),
            "retry" | "r" => ShellCommand::Retry,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            // Unrecognized `/word` lines are questions, e.g. "/etc/hosts format?".
            _ => ShellCommand::Ask(line.to_string()),
        }
    }
}

pub const SHELL_HELP: &str = "\
Type a question and press Enter to send it.
  /search <text>  filter the history by question (no text clears the filter)
  /list           show the history
  /delete <id>    delete an exchange
  /retry          resend the last question if it failed
  /quit           leave
Any other line, including one starting with an unlisted /word, is sent as a question.";
