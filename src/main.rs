mod cli;
mod config;
mod models;
mod output;
mod providers;
mod services;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, FilterArgs, ShellCommand, SHELL_HELP};
use config::{CompletionConfig, Config, APP_NAME, VERSION};
use providers::OpenAiProvider;
use services::export::export_to_markdown;
use services::{ConversationController, Database, SkipReason, SubmitOutcome};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Shell);
    let config = Config::new(cli.db, &cli.endpoint, cli.model, cli.api_key)?;
    tracing::debug!(?config, "Resolved configuration");

    let completion = if command.needs_api_key() {
        config.completion()?
    } else {
        // Read-only commands never reach the completion endpoint.
        CompletionConfig {
            api_key: String::new(),
            model: config.model.clone(),
        }
    };

    let db = Database::open(&config.db_path)?;
    let provider = Arc::new(OpenAiProvider::new(config.endpoint.clone()));
    let controller = ConversationController::new(provider, Arc::new(db), completion);
    controller.initialize().await?;

    match command {
        Commands::Ask { question } => {
            controller.set_draft_question(question.join(" "));
            match controller.submit().await? {
                SubmitOutcome::Submitted(exchange) => println!("{}", exchange.answer),
                SubmitOutcome::Skipped(reason) => println!("{}", skip_message(reason)),
            }
        }
        Commands::List(FilterArgs { search }) => {
            let searching = apply_search(&controller, search);
            output::print_exchanges(&controller.visible_exchanges(), searching);
        }
        Commands::Delete { id } => {
            controller.delete(Some(id)).await?;
            println!("{}", output::deleted_message(id));
        }
        Commands::Export(FilterArgs { search }) => {
            apply_search(&controller, search);
            print!("{}", export_to_markdown(&controller.visible_exchanges()));
        }
        Commands::Shell => run_shell(&controller).await?,
    }

    Ok(())
}

fn apply_search(controller: &ConversationController, search: Option<String>) -> bool {
    let search = search.unwrap_or_default();
    let searching = !search.is_empty();
    controller.set_search_text(search);
    searching
}

fn skip_message(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Pending => "A question is already waiting for an answer.",
        SkipReason::EmptyDraft => "Nothing to send.",
    }
}

fn prompt(controller: &ConversationController) -> Result<()> {
    let search = controller.search_text();
    if search.is_empty() {
        print!("> ");
    } else {
        print!("[{}] > ", search);
    }
    std::io::stdout().flush()?;
    Ok(())
}

async fn run_shell(controller: &ConversationController) -> Result<()> {
    println!(
        "{} {}: {} saved exchanges. Type a question, or /help for commands.",
        APP_NAME,
        VERSION,
        controller.exchanges().len()
    );
    output::print_exchanges(&controller.visible_exchanges(), false);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt(controller)?;

    while let Some(line) = lines.next_line().await? {
        match ShellCommand::parse(&line) {
            ShellCommand::Empty => {}
            ShellCommand::Quit => break,
            ShellCommand::Help => println!("{}", SHELL_HELP),
            ShellCommand::List => {
                let searching = !controller.search_text().is_empty();
                output::print_exchanges(&controller.visible_exchanges(), searching);
            }
            ShellCommand::Search(text) => {
                let searching = !text.is_empty();
                controller.set_search_text(text);
                output::print_exchanges(&controller.visible_exchanges(), searching);
            }
            ShellCommand::Delete(id) => match (id, controller.delete(id).await) {
                (Some(id), Ok(())) => println!("{}", output::deleted_message(id)),
                (_, Ok(())) => {}
                (_, Err(e)) => eprintln!("{}", e),
            },
            ShellCommand::Ask(question) => {
                controller.set_draft_question(question);
                send_draft(controller).await;
            }
            ShellCommand::Retry => {
                if !controller.can_submit() {
                    println!("Nothing to retry.");
                } else {
                    send_draft(controller).await;
                }
            }
        }
        prompt(controller)?;
    }

    Ok(())
}

async fn send_draft(controller: &ConversationController) {
    println!("Thinking...");
    match controller.submit().await {
        Ok(SubmitOutcome::Submitted(exchange)) => {
            println!("{}\n", output::format_exchange(&exchange));
        }
        Ok(SubmitOutcome::Skipped(reason)) => println!("{}", skip_message(reason)),
        Err(e) => eprintln!("{}. Type /retry to send the question again.", e),
    }
}
