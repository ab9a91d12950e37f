use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use shopchat_core::{AgentClient, AgentError, ChatSession, Config};
use tracing::{info, warn};

mod app;
mod handler;
mod logging;
mod markdown;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "shopchat")]
#[command(about = "Chat with a store AI agent from the terminal")]
#[command(version)]
struct Cli {
    /// Agent endpoint (overrides SHOPCHAT_ENDPOINT and the config file)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,
    /// Store URL sent with every question
    #[arg(short, long, global = true)]
    store: Option<String>,
    /// Log file for the interactive chat
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the agent's reply
    Ask {
        /// Your question
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config: {}", e);
        Config::new()
    });
    let endpoint = config.resolve_endpoint(cli.endpoint.as_deref());
    let store_url = config.resolve_store_url(cli.store.as_deref());
    let client = AgentClient::new(&endpoint);

    match cli.command {
        Some(Commands::Ask { question }) => {
            logging::init_stderr()?;
            let reply = ask_once(&client, &store_url, question).await?;
            println!("{}", reply);
            Ok(())
        }
        None => {
            let log_path = match cli.log_file {
                Some(path) => path,
                None => logging::default_log_path()?,
            };
            logging::init_file(&log_path)?;
            run_chat(client, store_url).await
        }
    }
}

async fn ask_once(client: &AgentClient, store_url: &str, question: String) -> Result<String> {
    let mut session = ChatSession::with_store_url(store_url);
    session.set_draft(question);

    let Some(request) = session.begin_submit() else {
        bail!("question is empty");
    };

    // The session gets the prefixed log entry; the caller gets the bare error
    match client.send(&request).await {
        Ok(reply) => {
            session.settle(Ok::<_, AgentError>(reply.clone()));
            Ok(reply)
        }
        Err(e) => {
            session.settle(Err::<String, _>(&e));
            Err(e.into())
        }
    }
}

async fn run_chat(client: AgentClient, store_url: String) -> Result<()> {
    info!(endpoint = %client.endpoint(), "starting chat");

    let mut app = App::new(ChatSession::with_store_url(store_url), client);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    tui::restore()?;

    // Remember the store between runs; the chat itself is never saved
    let store_url = app.session.store_url();
    if !store_url.is_empty() {
        if let Err(e) = Config::save_last_store_url(store_url) {
            warn!(error = %e, "could not save store URL");
        }
    }

    if app.session.is_busy() {
        info!("quit with a request still outstanding");
    }

    result
}
