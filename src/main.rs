//! `catpicker` - chat backend that helps users pick a cat picture
//!
//! Serves `POST /api/messages`, relaying each message to a hosted assistant
//! that can search TheCatAPI, or answers a single message from the command line.

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use catpicker_core::config::Config;
use catpicker_core::{MessagePayload, MessageRelay};

mod cli;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catpicker=info,catpicker_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => Config::load().context("Failed to load configuration")?,
    };

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate().context("Invalid configuration")?;

            tracing::info!(
                model = %config.assistant.model,
                assistant_id = ?config.assistant.assistant_id,
                "Starting catpicker server"
            );
            let relay = MessageRelay::from_config(&config)?;
            server::serve(&config.server, relay).await?;
        }

        Commands::Ask { message, thread_id } => {
            config.validate().context("Invalid configuration")?;
            let relay = MessageRelay::from_config(&config)?;

            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                server::shutdown_signal().await;
                interrupt.cancel();
            });

            let response = relay
                .message_with_cancel(
                    MessagePayload {
                        thread_id,
                        message: catpicker_core::Message::user(message),
                    },
                    &cancel,
                )
                .await?;

            println!("{}", response.message.content);
            if let Some(thread_id) = response.thread_id {
                eprintln!("thread: {}", thread_id);
            }
        }
    }

    Ok(())
}
