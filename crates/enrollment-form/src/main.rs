//! Enrollment form - console host entry point.

use anyhow::{Context, Result};
use enrollment_form::config::Config;
use enrollment_form::console::{self, Command, HELP_TEXT};
use enrollment_form::{FormSettings, RegistrationForm, SupabaseBackend};
use secrecy::ExposeSecret;
use std::sync::Arc;
use supabase_client::SupabaseClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.log.level);

    info!("Starting enrollment form...");

    let client = SupabaseClient::new(
        &config.supabase.url,
        config.supabase.anon_key.expose_secret().as_str(),
        config.supabase.timeout,
    )
    .context("Failed to create Supabase client")?;

    if client.health_check().await {
        info!("Supabase reachable at {}", client.base_url());
    } else {
        warn!("Supabase health check failed - will retry on requests");
    }

    let backend = Arc::new(SupabaseBackend::new(client, &config.supabase.table));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut form = RegistrationForm::new(backend, FormSettings::from(&config), events_tx);

    form.restore_session().await;

    println!("{}\n", HELP_TEXT);
    println!("{}\n", console::render(form.view()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Main event loop
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    info!("Input closed");
                    break;
                };

                match console::parse_command(&line) {
                    Some(Command::Event(event)) => {
                        if let Some(busy) = form.busy_view(&event) {
                            println!("{}\n", console::render(&busy));
                        }
                        if let Err(e) = form.handle(event).await {
                            warn!("Action failed: {}", e);
                        }
                        println!("{}\n", console::render(form.view()));
                    }
                    Some(Command::Help) => println!("{}\n", HELP_TEXT),
                    None if line.trim().is_empty() => {}
                    None => println!("Unknown command. Type `help`.\n"),
                }
            }
            Some(event) = events_rx.recv() => {
                let _ = form.handle(event).await;
                println!("{}\n", console::render(form.view()));
            }
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down...");
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
