//! Showhome Console Bridge
//!
//! Opens a session with every configured lighting and audio console, keeps
//! their labels mirrored, and accepts label-addressed commands on stdin.
//!
//! Usage: `showhome [settings.json]`

mod console;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use settings::Settings;
use show_sync::{connect, Session};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "showhome=info,show_protocol=info,show_sync=info,show_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load(path.as_deref())?;
    if settings.sessions.is_empty() {
        bail!("no consoles configured");
    }

    info!("Starting showhome with {} console(s)", settings.sessions.len());

    let mut handles = Vec::with_capacity(settings.sessions.len());
    for config in &settings.sessions {
        let handle = connect(config)
            .await
            .with_context(|| format!("opening {} session with {}", config.family, config.console))?;
        handles.push(handle);
    }
    let sessions: Vec<Arc<Session>> = handles.iter().map(|h| h.session().clone()).collect();

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = console::run(&sessions, stdin, tokio::io::stdout()) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    for handle in handles {
        handle.shutdown().await;
    }
    info!("Showhome stopped");
    Ok(())
}
