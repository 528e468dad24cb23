//! Product Gateway server
//!
//! ```text
//! client ──POST /functions/v1/gateway──▶ auth ─▶ action ─▶ rate limit ─▶ validate ─▶ backend RPC
//! ```
//!
//! Usage: `product_gateway [--env|-e <env>] [--port <port>]`
//! (reads `config/<env>.yaml`, default `dev`).

use anyhow::Context;
use std::sync::Arc;

use product_gateway::config::AppConfig;
use product_gateway::gateway::{self, AppState};
use product_gateway::logging;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env).with_context(|| format!("loading {} config", env))?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }

    let _log_guard = logging::init_logging(&app_config);
    tracing::info!(
        "Starting product gateway {} ({}) in {} mode",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env
    );

    let state = AppState::from_config(&app_config).context("initializing gateway state")?;
    gateway::run_server(&app_config.gateway, Arc::new(state))
        .await
        .with_context(|| {
            format!(
                "serving on {}:{}",
                app_config.gateway.host, app_config.gateway.port
            )
        })?;

    Ok(())
}
