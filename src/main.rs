#![allow(dead_code)]

use std::fs;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::app::Context;
use crate::utils::prelude::*;

mod app;
mod catalog;
mod config;
mod error;
mod inbound;
mod model;
mod onebot;
mod outbound;
mod parser;
mod policy;
mod router;
mod store;
mod utils;

#[tokio::main]
async fn main() -> AnyResult<()> {
    simple_env_load::load_env_from(&[".env"]);

    std::fs::create_dir_all("./data/")
        .map_err(|e| anyhow::anyhow!("Failed to create data folder: {}", e))?;

    let logfile = fs::File::create("./data/gateway.log")
        .map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env()?,
        )
        .with_ansi(false)
        .with_writer(Mutex::new(logfile))
        .compact()
        .init();

    let config_path = std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "./data/config.yaml".to_string());

    let ctx = Context::bootstrap(config_path).await.context("failed to bootstrap gateway")?;

    let config = ctx.config.load().context("failed to read configuration for server bind")?;
    let addr = ctx.server_addr(&config);

    let inbound = inbound::InboundServer::new(Arc::clone(&ctx.router), Arc::clone(&ctx.audit));

    // Fan unsolicited downstream traffic back to every connected chat adapter.
    {
        let inbound = Arc::clone(&inbound);
        ctx.outbound
            .set_message_handler(move |id, frame| {
                let inbound = Arc::clone(&inbound);
                tokio::spawn(async move {
                    debug!("downstream frame from {id}");
                    inbound.broadcast(&frame).await;
                });
            })
            .await;
    }

    // Spawn ctrl-c shutdown task.
    {
        tokio::spawn(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("Could not register ctrl+c handler");

            info!("Shutting down by ctrl-c");
            std::process::exit(0);
        });
    }

    info!("starting inbound server on {addr}");
    inbound.serve(&addr).await.context("inbound server crashed")?;

    Ok(())
}
