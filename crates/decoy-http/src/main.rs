//! Decoy command line
//!
//! Loads a configuration, builds its fixtures and pushes one request through
//! a fake transport, or shows how a URL is recognized.
//!
//! Usage:
//!   decoy --config decoy.yaml request GET /users/1
//!   decoy --config decoy.yaml recognize GET /users/1?page=2

use anyhow::Context;
use clap::{Parser, Subcommand};
use decoy_http::transport::{OpenOptions, Transport};
use decoy_http::{Agent, DecoyConfig, TransportBinding};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fake HTTP server for client-side test suites
#[derive(Parser, Debug)]
#[command(name = "decoy")]
#[command(author, version, about = "Serve fixture records through a fake HTTP transport")]
struct Cli {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long, env = "DECOY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dispatch one request and print the response
    Request {
        method: String,
        url: String,

        /// Request body
        #[arg(short, long)]
        body: Option<String>,

        /// Request header as NAME:VALUE, repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Print the parameters a URL is recognized with
    Recognize { method: String, url: String },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DecoyConfig> {
    match path {
        Some(path) => DecoyConfig::from_file(path),
        None => Ok(DecoyConfig::default()),
    }
}

fn build_agent(config: DecoyConfig) -> anyhow::Result<Agent> {
    let mut agent = Agent::with_binding(config, Arc::new(TransportBinding::new()))
        .context("failed to create agent")?;
    agent.build().context("failed to build fixtures")?;
    agent.server().context("failed to start server")?;
    Ok(agent)
}

fn request(
    agent: &mut Agent,
    method: &str,
    url: &str,
    body: Option<&str>,
    headers: &[String],
) -> anyhow::Result<()> {
    let mut transport = agent.server()?.transport();
    transport.open(method, url, OpenOptions::default());
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header '{header}' is not NAME:VALUE"))?;
        transport.set_request_header(name.trim(), value.trim())?;
    }
    transport.send(body)?;

    println!("{} {}", transport.status(), transport.status_text());
    print!("{}", transport.get_all_response_headers());
    println!();
    if let Some(text) = transport.response_text() {
        println!("{text}");
    }
    Ok(())
}

fn recognize(agent: &mut Agent, method: &str, url: &str) -> anyhow::Result<()> {
    match agent.server()?.resolve(method, url) {
        Some(resolved) => {
            let output = serde_json::json!({
                "route": resolved.handler.label(),
                "params": resolved.params,
                "queryParams": resolved.query_params,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        None => println!("no route matches {} {}", method.to_uppercase(), url),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "decoy_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_ref())?;
    info!(
        "Loaded configuration with {} resource routes",
        config.resources.len()
    );
    let mut agent = build_agent(config)?;

    match cli.command {
        Command::Request {
            method,
            url,
            body,
            headers,
        } => request(&mut agent, &method, &url, body.as_deref(), &headers),
        Command::Recognize { method, url } => recognize(&mut agent, &method, &url),
    }
}
