//! Command handlers

use crate::error::Result;
use monitor360_sdk::auth::{InMemorySessionSource, TokenBroker, TokenResolver};
use monitor360_sdk::{ClientBuilder, RequestOutcome, SdkConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Broker over a source seeded with whatever session can be found locally
async fn start_broker(config: &SdkConfig) -> Arc<TokenBroker> {
    let source = match TokenResolver::resolve().await {
        Some(session) => InMemorySessionSource::with_session(session),
        None => InMemorySessionSource::new(),
    };
    let broker = Arc::new(TokenBroker::from_config(Arc::new(source), &config.wait));
    broker.start().await;
    broker
}

pub async fn handle_token(
    config_path: Option<&Path>,
    timeout_ms: Option<u64>,
    require_auth: bool,
) -> Result<()> {
    let config = SdkConfig::load(config_path)?;
    let broker = start_broker(&config).await;

    let mut options = config.wait.options();
    if let Some(timeout_ms) = timeout_ms {
        options = options.timeout_ms(timeout_ms);
    }
    if require_auth {
        options = options.require_auth(true);
    }
    debug!(?options, "Waiting for session token");

    match broker.await_token(options).await? {
        Some(token) => {
            let source = TokenResolver::auth_source().await.unwrap_or("unknown");
            println!("Session token available ({} chars, from {})", token.len(), source);
        }
        None => println!("No session token available"),
    }

    broker.shutdown();
    Ok(())
}

pub async fn handle_get(config_path: Option<&Path>, path: &str) -> Result<()> {
    let config = SdkConfig::load(config_path)?;
    let broker = start_broker(&config).await;

    let client = ClientBuilder::from_config(&config)?
        .broker(broker.clone())
        .build()?;
    info!(base_url = client.base_url(), "Sending GET {}", path);

    let request = client.get(path).build().map_err(monitor360_sdk::ApiError::from)?;
    let response = client.send(request).await?;
    let status = response.status();
    let outcome = RequestOutcome::of(&response);
    let body = response.text().await.unwrap_or_default();

    println!("{} {}", status, outcome);
    if !body.is_empty() {
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or(body)
            ),
            Err(_) => println!("{body}"),
        }
    }

    broker.shutdown();
    Ok(())
}

pub fn handle_config(config_path: Option<&Path>, example: bool) -> Result<()> {
    if example {
        println!("{}", SdkConfig::generate_example()?);
        return Ok(());
    }

    let config = SdkConfig::load(config_path)?;
    println!("api_base        = {}", config.api_base()?);
    println!("identity.url    = {}", config.identity.url);
    println!("identity.key    = <set>");
    println!("request_timeout = {:?}", config.request_timeout());
    println!(
        "wait            = {} ms (poll {} ms, require_auth = {})",
        config.wait.timeout_ms, config.wait.poll_interval_ms, config.wait.require_auth
    );
    Ok(())
}
