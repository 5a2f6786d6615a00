//! Subcommand handlers, one participant client per invocation.

use anyhow::Context;
use letterbox_client::{Client, ClientConfig};
use letterbox_config_and_utils::ParticipantId;
use tracing::info;

async fn open(config: &ClientConfig, id: &str) -> anyhow::Result<Client> {
    let participant = ParticipantId::parse(id)?;
    let client = Client::open(participant, config)
        .await
        .with_context(|| format!("failed to open store for {id:?}"))?;
    Ok(client)
}

pub async fn init(config: &ClientConfig, id: &str) -> anyhow::Result<()> {
    let client = open(config, id).await?;
    let path = config.paths.store_file(client.participant());
    println!("{}", path.display());
    Ok(())
}

pub async fn send(
    config: &ClientConfig,
    from: &str,
    to: &str,
    message: &str,
) -> anyhow::Result<()> {
    let client = open(config, from).await?;
    let id = client.send(to, message).await?;
    let report = client.flush().await?;
    info!(record_id = id, report = ?report, "Send complete");
    println!("{id}");
    Ok(())
}

pub async fn inbox(config: &ClientConfig, id: &str) -> anyhow::Result<()> {
    let client = open(config, id).await?;
    for message in client.list_messages().await? {
        println!("{}", serde_json::to_string(&message)?);
    }
    Ok(())
}

pub async fn run(config: &ClientConfig, id: &str) -> anyhow::Result<()> {
    let client = open(config, id).await?;
    client.start();
    info!(participant_id = %client.participant(), "Running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("Shutting down");
    client.shutdown().await;
    Ok(())
}

pub async fn register(config: &ClientConfig, id: &str, strict: bool) -> anyhow::Result<()> {
    let client = open(config, id).await?;
    let outcome = if strict {
        Some(client.register_strict().await?)
    } else {
        client.register_configured().await?
    };
    if let Some(outcome) = outcome {
        println!("{outcome:?}");
    }
    Ok(())
}
