use super::*;
use std::io::{self, Write};

use anyhow::{Context, bail};
use futures_util::StreamExt;

use crate::config;
use crate::gateway::{CortexSelector, GatewayClient};
use crate::supervisor::{Status, StopOutcome, Supervisor};

fn build_supervisor() -> Result<Supervisor> {
    let settings = config::load().context("loading settings")?;
    Ok(Supervisor::new(settings))
}

/// Bring the server up if needed and hand back a client bound to its
/// live endpoint. Every domain command funnels through here.
async fn connect() -> Result<GatewayClient> {
    let supervisor = build_supervisor()?;
    let endpoint = supervisor
        .endpoint()
        .await
        .context("bringing up the memex server")?;
    Ok(GatewayClient::new(&endpoint))
}

pub async fn server_start() -> Result<()> {
    let supervisor = build_supervisor()?;
    if supervisor.is_alive().await {
        println!("server already running");
        return Ok(());
    }

    let record = supervisor
        .ensure()
        .await
        .context("starting the memex server")?;
    println!("server started on port {} (pid {})", record.port, record.pid);
    Ok(())
}

pub async fn server_stop() -> Result<()> {
    let supervisor = build_supervisor()?;
    match supervisor
        .stop()
        .await
        .context("stopping the memex server")?
    {
        StopOutcome::Stopped => println!("server stopped"),
        StopOutcome::StaleRecord => println!("server not running (stale state cleaned up)"),
        StopOutcome::NotRunning => println!("server not running"),
    }
    Ok(())
}

pub async fn server_status() -> Result<()> {
    let supervisor = build_supervisor()?;
    match supervisor.status().await {
        Status::Running(record) => {
            println!("server is running on port {} (pid {})", record.port, record.pid);
        }
        Status::RunningUnrecorded => {
            println!("server is running but its state record is missing");
        }
        Status::NotRunning => println!("server is not running"),
    }
    Ok(())
}

pub async fn server_restart() -> Result<()> {
    let supervisor = build_supervisor()?;
    let record = supervisor
        .restart()
        .await
        .context("restarting the memex server")?;
    println!("server restarted on port {} (pid {})", record.port, record.pid);
    Ok(())
}

pub async fn cortex_create(args: CreateArgs) -> Result<()> {
    let client = connect().await?;
    let created = client
        .create_cortex(&args.path, &args.name)
        .await
        .context("creating cortex")?;
    println!(
        "created cortex {} at {} (id {})",
        created.cortex.name, created.cortex.path, created.cortex.id
    );
    Ok(())
}

pub async fn cortex_list() -> Result<()> {
    let client = connect().await?;
    let list = client.list_cortices().await.context("listing cortices")?;

    if list.cortices.is_empty() {
        println!("no cortices found");
        return Ok(());
    }

    println!("ID\tNAME\tPATH");
    for cortex in &list.cortices {
        println!("{}\t{}\t{}", cortex.id, cortex.name, cortex.path);
    }
    Ok(())
}

pub async fn cortex_show(args: SelectArgs) -> Result<()> {
    let selector = selector_from_flags(args)?;
    let client = connect().await?;
    let cortex = client
        .get_cortex(&selector)
        .await
        .context("fetching cortex")?;
    println!("{}", serde_json::to_string_pretty(&cortex)?);
    Ok(())
}

pub async fn cortex_index(args: SelectArgs) -> Result<()> {
    let selector = selector_from_flags(args)?;
    let client = connect().await?;
    client
        .index_cortex(&selector)
        .await
        .context("indexing cortex")?;
    println!("cortex {selector} indexed");
    Ok(())
}

pub async fn query(args: QueryArgs) -> Result<()> {
    let client = connect().await?;

    if args.stream {
        let stream = client
            .query_stream(&args.text)
            .await
            .context("opening query stream")?;
        tokio::pin!(stream);

        let mut stdout = io::stdout();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("reading query stream")?;
            stdout.write_all(chunk.as_bytes())?;
            stdout.flush()?;
        }
        println!();
        return Ok(());
    }

    let answer = client.query(&args.text).await.context("running query")?;
    println!("{}", serde_json::to_string_pretty(&answer)?);
    Ok(())
}

pub async fn init() -> Result<()> {
    let client = connect().await?;
    let report = client
        .system_init()
        .await
        .context("initializing backing stores")?;

    for (store, initialized) in &report {
        let outcome = if *initialized {
            "initialized"
        } else {
            "not initialized"
        };
        println!("{store}: {outcome}");
    }
    Ok(())
}

pub fn completions(args: CompletionsArgs) -> Result<()> {
    let mut command = <Cli as clap::CommandFactory>::command();
    clap_complete::generate(args.shell, &mut command, "memex", &mut io::stdout());
    Ok(())
}

fn selector_from_flags(args: SelectArgs) -> Result<CortexSelector> {
    match (args.id, args.name) {
        (Some(id), None) => Ok(CortexSelector::Id(id)),
        (None, Some(name)) => Ok(CortexSelector::Name(name)),
        _ => bail!("specify exactly one of --id or --name"),
    }
}
