mod commands;
mod view;

use anyhow::anyhow;
use boat_link::{LinkConfig, LinkHandle, UiCommand};
use boat_protocol::{DisplayWidth, Identity, SailRig};
use clap::{Parser, ValueEnum};
use commands::{parse_line, ConsoleCommand, HELP};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use view::Dashboard;

#[derive(Parser, Debug)]
#[command(name = "boat_console")]
struct Args {
    /// Broker URL (mqtt://, mqtts://, ws:// or wss://).
    #[arg(long, env = "BOAT_BROKER_URL")]
    broker_url: Option<String>,

    /// Boat to log in as on startup.
    #[arg(long)]
    boat: Option<String>,

    #[arg(long)]
    namespace: Option<String>,

    #[arg(long, value_enum)]
    display: Option<DisplayArg>,

    #[arg(long, value_enum)]
    sail_rig: Option<SailRigArg>,

    /// JSON link config; flags override its fields.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Wait for an explicit `connect` instead of connecting on startup.
    #[arg(long, default_value_t = false)]
    no_connect: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DisplayArg {
    Narrow,
    Wide,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SailRigArg {
    Angle,
    Opening,
}

impl Args {
    fn link_config(&self) -> anyhow::Result<LinkConfig> {
        let mut config = match &self.config {
            Some(path) => LinkConfig::from_json_file(path)?,
            None => LinkConfig::default(),
        };
        if let Some(url) = &self.broker_url {
            config.broker_url = url.trim().to_string();
        }
        if let Some(ns) = &self.namespace {
            config.namespace = ns.trim().to_string();
        }
        if let Some(display) = self.display {
            config.display = match display {
                DisplayArg::Narrow => DisplayWidth::Narrow,
                DisplayArg::Wide => DisplayWidth::Wide,
            };
        }
        if let Some(rig) = self.sail_rig {
            config.sail_rig = match rig {
                SailRigArg::Angle => SailRig::Angle,
                SailRigArg::Opening => SailRig::Opening,
            };
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = args.link_config()?;
    let boat = args
        .boat
        .as_deref()
        .map(Identity::parse)
        .transpose()
        .map_err(|e| anyhow!("bad --boat: {e}"))?;

    info!(broker = %config.broker_url, namespace = %config.namespace, "starting console");
    let LinkHandle {
        tx,
        mut events,
        task,
    } = boat_link::spawn(config);

    let send = |cmd: UiCommand| {
        let tx = tx.clone();
        async move {
            tx.send(cmd)
                .await
                .map_err(|_| anyhow!("link actor stopped"))
        }
    };

    if let Some(boat) = boat {
        send(UiCommand::Login(boat)).await?;
    }
    if !args.no_connect {
        send(UiCommand::Connect).await?;
    }

    let mut dashboard = Dashboard::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(ConsoleCommand::Help)) => println!("{HELP}"),
                    Ok(Some(ConsoleCommand::Status)) => println!("{}", dashboard.render()),
                    Ok(Some(ConsoleCommand::Link(cmd))) => send(cmd).await?,
                    Err(e) => eprintln!("{e:#}"),
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                println!("{}", dashboard.apply(event));
            }
        }
    }

    drop(send);
    drop(tx);
    task.await?;
    Ok(())
}
