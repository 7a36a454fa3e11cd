//! Duelcast CLI tools: local match simulation, payload diagnostics.

#![forbid(unsafe_code)]

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use duel_client::{LoopbackHub, SessionController};
use duel_common::MatchConfig;
use duel_core::{PlayerKey, Role, SignalPayload};

#[derive(Parser, Debug)]
#[command(name = "duelcast")]
#[command(about = "Duelcast CLI tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scripted duel over in-memory transports
    Simulate {
        /// Number of late-joining viewers
        #[arg(short, long, default_value_t = 2)]
        viewers: usize,

        /// Shrink the snapshot delay for quick runs
        #[arg(long)]
        fast: bool,
    },

    /// Decode a signal payload and print its parsed form
    Decode {
        /// Wire text, e.g. "react:player1"
        text: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    duel_common::init_tracing();

    let args = Args::parse();

    match args.command {
        Command::Simulate { viewers, fast } => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(simulate(viewers, fast))?;
        }
        Command::Decode { text } => {
            let payload = SignalPayload::decode(&text)
                .map_err(|e| anyhow::anyhow!("malformed payload: {e}"))?;
            println!("{payload:?}");
        }
        Command::Version => {
            println!("duelcast {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn simulate(viewer_count: usize, fast: bool) -> Result<()> {
    let hub = LoopbackHub::new();
    let config = if fast {
        MatchConfig::default().with_sync_delay(Duration::from_millis(50))
    } else {
        MatchConfig::default()
    };

    println!(
        "simulating a duel on channel {:?} with {} viewer(s)",
        config.channel, viewer_count
    );

    let (mut player1, _p1_events) =
        SessionController::new(hub.media_session(), hub.signal_session(), config.clone());
    player1.select_role(Role::Player1)?;
    player1.join().await?;

    let (mut player2, _p2_events) =
        SessionController::new(hub.media_session(), hub.signal_session(), config.clone());
    player2.select_role(Role::Player2)?;
    player2.join().await?;

    let mut viewers = Vec::with_capacity(viewer_count);
    for _ in 0..viewer_count {
        let (mut viewer, _events) =
            SessionController::new(hub.media_session(), hub.signal_session(), config.clone());
        viewer.select_role(Role::Viewer)?;
        viewer.join().await?;
        viewers.push(viewer);
    }

    // Wait out the snapshot window so every member has a baseline tally.
    tokio::time::sleep(config.sync_delay * 2).await;

    for (i, viewer) in viewers.iter().enumerate() {
        let target = if i % 2 == 0 {
            PlayerKey::Player1
        } else {
            PlayerKey::Player2
        };
        viewer.send_reaction(target).await?;
        println!(
            "{} cheered for {target}",
            viewer
                .identity()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "viewer".to_string()),
        );
    }

    let view = player1.view();
    println!(
        "final tally: player1={} player2={}",
        view.tally.player1, view.tally.player2
    );
    let all_consistent = player2.view().tally == view.tally
        && viewers.iter().all(|v| v.view().tally == view.tally);
    println!("tallies consistent across members: {all_consistent}");

    for mut viewer in viewers {
        viewer.leave().await?;
    }
    player2.leave().await?;
    player1.leave().await?;
    println!("all participants left cleanly");

    Ok(())
}
