//! League - generational self-play training for Ludus
//!
//! A long-running process that:
//! 1. Builds (or resumes) a league roster for the selected checkers board
//! 2. Runs each generation's episodes with MCTS and move validation
//! 3. Promotes challengers, audits the Champion against fresh baselines
//! 4. Writes JSON checkpoints under the checkpoint directory

use anyhow::Result;
use clap::Parser;
use games_checkers::Checkers;
use indicatif::{ProgressBar, ProgressStyle};
use league::{
    ChannelSink, Collaborators, FanoutSink, JsonCheckpointStore, LeagueEvent, LeagueScheduler,
    LocalEvaluators, LocalTrainer, PersistenceCollaborator, TracingSink,
};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{error, info};

mod config;

use crate::config::{Config, CENTRAL_CONFIG};

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Drive a progress bar from league events until the league shuts down.
async fn show_progress(mut events: UnboundedReceiver<LeagueEvent>, generations: u64, enabled: bool) {
    let bar = if enabled && std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let pb = ProgressBar::new(generations);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} generations {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    } else {
        None
    };

    while let Some(event) = events.recv().await {
        let Some(pb) = &bar else { continue };
        match event {
            LeagueEvent::GenerationSealed(stats) => {
                pb.inc(1);
                pb.set_message(format!(
                    "(gen {}: {} games, {} failed)",
                    stats.index, stats.completed, stats.failed
                ));
            }
            LeagueEvent::ChallengerDecided(report) if report.promoted => {
                pb.println(format!(
                    "generation {}: {} promoted with win rate {:.3}",
                    report.generation, report.challenger, report.win_rate
                ));
            }
            _ => {}
        }
    }

    if let Some(pb) = bar {
        pb.finish_and_clear();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    let rules = Arc::new(config.rules()?);
    let league_config = config.league_config(&CENTRAL_CONFIG);
    league_config.validate()?;

    info!(
        board = %config.board,
        generations = config.generations,
        seed = league_config.seed,
        simulations = league_config.episode.search.num_simulations,
        validation = league_config.episode.search.validate_moves,
        data_dir = %config.data_dir,
        checkpoint_dir = %config.checkpoint_dir,
        "Starting league"
    );

    let store = Arc::new(JsonCheckpointStore::new(&config.checkpoint_dir));
    let (tx, rx) = mpsc::unbounded_channel();
    let events = FanoutSink::new()
        .with(Arc::new(TracingSink))
        .with(Arc::new(ChannelSink::new(tx)));
    let collaborators: Collaborators<Checkers> = Collaborators {
        evaluators: Arc::new(LocalEvaluators::new()),
        trainer: Arc::new(LocalTrainer::new()),
        persistence: store.clone(),
        events: Arc::new(events),
    };

    let snapshot = match config.resume {
        Some(index) => Some(store.load(index).await?),
        None if config.resume_latest => {
            let latest = store.latest().await?;
            if latest.is_none() {
                info!("No checkpoint found, starting a new league");
            }
            latest
        }
        None => None,
    };

    let mut league = match snapshot {
        Some(snapshot) => LeagueScheduler::resume(rules, league_config, collaborators, snapshot)?,
        None => LeagueScheduler::new(rules, league_config, collaborators)?,
    };

    // Setup graceful shutdown
    let cancel = league.cancel_token();
    let shutdown_handle = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, finishing current generation...");
            cancel.cancel();
        }
    });

    let progress = tokio::spawn(show_progress(rx, config.generations, !config.no_progress));

    let run_result = league.run(config.generations).await;

    // Closes the event channel so the progress task can finish
    drop(league);
    let _ = progress.await;
    shutdown_handle.abort();

    match run_result {
        Ok(sealed) => {
            info!(generations = sealed, "League completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("League failed: {}", e);
            Err(e.into())
        }
    }
}
