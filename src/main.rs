use std::{env, path::PathBuf};

use color_eyre::{eyre::eyre, Result};
use leaderboard::{
    leaderboard::Leaderboard,
    replay::{Config, Replay},
};
use tracing_subscriber::{prelude::*, EnvFilter};
use tracing_tree::HierarchicalLayer;
use yansi::Paint;

const USAGE: &str = "\
usage: leaderboard [--config PATH] [--top N] [--window N] [--no-color] REPLAY";

fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(HierarchicalLayer::new(2))
        .try_init()?;

    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        println!("{USAGE}");
        return Ok(());
    }

    let config_path: PathBuf = match args.opt_value_from_str("--config")? {
        Some(path) => path,
        None => env::var("LEADERBOARD_CONFIG")
            .unwrap_or_else(|_| String::from("leaderboard.toml"))
            .into(),
    };
    let top: Option<i64> = args.opt_value_from_str("--top")?;
    let window: Option<i64> = args.opt_value_from_str("--window")?;
    let no_color = args.contains("--no-color");

    let replay_path: PathBuf = match args.opt_free_from_str()? {
        Some(path) => path,
        None => env::var("REPLAY_FILE")
            .map_err(|_| eyre!("no replay file given\n{USAGE}"))?
            .into(),
    };

    let remaining = args.finish();
    if !remaining.is_empty() {
        tracing::warn!("ignoring unexpected arguments {remaining:?}");
    }

    let mut config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        tracing::debug!("no config at {}, using defaults", config_path.display());
        Config::default()
    };
    config.top = top.unwrap_or(config.top);
    config.window = window.unwrap_or(config.window);
    config.color &= !no_color;

    if !config.color {
        Paint::disable();
    }

    let replay = Replay::load(&replay_path)?;
    let board = Leaderboard::new();

    let summary = replay.apply(&board)?;
    tracing::info!(
        "replayed {} ({} applied, {} skipped)",
        replay.name,
        summary.applied,
        summary.skipped
    );

    print!("{}", replay.report(&board, &config)?);

    Ok(())
}
