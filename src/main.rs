mod catalog;
mod config;
mod controller;
mod prediction;
mod products;
mod view;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use catalog::{find_tile, is_element_symbol, normalize_identifier, tiles, Tile};
use config::load_settings;
use controller::{PairState, Phase};
use prediction::{HttpPredictionService, PredictionService};

#[derive(Parser)]
#[command(name = "reactions", about = "Ask the prediction engine what two reactants form")]
struct Cli {
    /// Config file (defaults to ./reactions.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the prediction endpoint
    #[arg(long, global = true)]
    predict_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one reactant pair through the prediction engine
    Predict {
        first: String,
        second: String,
        /// Promote the product at this index after the prediction
        #[arg(long)]
        pick: Option<usize>,
        /// Print the view as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the selectable reactant tiles
    Tiles,
}

fn tile_for(identifier: &str) -> Tile {
    if let Some(tile) = find_tile(identifier) {
        return tile.clone();
    }
    let symbol = normalize_identifier(identifier);
    if !is_element_symbol(&symbol) {
        warn!(identifier, symbol = %symbol, "not a known element symbol");
    }
    Tile::new(identifier, identifier, "")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Tiles => {
            for tile in tiles() {
                println!("{:<4} {}", tile.identifier, tile.display_name);
            }
            Ok(())
        }
        Command::Predict {
            first,
            second,
            pick,
            json,
        } => {
            let mut settings = load_settings(cli.config.as_deref()).context("loading settings")?;
            if let Some(url) = cli.predict_url {
                settings.predict_url = url;
            }
            let service =
                HttpPredictionService::new(&settings.predict_url, settings.request_timeout())
                    .context("building prediction client")?;
            info!(endpoint = service.endpoint(), "using prediction service");

            let state = PairState::new().select(&tile_for(&first)).state;
            let transition = state.select(&tile_for(&second));
            let Some(pending) = transition.prediction else {
                bail!("pair did not produce a prediction request");
            };
            let outcome = service.predict(&pending.request).await;
            let mut state = transition.state.resolve(&pending, outcome);

            if let Some(index) = pick {
                state = state.swap(index).context("picking product")?;
            }

            let view = view::render(&state);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{view}");
            }

            if let Phase::Error { reason, .. } = state.phase() {
                bail!("prediction failed: {reason}");
            }
            Ok(())
        }
    }
}
