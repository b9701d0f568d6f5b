#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line for the clinic locator.
//!
//! ```text
//! clinic_map_cli nearby --lat 28.6139 --lon 77.209 [--filter psych]
//! clinic_map_cli mirrors
//! clinic_map_cli serve [--interactive]
//! ```
//!
//! Running with no subcommand enters the interactive map session.
//!
//! Uses `indicatif-log-bridge` (via [`clinic_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the search spinner never fight for the terminal.

mod interactive;
mod table;

use clap::{Parser, Subcommand};
use clinic_map_cli_utils::FetchSpinner;
use clinic_map_clinic_models::Coordinate;
use clinic_map_locator::{ClinicQueryEngine, LocatorConfig};
use clinic_map_overpass::OverpassConfig;
use clinic_map_overpass::mirrors::enabled_mirrors;

#[derive(Parser)]
#[command(name = "clinic_map_cli", about = "Find mental-health clinics near a point")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search once around a coordinate and print the results
    Nearby {
        /// Latitude of the search anchor
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude of the search anchor
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Only show clinics whose name or type contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show the Overpass mirrors in failover order
    Mirrors,
    /// Start the API server
    Serve {
        /// Prompt for bind address and port
        #[arg(long)]
        interactive: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = clinic_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Nearby { lat, lon, filter } => {
            let anchor = Coordinate::new(lat, lon)?;
            let overpass = OverpassConfig::from_env()?;
            let locator = LocatorConfig::from_env()?;
            let mut engine = ClinicQueryEngine::from_config(&overpass, locator.timing)?;
            let mut results = engine.subscribe();

            let mut spinner = FetchSpinner::new(&multi, &format!("Searching around {anchor}..."));
            spinner.set_active(true);
            engine.search(anchor, true);
            let outcome = results.wait_for(|r| !r.fetching).await?.clone();
            spinner.set_active(false);

            if let Some(failure) = &outcome.last_error {
                eprintln!("Search failed: {failure}");
                std::process::exit(1);
            }

            let needle = filter.as_deref().unwrap_or_default();
            let clinics: Vec<_> = outcome
                .clinics
                .into_iter()
                .filter(|c| c.matches_filter(needle))
                .collect();
            table::print_clinics(&clinics, &anchor);
        }
        Commands::Mirrors => {
            let config = OverpassConfig::from_env()?;
            let registry = enabled_mirrors();

            println!("{:<4} {:<18} URL", "#", "ID");
            println!("{}", "-".repeat(80));
            for (index, url) in config.mirrors.iter().enumerate() {
                let id = registry
                    .iter()
                    .find(|m| &m.url == url)
                    .map_or("(custom)", |m| m.id.as_str());
                println!("{:<4} {id:<18} {url}", index + 1);
            }
            println!(
                "\nRadius {}m, request timeout {:?}",
                config.radius_meters, config.request_timeout
            );
        }
        Commands::Serve { interactive } => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(async move {
                    if interactive {
                        clinic_map_server::interactive::run().await
                    } else {
                        clinic_map_server::run_server().await
                    }
                })
            })
            .await??;
        }
    }

    Ok(())
}
