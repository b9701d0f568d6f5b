//! Interactive mode for the server.
//!
//! Shows the mirror pool that will be used, then prompts for bind address
//! and port before starting the server.

use clinic_map_overpass::OverpassConfig;
use dialoguer::{Confirm, Input};

use crate::{DEFAULT_BIND_ADDR, DEFAULT_PORT};

/// Runs the server in interactive mode, prompting for configuration.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the Overpass configuration is
/// invalid, a prompt fails, or the underlying server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Clinic Map Server");
    println!();

    let config = OverpassConfig::from_env().map_err(std::io::Error::other)?;
    println!("Overpass mirrors (failover order):");
    for (index, url) in config.mirrors.iter().enumerate() {
        println!("  {}. {url}", index + 1);
    }
    println!("Search radius: {}m", config.radius_meters);
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(DEFAULT_BIND_ADDR.to_string())
        .interact_text()
        .map_err(std::io::Error::other)?;

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(DEFAULT_PORT)
        .interact_text()
        .map_err(std::io::Error::other)?;

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .map_err(std::io::Error::other)?
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::serve(&bind_addr, port).await
}
