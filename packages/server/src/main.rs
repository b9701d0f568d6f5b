#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Clinic map API server binary.
//!
//! Runs non-interactively from `BIND_ADDR`/`PORT`, or prompts for both
//! when started with `--interactive`.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if std::env::args().skip(1).any(|arg| arg == "--interactive") {
        clinic_map_server::interactive::run().await
    } else {
        clinic_map_server::run_server().await
    }
}
