#![cfg(not(tarpaulin_include))]

use barcode_desk::Config;
use barcode_desk::app;
use std::env;

/// Main entry point for the barcode desk web application
///
/// # Arguments
/// * `BIND_ADDR` - Optional listen address, `127.0.0.1:3000` by default
/// * `DATA_FILE` - Optional spreadsheet path, `barcode_database.xlsx` next to
///   the executable by default
///
/// Log verbosity follows `RUST_LOG` and defaults to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_args(&args);

    app::run(config).await
}
