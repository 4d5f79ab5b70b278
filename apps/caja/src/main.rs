//! # Caja Entry Point
//!
//! Prints the ledger status for the configured tenant.
//!
//! ```bash
//! caja                         # status report
//! caja --config ./caja.toml    # explicit config file
//! caja --reset --yes           # clear sales and balances, then report
//! ```
//!
//! The setup lives in lib.rs so the commands stay testable.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    match caja::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            ExitCode::FAILURE
        }
    }
}
