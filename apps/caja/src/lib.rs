//! # Caja Application Library
//!
//! Application layer for Caja POS: configuration, UI state, commands and
//! the `caja` status binary.
//!
//! ## Module Organization
//! ```text
//! caja/
//! ├── lib.rs          ◄─── You are here (logging, startup, status report)
//! ├── config.rs       ◄─── caja.toml + environment
//! ├── error.rs        ◄─── API error type for commands
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── cart.rs     ◄─── Cart with frozen prices
//! │   └── app.rs      ◄─── AppState, Action, reduce(), SharedState
//! └── commands/
//!     ├── mod.rs          ◄─── Outcome dispatch
//!     ├── inventory.rs    ◄─── Items and stock movements
//!     ├── sale.rs         ◄─── Cart, clients, checkout
//!     ├── settlement.rs   ◄─── Payables and payments
//!     ├── capital.rs      ◄─── Contributions and withdrawals
//!     └── maintenance.rs  ◄─── Reset, audit, subscriptions
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Application Startup                               │
//! │                                                                         │
//! │  1. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter                                │
//! │     • Default: info,caja=debug,sqlx=warn; override with RUST_LOG        │
//! │                                                                         │
//! │  2. Load Configuration ───────────────────────────────────────────────► │
//! │     • defaults → caja.toml → CAJA_* environment → validate              │
//! │                                                                         │
//! │  3. Open the Store ───────────────────────────────────────────────────► │
//! │     • SQLite with WAL mode, embedded migrations                         │
//! │                                                                         │
//! │  4. Build LedgerEngine + SharedState ─────────────────────────────────► │
//! │                                                                         │
//! │  5. Optional reset (--reset --yes), then print the ledger status        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod state;

use std::fmt::Write as _;
use std::path::PathBuf;

use caja_core::ledger::{AuditReport, LedgerSummary};
use caja_db::{LedgerEngine, SqliteStore};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, StoreInfo};
use crate::error::ApiError;
use crate::state::SharedState;

/// Command line options of the `caja` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub reset: bool,
    pub confirmed: bool,
    pub help: bool,
}

impl CliOptions {
    /// Parses `args` (including the program name).
    pub fn parse(args: &[String]) -> Result<Self, ApiError> {
        let mut options = CliOptions::default();
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = iter
                        .next()
                        .ok_or_else(|| ApiError::validation("--config needs a path"))?;
                    options.config_path = Some(PathBuf::from(path));
                }
                "--reset" => options.reset = true,
                "--yes" | "-y" => options.confirmed = true,
                "--help" | "-h" => options.help = true,
                other => {
                    return Err(ApiError::validation(format!("Unknown option: {}", other)));
                }
            }
        }
        Ok(options)
    }
}

pub const USAGE: &str = "\
Caja POS ledger status

Usage: caja [OPTIONS]

Options:
  -c, --config <PATH>  Config file (default: platform config dir caja.toml)
      --reset          Delete every sale, receivable and payable
  -y, --yes            Confirm --reset
  -h, --help           Show this help message";

/// Runs the `caja` binary.
pub async fn run(args: Vec<String>) -> Result<(), ApiError> {
    let options = CliOptions::parse(&args)?;
    if options.help {
        println!("{}", USAGE);
        return Ok(());
    }

    init_tracing();
    info!("Starting Caja POS");

    let config = AppConfig::load(options.config_path)?;
    let db_config = config.db_config()?;
    info!(path = ?db_config.database_path, tenant = config.tenant_id(), "Opening ledger");

    let store = SqliteStore::connect(db_config).await?;
    let engine = LedgerEngine::with_config(store, config.tenant_id(), config.engine_config());
    let state = SharedState::new();

    if options.reset {
        let summary =
            commands::maintenance::reset_ledger(&engine, &state, options.confirmed).await?;
        println!(
            "Reset: {} sales, {} receivables, {} payables removed; {} clients cleared",
            summary.sales_deleted,
            summary.receivables_deleted,
            summary.payables_deleted,
            summary.clients_zeroed
        );
    }

    let summary = commands::maintenance::summary(&engine, &state).await?;
    let audit = commands::maintenance::audit(&engine, &state).await?;
    print!("{}", render_report(&config.store_info, &summary, &audit));

    Ok(())
}

/// Formats the ledger status.
pub fn render_report(info: &StoreInfo, summary: &LedgerSummary, audit: &AuditReport) -> String {
    let money = |m| info.format_money(m);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}", info.name);
    let _ = writeln!(out, "{}", "=".repeat(info.name.chars().count().max(8)));
    let _ = writeln!(
        out,
        "Inventory     {} items, {} units, valued {}",
        summary.item_count,
        summary.units_on_hand,
        money(summary.stock_value)
    );
    let _ = writeln!(
        out,
        "Sales         {} totalling {}",
        summary.sale_count,
        money(summary.sales_total)
    );
    let _ = writeln!(
        out,
        "Receivables   {} open, {} outstanding, {} deferred profit",
        summary.open_receivables,
        money(summary.receivables_outstanding),
        money(summary.deferred_profit)
    );
    let _ = writeln!(
        out,
        "Payables      {} open, {} outstanding",
        summary.open_payables,
        money(summary.payables_outstanding)
    );
    let _ = writeln!(
        out,
        "Clients       {} owing {}",
        summary.client_count,
        money(summary.client_debt)
    );
    let _ = writeln!(out, "Capital       {}", money(summary.current_capital));
    let _ = writeln!(out, "  initial     {}", money(summary.initial_capital));
    let _ = writeln!(out, "  profit      {}", money(summary.total_profit));

    if audit.is_clean() {
        let _ = writeln!(out, "Audit         clean");
    } else {
        let _ = writeln!(out, "Audit         {} findings", audit.findings.len());
        for finding in &audit.findings {
            let _ = writeln!(out, "  - {:?}", finding);
        }
    }
    out
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=caja_db=trace` - Show trace for the store only
/// - Default: `info,caja=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caja=debug,sqlx=warn"));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::ledger::AuditFinding;
    use caja_core::Money;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("caja")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_options() {
        let options = CliOptions::parse(&args(&["--reset", "-y", "-c", "/tmp/caja.toml"])).unwrap();
        assert!(options.reset);
        assert!(options.confirmed);
        assert_eq!(options.config_path, Some(PathBuf::from("/tmp/caja.toml")));

        assert!(CliOptions::parse(&args(&["--config"])).is_err());
        assert!(CliOptions::parse(&args(&["--frobnicate"])).is_err());
        assert_eq!(CliOptions::parse(&args(&[])).unwrap(), CliOptions::default());
    }

    #[test]
    fn test_render_report() {
        let summary = LedgerSummary {
            item_count: 2,
            units_on_hand: 10,
            stock_value: Money::from_cents(35_000),
            current_capital: Money::from_cents(123_450),
            ..LedgerSummary::default()
        };
        let audit = AuditReport {
            findings: vec![AuditFinding::NegativeStock {
                code: "A".to_string(),
                quantity: -1,
            }],
        };

        let report = render_report(&StoreInfo::default(), &summary, &audit);
        assert!(report.starts_with("Caja POS\n"));
        assert!(report.contains("2 items, 10 units, valued $350.00"));
        assert!(report.contains("Capital       $1,234.50"));
        assert!(report.contains("1 findings"));
    }
}
