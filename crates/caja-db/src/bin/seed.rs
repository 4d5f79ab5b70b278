//! # Seed Data Generator
//!
//! Populates a database with a small working ledger for development.
//!
//! ## Usage
//! ```bash
//! # 40 items (default)
//! cargo run -p caja-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p caja-db --bin seed -- --items 200 --db ./data/caja.db
//! ```
//!
//! ## Generated Data
//! - Opening capital of $500.00
//! - Items across a few categories with restocks at two costs, so the
//!   moving average is exercised
//! - A handful of clients
//! - Cash and credit sales, some receivables partly paid
//! - One open payable

use caja_core::ledger::{CartLine, NewItem, NewPayable, PaymentRequest, SaleRequest, StockMovement};
use caja_core::{Money, SaleType, DEFAULT_TENANT_ID};
use caja_db::{DbConfig, LedgerEngine, SqliteStore};
use rust_decimal::Decimal;
use std::env;

/// Item families: code prefix, names.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "BEB",
        &["Agua 600ml", "Refresco Cola", "Jugo Naranja", "Cafe Molido", "Te Verde"],
    ),
    (
        "BOT",
        &["Papas Sal", "Galletas Maria", "Cacahuates", "Chocolate", "Palomitas"],
    ),
    (
        "ABR",
        &["Arroz 1kg", "Frijol 1kg", "Azucar 1kg", "Aceite 1L", "Sal 1kg"],
    ),
    (
        "LIM",
        &["Jabon Barra", "Detergente", "Cloro 1L", "Esponja", "Papel Higienico"],
    ),
];

const CLIENTS: &[&str] = &["Ana Lopez", "Luis Perez", "Marta Ruiz", "Jorge Diaz"];

/// Margins in basis points.
const MARGINS: &[u32] = &[2000, 2500, 3000, 4000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut item_count: usize = 40;
    let mut db_path = String::from("./caja_dev.db");
    let mut tenant = String::from(DEFAULT_TENANT_ID);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--items" | "-n" => {
                if i + 1 < args.len() {
                    item_count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Caja POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --items <N>      Number of items to register (default: 40)");
                println!("  -d, --db <PATH>      Database file path (default: ./caja_dev.db)");
                println!("  -t, --tenant <ID>    Tenant id (default: built-in tenant)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Caja POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Tenant:   {}", tenant);
    println!("Items:    {}", item_count);
    println!();

    let store = SqliteStore::connect(DbConfig::new(&db_path)).await?;
    let engine = LedgerEngine::new(store, tenant);

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = engine.items().await?.len();
    if existing > 0 {
        println!("⚠ Tenant already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    engine
        .set_initial_capital(Money::from_cents(50_000), false)
        .await?;
    println!("✓ Opening capital: {}", Money::from_cents(50_000));

    // Items
    let start = std::time::Instant::now();
    let catalog: Vec<(&str, &str)> = CATEGORIES
        .iter()
        .flat_map(|(prefix, names)| names.iter().map(move |name| (*prefix, *name)))
        .collect();
    let mut codes = Vec::new();
    for seed in 0..item_count {
        let (prefix, name) = catalog[seed % catalog.len()];
        let variant = seed / catalog.len();
        let code = format!("{}-{:03}", prefix, seed);
        let description = if variant == 0 {
            name.to_string()
        } else {
            format!("{} #{}", name, variant + 1)
        };

        if let Err(e) = seed_item(&engine, &code, &description, seed).await {
            eprintln!("Failed to register {}: {}", code, e);
            continue;
        }
        codes.push(code);

        if codes.len() % 20 == 0 {
            println!("  Registered {} items...", codes.len());
        }
    }
    println!("✓ Registered {} items in {:?}", codes.len(), start.elapsed());

    // Clients
    let mut clients = Vec::new();
    for name in CLIENTS {
        clients.push(engine.register_client(name).await?);
    }
    println!("✓ Registered {} clients", clients.len());

    // Sales
    let mut sales = 0;
    for (idx, client) in clients.iter().enumerate() {
        let lines: Vec<CartLine> = codes
            .iter()
            .skip(idx)
            .step_by(clients.len().max(1))
            .take(3)
            .map(|code| CartLine::new(code.as_str(), 1 + (idx as i64 % 2)))
            .collect();
        if lines.is_empty() {
            continue;
        }
        let sale_type = if idx % 2 == 0 {
            SaleType::Cash
        } else {
            SaleType::Credit
        };

        let sale = engine
            .commit_sale(SaleRequest {
                client_id: Some(client.id.clone()),
                sale_type,
                lines,
            })
            .await?;
        sales += 1;

        // Pay half of every other receivable.
        if let Some(receivable_id) = &sale.receivable_id {
            if idx % 4 == 1 {
                let half = Money::from_cents(sale.subtotal_cents / 2);
                engine
                    .apply_payment(PaymentRequest::receivable(receivable_id.as_str(), half))
                    .await?;
            }
        }
    }
    println!("✓ Committed {} sales", sales);

    engine
        .record_payable(NewPayable {
            provider: "Distribuidora Central".to_string(),
            concept: "Restock abarrotes".to_string(),
            amount: Money::from_cents(12_500),
        })
        .await?;
    println!("✓ Recorded 1 payable");

    println!();
    let summary = engine.summary().await?;
    println!("Stock value:        {}", summary.stock_value);
    println!("Receivables:        {}", summary.receivables_outstanding);
    println!("Current capital:    {}", summary.current_capital);
    println!("Total profit:       {}", summary.total_profit);

    let report = engine.audit().await?;
    if report.is_clean() {
        println!("✓ Audit clean");
    } else {
        println!("⚠ Audit found {} issues", report.findings.len());
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Registers one item and restocks it at a second cost.
async fn seed_item(
    engine: &LedgerEngine<SqliteStore>,
    code: &str,
    description: &str,
    seed: usize,
) -> caja_db::DbResult<()> {
    // Unit cost $0.50 - $8.49
    let first_cost = 50 + ((seed * 37) % 800) as i64;
    let second_cost = first_cost + (seed % 7) as i64 * 5;

    engine
        .register_item(NewItem {
            code: code.to_string(),
            description: description.to_string(),
            margin_bps: MARGINS[seed % MARGINS.len()],
            image_ref: None,
            initial_quantity: 10 + (seed % 20) as i64,
            initial_unit_cost_cents: Decimal::from(first_cost),
        })
        .await?;

    engine
        .apply_stock_movement(
            code,
            StockMovement::restock(5 + (seed % 10) as i64, Decimal::from(second_cost)),
        )
        .await?;
    Ok(())
}
