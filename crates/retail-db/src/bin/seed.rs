//! # Seed Data Generator
//!
//! Populates a development database with a small retail chain.
//!
//! ## Usage
//! ```bash
//! # Seed ./backoffice_dev.db with 3 branches (default)
//! cargo run -p retail-db --bin seed
//!
//! # More branches
//! cargo run -p retail-db --bin seed -- --stores 5
//!
//! # Specify database path
//! cargo run -p retail-db --bin seed -- --db ./data/backoffice.db
//! ```
//!
//! ## Generated Data
//! - Head office (store 1) plus `--stores` branches
//! - One category and one supplier per product group
//! - Products: `{GROUP}-{NAME}` SKUs
//! - Inventory in every branch, quantity 0 - 60, price varying per store
//!
//! No user accounts are created; run the `bootstrap` binary for the first
//! administrator.

use chrono::Utc;
use retail_core::ProductInput;
use retail_db::{Database, DbConfig};
use std::env;

/// Product groups: (sku prefix, category / supplier name, products)
const GROUPS: &[(&str, &str, &[&str])] = &[
    (
        "BEV",
        "Beverages",
        &["Cola", "Lemonade", "Orange Juice", "Iced Tea", "Still Water", "Sparkling Water"],
    ),
    (
        "SNK",
        "Snacks",
        &["Salted Crisps", "Pretzels", "Chocolate Bar", "Gummy Bears", "Oat Cookies"],
    ),
    (
        "DRY",
        "Dairy",
        &["Whole Milk", "Cheddar", "Greek Yogurt", "Butter", "Eggs Dozen"],
    ),
    (
        "GRO",
        "Grocery",
        &["White Bread", "Spaghetti", "Brown Rice", "Canned Beans", "Peanut Butter", "Honey"],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut branches: usize = 3;
    let mut db_path = String::from("./backoffice_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stores" | "-s" => {
                if i + 1 < args.len() {
                    branches = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Retail Back Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --stores <N>   Number of branch stores (default: 3)");
                println!("  -d, --db <PATH>    Database file path (default: ./backoffice_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Retail Back Office Seed Data Generator");
    println!("======================================");
    println!("Database: {}", db_path);
    println!("Branches: {}", branches);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Stores
    let head_office = db.stores().ensure_head_office("Head Office").await?;
    let mut store_ids = Vec::with_capacity(branches);
    for n in 1..=branches {
        let address = format!("{n} Market Street");
        let store = db
            .stores()
            .insert(&format!("Branch {n}"), Some(address.as_str()))
            .await?;
        store_ids.push(store.id);
    }
    println!("✓ Stores: head office #{} + {} branches", head_office.id, store_ids.len());

    // Catalog + inventory
    let now = Utc::now();
    let mut products = 0usize;
    let mut records = 0usize;

    for (group_idx, (prefix, group, names)) in GROUPS.iter().enumerate() {
        let category = db.categories().insert(group).await?;
        let supplier = db
            .suppliers()
            .insert(&format!("{group} Wholesale"), Some("orders@example.test"))
            .await?;

        for (idx, name) in names.iter().enumerate() {
            let input = ProductInput {
                sku: format!("{}-{}", prefix, name.replace(' ', "").to_uppercase()),
                name: name.to_string(),
                description: None,
                category_id: Some(category.id),
                supplier_id: Some(supplier.id),
            };

            let product = match db.products().insert(&input).await {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Failed to insert {}: {}", input.sku, e);
                    continue;
                }
            };
            products += 1;

            let seed = (group_idx * 100 + idx) as i64;
            let base_price = 99 + (seed * 37) % 900;

            for (store_idx, store_id) in store_ids.iter().enumerate() {
                let quantity = (seed * 7 + store_idx as i64 * 13) % 61;
                let price_cents = base_price + store_idx as i64 * 10;
                db.inventory()
                    .upsert(product.id, *store_id, quantity, price_cents, now)
                    .await?;
                records += 1;
            }
        }
    }

    println!("✓ Products: {}", products);
    println!("✓ Inventory records: {}", records);

    println!();
    let hits = db.products().search("milk", 10).await?;
    println!("  Search 'milk': {} results", hits.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
