//! Database seeder for Nestegg.
//!
//! Gives every family without categories the default category set
//! (Salary, Groceries, Utilities, ...). Families that already have
//! categories are left alone, so running it twice is harmless.
//!
//! Usage: cargo run --bin seeder

use nestegg_core::ledger::default_categories;
use nestegg_core::{IdentityStore, LedgerStore};
use nestegg_db::Stores;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = nestegg_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    let stores = Stores::postgres(db);

    let families = stores
        .identities
        .list_families()
        .await
        .expect("Failed to list families");

    println!("Seeding default categories for {} families...", families.len());
    let mut seeded = 0;
    for family in &families {
        let created = stores
            .ledger
            .seed_categories(family.id, default_categories())
            .await
            .expect("Failed to seed categories");
        if created > 0 {
            println!("  {} ({}): {created} categories", family.name, family.id);
            seeded += 1;
        }
    }

    println!("Seeding complete! {seeded} families seeded.");
}
