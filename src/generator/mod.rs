
use anyhow::Result;
use chrono::{Datelike, NaiveDate, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::statement::{StatementRecord, write_csv};

/// Transaction description categories, matching the demo dataset.
const DESCRIPTIONS: &[&str] = &[
    "Grocery Store",
    "Online Retailer",
    "Utility Bill",
    "Salary Deposit",
    "Restaurant",
    "Gas Station",
    "Transfer Out",
];

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Carlos", "Maria", "Wei", "Priya", "Omar", "Fatima", "Yuki", "Amara",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Chen",
    "Patel", "Kim", "Nguyen", "Okafor", "Tanaka", "Ali",
];

/// Generate synthetic statement rows for `customers` customers, each with
/// 1 to 5 transactions. Account number, name, and phone are shared across
/// one customer's rows; everything else is independent per row.
#[inline]
pub fn generate_records(customers: usize) -> Vec<StatementRecord> {
    let mut rng = rand::rng();
    generate_records_with_rng(&mut rng, customers)
}

/// Deterministic variant taking an explicit RNG.
#[inline]
pub fn generate_records_with_rng<R: Rng + ?Sized>(
    rng: &mut R,
    customers: usize,
) -> Vec<StatementRecord> {
    let mut records = Vec::new();

    for _ in 0..customers {
        let account_number = random_account_number(rng);
        let customer_name = random_customer_name(rng);
        let phone_number = random_phone_number(rng);

        let transactions = rng.random_range(1..=5);
        for _ in 0..transactions {
            records.push(StatementRecord {
                date: random_date_this_year(rng),
                transaction_id: Uuid::new_v4().to_string(),
                description: random_description(rng),
                amount: round_cents(rng.random_range(-500.0..2000.0)),
                balance: round_cents(rng.random_range(1000.0..50000.0)),
                account_number: account_number.clone(),
                customer_name: customer_name.clone(),
                phone_number: phone_number.clone(),
            });
        }
    }

    records
}

/// Generate a statement file with `customers` customers, overwriting any
/// existing file at `path`. Returns the number of rows written.
#[inline]
pub fn generate_statement_file<P: AsRef<Path>>(path: P, customers: usize) -> Result<usize> {
    let records = generate_records(customers);
    write_csv(&path, &records)?;

    info!(
        "Generated {} records for {} customers in {}",
        records.len(),
        customers,
        path.as_ref().display()
    );

    Ok(records.len())
}

fn random_description<R: Rng + ?Sized>(rng: &mut R) -> String {
    DESCRIPTIONS
        .choose(rng)
        .copied()
        .unwrap_or("Grocery Store")
        .to_string()
}

fn random_customer_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("James");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
    format!("{} {}", first, last)
}

fn random_account_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    // BBAN-style: four uppercase letters followed by 14 digits
    let letters: String = (0..4)
        .map(|_| char::from(b'A' + rng.random_range(0..26)))
        .collect();
    let digits: String = (0..14)
        .map(|_| char::from(b'0' + rng.random_range(0..10)))
        .collect();
    format!("{}{}", letters, digits)
}

fn random_phone_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!(
        "555-{:03}-{:04}",
        rng.random_range(0..1000),
        rng.random_range(0..10000)
    )
}

fn random_date_this_year<R: Rng + ?Sized>(rng: &mut R) -> NaiveDate {
    let today = Utc::now().date_naive();
    let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    let span = (today - start).num_days().max(0);
    start + chrono::Duration::days(rng.random_range(0..=span))
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
