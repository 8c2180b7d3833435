use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use bike_rental::{
    db, import, recommend, rent, return_bicycle, search, Condition, RentalPolicy, SearchQuery,
    SortKey, SystemClock,
};

const DB_FILE: &str = "BicycleRental.db";
const POLICY_FILE: &str = "policy.json";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");

    match command {
        "init" => run_init(&args[2..]),
        "list" => run_list(),
        "search" => run_search(&args[2..]),
        "rent" => run_rent(&args[2..]),
        "return" => run_return(&args[2..]),
        "open" => run_open(),
        "recommend" => run_recommend(&args[2..]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("Bicycle Rental Management v{}", bike_rental::VERSION);
    println!();
    println!("Usage:");
    println!("  bike-rental init <inventory.txt> [members.txt]   create schema and seed data");
    println!("  bike-rental list                                 full inventory");
    println!("  bike-rental search [key=value ...]               filter inventory");
    println!("      keys: brand, type, size, status, condition, min, max, sort");
    println!("      sort values: brand, rate, availability");
    println!("  bike-rental rent <member-id> <bicycle-id> [days] check a bike out");
    println!("  bike-rental return <transaction-id> <condition>  check a bike back in");
    println!("  bike-rental open                                 currently rented bikes");
    println!("  bike-rental recommend <budget>                   purchase suggestions");
}

fn load_policy() -> Result<RentalPolicy> {
    if Path::new(POLICY_FILE).exists() {
        RentalPolicy::from_file(POLICY_FILE)
    } else {
        Ok(RentalPolicy::default())
    }
}

fn run_init(args: &[String]) -> Result<()> {
    let conn = db::open(DB_FILE)?;
    println!("✓ Database ready: {DB_FILE}");

    if let Some(inventory) = args.first() {
        let summary = import::load_bicycles(&conn, inventory)?;
        println!(
            "✓ Inventory: {} inserted, {} already present, {} skipped",
            summary.inserted, summary.skipped_existing, summary.skipped_invalid
        );
    }

    if let Some(members) = args.get(1) {
        let loaded = import::load_members(&conn, members)?;
        println!("✓ Members: {loaded} loaded");
    }

    Ok(())
}

fn run_list() -> Result<()> {
    let conn = db::open(DB_FILE)?;
    let bikes = search(&conn, &SearchQuery::default())?;

    println!(
        "{:<5} {:<12} {:<10} {:<6} {:>8}  {:<10} {:<12}",
        "ID", "Brand", "Type", "Size", "Rate", "Condition", "Status"
    );
    for bike in &bikes {
        println!(
            "{:<5} {:<12} {:<10} {:<6} {:>8.2}  {:<10} {:<12}",
            bike.id,
            bike.brand,
            bike.bike_type,
            bike.frame_size,
            bike.rental_rate,
            bike.condition,
            bike.status
        );
    }
    println!("\n{} bicycle(s)", bikes.len());

    Ok(())
}

fn run_search(args: &[String]) -> Result<()> {
    let mut query = SearchQuery::default();

    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got '{arg}'"))?;

        match key {
            "brand" => query.brand = Some(value.to_string()),
            "type" => query.bike_type = Some(value.to_string()),
            "size" => query.frame_size = Some(value.to_string()),
            "status" => query.status = Some(bike_rental::BikeStatus::parse(value)?),
            "condition" => query.condition = Some(Condition::parse(value)?),
            "min" => query.min_rate = Some(value.parse().context("min must be a number")?),
            "max" => query.max_rate = Some(value.parse().context("max must be a number")?),
            "sort" => query.sort = Some(SortKey::parse(value)?),
            other => return Err(anyhow!("unknown search key '{other}'")),
        }
    }

    let conn = db::open(DB_FILE)?;
    let bikes = search(&conn, &query)?;

    for bike in &bikes {
        println!(
            "#{} {} {} ({}) - {:.2}/day, {}, {}",
            bike.id,
            bike.brand,
            bike.bike_type,
            bike.frame_size,
            bike.rental_rate,
            bike.condition,
            bike.status
        );
    }
    println!("\n{} match(es)", bikes.len());

    Ok(())
}

fn run_rent(args: &[String]) -> Result<()> {
    let member_id: i64 = args
        .first()
        .ok_or_else(|| anyhow!("rent requires <member-id> <bicycle-id>"))?
        .parse()
        .context("member id must be numeric")?;
    let bicycle_id: i64 = args
        .get(1)
        .ok_or_else(|| anyhow!("rent requires <member-id> <bicycle-id>"))?
        .parse()
        .context("bicycle id must be numeric")?;
    let period: Option<u32> = args
        .get(2)
        .map(|d| d.parse().context("days must be numeric"))
        .transpose()?;

    let mut conn = db::open(DB_FILE)?;
    let policy = load_policy()?;

    let tx = rent(&mut conn, &policy, &SystemClock, member_id, bicycle_id, period)?;
    println!(
        "✓ Rental confirmed: transaction #{} - bicycle {} to member {}, due {}",
        tx.id, tx.bicycle_id, tx.member_id, tx.due_date
    );

    Ok(())
}

fn run_return(args: &[String]) -> Result<()> {
    let transaction_id: i64 = args
        .first()
        .ok_or_else(|| anyhow!("return requires <transaction-id> <condition>"))?
        .parse()
        .context("transaction id must be numeric")?;
    let condition = Condition::parse(
        args.get(1)
            .ok_or_else(|| anyhow!("return requires <transaction-id> <condition>"))?,
    )?;

    let mut conn = db::open(DB_FILE)?;
    let policy = load_policy()?;

    let receipt = return_bicycle(&mut conn, &policy, &SystemClock, transaction_id, condition)?;

    let closed_on = receipt
        .transaction
        .return_date
        .map(|d| d.to_string())
        .unwrap_or_default();
    println!(
        "✓ Return recorded: transaction #{} closed on {}",
        receipt.transaction.id, closed_on
    );
    for fee in &receipt.fees {
        println!("  {} fee: {:.2} ({})", fee.fee_type, fee.amount, fee.note);
    }
    if receipt.fees.is_empty() {
        println!("  No fees due");
    } else {
        println!("  Total due: {:.2}", receipt.total_fees());
    }

    Ok(())
}

fn run_open() -> Result<()> {
    let conn = db::open(DB_FILE)?;
    let rentals = db::open_rentals(&conn)?;

    if rentals.is_empty() {
        println!("No bicycles are currently rented.");
        return Ok(());
    }

    println!(
        "{:<6} {:<8} {:<8} {:<12} {:<12} {:<12} {:<10}",
        "Tx", "Bike", "Member", "Checkout", "Due", "Brand", "Type"
    );
    for r in &rentals {
        println!(
            "{:<6} {:<8} {:<8} {:<12} {:<12} {:<12} {:<10}",
            r.transaction_id,
            r.bicycle_id,
            r.member_id,
            r.checkout_date.to_string(),
            r.due_date.to_string(),
            r.brand,
            r.bike_type
        );
    }

    Ok(())
}

fn run_recommend(args: &[String]) -> Result<()> {
    let budget: f64 = args
        .first()
        .ok_or_else(|| anyhow!("recommend requires <budget>"))?
        .parse()
        .context("budget must be a number")?;

    let conn = db::open(DB_FILE)?;
    let policy = load_policy()?;

    let picks = recommend(&conn, &policy, budget)?;
    if picks.is_empty() {
        println!("No recommendations within a budget of {budget:.2}.");
        return Ok(());
    }

    println!("Recommended purchases (budget {budget:.2}):");
    let mut total = 0.0;
    for pick in &picks {
        total += pick.estimated_cost;
        println!(
            "  {} / {} - score {:.1} ({} rentals), est. cost {:.2}",
            pick.bike_type, pick.brand, pick.score, pick.rentals, pick.estimated_cost
        );
    }
    println!("Total estimated cost: {total:.2}");

    Ok(())
}
