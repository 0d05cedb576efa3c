// ============================================================================
// Basic Trading Example
// ============================================================================

use exchange_core::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    println!("=== Exchange Core Example ===\n");

    let exchange = Exchange::open(ExchangeConfig::default()).unwrap();
    println!(
        "Exchange open for: {}\n",
        exchange.config().instruments.join(", ")
    );

    let buyer = Arc::new(Participant::new(Decimal::from(50_000)));
    let seller = Arc::new(Participant::new(Decimal::from(50_000)));

    // Ladder of resting asks.
    println!("Adding sell orders...");
    for step in 0..5i64 {
        let price = Decimal::from(100 + step * 5);
        exchange
            .submit(&seller, Order::new(Side::Sell, "GOOGL", price, 10))
            .unwrap();
    }

    // A bid that crosses the cheapest two asks.
    println!("Adding a crossing buy order...");
    exchange
        .submit(&buyer, Order::new(Side::Buy, "GOOGL", Decimal::from(105), 20))
        .unwrap();

    // Let the matching thread resolve the cross.
    thread::sleep(Duration::from_millis(50));

    println!("\n=== GOOGL Book ===");
    let book = exchange.snapshot("GOOGL").unwrap();
    println!("Bids:");
    for resting in &book.bids {
        println!("  {} @ ${}", resting.quantity, resting.price);
    }
    println!("Asks:");
    for resting in &book.asks {
        println!("  {} @ ${}", resting.quantity, resting.price);
    }

    println!("\n=== Fill Book ===");
    for fill in exchange.fill_log() {
        println!("{fill}");
    }

    println!("\nBuyer:  {buyer}");
    println!("Seller: {seller}");

    exchange.close();
    println!("\nExchange closed.");
}
