//! Performance benchmarks for the hot paths of the game engines

use server::games::blackjack::{settle, Hand};
use server::games::card::{Card, Rank, Suit};
use server::games::deck::Shoe;
use server::games::tictactoe::{Grid, Mark};
use server::queue::QueueKey;
use std::time::Instant;

/// Benchmarks hand valuation on every three-card hand
#[test]
fn benchmark_hand_value() {
    let hands: Vec<Hand> = Rank::ALL
        .iter()
        .flat_map(|&a| Rank::ALL.iter().map(move |&b| (a, b)))
        .flat_map(|(a, b)| Rank::ALL.iter().map(move |&c| [a, b, c]))
        .map(|ranks| {
            Hand::from_cards(ranks.iter().map(|&r| Card::new(Suit::Club, r)).collect())
        })
        .collect();

    let iterations = 50;
    let start = Instant::now();

    let mut total = 0u64;
    for _ in 0..iterations {
        for hand in &hands {
            total += hand.value(true) as u64;
        }
    }

    let duration = start.elapsed();
    let evaluations = iterations * hands.len();
    println!(
        "Hand value: {} evaluations in {:?} ({:.2} ns/iter)",
        evaluations,
        duration,
        duration.as_nanos() as f64 / evaluations as f64
    );

    assert!(total > 0);
    // ~110k evaluations should stay well under a second even unoptimized
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks settling a full table against the dealer
#[test]
fn benchmark_settlement() {
    let dealer = Hand::from_cards(vec![
        Card::new(Suit::Heart, Rank::Nine),
        Card::new(Suit::Heart, Rank::Eight),
    ]);
    let player = Hand::from_cards(vec![
        Card::new(Suit::Spade, Rank::Ten),
        Card::new(Suit::Spade, Rank::Nine),
    ]);

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = settle(&dealer, &player, false).net(10);
    }

    let duration = start.elapsed();
    println!(
        "Settlement: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 500);
}

/// Benchmarks winner detection on a nearly full grid
#[test]
fn benchmark_grid_winner() {
    let mut grid = Grid::new();
    let moves = [
        (0, 0, Mark::O),
        (1, 1, Mark::X),
        (0, 1, Mark::O),
        (0, 2, Mark::X),
        (2, 0, Mark::O),
        (1, 0, Mark::X),
        (1, 2, Mark::O),
        (2, 1, Mark::X),
    ];
    for (row, col, mark) in moves {
        assert!(grid.place(row, col, mark));
    }

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = grid.winner();
    }

    let duration = start.elapsed();
    println!(
        "Grid winner: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(grid.winner(), None);
    assert!(duration.as_millis() < 500);
}

/// Benchmarks emptying a six-deck shoe
#[test]
fn benchmark_shoe_draw() {
    let start = Instant::now();

    let mut drawn = 0;
    for _ in 0..10 {
        let mut shoe = Shoe::new(6);
        while shoe.draw().is_some() {
            drawn += 1;
        }
    }

    let duration = start.elapsed();
    println!("Shoe: {} cards drawn in {:?}", drawn, duration);

    assert_eq!(drawn, 10 * 312);
    assert!(duration.as_millis() < 500);
}

/// Benchmarks queue name parsing
#[test]
fn benchmark_queue_key_parse() {
    let names: Vec<String> = QueueKey::all().iter().map(|k| k.to_string()).collect();

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        for name in &names {
            assert!(name.parse::<QueueKey>().is_ok());
        }
    }

    let duration = start.elapsed();
    println!(
        "Queue key parse: {} iterations in {:?}",
        iterations * names.len(),
        duration
    );

    assert!(duration.as_millis() < 500);
}
