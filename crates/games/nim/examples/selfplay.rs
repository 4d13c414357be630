//! Engine-vs-engine Nim self-play.
//!
//! Usage:
//!   cargo run --example selfplay -p nim_game -- [stones] [depth]
//!
//! Both sides share one engine and one transposition table; the table is
//! aged once per move, as a real driver would between real-world moves.
//! Set RUST_LOG=debug for per-search diagnostics.

use nim_game::{NimEvaluator, NimGenerator, NimState};
use search_core::{GameState, GameTree, PlayerId, SearchOptions, TranspositionTable};
use std::env;
use std::time::Instant;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let stones: u32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(21);
    let depth: i32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(5);

    let table = TranspositionTable::new(1 << 16, 1);
    let options = SearchOptions {
        analysis: true,
        ..SearchOptions::default()
    };
    let mut tree = GameTree::with_options(table, NimEvaluator, NimGenerator, depth, options);

    println!("Nim: {} stones, searching {} plies per move", stones, depth);

    let start = Instant::now();
    let mut state = NimState::new(stones, PlayerId::First);
    let mut plies = 0u32;

    while state.winner().is_none() {
        tree.find_best_response(&mut state);
        let next = match state.response_mut().take() {
            Some(next) => next,
            None => break,
        };

        plies += 1;
        println!(
            "{:>2}. {:?} takes {} leaving {}",
            plies,
            state.whose_turn(),
            state.stones() - next.stones(),
            next.stones()
        );

        state = *next;
        tree.table_mut().age();
    }

    let elapsed = start.elapsed();
    match state.winner() {
        Some(winner) => println!("{:?} wins in {} plies ({:.2?})", winner, plies, elapsed),
        None => println!("No moves available after {} plies", plies),
    }

    match tree.analysis_data().to_json() {
        Ok(json) => println!("Last search analysis:\n{}", json),
        Err(e) => eprintln!("{}", e),
    }
    match tree.table().analysis_data().to_json() {
        Ok(json) => println!("Table analysis:\n{}", json),
        Err(e) => eprintln!("{}", e),
    }
}
