/*
 * Ruckus, a UCI-compatible Chess960 engine
 * Copyright (C) 2024 Jasper Shovelton
 *
 * Ruckus is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * Ruckus is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
 * details.
 *
 * You should have received a copy of the GNU General Public License along with
 * Ruckus. If not, see <https://www.gnu.org/licenses/>.
 */

use std::time::Instant;

use crate::{
    engine::{Engine, WEEK},
    search::MAX_SEARCH_DEPTH,
    util::parse_option,
};

/// Default bench depth.
const BENCH_DEPTH: i32 = 14;
/// Default speed-run budget per position, in milliseconds.
const BENCH_SPEED: u64 = 10_000;

/// Tactical positions with their expected best moves, used to pressure the
/// search.
static SUITE: &[(&str, &str)] = &[
    ("r2q2k1/pQ2bppp/4p3/8/3r1B2/6P1/P3PP1P/1R3RK1 w - - 0 1", "f4b8"),
    ("3r2k1/5p2/6p1/4b3/1P2P3/1R2P2p/P1K1N3/8 b - - 0 1", "d8d1"),
    ("r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 1", "g5f6"),
    ("8/5K2/7P/6pP/8/8/8/7k w - - 0 1", "f7f6"),
    ("6k1/3r4/2R5/P5P1/1P4p1/8/4rB2/6K1 b - - 0 1", "g4g3"),
    ("8/8/8/4p3/4k3/8/8/4K3 w - - 0 1", "e1e2"),
    ("8/8/8/8/8/k5R1/2rn4/K7 b - - 55 94", "d2b3"),
    ("R7/P4k2/8/8/8/8/r7/6K1 w - - 0 1", "a8h8"),
    ("7k/5K2/7P/6pP/8/8/8/8 w - - 0 1", "f7f6"),
    ("8/4R2n/4K1pk/6p1/7P/8/8/8 w - - 0 1", "e7h7"),
];

/// The `bench` command: run the suite to a fixed depth, with noise, book and
/// network all off, and report the signature.
pub fn bench(engine: &mut Engine, depth: Option<&str>) {
    let depth = match depth {
        Some("inf") => MAX_SEARCH_DEPTH as i32,
        other => parse_option(other)
            .unwrap_or(BENCH_DEPTH)
            .clamp(1, MAX_SEARCH_DEPTH as i32),
    };
    run(engine, depth, WEEK);
}

/// The `speed` command: run the suite under a time budget per position.
pub fn speed(engine: &mut Engine, ms: Option<&str>) {
    run(
        engine,
        MAX_SEARCH_DEPTH as i32,
        parse_option(ms).unwrap_or(BENCH_SPEED),
    );
}

/// Runs every suite position and prints totals.
fn run(engine: &mut Engine, depth: i32, ms: u64) {
    // make the search deterministic and self-contained
    let noise = engine.evaluator.noise;
    engine.evaluator.noise = 0;
    let network = engine.evaluator.nnue.take();
    let book = engine.book.take();

    let start = Instant::now();
    let mut nodes = 0;
    let mut correct = 0;

    for (i, (fen, best)) in SUITE.iter().enumerate() {
        println!("[ {}/{} ; {fen} ; bm {best} ]", i + 1, SUITE.len());
        engine.new_game();
        let position = format!("fen {fen}");
        engine.set_position(position.split_whitespace());
        engine.max_depth = depth;
        engine.think(ms);
        engine.max_depth = MAX_SEARCH_DEPTH as i32;
        nodes += engine.last_nodes;
        if engine.best_move_name() == *best {
            correct += 1;
        }
        println!();
    }

    let total_ms = start.elapsed().as_millis().max(1) as u64;
    println!("===========================");
    println!();
    println!("Result:   {correct} / {}", SUITE.len());
    println!("Nodes:    {nodes}");
    println!("Time(ms): {total_ms}");
    println!("NPS:      {}", 1000 * nodes / total_ms);

    engine.evaluator.noise = noise;
    engine.evaluator.nnue = network;
    engine.book = book;
}

#[cfg(test)]
mod tests {
    use crate::engine::Engine;

    /// A deterministic fixed-depth search, returning the chosen move.
    fn best_move(fen: &str, depth: i32) -> String {
        let mut engine = Engine::new();
        engine.evaluator.noise = 0;
        engine.evaluator.nnue = None;
        engine.book = None;
        let position = format!("fen {fen}");
        engine.set_position(position.split_whitespace());
        engine.max_depth = depth;
        engine.think(60_000);
        engine.best_move_name()
    }

    #[test]
    fn finds_mate_in_one() {
        assert_eq!(best_move("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1", 4), "d1d8");
    }

    #[test]
    fn finds_the_back_rank_skewer() {
        // suite position 1: Bb8 wins the queen for the bishop
        assert_eq!(
            best_move("r2q2k1/pQ2bppp/4p3/8/3r1B2/6P1/P3PP1P/1R3RK1 w - - 0 1", 6),
            "f4b8"
        );
    }

    #[test]
    fn holds_the_pawn_endgame() {
        // only taking the opposition saves the KvKP defence
        assert_eq!(best_move("8/8/8/4p3/4k3/8/8/4K3 w - - 0 1", 10), "e1e2");
    }

    #[test]
    fn stalemated_side_reports_null() {
        let mut engine = Engine::new();
        engine.set_position(
            "fen 7k/5Q2/6K1/8/8/8/8/8 b - - 0 1".split_whitespace(),
        );
        engine.think(10);
        assert_eq!(engine.best_move_name(), "0000");
    }

    #[test]
    fn checkmated_side_reports_null() {
        let mut engine = Engine::new();
        engine.set_position("fen 6kR/6P1/6K1/8/8/8/8/8 b - - 0 1".split_whitespace());
        engine.think(10);
        assert_eq!(engine.best_move_name(), "0000");
    }
}
