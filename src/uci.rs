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

use crate::{bench, board::STARTPOS, engine::Engine, perft, util::parse_option};

/// The name of this engine.
const ID_NAME: &str = "Ruckus";
/// The name of the author of this engine.
const ID_AUTHOR: &str = "Jasper Shovelton";
/// The version of this engine.
const ID_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Repeatedly waits for a command and executes it according to the UCI
/// protocol, until `quit` or the end of stdin.
pub fn main_loop(engine: &mut Engine) {
    while engine.game_on {
        let Some(line) = engine.recv() else { break };
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("uci") => print_id(),
            Some("isready") => println!("readyok"),
            Some("ucinewgame") => engine.new_game(),
            Some("setoption") => engine.set_option(tokens),
            Some("position") => engine.set_position(tokens),
            Some("go") => engine.go(tokens),
            // a stray `stop` outside a search changes nothing
            Some("stop") => (),
            Some("quit") => break,
            Some("p") => {
                let fen = tokens.collect::<Vec<_>>().join(" ");
                engine.print_board((!fen.is_empty()).then_some(fen.as_str()));
            }
            Some("perft") => {
                let depth = parse_option(tokens.next()).unwrap_or(6);
                let fen = tokens.collect::<Vec<_>>().join(" ");
                perft::split(if fen.is_empty() { STARTPOS } else { fen.as_str() }, depth);
            }
            Some("bench") => bench::bench(engine, tokens.next()),
            Some("speed") => bench::speed(engine, tokens.next()),
            Some("logo") => print_logo(),
            Some("help") => print_help(),
            Some(other) => println!("Unknown command: {other}"),
            None => (),
        }
    }
}

/// Prints the identification block and the supported options.
fn print_id() {
    println!("id name {ID_NAME} {ID_VERSION}");
    println!("id author {ID_AUTHOR}");
    println!("option name UCI_Chess960 type check default false");
    println!("option name Level type spin default 100 min 0 max 100");
    println!("option name MoveOverhead type spin default 100 min 0 max 100000");
    println!("option name Hash type spin default 32 min 1 max 1048576");
    println!("option name EvalFile type string default nn-cb80fb9393af.nnue");
    println!("option name BookFile type string default final-book.bin");
    println!("uciok");
}

/// ASCII art, because every engine needs some.
fn print_logo() {
    println!(
        r"
 ____            _
|  _ \ _   _  __| | ___   _ ___
| |_) | | | |/ _` |/ / | | / __|
|  _ <| |_| | (_|   <| |_| \__ \
|_| \_\__,_|\__,_|_|\_\__,_|___/
"
    );
}

/// Prints the command summary.
fn print_help() {
    println!("{ID_NAME}, a UCI Chess960 engine written in Rust");
    println!();
    println!("Supported commands:");
    println!("  uci                 engine info and options");
    println!("  isready             synchronisation, answered with 'readyok'");
    println!("  ucinewgame          prepare for a new game");
    println!("  setoption name [n] value [v]");
    println!("  position [startpos | fen <fen>] [moves <moves>]");
    println!("  go [wtime btime winc binc movestogo movetime depth infinite]");
    println!("  stop                stop the search, report the best move");
    println!("  p [fen]             print an ASCII board");
    println!("  perft [depth] [fen] perft split numbers");
    println!("  bench [depth]       run the tactical suite");
    println!("  speed [ms]          run the suite under a time budget");
    println!("  quit                exit");
}
