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

use std::{
    io::stdin,
    process::exit,
    sync::mpsc::{channel, Receiver},
    thread::spawn,
    time::Instant,
};

use oorandom::Rand64;

use crate::{
    board::{parse_fen, zobrist, Board, Castling, STARTPOS},
    book::PolyglotBook,
    defs::{Black, MoveKind, Piece, White},
    error::ParseError,
    evaluation::{Eval, Evaluator, Material},
    movegen::generate_all,
    nnue::Network,
    ordering::{spawn_hint_loader, HintSet, OrderingTable},
    search::{new_arena, Arena, HashRing, Limits, Search, MAX_SEARCH_DEPTH},
    util::{parse_option, seeded_rng},
};

/// Default ordering-table budget in MiB.
const DEF_HASH_MB: usize = 32;
/// Default NNUE network file.
const EVAL_FILE: &str = "nn-cb80fb9393af.nnue";
/// Default Polyglot book file.
const BOOK_FILE: &str = "final-book.bin";
/// A book probe needs at least this much clock, in milliseconds.
const BOOK_MS: u64 = 100;
/// "Forever", in milliseconds.
pub const WEEK: u64 = 7 * 24 * 60 * 60 * 1000;

/// Master object owning every piece of process-wide mutable state: the
/// current position, the search scratch space, the ordering store and the
/// evaluator configuration.
pub struct Engine {
    /// The current position.
    board: Board,
    /// Castling geometry of the current game.
    castling: Castling,
    /// Whether White is to move.
    wtm: bool,
    /// Fullmove number.
    fullmoves: u16,
    /// Chess960 notation mode.
    chess960: bool,
    /// A usable `position` has been received.
    position_ok: bool,
    /// Repetition ring.
    ring: HashRing,
    /// Killer/good ordering store.
    table: OrderingTable,
    /// Static evaluator and its configuration.
    pub evaluator: Evaluator,
    /// Per-ply move lists.
    arena: Box<Arena>,
    /// Opening book, if one loaded.
    pub(crate) book: Option<PolyglotBook>,
    /// Legacy root-ordering hints.
    hints: HintSet,
    /// Milliseconds shaved off every clock for lag.
    move_overhead: i64,
    /// Iterative deepening cap.
    pub max_depth: i32,
    /// `go infinite` is running: underpromotions stay on.
    analyzing: bool,
    /// Score of the last finished search.
    last_eval: Eval,
    /// Nodes of the last finished search.
    pub last_nodes: u64,
    /// Cleared by `quit`.
    pub game_on: bool,
    /// UCI input, fed by the reader thread.
    uci_rx: Receiver<String>,
    /// Randomness for the book and the random mover.
    rng: Rand64,
}

impl Engine {
    /// Creates an engine on the starting position and spawns the stdin
    /// reader thread.
    pub fn new() -> Self {
        let (tx, rx) = channel();
        spawn(move || {
            for line in stdin().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let table = OrderingTable::new(DEF_HASH_MB).unwrap_or_else(|e| {
            eprintln!("fatal: {e}");
            exit(1);
        });

        let setup = parse_fen(STARTPOS)
            .unwrap_or_else(|_| unreachable!("the starting position always parses"));

        let mut evaluator = Evaluator::new();
        evaluator.nnue = Network::init(EVAL_FILE);

        Self {
            board: setup.board,
            castling: setup.castling,
            wtm: setup.wtm,
            fullmoves: setup.fullmoves,
            chess960: false,
            position_ok: true,
            ring: HashRing::new(),
            table,
            evaluator,
            arena: new_arena(),
            book: PolyglotBook::open(BOOK_FILE),
            hints: HintSet::new(),
            move_overhead: 100,
            max_depth: MAX_SEARCH_DEPTH as i32,
            analyzing: false,
            last_eval: 0,
            last_nodes: 0,
            game_on: true,
            uci_rx: rx,
            rng: seeded_rng(),
        }
    }

    /// Blocks for the next UCI command; [`None`] when stdin is gone.
    pub fn recv(&self) -> Option<String> {
        self.uci_rx.recv().ok()
    }

    /// Resets the per-game state. The position itself arrives with the next
    /// `position` command.
    pub fn new_game(&mut self) {
        self.last_eval = 0;
        self.ring = HashRing::new();
        self.table.clear();
        self.hints.clear();
        self.evaluator.clear_cache();
    }

    /// Executes a `position` command. A bad FEN or move leaves the previous
    /// position in place but refuses to search until a good one arrives.
    pub fn set_position<'a, T>(&mut self, mut tokens: T)
    where
        T: Iterator<Item = &'a str>,
    {
        let mut has_moves = false;

        let result = match tokens.next() {
            Some("startpos") => {
                has_moves = tokens.next() == Some("moves");
                self.load_fen(STARTPOS)
            }
            Some("fen") => {
                let mut fen = String::with_capacity(90);
                for token in tokens.by_ref() {
                    if token == "moves" {
                        has_moves = true;
                        break;
                    }
                    fen.push_str(token);
                    fen.push(' ');
                }
                self.load_fen(&fen)
            }
            _ => Err(ParseError::BadFen(String::new())),
        };

        if let Err(e) = result {
            println!("info string {e}");
            self.position_ok = false;
            return;
        }

        if has_moves {
            for token in tokens {
                if let Err(e) = self.make_uci_move(token) {
                    println!("info string {e}");
                    self.position_ok = false;
                    return;
                }
            }
        }
        self.position_ok = true;
    }

    /// Replaces the position with a parsed FEN.
    fn load_fen(&mut self, fen: &str) -> Result<(), ParseError> {
        let setup = parse_fen(fen)?;
        self.board = setup.board;
        self.castling = setup.castling;
        self.wtm = setup.wtm;
        self.fullmoves = setup.fullmoves;
        Ok(())
    }

    /// Applies one move in long algebraic notation by matching it against
    /// the generated legal moves.
    fn make_uci_move(&mut self, token: &str) -> Result<(), ParseError> {
        self.generate_root();
        for i in 0..self.arena[0].len() {
            if self.arena[0][i].notation(&self.castling, self.chess960) == token {
                // remember where we came from for repetition detection
                self.ring.0[HashRing::slot(self.board.fifty)] =
                    zobrist::hash(&self.board, self.wtm);
                if !self.wtm {
                    self.fullmoves += 1;
                }
                self.board = self.arena[0][i];
                self.board.score = 0;
                self.wtm = !self.wtm;
                return Ok(());
            }
        }
        Err(ParseError::BadMove(token.to_string()))
    }

    /// Executes a `setoption` command.
    pub fn set_option<'a, T>(&mut self, mut tokens: T)
    where
        T: Iterator<Item = &'a str>,
    {
        if tokens.next() != Some("name") {
            return;
        }
        let name = tokens.next();
        if tokens.next() != Some("value") {
            return;
        }
        let value = tokens.next();

        match name {
            Some("UCI_Chess960") => self.chess960 = value == Some("true"),
            Some("Hash") => {
                if let Some(mb) = parse_option::<usize>(value) {
                    if let Err(e) = self.table.resize(mb) {
                        println!("info string {e}");
                    }
                }
            }
            Some("Level") => {
                if let Some(level) = parse_option::<i32>(value) {
                    self.evaluator.level = level.clamp(0, 100);
                }
            }
            Some("MoveOverhead") => {
                if let Some(overhead) = parse_option::<i64>(value) {
                    self.move_overhead = overhead.clamp(0, 100_000);
                }
            }
            Some("EvalFile") => {
                self.evaluator.nnue = value.and_then(Network::init);
            }
            Some("BookFile") => {
                self.book = value.and_then(PolyglotBook::open);
            }
            _ => (),
        }
    }

    /// Executes a `go` command and prints the best move.
    pub fn go<'a, T>(&mut self, mut tokens: T)
    where
        T: Iterator<Item = &'a str>,
    {
        if !self.position_ok {
            println!("info string no usable position");
            println!("bestmove 0000");
            return;
        }

        let mut wtime: i64 = 0;
        let mut btime: i64 = 0;
        let mut winc: i64 = 0;
        let mut binc: i64 = 0;
        let mut mtg: i64 = 26;

        while let Some(token) = tokens.next() {
            match token {
                "wtime" => {
                    wtime = (parse_option(tokens.next()).unwrap_or(0) - self.move_overhead).max(0);
                }
                "btime" => {
                    btime = (parse_option(tokens.next()).unwrap_or(0) - self.move_overhead).max(0);
                }
                "winc" => winc = parse_option(tokens.next()).unwrap_or(0).max(0),
                "binc" => binc = parse_option(tokens.next()).unwrap_or(0).max(0),
                "movestogo" => mtg = parse_option(tokens.next()).unwrap_or(26).max(1),
                "movetime" => {
                    let ms = parse_option(tokens.next()).unwrap_or(0).max(0);
                    self.think(ms as u64);
                    self.print_bestmove();
                    return;
                }
                "depth" => {
                    let depth: i64 = parse_option(tokens.next()).unwrap_or(1);
                    self.max_depth = (depth as i32).clamp(1, MAX_SEARCH_DEPTH as i32);
                    self.think(WEEK);
                    self.max_depth = MAX_SEARCH_DEPTH as i32;
                    self.print_bestmove();
                    return;
                }
                "infinite" => {
                    self.analyzing = true;
                    self.think(WEEK);
                    self.analyzing = false;
                    self.print_bestmove();
                    return;
                }
                _ => (),
            }
        }

        let (time, inc) = if self.wtm { (wtime, winc) } else { (btime, binc) };
        self.think(time.min(time / mtg + inc).max(0) as u64);
        self.print_bestmove();
    }

    /// Runs one full search within a millisecond budget: root generation,
    /// fast-move shortcuts, root ordering, iterative deepening.
    pub fn think(&mut self, ms: u64) {
        let start = Instant::now();
        self.last_nodes = 0;
        self.generate_root();

        if !self.analyzing && self.play_fast_move(ms) {
            return;
        }

        let material = Material::of(&self.board);
        self.evaluator.classical =
            material.classical_activation(&self.board, self.wtm, self.evaluator.nnue.is_some());

        // legacy: hint files load alongside the search and must be merged in
        // before the best move goes out
        let loader = spawn_hint_loader();

        self.eval_root_moves();
        self.arena[0].sort_by(|a, b| b.score.cmp(&a.score));

        let limits = Limits::timed(ms, self.max_depth);
        let is_endgame = material.is_endgame(self.wtm);
        let mut search = Search::new(
            limits,
            self.analyzing,
            self.chess960,
            &self.castling,
            &mut self.ring,
            &mut self.table,
            &mut self.evaluator,
            &self.uci_rx,
        );
        if self.wtm {
            search.iterate::<White>(&mut self.arena, is_endgame, start);
        } else {
            search.iterate::<Black>(&mut self.arena, is_endgame, start);
        }

        self.last_eval = search.best_score;
        self.last_nodes = search.nodes;
        if search.quit {
            self.game_on = false;
        }

        if let Ok(hashes) = loader.join() {
            self.hints.merge(&hashes);
        }
    }

    /// Prints `bestmove`, or `0000` when there is nothing to play.
    pub fn print_bestmove(&self) {
        match self.arena[0].first() {
            Some(board) => {
                println!("bestmove {}", board.notation(&self.castling, self.chess960));
            }
            None => println!("bestmove 0000"),
        }
    }

    /// Fills `arena[0]` with the legal moves of the current position.
    fn generate_root(&mut self) {
        if self.wtm {
            generate_all::<White>(&self.board, &self.castling, true, &mut self.arena[0]);
        } else {
            generate_all::<Black>(&self.board, &self.castling, true, &mut self.arena[0]);
        }
    }

    /// Plays without searching when possible: a forced reply, the level-0
    /// random mover, an exhausted clock or a book hit.
    fn play_fast_move(&mut self, ms: u64) -> bool {
        let root_n = self.arena[0].len();

        let fast = root_n <= 1
            || self.play_random_move(root_n)
            || ms <= 1
            || (ms > BOOK_MS && self.probe_book());

        if fast {
            let sign = if self.wtm { 1 } else { -1 };
            println!(
                "info depth 1 nodes 0 time 0 nps 0 score cp {} pv {}",
                sign * self.last_eval,
                self.arena[0]
                    .first()
                    .map_or_else(|| "0000".to_string(), |b| b
                        .notation(&self.castling, self.chess960)),
            );
        }
        fast
    }

    /// At level 0 any legal move will do.
    fn play_random_move(&mut self, root_n: usize) -> bool {
        if self.evaluator.level != 0 {
            return false;
        }
        let i = self.rng.rand_range(0..root_n as u64) as usize;
        self.arena[0].swap(0, i);
        true
    }

    /// Probes the book and rotates a hit to the front of the root list.
    fn probe_book(&mut self) -> bool {
        let Some(book) = &self.book else {
            return false;
        };
        let mv = book.probe(
            &self.board.pieces,
            self.board.both(),
            self.board.castle.0,
            self.board.epsq,
            self.wtm,
            false,
            &mut self.rng,
        );
        if mv == 0 {
            return false;
        }

        let from = 8 * ((mv >> 9) & 0x7) + ((mv >> 6) & 0x7);
        let to = 8 * ((mv >> 3) & 0x7) + (mv & 0x7);
        self.find_book_move(from as u8, to as u8, book_move_kind(&self.board, mv))
    }

    /// Finds the root move matching a decoded book move. Castlings and
    /// promotions are matched by kind, anything else by squares.
    fn find_book_move(&mut self, from: u8, to: u8, kind: Option<MoveKind>) -> bool {
        let root = &mut self.arena[0];
        for i in 0..root.len() {
            let hit = match kind {
                Some(kind) => root[i].kind == kind,
                None => root[i].from.0 == from && root[i].to.0 == to,
            };
            if hit {
                root.swap(0, i);
                return true;
            }
        }
        false
    }

    /// Seeds the root ordering: castling and queen-promotion sweeteners, an
    /// underpromotion penalty, hint-file and noise nudges, plus a full
    /// evaluation from the mover's point of view.
    fn eval_root_moves(&mut self) {
        let wtm = self.wtm;
        let sign = if wtm { 1 } else { -1 };

        for i in 0..self.arena[0].len() {
            let child = self.arena[0][i];
            let mut score = match child.kind {
                MoveKind::PromoQueen => 1000,
                kind if kind.is_castling() => 100,
                kind if kind.is_underpromotion() => -5000,
                _ => 0,
            };
            if self.hints.contains(zobrist::hash(&child, !wtm)) {
                score += 100;
            }
            score += self.evaluator.root_noise();
            score += sign * self.evaluator.evaluate(&child, wtm);
            self.arena[0][i].score += score;
        }
    }

    /// Prints the ASCII board, FEN and evaluation of the current position or
    /// of a given FEN.
    pub fn print_board(&mut self, fen: Option<&str>) {
        let (board, castling, wtm, fullmoves) = match fen {
            Some(fen) => match parse_fen(fen) {
                Ok(setup) => (setup.board, setup.castling, setup.wtm, setup.fullmoves),
                Err(e) => {
                    println!("info string {e}");
                    return;
                }
            },
            None => (self.board, self.castling, self.wtm, self.fullmoves),
        };

        println!("{}", board.pretty());
        println!();
        println!("> {}", board.to_fen(&castling, wtm, fullmoves));
        println!(
            "> Eval: {} | NNUE: {} | Book: {}",
            self.evaluator.evaluate(&board, wtm),
            if self.evaluator.nnue.is_some() { "OK" } else { "-" },
            if self.book.is_some() { "OK" } else { "-" },
        );
    }

    /// The current board. Test and perft support.
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// The castling geometry. Test and perft support.
    pub const fn castling(&self) -> &Castling {
        &self.castling
    }

    /// Whether White is to move.
    pub const fn wtm(&self) -> bool {
        self.wtm
    }

    /// The name of the current best root move. Test support.
    pub fn best_move_name(&self) -> String {
        self.arena[0]
            .first()
            .map_or_else(|| "0000".to_string(), |b| b.notation(&self.castling, self.chess960))
    }

    /// Whether the current position is a draw by threefold repetition,
    /// judged exactly as a search node would.
    pub fn draw_by_repetition(&self) -> bool {
        let hash = zobrist::hash(&self.board, self.wtm);
        let mut reps = 1;
        let mut i = i32::from(self.board.fifty) - 2;
        while i >= 0 {
            if self.ring.0[i as usize] == hash {
                reps += 1;
                if reps >= 3 {
                    return true;
                }
            }
            i -= 2;
        }
        false
    }
}

/// Classifies a decoded book move: castling is king-takes-own-rook, and the
/// promotion bits name the piece.
fn book_move_kind(board: &Board, mv: u16) -> Option<MoveKind> {
    match (mv >> 12) & 0x7 {
        1 => return Some(MoveKind::PromoKnight),
        2 => return Some(MoveKind::PromoBishop),
        3 => return Some(MoveKind::PromoRook),
        4 => return Some(MoveKind::PromoQueen),
        _ => (),
    }

    let from = (8 * ((mv >> 9) & 0x7) + ((mv >> 6) & 0x7)) as usize;
    let to = (8 * ((mv >> 3) & 0x7) + (mv & 0x7)) as usize;
    if board.pieces[from] == Piece::WKING && board.pieces[to] == Piece::WROOK {
        return Some(if to > from {
            MoveKind::CastleKingsideW
        } else {
            MoveKind::CastleQueensideW
        });
    }
    if board.pieces[from] == Piece::BKING && board.pieces[to] == Piece::BROOK {
        return Some(if to > from {
            MoveKind::CastleKingsideB
        } else {
            MoveKind::CastleQueensideB
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::Engine;

    #[test]
    fn repetition_is_detected() {
        let mut engine = Engine::new();
        engine.set_position(
            "startpos moves g1f3 g8f6 f3g1 f6g8 g1f3 g8f6 f3g1 f6g8".split_whitespace(),
        );
        assert!(engine.draw_by_repetition());
    }

    #[test]
    fn no_false_repetition() {
        let mut engine = Engine::new();
        engine.set_position("startpos moves g1f3 g8f6 f3g1 f6g8".split_whitespace());
        assert!(!engine.draw_by_repetition());
    }

    #[test]
    fn bad_moves_refuse_the_position() {
        let mut engine = Engine::new();
        engine.set_position("startpos moves e2e5".split_whitespace());
        assert!(!engine.position_ok);
        engine.set_position("startpos moves e2e4 e7e5".split_whitespace());
        assert!(engine.position_ok);
    }

    #[test]
    fn uci_moves_keep_state_in_sync() {
        let mut engine = Engine::new();
        engine.set_position("startpos moves e2e4 c7c5 g1f3".split_whitespace());
        assert!(!engine.wtm());
        assert!(engine.board().is_consistent());
        assert_eq!(
            engine
                .board()
                .to_fen(engine.castling(), engine.wtm(), engine.fullmoves),
            "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
    }
}
