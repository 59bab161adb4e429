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
    sync::mpsc::Receiver,
    time::{Duration, Instant},
};

use crate::{
    board::{zobrist, Board, Castling, FIFTY},
    defs::{MoveKind, Piece, SideType},
    evaluation::{is_easy_draw, Eval, Evaluator, INF},
    movegen::{generate_all, generate_tactical, MoveList},
    ordering::{lazy_sort, OrderingTable},
};

/// Maximum main-search ply.
pub const MAX_SEARCH_DEPTH: usize = 64;
/// Maximum quiescence ply on top of the main search.
pub const MAX_Q_SEARCH_DEPTH: usize = 16;
/// Total plies the arena must hold.
pub const MAX_PLY: usize = MAX_SEARCH_DEPTH + MAX_Q_SEARCH_DEPTH;
/// Slots in the repetition ring: a checkmate may overrule the fifty-move
/// rule, so there is room past the boundary.
pub const R50_SLOTS: usize = FIFTY as usize + 2;
/// Margin a root underpromotion must clear over alpha to be kept.
const UNDERPROMO_MARGIN: Eval = 3 * 100;
/// Poll the clock and stdin every this many ticks.
const READ_CLOCK: u64 = 0x1ff;

/// One move list per ply, the search's only scratch space.
pub type Arena = [MoveList; MAX_PLY];

/// Hashes of the reversible-move tail of the game, indexed by the fifty-move
/// counter at the time each position occurred.
#[derive(Clone)]
pub struct HashRing(pub [u64; R50_SLOTS]);

/// What `go` handed to the search, resolved to a deadline.
#[derive(Clone, Copy)]
pub struct Limits {
    /// Hard deadline.
    pub deadline: Instant,
    /// Maximum iterative-deepening depth.
    pub max_depth: i32,
}

/// One search invocation: borrows every piece of engine state the search
/// mutates, so the engine cannot be touched behind its back.
pub struct Search<'a> {
    /// The limits of this search.
    pub limits: Limits,
    /// Nodes visited.
    pub nodes: u64,
    /// Poll divider.
    ticks: u64,
    /// Set once the search must unwind.
    pub stop: bool,
    /// Set when `quit` arrived mid-search.
    pub quit: bool,
    /// The depth currently being iterated.
    depth: i32,
    /// The quiescence depth budget, ramping up with the iteration.
    q_depth: i32,
    /// Best score of the last finished iteration.
    pub best_score: Eval,
    /// A null move is on the current path.
    nullmove_active: bool,
    /// The current line looks like the principal variation.
    is_pv: bool,
    /// Whether underpromotions are generated at interior nodes.
    pub underpromos: bool,
    /// Chess960 notation for reports.
    chess960: bool,
    /// Castling geometry.
    castling: &'a Castling,
    /// The repetition ring.
    ring: &'a mut HashRing,
    /// The killer/good ordering store.
    table: &'a mut OrderingTable,
    /// The static evaluator.
    pub evaluator: &'a mut Evaluator,
    /// Commands arriving mid-search.
    uci_rx: &'a Receiver<String>,
}

impl HashRing {
    /// A zeroed ring.
    pub fn new() -> Self {
        Self([0; R50_SLOTS])
    }

    /// The slot for a position with the given fifty-move counter.
    pub fn slot(fifty: u8) -> usize {
        (fifty as usize).min(R50_SLOTS - 1)
    }
}

/// Allocates the per-ply arena on the heap.
pub fn new_arena() -> Box<Arena> {
    let lists = (0..MAX_PLY).map(|_| MoveList::new()).collect::<Vec<_>>();
    let boxed: Box<[MoveList]> = lists.into_boxed_slice();
    boxed
        .try_into()
        .unwrap_or_else(|_| unreachable!("arena construction has a fixed length"))
}

impl<'a> Search<'a> {
    /// Builds a search over the engine's borrowed state.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        limits: Limits,
        underpromos: bool,
        chess960: bool,
        castling: &'a Castling,
        ring: &'a mut HashRing,
        table: &'a mut OrderingTable,
        evaluator: &'a mut Evaluator,
        uci_rx: &'a Receiver<String>,
    ) -> Self {
        Self {
            limits,
            nodes: 0,
            ticks: 0,
            stop: false,
            quit: false,
            depth: 0,
            q_depth: 0,
            best_score: 0,
            nullmove_active: false,
            is_pv: false,
            underpromos,
            chess960,
            castling,
            ring,
            table,
            evaluator,
            uci_rx,
        }
    }

    /// Runs iterative deepening over the pre-ordered root list in
    /// `arena[0]`. Side `S` is to move.
    ///
    /// `is_endgame` enables the permanent switch to the classical evaluation
    /// once the score has stayed decisive for seven straight iterations.
    pub fn iterate<S: SideType>(&mut self, arena: &mut Arena, is_endgame: bool, start: Instant) {
        let (root, rest) = arena
            .split_first_mut()
            .unwrap_or_else(|| unreachable!("the arena is never empty"));
        let mut decisive_streak = 0;

        while self.best_score.abs() != INF && self.depth < self.limits.max_depth && !self.stop {
            self.q_depth = (self.q_depth + 2).min(MAX_Q_SEARCH_DEPTH as i32);
            self.best_score = self.search_root::<S>(root, rest);

            if is_endgame && self.best_score.abs() > 4 * 100 {
                decisive_streak += 1;
                if decisive_streak >= 7 {
                    // the game is decided: the handcrafted terms convert
                    // faster than the network from here
                    self.evaluator.classical = true;
                }
            } else {
                decisive_streak = 0;
            }

            self.report::<S>(root, start);
            self.depth += 1;
        }

        if self.q_depth == 0 {
            // nothing was searched at all; say something for the GUI
            self.report::<S>(root, start);
        }
    }

    /// Searches the root list at the current depth. White maximises, Black
    /// minimises; the first move gets a full window and the rest a
    /// null-window probe with a re-search on improvement.
    fn search_root<S: SideType>(&mut self, root: &mut MoveList, rest: &mut [MoveList]) -> Eval {
        let mut best_index = 0;
        let mut alpha = -INF;
        let mut beta = INF;

        for i in 0..root.len() {
            self.set_pv(root, i);
            let child = root[i];

            let score = if S::IS_WHITE {
                self.root_move::<S>(&child, rest, i, alpha, INF, root)
            } else {
                self.root_move::<S>(&child, rest, i, -INF, beta, root)
            };
            if self.stop {
                // scores are rubbish now
                return self.best_score;
            }

            if S::IS_WHITE {
                if score > alpha {
                    // underpromotions must prove a lot at the root
                    if child.kind.is_underpromotion() && score < alpha + UNDERPROMO_MARGIN {
                        continue;
                    }
                    alpha = score;
                    best_index = i;
                }
            } else if score < beta {
                if child.kind.is_underpromotion() && score > beta - UNDERPROMO_MARGIN {
                    continue;
                }
                beta = score;
                best_index = i;
            }
        }

        // rotate the best move to the front for the next iteration's PV
        if !root.is_empty() {
            root[0..=best_index].rotate_right(1);
        }
        if S::IS_WHITE {
            alpha
        } else {
            beta
        }
    }

    /// Searches one root move: null-window probe for the late ones, full
    /// window for the first or on improvement.
    #[allow(clippy::too_many_arguments)]
    fn root_move<S: SideType>(
        &mut self,
        child: &Board,
        rest: &mut [MoveList],
        i: usize,
        alpha: Eval,
        beta: Eval,
        root: &MoveList,
    ) -> Eval {
        if self.depth >= 1 && i >= 1 {
            let probe = if S::IS_WHITE {
                self.search::<S::Flip>(child, rest, alpha, alpha + 1, self.depth)
            } else {
                self.search::<S::Flip>(child, rest, beta - 1, beta, self.depth)
            };
            let improves = if S::IS_WHITE {
                probe > alpha
            } else {
                probe < beta
            };
            if !improves {
                return probe;
            }
            self.is_pv = i <= 1 && root[i].score == 0;
        }
        self.search::<S::Flip>(child, rest, alpha, beta, self.depth)
    }

    /// The interior search with side `S` to move. White maximises alpha,
    /// Black minimises beta; every score is from White's point of view.
    fn search<S: SideType>(
        &mut self,
        board: &Board,
        lists: &mut [MoveList],
        alpha: Eval,
        beta: Eval,
        depth: i32,
    ) -> Eval {
        self.nodes += 1;
        if self.stop || self.check_time() {
            self.stop = true;
            return 0;
        }
        if depth <= 0 || lists.len() <= MAX_Q_SEARCH_DEPTH {
            return self.quiescence::<S>(board, lists, alpha, beta, self.q_depth);
        }

        if let Some(score) = self.try_null_move::<S>(board, lists, alpha, beta, depth) {
            return score;
        }

        let slot = HashRing::slot(board.fifty);
        let saved = self.ring.0[slot];
        self.ring.0[slot] = zobrist::hash(board, S::IS_WHITE);

        let result = if self.is_draw::<S>(board) {
            0
        } else {
            self.search_moves::<S>(board, lists, alpha, beta, depth)
        };

        self.ring.0[slot] = saved;
        result
    }

    /// Generates and walks the moves of an interior node.
    fn search_moves<S: SideType>(
        &mut self,
        board: &Board,
        lists: &mut [MoveList],
        mut alpha: Eval,
        mut beta: Eval,
        mut depth: i32,
    ) -> Eval {
        let hash = self.ring.0[HashRing::slot(board.fifty)];
        let in_check = board.in_check::<S>();
        let (list, rest) = lists
            .split_first_mut()
            .unwrap_or_else(|| unreachable!("quiescence owns the shallow plies"));
        generate_all::<S>(board, self.castling, self.underpromos, list);
        let moves_n = list.len();

        if moves_n == 0 {
            // checkmate or stalemate
            return if in_check {
                if S::IS_WHITE {
                    -INF
                } else {
                    INF
                }
            } else {
                0
            };
        }

        // extend forced lines, near-horizon checks and fresh queens
        if moves_n == 1 || (depth == 1 && (in_check || board.kind == MoveKind::PromoQueen)) {
            depth += 1;
        }

        let ok_lmr = moves_n >= 5 && depth >= 2 && !in_check;
        self.table.apply_hints(hash, list);

        // lazy sorting stops at the first uninteresting move: everything
        // behind it is unscored shuffling
        let mut sorting = true;
        for i in 0..moves_n {
            if sorting {
                lazy_sort(list, i);
                sorting = list[i].score != 0;
            }
            self.set_pv(list, i);
            let child = list[i];

            if ok_lmr && i >= 1 && child.score == 0 && !child.in_check::<S::Flip>() {
                let reduced = depth - 2 - lmr(depth, i);
                let probe = self.search::<S::Flip>(&child, rest, alpha, beta, reduced);
                let hopeless = if S::IS_WHITE {
                    probe <= alpha
                } else {
                    probe >= beta
                };
                if hopeless {
                    continue;
                }
                self.set_pv(list, i);
            }

            let score = self.search::<S::Flip>(&child, rest, alpha, beta, depth - 1);

            if S::IS_WHITE {
                if score > alpha {
                    alpha = score;
                    if alpha >= beta {
                        self.table.store_killer(hash, child.index);
                        return alpha;
                    }
                    self.table.store_good(hash, child.index);
                }
            } else if score < beta {
                beta = score;
                if alpha >= beta {
                    self.table.store_killer(hash, child.index);
                    return beta;
                }
                self.table.store_good(hash, child.index);
            }
        }

        if S::IS_WHITE {
            alpha
        } else {
            beta
        }
    }

    /// A "pass" to prove the mover is so far ahead that losing a tempo
    /// keeps them past the bound. Returns the cutoff score if it works.
    fn try_null_move<S: SideType>(
        &mut self,
        board: &Board,
        lists: &mut [MoveList],
        alpha: Eval,
        beta: Eval,
        depth: i32,
    ) -> Option<Eval> {
        if self.nullmove_active
            || self.is_pv
            || depth < 3
            || board.in_check::<S>()
            || !(board.has_non_pawn_material::<S>()
                || board.bb::<S>(Piece::PAWN).count() >= 2)
        {
            return None;
        }
        // only bother when standing pat already looks past the bound
        let eval = self.evaluator.evaluate(board, S::IS_WHITE);
        let looks_good = if S::IS_WHITE {
            eval >= beta
        } else {
            alpha >= eval
        };
        if !looks_good {
            return None;
        }

        let mut null_board = *board;
        null_board.epsq = -1;
        self.nullmove_active = true;
        let score = self.search::<S::Flip>(
            &null_board,
            lists,
            alpha,
            beta,
            depth - (depth / 4 + 3),
        );
        self.nullmove_active = false;

        let cutoff = if S::IS_WHITE {
            score >= beta
        } else {
            alpha >= score
        };
        cutoff.then_some(score)
    }

    /// The capture search that absorbs the horizon effect. Stand-pat against
    /// the static evaluation, then only tactical moves, on a separate depth
    /// budget.
    fn quiescence<S: SideType>(
        &mut self,
        board: &Board,
        lists: &mut [MoveList],
        mut alpha: Eval,
        mut beta: Eval,
        depth: i32,
    ) -> Eval {
        self.nodes += 1;
        if self.stop || self.check_time() {
            self.stop = true;
            return 0;
        }

        if S::IS_WHITE {
            alpha = alpha.max(self.evaluator.evaluate(board, true));
            if alpha >= beta || depth <= 0 {
                return alpha;
            }
        } else {
            beta = beta.min(self.evaluator.evaluate(board, false));
            if alpha >= beta || depth <= 0 {
                return beta;
            }
        }

        let Some((list, rest)) = lists.split_first_mut() else {
            return if S::IS_WHITE { alpha } else { beta };
        };
        generate_tactical::<S>(board, self.castling, list);

        for i in 0..list.len() {
            // very few moves; sort them all
            lazy_sort(list, i);
            let child = list[i];
            let score = self.quiescence::<S::Flip>(&child, rest, alpha, beta, depth - 1);
            if S::IS_WHITE {
                alpha = alpha.max(score);
                if alpha >= beta {
                    return alpha;
                }
            } else {
                beta = beta.min(score);
                if alpha >= beta {
                    return beta;
                }
            }
        }

        if S::IS_WHITE {
            alpha
        } else {
            beta
        }
    }

    /// Draw detection at a node: the fifty-move rule, trivial material, or a
    /// third repetition found by stepping the ring two plies at a time.
    fn is_draw<S: SideType>(&self, board: &Board) -> bool {
        if board.fifty > FIFTY || is_easy_draw(board, S::IS_WHITE) {
            return true;
        }

        let hash = self.ring.0[HashRing::slot(board.fifty)];
        let mut reps = 1;
        let mut i = i32::from(board.fifty) - 2;
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

    /// Flags the first two zero-scored tries at a node as the PV, which
    /// shields them from the null move.
    fn set_pv(&mut self, list: &MoveList, i: usize) {
        self.is_pv = i <= 1 && list[i].score == 0;
    }

    /// True once the budget is spent or the operator interfered. Checked
    /// every 512 ticks.
    fn check_time(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks & READ_CLOCK != 0 {
            return false;
        }
        if Instant::now() >= self.limits.deadline {
            return true;
        }
        self.poll_input()
    }

    /// Drains one pending command mid-search: `stop`/`quit` end the search,
    /// `isready` is answered in place, anything else is dropped.
    fn poll_input(&mut self) -> bool {
        let Ok(line) = self.uci_rx.try_recv() else {
            return false;
        };
        match line.split_whitespace().next() {
            Some("stop") => true,
            Some("quit") => {
                self.quit = true;
                true
            }
            Some("isready") => {
                println!("readyok");
                false
            }
            _ => false,
        }
    }

    /// One `info` line per finished iteration: depth, nodes, speed and the
    /// head of the PV.
    fn report<S: SideType>(&self, root: &MoveList, start: Instant) {
        let ms = start.elapsed().as_millis().max(1) as u64;
        let nps = 1000 * self.nodes / ms;
        let sign = if S::IS_WHITE { 1 } else { -1 };
        let score = if self.best_score.abs() == INF {
            self.best_score / 100
        } else {
            self.best_score
        };
        let pv = root
            .first()
            .map_or_else(|| "0000".to_string(), |b| b.notation(self.castling, self.chess960));

        println!(
            "info depth {} nodes {} time {} nps {nps} score cp {} pv {pv}",
            self.limits.max_depth.min(self.depth + 1),
            self.nodes,
            start.elapsed().as_millis(),
            sign * score,
        );
    }
}

impl Limits {
    /// A budget of `ms` milliseconds with the given depth cap.
    pub fn timed(ms: u64, max_depth: i32) -> Self {
        Self {
            deadline: Instant::now() + Duration::from_millis(ms),
            max_depth,
        }
    }
}

/// The late-move reduction on top of the base reduction of 2.
fn lmr(depth: i32, i: usize) -> i32 {
    if depth <= 0 || i == 0 {
        1
    } else {
        (0.25 * f64::from(depth).ln() * (i as f64).ln()).clamp(1.0, 6.0) as i32
    }
}
