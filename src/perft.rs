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
    board::{parse_fen, Board, Castling},
    defs::{Black, White},
    movegen::{generate_all, MoveList},
    search::new_arena,
};

/// Counts the leaf nodes `depth` moves in the future, with bulk counting at
/// the last ply.
pub fn perft(
    board: &Board,
    castling: &Castling,
    wtm: bool,
    depth: u32,
    lists: &mut [MoveList],
) -> u64 {
    if depth == 0 {
        return 1;
    }

    let Some((list, rest)) = lists.split_first_mut() else {
        return 1;
    };
    if wtm {
        generate_all::<White>(board, castling, true, list);
    } else {
        generate_all::<Black>(board, castling, true, list);
    }

    if depth == 1 {
        return list.len() as u64;
    }

    let mut nodes = 0;
    for i in 0..list.len() {
        let child = list[i];
        nodes += perft(&child, castling, !wtm, depth - 1, rest);
    }
    nodes
}

/// The `perft` command: per-move split counts plus totals and speed.
pub fn split(fen: &str, depth: u32) {
    let setup = match parse_fen(fen) {
        Ok(setup) => setup,
        Err(e) => {
            println!("info string {e}");
            return;
        }
    };

    let mut arena = new_arena();
    let (root, rest) = arena
        .split_first_mut()
        .unwrap_or_else(|| unreachable!("the arena is never empty"));
    if setup.wtm {
        generate_all::<White>(&setup.board, &setup.castling, true, root);
    } else {
        generate_all::<Black>(&setup.board, &setup.castling, true, root);
    }

    let start = Instant::now();
    let mut nodes = 0;
    for (i, child) in root.iter().enumerate() {
        let count = if depth >= 1 {
            perft(child, &setup.castling, !setup.wtm, depth - 1, rest)
        } else {
            0
        };
        nodes += count;
        println!(
            "{}. {} -> {count}",
            i + 1,
            child.notation(&setup.castling, false)
        );
    }

    let ms = start.elapsed().as_millis().max(1) as u64;
    println!();
    println!("Nodes:    {nodes}");
    println!("Time(ms): {ms}");
    println!("NPS:      {}", 1000 * nodes / ms);
}

#[cfg(test)]
mod tests {
    use super::perft;
    use crate::{
        board::{parse_fen, STARTPOS},
        search::new_arena,
    };

    /// Runs perft from a FEN with a fresh arena.
    fn count(fen: &str, depth: u32) -> u64 {
        let setup = parse_fen(fen).unwrap();
        let mut arena = new_arena();
        perft(&setup.board, &setup.castling, setup.wtm, depth, &mut arena[..])
    }

    #[test]
    fn startpos_shallow() {
        assert_eq!(count(STARTPOS, 1), 20);
        assert_eq!(count(STARTPOS, 2), 400);
        assert_eq!(count(STARTPOS, 3), 8_902);
        assert_eq!(count(STARTPOS, 4), 197_281);
    }

    #[test]
    fn startpos_depth_5() {
        assert_eq!(count(STARTPOS, 5), 4_865_609);
    }

    #[test]
    fn kiwipete() {
        assert_eq!(
            count(
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
                4,
            ),
            4_085_603,
        );
    }

    #[test]
    fn en_passant_discovered_check() {
        assert_eq!(count("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 5), 674_624);
    }

    #[test]
    fn promotion_party() {
        assert_eq!(
            count(
                "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
                4,
            ),
            422_333,
        );
    }

    #[test]
    fn castling_rights_torture() {
        assert_eq!(
            count(
                "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 0 1",
                4,
            ),
            2_103_487,
        );
    }

    #[test]
    fn quiet_middlegame() {
        assert_eq!(
            count(
                "r4rk1/1pp1qppp/p1np1n2/2b1p1b1/2B1P1B1/2NP1N2/PPP1QPPP/R4RK1 w - - 0 10",
                4,
            ),
            3_894_594,
        );
    }

    // the canonical deep counts; minutes of runtime, so `--ignored` only
    #[test]
    #[ignore]
    fn deep_reference_counts() {
        assert_eq!(count(STARTPOS, 6), 119_060_324);
        assert_eq!(
            count(
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
                5,
            ),
            193_690_690,
        );
        assert_eq!(
            count(
                "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
                5,
            ),
            15_833_292,
        );
        assert_eq!(
            count(
                "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 0 1",
                5,
            ),
            89_941_194,
        );
        assert_eq!(
            count(
                "r4rk1/1pp1qppp/p1np1n2/2b1p1b1/2B1P1B1/2NP1N2/PPP1QPPP/R4RK1 w - - 0 10",
                5,
            ),
            164_075_551,
        );
    }
}
