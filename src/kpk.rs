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

//! A king-and-pawn versus king bitbase, generated by retrograde analysis at
//! first use.
//!
//! Only White-pawn positions are tabulated; the pawn is mirrored onto files
//! a-d. Callers with a Black pawn flip the board vertically before asking.

use lazy_static::lazy_static;

use crate::{
    bitboard::Bitboard,
    defs::{File, Rank, Square, White},
    lookups::LOOKUPS,
};

/// An unreachable entry. The zero value so that `|` accumulates cleanly.
const INVALID: u8 = 0;
/// Not yet classified.
const UNKNOWN: u8 = 1;
/// A draw with best play.
const DRAW: u8 = 2;
/// A White win with best play.
const WIN: u8 = 4;

/// Pawn placements: files a-d, ranks 2-7.
const PAWN_SLOTS: usize = 24;
/// Entries in the bitbase.
const SIZE: usize = 2 * PAWN_SLOTS * 64 * 64;

lazy_static! {
    /// The generated bitbase.
    static ref BITBASE: Box<[u8]> = generate();
}

/// Probes the bitbase: `true` if the position is a draw with best play.
///
/// `wp` must be a White pawn square on ranks 2-7; `wtm` is whether White is
/// to move. Positions with a Black pawn must be vertically mirrored by the
/// caller before probing.
pub fn is_draw(wk: Square, wp: Square, bk: Square, wtm: bool) -> bool {
    let (wk, wp, bk) = if File::from(wp).0 >= 4 {
        (flip_file(wk), flip_file(wp), flip_file(bk))
    } else {
        (wk, wp, bk)
    };
    BITBASE[index(wtm, bk, wk, wp)] != WIN
}

/// Mirrors a square horizontally: a1 <-> h1 etc.
const fn flip_file(sq: Square) -> Square {
    Square(sq.0 ^ 7)
}

/// Chebyshev distance between two squares.
fn distance(a: Square, b: Square) -> u8 {
    let files = File::from(a).0.abs_diff(File::from(b).0);
    let ranks = Rank::from(a).0.abs_diff(Rank::from(b).0);
    files.max(ranks)
}

/// Packs a position into its bitbase slot.
///
/// The pawn contributes its file (0-3) and rank (2-7), kings their full
/// squares, plus one bit for the side to move.
fn index(wtm: bool, bk: Square, wk: Square, wp: Square) -> usize {
    wk.to_index()
        | (bk.to_index() << 6)
        | (usize::from(!wtm) << 12)
        | ((File::from(wp).0 as usize) << 13)
        | (((6 - Rank::from(wp).0) as usize) << 15)
}

/// Unpacks a bitbase slot back into a position.
fn unpack(idx: usize) -> (bool, Square, Square, Square) {
    let wk = Square((idx & 0x3f) as u8);
    let bk = Square(((idx >> 6) & 0x3f) as u8);
    let wtm = (idx >> 12) & 1 == 0;
    let file = ((idx >> 13) & 0x3) as u8;
    let rank = 6 - ((idx >> 15) & 0x7) as u8;
    (wtm, bk, wk, Square::from_pos(Rank(rank), File(file)))
}

/// Seeds the immediately-decided entries.
fn classify_leaf(idx: usize) -> u8 {
    let (wtm, bk, wk, wp) = unpack(idx);
    let pawn_attacks = LOOKUPS.pawn_attacks::<White>(wp);

    // overlapping or touching kings, a king on the pawn, or Black's king en
    // prise on White's turn: unreachable
    if wk == bk
        || wk == wp
        || bk == wp
        || !(LOOKUPS.king_attacks(wk) & Bitboard::from(bk)).is_empty()
        || (wtm && !(pawn_attacks & Bitboard::from(bk)).is_empty())
    {
        return INVALID;
    }

    let push = Square(wp.0 + 8);

    // the pawn promotes: the defender cannot reach the promotion square, or
    // the new queen is defended
    if wtm
        && Rank::from(wp) == Rank::RANK7
        && wk != push
        && (distance(bk, push) > 1 || distance(wk, push) == 1)
    {
        return WIN;
    }

    if !wtm {
        let bk_moves = LOOKUPS.king_attacks(bk);
        let unsafe_squares = LOOKUPS.king_attacks(wk) | pawn_attacks;
        // stalemate, or the pawn falls undefended
        if (bk_moves & !unsafe_squares).is_empty()
            || !(bk_moves & !LOOKUPS.king_attacks(wk) & Bitboard::from(wp)).is_empty()
        {
            return DRAW;
        }
    }

    UNKNOWN
}

/// Resolves one unknown entry from its successors. Returns the new value.
fn classify(idx: usize, db: &[u8]) -> u8 {
    let (wtm, bk, wk, wp) = unpack(idx);

    if wtm {
        let mut r = INVALID;
        for to in LOOKUPS.king_attacks(wk) {
            r |= db[index(false, bk, to, wp)];
        }
        if Rank::from(wp).0 < Rank::RANK7.0 {
            let push = Square(wp.0 + 8);
            if push != wk && push != bk {
                r |= db[index(false, bk, wk, push)];
            }
            if Rank::from(wp) == Rank::RANK2 {
                let double = Square(wp.0 + 16);
                if push != wk && push != bk && double != wk && double != bk {
                    r |= db[index(false, bk, wk, double)];
                }
            }
        }
        if r & WIN != 0 {
            WIN
        } else if r & UNKNOWN != 0 {
            UNKNOWN
        } else {
            DRAW
        }
    } else {
        let mut r = INVALID;
        for to in LOOKUPS.king_attacks(bk) {
            r |= db[index(true, to, wk, wp)];
        }
        if r & DRAW != 0 {
            DRAW
        } else if r & UNKNOWN != 0 {
            UNKNOWN
        } else {
            WIN
        }
    }
}

/// Builds the bitbase: leaf classification, then iterate to a fixpoint.
fn generate() -> Box<[u8]> {
    let mut db = vec![UNKNOWN; SIZE];

    for (idx, entry) in db.iter_mut().enumerate() {
        *entry = classify_leaf(idx);
    }

    loop {
        let mut changed = false;
        for idx in 0..SIZE {
            if db[idx] == UNKNOWN {
                let result = classify(idx, &db);
                if result != UNKNOWN {
                    db[idx] = result;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    db.into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::is_draw;
    use crate::defs::Square;

    /// Parses squares like "e4" for terser tests.
    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn king_ahead_on_sixth_wins() {
        assert!(!is_draw(sq("e6"), sq("e5"), sq("e8"), true));
        assert!(!is_draw(sq("e6"), sq("e5"), sq("e8"), false));
    }

    #[test]
    fn opposition_decides() {
        // kings in opposition, pawn behind the king: only the defender to
        // move loses
        assert!(is_draw(sq("e5"), sq("e4"), sq("e7"), true));
        assert!(!is_draw(sq("e5"), sq("e4"), sq("e7"), false));
    }

    #[test]
    fn rook_pawn_corner_is_dead() {
        assert!(is_draw(sq("h6"), sq("h5"), sq("h8"), true));
        assert!(is_draw(sq("h6"), sq("h5"), sq("h8"), false));
    }

    #[test]
    fn runaway_pawn_promotes() {
        assert!(!is_draw(sq("e2"), sq("e7"), sq("a8"), true));
    }
}
