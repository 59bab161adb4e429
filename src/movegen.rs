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

use std::marker::PhantomData;

use arrayvec::ArrayVec;

use crate::{
    bitboard::Bitboard,
    board::{Board, Castling, CastlingRights},
    defs::{MoveKind, Piece, Rank, SideType, Square, MVV},
    lookups::LOOKUPS,
};

/// Enough room for any legal position.
pub const MAX_MOVES: usize = 256;

/// A list of successor positions, filled by one generator call.
pub type MoveList = ArrayVec<Board, MAX_MOVES>;

/// The rank containing the en passant destination square for side `S`.
const fn ep_rank_bb<S: SideType>() -> Bitboard {
    if S::IS_WHITE {
        Bitboard(0x0000_ff00_0000_0000)
    } else {
        Bitboard(0x0000_0000_00ff_0000)
    }
}

/// Generates every legal move of side `S` on `board` into `moves`.
///
/// Every emitted board is a full successor position: the king of `S` is not
/// attacked in it, its castling rights are already maintained and its
/// ordering score is pre-seeded.
pub fn generate_all<S: SideType>(
    board: &Board,
    castling: &Castling,
    underpromos: bool,
    moves: &mut MoveList,
) {
    moves.clear();
    let mut gen = Generator::<S>::new(board, castling, underpromos, moves);
    gen.good = !gen.us;
    gen.pawns();
    gen.knights();
    gen.bishops_and_queens();
    gen.rooks_and_queens();
    gen.king();
    gen.castles();
}

/// Generates the captures (including en passant and every promotion) of side
/// `S` on `board` into `moves`.
pub fn generate_captures<S: SideType>(board: &Board, castling: &Castling, moves: &mut MoveList) {
    moves.clear();
    let mut gen = Generator::<S>::new(board, castling, false, moves);
    gen.good = gen.them;
    gen.promoting_and_capturing_pawns();
    gen.knights();
    gen.bishops_and_queens();
    gen.rooks_and_queens();
    gen.king();
}

/// Generates the tactical moves of side `S`: captures and promotions, or
/// every legal move when `S` is in check (pruning escapes would blind the
/// quiescence search).
///
/// Underpromotions are never generated here.
pub fn generate_tactical<S: SideType>(board: &Board, castling: &Castling, moves: &mut MoveList) {
    if board.in_check::<S>() {
        generate_all::<S>(board, castling, false, moves);
    } else {
        generate_captures::<S>(board, castling, moves);
    }
}

/// One generator pass: the parent board plus the masks shared by every
/// emitter.
struct Generator<'a, S: SideType> {
    /// The parent position.
    board: &'a Board,
    /// Castling geometry.
    castling: &'a Castling,
    /// The output list.
    moves: &'a mut MoveList,
    /// Occupancies of the moving side.
    us: Bitboard,
    /// Occupancies of the opponent.
    them: Bitboard,
    /// All occupancies.
    both: Bitboard,
    /// Empty squares.
    empty: Bitboard,
    /// Destination mask for non-pawn moves.
    good: Bitboard,
    /// Destination mask for pawn captures: enemy pieces plus a legal en
    /// passant square.
    pawn_sq: Bitboard,
    /// Whether rook and bishop promotions are generated.
    underpromos: bool,
    /// The side to move.
    _side: PhantomData<S>,
}

impl<'a, S: SideType> Generator<'a, S> {
    /// Sets up a generator pass over `board`.
    fn new(
        board: &'a Board,
        castling: &'a Castling,
        underpromos: bool,
        moves: &'a mut MoveList,
    ) -> Self {
        let us = board.side_all::<S>();
        let them = board.side_all::<S::Flip>();
        let both = us | them;
        let ep = if board.epsq > 0 {
            Bitboard(1 << board.epsq) & ep_rank_bb::<S>()
        } else {
            Bitboard::empty()
        };

        Self {
            board,
            castling,
            moves,
            us,
            them,
            both,
            empty: !both,
            good: Bitboard::empty(),
            pawn_sq: them | ep,
            underpromos,
            _side: PhantomData,
        }
    }

    /// The starting rank of `S`'s pawns.
    const fn pawn_start_rank() -> Rank {
        if S::IS_WHITE {
            Rank::RANK2
        } else {
            Rank::RANK7
        }
    }

    /// The rank from which `S`'s pawns promote.
    const fn promo_from_rank() -> Rank {
        if S::IS_WHITE {
            Rank::RANK7
        } else {
            Rank::RANK2
        }
    }

    /// Generates pushes, double pushes, captures, en passant and promotions.
    fn pawns(&mut self) {
        let pawns = self.board.bb::<S>(Piece::PAWN);
        for from in pawns {
            self.add_moves(from, LOOKUPS.pawn_attacks::<S>(from) & self.pawn_sq);
            if Rank::from(from) == Self::pawn_start_rank() {
                // the double-push table holds both steps; a blocked first
                // step rules out both
                if !(LOOKUPS.pawn_push::<S>(from) & self.empty).is_empty() {
                    self.add_moves(from, LOOKUPS.pawn_double_push::<S>(from) & self.empty);
                }
            } else {
                self.add_moves(from, LOOKUPS.pawn_push::<S>(from) & self.empty);
            }
        }
    }

    /// Pawn part of the captures-only pass: captures everywhere, plus the
    /// quiet push for pawns about to promote.
    fn promoting_and_capturing_pawns(&mut self) {
        let pawns = self.board.bb::<S>(Piece::PAWN);
        for from in pawns {
            let mut targets = LOOKUPS.pawn_attacks::<S>(from) & self.pawn_sq;
            if Rank::from(from) == Self::promo_from_rank() {
                targets |= LOOKUPS.pawn_push::<S>(from) & self.empty;
            }
            self.add_moves(from, targets);
        }
    }

    /// Generates knight moves into the `good` mask.
    fn knights(&mut self) {
        let knights = self.board.bb::<S>(Piece::KNIGHT);
        for from in knights {
            self.add_moves(from, LOOKUPS.knight_attacks(from) & self.good);
        }
    }

    /// Generates the diagonal moves of bishops and queens.
    fn bishops_and_queens(&mut self) {
        let sliders = self.board.bb::<S>(Piece::BISHOP) | self.board.bb::<S>(Piece::QUEEN);
        for from in sliders {
            self.add_moves(from, LOOKUPS.bishop_attacks(from, self.both) & self.good);
        }
    }

    /// Generates the orthogonal moves of rooks and queens.
    fn rooks_and_queens(&mut self) {
        let sliders = self.board.bb::<S>(Piece::ROOK) | self.board.bb::<S>(Piece::QUEEN);
        for from in sliders {
            self.add_moves(from, LOOKUPS.rook_attacks(from, self.both) & self.good);
        }
    }

    /// Generates king moves.
    fn king(&mut self) {
        let from = self.board.king_square::<S>();
        self.add_moves(from, LOOKUPS.king_attacks(from) & self.good);
    }

    /// Generates castling on both wings.
    fn castles(&mut self) {
        if self.board.castle.has(CastlingRights::kingside::<S>())
            && (self.castling.empty::<S>(0) & self.both).is_empty()
        {
            self.add_castle(0);
        }
        if self.board.castle.has(CastlingRights::queenside::<S>())
            && (self.castling.empty::<S>(1) & self.both).is_empty()
        {
            self.add_castle(1);
        }
    }

    /// Emits every move from `from` to the squares of `targets`.
    fn add_moves(&mut self, from: Square, targets: Bitboard) {
        let is_promoting = self.board.piece_on(from) == Piece::from_kind::<S>(Piece::PAWN)
            && Rank::from(from) == Self::promo_from_rank();

        for to in targets {
            if is_promoting {
                self.add_promotions(from, to);
            } else {
                self.add_normal(from, to);
            }
        }
    }

    /// Emits a quiet move or a capture, including en passant.
    fn add_normal(&mut self, from: Square, to: Square) {
        let me = self.board.piece_on(from);
        let eat = self.board.piece_on(to);

        let mut b = *self.board;
        b.from = from;
        b.to = to;
        b.kind = MoveKind::Normal;
        b.score = 0;
        b.epsq = -1;
        b.pieces[from.to_index()] = Piece::NONE;
        b.pieces[to.to_index()] = me;
        *b.bb_mut::<S>(me.kind()) ^= Bitboard::from(from) | Bitboard::from(to);
        b.fifty = b.fifty.saturating_add(1);

        if eat.is_side::<S::Flip>() {
            *b.bb_mut::<S::Flip>(eat.kind()) ^= Bitboard::from(to);
            b.score = MVV[me.kind()][eat.kind()];
            b.fifty = 0;
        }

        if me == Piece::from_kind::<S>(Piece::PAWN) {
            b.fifty = 0;
            if to.0 as i8 == self.board.epsq {
                // en passant: the captured pawn sits behind the target
                let behind = if S::IS_WHITE { to.0 - 8 } else { to.0 + 8 };
                b.score = 10;
                b.pieces[behind as usize] = Piece::NONE;
                *b.bb_mut::<S::Flip>(Piece::PAWN) ^= Bitboard::from(Square(behind));
            } else if Rank::from(from) == Self::pawn_start_rank()
                && from.0.abs_diff(to.0) == 16
            {
                b.epsq = (if S::IS_WHITE { to.0 - 8 } else { to.0 + 8 }) as i8;
            } else if Rank::from(to) == Self::promo_from_rank() {
                // one step from promoting
                b.score = 91;
            }
        }

        self.push_if_legal(b);
    }

    /// Emits the promotions from `from` to `to`: queen and knight always,
    /// rook and bishop behind the underpromotion gate.
    fn add_promotions(&mut self, from: Square, to: Square) {
        static FULL: [usize; 4] = [Piece::QUEEN, Piece::KNIGHT, Piece::ROOK, Piece::BISHOP];
        static GAMEPLAY: [usize; 2] = [Piece::QUEEN, Piece::KNIGHT];

        let kinds: &[usize] = if self.underpromos { &FULL } else { &GAMEPLAY };
        let eat = self.board.piece_on(to);

        for &kind in kinds {
            let mut b = *self.board;
            b.from = from;
            b.to = to;
            b.kind = promo_move_kind(kind);
            b.score = if kind == Piece::QUEEN { 115 } else { 0 };
            b.epsq = -1;
            b.fifty = 0;
            b.pieces[from.to_index()] = Piece::NONE;
            b.pieces[to.to_index()] = Piece::from_kind::<S>(kind);
            *b.bb_mut::<S>(Piece::PAWN) ^= Bitboard::from(from);
            *b.bb_mut::<S>(kind) |= Bitboard::from(to);
            if eat.is_side::<S::Flip>() {
                *b.bb_mut::<S::Flip>(eat.kind()) ^= Bitboard::from(to);
            }
            self.push_if_legal(b);
        }
    }

    /// Emits castling on the given wing (0 kingside, 1 queenside).
    ///
    /// The caller has already checked the rights bit and the empty squares;
    /// this checks the attacked-path rule and builds the successor.
    fn add_castle(&mut self, wing: usize) {
        if self
            .board
            .any_attacked::<S::Flip>(self.castling.path::<S>(wing))
        {
            return;
        }

        let king_from = self.castling.king::<S>();
        let rook_from = self.castling.rook::<S>(wing);
        let (king_to, rook_to) = castle_destinations::<S>(wing);

        let mut b = *self.board;
        b.from = king_from;
        b.to = king_to;
        b.kind = castle_move_kind::<S>(wing);
        b.score = 0;
        b.epsq = -1;
        b.fifty = 0;
        b.castle.keep(CastlingRights::both_of::<S::Flip>());
        // zero both origin squares before writing: in Chess960 the king may
        // land on the rook's origin or vice versa
        b.pieces[rook_from.to_index()] = Piece::NONE;
        b.pieces[king_from.to_index()] = Piece::NONE;
        b.pieces[rook_to.to_index()] = Piece::from_kind::<S>(Piece::ROOK);
        b.pieces[king_to.to_index()] = Piece::from_kind::<S>(Piece::KING);
        let rooks = (b.bb::<S>(Piece::ROOK) ^ Bitboard::from(rook_from)) | Bitboard::from(rook_to);
        *b.bb_mut::<S>(Piece::ROOK) = rooks;
        let kings = (b.bb::<S>(Piece::KING) ^ Bitboard::from(king_from)) | Bitboard::from(king_to);
        *b.bb_mut::<S>(Piece::KING) = kings;

        if b.in_check::<S>() {
            return;
        }
        b.index = self.moves.len() as u8;
        self.moves.push(b);
    }

    /// Pushes `b` if the king of `S` is not left in check, maintaining the
    /// castling rights and the list index.
    fn push_if_legal(&mut self, mut b: Board) {
        if b.in_check::<S>() {
            return;
        }
        b.update_castling_rights(self.castling);
        b.index = self.moves.len() as u8;
        self.moves.push(b);
    }
}

/// King and rook destinations for a castle of side `S` on the given wing.
const fn castle_destinations<S: SideType>(wing: usize) -> (Square, Square) {
    if S::IS_WHITE {
        if wing == 0 {
            (Square::G1, Square::F1)
        } else {
            (Square::C1, Square::D1)
        }
    } else if wing == 0 {
        (Square::G8, Square::F8)
    } else {
        (Square::C8, Square::D8)
    }
}

/// The [`MoveKind`] of a castle of side `S` on the given wing.
const fn castle_move_kind<S: SideType>(wing: usize) -> MoveKind {
    if S::IS_WHITE {
        if wing == 0 {
            MoveKind::CastleKingsideW
        } else {
            MoveKind::CastleQueensideW
        }
    } else if wing == 0 {
        MoveKind::CastleKingsideB
    } else {
        MoveKind::CastleQueensideB
    }
}

/// The [`MoveKind`] of a promotion to the given piece kind.
const fn promo_move_kind(kind: usize) -> MoveKind {
    match kind {
        Piece::KNIGHT => MoveKind::PromoKnight,
        Piece::BISHOP => MoveKind::PromoBishop,
        Piece::ROOK => MoveKind::PromoRook,
        _ => MoveKind::PromoQueen,
    }
}

#[cfg(test)]
mod tests {
    use super::{generate_all, generate_captures, MoveList};
    use crate::{
        board::{parse_fen, STARTPOS},
        defs::{Black, MoveKind, White},
    };

    /// Generates all moves for the side named by the FEN.
    fn moves_of(fen: &str, underpromos: bool) -> MoveList {
        let setup = parse_fen(fen).unwrap();
        let mut moves = MoveList::new();
        if setup.wtm {
            generate_all::<White>(&setup.board, &setup.castling, underpromos, &mut moves);
        } else {
            generate_all::<Black>(&setup.board, &setup.castling, underpromos, &mut moves);
        }
        moves
    }

    #[test]
    fn startpos_has_twenty_moves() {
        let moves = moves_of(STARTPOS, true);
        assert_eq!(moves.len(), 20);
        for child in &moves {
            assert!(child.is_consistent());
            assert_eq!(child.epsq == -1, child.from.0.abs_diff(child.to.0) != 16);
        }
    }

    #[test]
    fn kiwipete_has_forty_eight_moves() {
        let moves = moves_of(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            true,
        );
        assert_eq!(moves.len(), 48);
    }

    #[test]
    fn underpromotion_gate() {
        let fen = "2n3k1/P5P1/6K1/8/8/8/8/8 w - - 0 1";
        let count = |under| {
            moves_of(fen, under)
                .iter()
                .filter(|b| b.kind.is_promotion())
                .count()
        };
        // the a7 pawn promotes by pushing; the g7 pawn is stuck
        assert_eq!(count(true), 4);
        assert_eq!(count(false), 2);
    }

    #[test]
    fn captures_include_promotions() {
        let setup = parse_fen("2n3k1/P5P1/6K1/8/8/8/8/8 w - - 0 1").unwrap();
        let mut moves = MoveList::new();
        generate_captures::<White>(&setup.board, &setup.castling, &mut moves);
        assert!(moves.iter().any(|b| b.kind == MoveKind::PromoQueen));
    }

    #[test]
    fn castling_through_check_is_rejected() {
        // the g8 rook guards g1: kingside is out, queenside is fine
        let moves = moves_of("r3k1r1/8/8/8/8/8/8/R3K2R w KQq - 0 1", true);
        let castles = moves
            .iter()
            .filter(|b| b.kind.is_castling())
            .collect::<Vec<_>>();
        assert_eq!(castles.len(), 1);
        assert_eq!(castles[0].kind, MoveKind::CastleQueensideW);
    }

    #[test]
    fn en_passant_is_materialised() {
        // after e2e4 d4xe3 the white e-pawn must be gone
        let moves = moves_of("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1", true);
        let ep = moves
            .iter()
            .find(|b| b.to.to_string() == "e3" && b.score == 10)
            .expect("no en passant move generated");
        assert!(ep.is_consistent());
        assert_eq!(ep.both().count(), 3);
    }

    #[test]
    fn castling_rights_follow_rook_captures() {
        // rook takes rook on h8: both K (mover) and k (victim) rights drop
        let moves = moves_of("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", true);
        let capture = moves
            .iter()
            .find(|b| b.to.to_string() == "h8")
            .expect("Rh1xh8 not generated");
        assert!(!capture.castle.has(crate::board::CastlingRights::K));
        assert!(!capture.castle.has(crate::board::CastlingRights::k));
        assert!(capture.castle.has(crate::board::CastlingRights::Q));
        assert!(capture.castle.has(crate::board::CastlingRights::q));
    }

    #[test]
    fn generation_leaves_the_parent_alone() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let setup = parse_fen(fen).unwrap();
        let before = crate::board::zobrist::hash(&setup.board, setup.wtm);

        let mut moves = MoveList::new();
        generate_all::<White>(&setup.board, &setup.castling, true, &mut moves);

        assert_eq!(
            setup
                .board
                .to_fen(&setup.castling, setup.wtm, setup.fullmoves),
            fen
        );
        assert_eq!(
            crate::board::zobrist::hash(&setup.board, setup.wtm),
            before
        );
    }

    #[test]
    fn notation_styles() {
        let moves = moves_of("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", true);
        let setup = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let castle = moves
            .iter()
            .find(|b| b.kind == MoveKind::CastleKingsideW)
            .unwrap();
        assert_eq!(castle.notation(&setup.castling, false), "e1g1");
        assert_eq!(castle.notation(&setup.castling, true), "e1h1");
    }
}
