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
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::error::ParseError;

/// A file: file A = 0 to file H = 7.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct File(pub u8);

/// A rank: rank 1 = 0 to rank 8 = 7.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Rank(pub u8);

/// A square with little-endian rank-file mapping: a1 = 0, b1 = 1, etc.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Square(pub u8);

/// A piece as it sits in the mailbox: positive for White, negative for Black,
/// 0 for an empty square.
///
/// The magnitude is the piece kind: 1 = pawn up to 6 = king. The evaluator
/// and the NNUE bridge rely on this signed encoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Piece(pub i8);

/// The kind of move that produced a [`Board`](crate::board::Board).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MoveKind {
    /// A quiet move or a capture.
    Normal = 0,
    /// White castles kingside.
    CastleKingsideW = 1,
    /// White castles queenside.
    CastleQueensideW = 2,
    /// Black castles kingside.
    CastleKingsideB = 3,
    /// Black castles queenside.
    CastleQueensideB = 4,
    /// A promotion to a knight.
    PromoKnight = 5,
    /// A promotion to a bishop.
    PromoBishop = 6,
    /// A promotion to a rook.
    PromoRook = 7,
    /// A promotion to a queen.
    PromoQueen = 8,
}

/// A marker for a side, to allow the search and the move generator to be
/// monomorphised per side.
///
/// The two sides flip through [`SideType::Flip`], which keeps the recursion
/// on stable Rust (a `!IS_WHITE` const-generic expression would not be).
pub trait SideType {
    /// Whether this side is White.
    const IS_WHITE: bool;
    /// The opposite side.
    type Flip: SideType;
}

/// The White side.
pub struct White;
/// The Black side.
pub struct Black;

impl SideType for White {
    const IS_WHITE: bool = true;
    type Flip = Black;
}

impl SideType for Black {
    const IS_WHITE: bool = false;
    type Flip = White;
}

/// MVV-LVA bonus, indexed `[attacker kind][captured kind]`.
///
/// A king capture scores 99: it only ever appears in pseudo-legal lines that
/// the legality filter is about to reject, so it must dominate everything.
pub static MVV: [[i32; 6]; 6] = [
    [10, 15, 15, 20, 25, 99],
    [9, 14, 14, 19, 24, 99],
    [9, 14, 14, 19, 24, 99],
    [8, 13, 13, 18, 23, 99],
    [7, 12, 12, 17, 22, 99],
    [6, 11, 11, 16, 21, 99],
];

/// File enumerations.
#[allow(dead_code, clippy::missing_docs_in_private_items)]
impl File {
    pub const FILE_A: Self = Self(0);
    pub const FILE_H: Self = Self(7);
    pub const TOTAL: usize = 8;
}

/// Rank enumerations.
#[allow(dead_code, clippy::missing_docs_in_private_items)]
impl Rank {
    pub const RANK1: Self = Self(0);
    pub const RANK2: Self = Self(1);
    pub const RANK3: Self = Self(2);
    pub const RANK4: Self = Self(3);
    pub const RANK5: Self = Self(4);
    pub const RANK6: Self = Self(5);
    pub const RANK7: Self = Self(6);
    pub const RANK8: Self = Self(7);
    pub const TOTAL: usize = 8;
}

/// Square enumerations.
#[allow(dead_code, clippy::missing_docs_in_private_items)]
impl Square {
    pub const A1: Self = Self(0);
    pub const B1: Self = Self(1);
    pub const C1: Self = Self(2);
    pub const D1: Self = Self(3);
    pub const E1: Self = Self(4);
    pub const F1: Self = Self(5);
    pub const G1: Self = Self(6);
    pub const H1: Self = Self(7);
    pub const B2: Self = Self(9);
    pub const G2: Self = Self(14);
    pub const A8: Self = Self(56);
    pub const B8: Self = Self(57);
    pub const C8: Self = Self(58);
    pub const D8: Self = Self(59);
    pub const E8: Self = Self(60);
    pub const F8: Self = Self(61);
    pub const G8: Self = Self(62);
    pub const H8: Self = Self(63);
    pub const B7: Self = Self(49);
    pub const G7: Self = Self(54);
    pub const TOTAL: usize = 64;
}

impl Square {
    /// Converts `rank` and `file` into a [`Square`].
    pub const fn from_pos(rank: Rank, file: File) -> Self {
        Self(rank.0 * 8 + file.0)
    }

    /// Converts the square to a usize.
    pub const fn to_index(self) -> usize {
        self.0 as usize
    }

    /// Mirrors the square vertically: a1 <-> a8 etc.
    pub const fn flip_rank(self) -> Self {
        Self(self.0 ^ 56)
    }
}

impl From<Square> for File {
    /// Calculates the file of a square.
    fn from(square: Square) -> Self {
        Self(square.0 & 7)
    }
}

impl From<Square> for Rank {
    /// Calculates the rank of a square.
    fn from(square: Square) -> Self {
        Self(square.0 >> 3)
    }
}

impl From<File> for char {
    /// Converts a file into a character: 'a' to 'h'.
    fn from(file: File) -> Self {
        (b'a' + file.0) as Self
    }
}

impl From<Rank> for char {
    /// Converts a rank into a character: '1' to '8'.
    fn from(rank: Rank) -> Self {
        (b'1' + rank.0) as Self
    }
}

impl Display for Square {
    /// Converts a square into its string representation, e.g. "b3".
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            char::from(File::from(*self)),
            char::from(Rank::from(*self))
        )
    }
}

impl FromStr for Square {
    type Err = ParseError;

    /// Converts a string representation of a square (e.g. "e4") into a
    /// [`Square`].
    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let mut bytes = string.bytes();
        let err = || ParseError::BadFen(string.to_string());

        let file = bytes.next().ok_or_else(err)?;
        if !(b'a'..=b'h').contains(&file) {
            return Err(err());
        }
        let rank = bytes.next().ok_or_else(err)?;
        if !(b'1'..=b'8').contains(&rank) {
            return Err(err());
        }

        Ok(Self((rank - b'1') * 8 + (file - b'a')))
    }
}

/// Piece enumerations for White and Black.
#[allow(dead_code, clippy::missing_docs_in_private_items)]
impl Piece {
    pub const NONE: Self = Self(0);
    pub const WPAWN: Self = Self(1);
    pub const WKNIGHT: Self = Self(2);
    pub const WBISHOP: Self = Self(3);
    pub const WROOK: Self = Self(4);
    pub const WQUEEN: Self = Self(5);
    pub const WKING: Self = Self(6);
    pub const BPAWN: Self = Self(-1);
    pub const BKNIGHT: Self = Self(-2);
    pub const BBISHOP: Self = Self(-3);
    pub const BROOK: Self = Self(-4);
    pub const BQUEEN: Self = Self(-5);
    pub const BKING: Self = Self(-6);

    /// Kind index of a pawn.
    pub const PAWN: usize = 0;
    /// Kind index of a knight.
    pub const KNIGHT: usize = 1;
    /// Kind index of a bishop.
    pub const BISHOP: usize = 2;
    /// Kind index of a rook.
    pub const ROOK: usize = 3;
    /// Kind index of a queen.
    pub const QUEEN: usize = 4;
    /// Kind index of a king.
    pub const KING: usize = 5;
    /// Total piece kinds per side.
    pub const KINDS: usize = 6;
}

impl Piece {
    /// Creates a piece of the given kind index (0 = pawn .. 5 = king) for the
    /// given side.
    pub const fn from_kind<S: SideType>(kind: usize) -> Self {
        if S::IS_WHITE {
            Self(kind as i8 + 1)
        } else {
            Self(-(kind as i8) - 1)
        }
    }

    /// Checks if the square is empty.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Checks if the piece is White.
    pub const fn is_white(self) -> bool {
        self.0 > 0
    }

    /// Checks if the piece is Black.
    pub const fn is_black(self) -> bool {
        self.0 < 0
    }

    /// Checks if the piece belongs to side `S`.
    pub const fn is_side<S: SideType>(self) -> bool {
        if S::IS_WHITE {
            self.is_white()
        } else {
            self.is_black()
        }
    }

    /// The kind index of the piece: 0 = pawn up to 5 = king.
    ///
    /// The piece must not be [`NONE`](Self::NONE).
    pub const fn kind(self) -> usize {
        (self.0.unsigned_abs() - 1) as usize
    }
}

impl TryFrom<char> for Piece {
    type Error = ParseError;

    /// Converts a piece character specified by FEN into an actual piece.
    fn try_from(piece: char) -> Result<Self, Self::Error> {
        Ok(match piece {
            'P' => Self::WPAWN,
            'N' => Self::WKNIGHT,
            'B' => Self::WBISHOP,
            'R' => Self::WROOK,
            'Q' => Self::WQUEEN,
            'K' => Self::WKING,
            'p' => Self::BPAWN,
            'n' => Self::BKNIGHT,
            'b' => Self::BBISHOP,
            'r' => Self::BROOK,
            'q' => Self::BQUEEN,
            'k' => Self::BKING,
            _ => return Err(ParseError::BadFen(piece.to_string())),
        })
    }
}

impl From<Piece> for char {
    /// Converts a piece into a character: 'P' for White pawn, 'k' for Black
    /// king, '.' for an empty square.
    fn from(piece: Piece) -> Self {
        let chars = [b'.', b'P', b'N', b'B', b'R', b'Q', b'K'];
        let c = chars[piece.0.unsigned_abs() as usize];
        if piece.is_black() {
            c.to_ascii_lowercase() as Self
        } else {
            c as Self
        }
    }
}

impl MoveKind {
    /// Checks if the move is one of the four castlings.
    pub const fn is_castling(self) -> bool {
        matches!(
            self,
            Self::CastleKingsideW
                | Self::CastleQueensideW
                | Self::CastleKingsideB
                | Self::CastleQueensideB
        )
    }

    /// Checks if the move is a promotion.
    pub const fn is_promotion(self) -> bool {
        matches!(
            self,
            Self::PromoKnight | Self::PromoBishop | Self::PromoRook | Self::PromoQueen
        )
    }

    /// Checks if the move is a promotion to anything but a queen.
    pub const fn is_underpromotion(self) -> bool {
        matches!(self, Self::PromoKnight | Self::PromoBishop | Self::PromoRook)
    }

    /// The promotion letter for long algebraic notation.
    ///
    /// The move must be a promotion.
    pub const fn promo_char(self) -> char {
        match self {
            Self::PromoKnight => 'n',
            Self::PromoBishop => 'b',
            Self::PromoRook => 'r',
            _ => 'q',
        }
    }

    /// The kind index (1 = knight .. 4 = queen) of the promotion piece.
    ///
    /// The move must be a promotion.
    pub const fn promo_kind(self) -> usize {
        self as usize - 4
    }
}

#[cfg(test)]
mod tests {
    use super::{MoveKind, Piece, Square, White};

    #[test]
    fn square_strings() {
        assert_eq!("e4".parse::<Square>().unwrap(), Square(28));
        assert_eq!(Square(28).to_string(), "e4");
        assert_eq!(Square::A1.to_string(), "a1");
        assert_eq!(Square::H8.to_string(), "h8");
        assert!("i9".parse::<Square>().is_err());
    }

    #[test]
    fn piece_encoding() {
        assert_eq!(Piece::try_from('n').unwrap(), Piece::BKNIGHT);
        assert_eq!(char::from(Piece::WQUEEN), 'Q');
        assert_eq!(Piece::BROOK.kind(), Piece::ROOK);
        assert_eq!(Piece::from_kind::<White>(Piece::QUEEN), Piece::WQUEEN);
    }

    #[test]
    fn promo_kinds() {
        assert_eq!(MoveKind::PromoKnight.promo_kind(), Piece::KNIGHT);
        assert_eq!(MoveKind::PromoQueen.promo_kind(), Piece::QUEEN);
        assert!(MoveKind::PromoRook.is_underpromotion());
        assert!(!MoveKind::PromoQueen.is_underpromotion());
    }
}
