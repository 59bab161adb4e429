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

use std::fmt::{self, Display, Formatter};

/// An error that occurs when a position cannot be set up.
#[derive(Debug)]
pub enum ParseError {
    /// The FEN string is unusable. Carries the offending string.
    BadFen(String),
    /// A move token did not match any legal move. Carries the token.
    BadMove(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadFen(fen) => write!(f, "bad fen: {fen}"),
            Self::BadMove(mv) => write!(f, "bad move: {mv}"),
        }
    }
}
