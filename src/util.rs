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

use std::str::FromStr;

use oorandom::Rand64;

/// A C-style `for` loop to allow easier looping in `const` functions.
// idea for this is from viridithas
#[macro_export]
macro_rules! cfor {
    ($stmt:stmt; $cond:expr; $expr:expr; $body:block) => {{
        $stmt
        while ($cond) {
            $body;
            $expr;
        }
    }};
}

/// Parses an `Option<&str>` into an `Option<T>`.
///
/// If the parse fails, it will return [`None`].
pub fn parse_option<T: FromStr>(num: Option<&str>) -> Option<T> {
    num.and_then(|t| t.parse::<T>().ok())
}

/// A random number in `min..=max`, collapsing to `min` for empty ranges.
pub fn random_range(rng: &mut Rand64, min: i32, max: i32) -> i32 {
    if min >= max {
        return min;
    }
    min + rng.rand_range(0..(max - min + 1) as u64) as i32
}

/// Seeds a [`Rand64`] from the operating system.
pub fn seeded_rng() -> Rand64 {
    let mut seed = [0_u8; 16];
    // a zero seed is merely predictable, not broken
    let _ = getrandom::getrandom(&mut seed);
    Rand64::new(u128::from_le_bytes(seed))
}
