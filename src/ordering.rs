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

use std::{fs, thread::JoinHandle};

use crate::{board::zobrist::Key, movegen::MoveList};

/// Score boost for a stored killer (beta-cutoff) move.
const KILLER_BONUS: i32 = 10_000;
/// Score boost for a stored good (alpha-improving) move.
const GOOD_BONUS: i32 = 7_000;
/// Slots in the legacy hint set; must be a power of two.
const HINT_SLOTS: usize = 1 << 15;
/// Default file name of the legacy root-ordering hints.
const HINT_FILE: &str = "good-moves.nn";

/// One table slot: a killer and a good move, each a `(hash32, index + 1)`
/// pair. Index 0 means empty.
#[derive(Clone, Copy, Default)]
struct Slot {
    /// High hash bits verifying the killer entry.
    killer_hash: u32,
    /// High hash bits verifying the good entry.
    good_hash: u32,
    /// Killer move-list index, plus one.
    killer: u8,
    /// Good move-list index, plus one.
    good: u8,
}

/// The hash-indexed store of move-ordering hints.
///
/// Entries are advisory: a stale index merely boosts the wrong move, so
/// collisions simply displace older slots. Correctness never depends on it.
pub struct OrderingTable {
    /// The slots.
    slots: Vec<Slot>,
}

/// The legacy hint set: position hashes whose root moves deserve a nudge,
/// loaded from a side file by a background task during the search.
pub struct HintSet {
    /// Direct-mapped hashes.
    table: Box<[Key]>,
}

impl OrderingTable {
    /// Creates a table of `megabytes` MiB. Fails loudly if the allocation is
    /// refused.
    pub fn new(megabytes: usize) -> Result<Self, String> {
        let mut table = Self { slots: Vec::new() };
        table.resize(megabytes)?;
        Ok(table)
    }

    /// Resizes the table to `megabytes` MiB (clamped to 1..=1048576) and
    /// clears it.
    pub fn resize(&mut self, megabytes: usize) -> Result<(), String> {
        let megabytes = megabytes.clamp(1, 1_048_576);
        let entries = megabytes * (1 << 20) / std::mem::size_of::<Slot>();

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(entries)
            .map_err(|e| format!("hash allocation of {megabytes} MiB failed: {e}"))?;
        slots.resize(entries, Slot::default());
        self.slots = slots;
        Ok(())
    }

    /// Zeroes every slot.
    pub fn clear(&mut self) {
        self.slots.fill(Slot::default());
    }

    /// The slot of `hash`.
    fn index(&self, hash: Key) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    /// Boosts the scores of the stored killer and good moves of this
    /// position, if the high hash bits verify.
    pub fn apply_hints(&self, hash: Key, moves: &mut MoveList) {
        let slot = self.slots[self.index(hash)];
        let high = (hash >> 32) as u32;

        if slot.killer != 0 && slot.killer_hash == high {
            if let Some(board) = moves.get_mut(slot.killer as usize - 1) {
                board.score += KILLER_BONUS;
            }
        }
        if slot.good != 0 && slot.good_hash == high {
            if let Some(board) = moves.get_mut(slot.good as usize - 1) {
                board.score += GOOD_BONUS;
            }
        }
    }

    /// Records the move `index` as the killer of this position.
    pub fn store_killer(&mut self, hash: Key, index: u8) {
        let at = self.index(hash);
        let slot = &mut self.slots[at];
        slot.killer_hash = (hash >> 32) as u32;
        slot.killer = index + 1;
    }

    /// Records the move `index` as a good move of this position.
    pub fn store_good(&mut self, hash: Key, index: u8) {
        let at = self.index(hash);
        let slot = &mut self.slots[at];
        slot.good_hash = (hash >> 32) as u32;
        slot.good = index + 1;
    }
}

/// Sorts just enough: swaps any better-scored later move into slot `nth`.
///
/// One call per picked move avoids the n log n of a full sort on lists whose
/// tail is never reached thanks to cutoffs.
pub fn lazy_sort(moves: &mut MoveList, nth: usize) {
    for i in nth + 1..moves.len() {
        if moves[i].score > moves[nth].score {
            moves.swap(nth, i);
        }
    }
}

impl HintSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            table: vec![0; HINT_SLOTS].into_boxed_slice(),
        }
    }

    /// Merges loaded hashes into the set.
    pub fn merge(&mut self, hashes: &[Key]) {
        for &hash in hashes {
            self.table[hash as usize & (HINT_SLOTS - 1)] = hash;
        }
    }

    /// Tests membership.
    pub fn contains(&self, hash: Key) -> bool {
        hash != 0 && self.table[hash as usize & (HINT_SLOTS - 1)] == hash
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.table.fill(0);
    }
}

/// Spawns the legacy loader: reads the hint file (whitespace-separated hex
/// hashes) while the search runs.
///
/// The controller joins this handle before emitting `bestmove` and merges
/// the result; an absent file simply yields nothing.
pub fn spawn_hint_loader() -> JoinHandle<Vec<Key>> {
    std::thread::spawn(|| {
        let Ok(text) = fs::read_to_string(HINT_FILE) else {
            return Vec::new();
        };
        text.split_whitespace()
            .filter_map(|token| Key::from_str_radix(token.trim_start_matches("0x"), 16).ok())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::{lazy_sort, HintSet, OrderingTable};
    use crate::{
        board::{parse_fen, STARTPOS},
        defs::White,
        movegen::{generate_all, MoveList},
    };

    /// A small table and the startpos move list.
    fn fixture() -> (OrderingTable, MoveList) {
        let setup = parse_fen(STARTPOS).unwrap();
        let mut moves = MoveList::new();
        generate_all::<White>(&setup.board, &setup.castling, true, &mut moves);
        (OrderingTable::new(1).unwrap(), moves)
    }

    #[test]
    fn hints_boost_verified_entries() {
        let (mut table, mut moves) = fixture();
        let hash = 0xdead_beef_0123_4567;

        table.store_killer(hash, 3);
        table.store_good(hash, 5);
        table.apply_hints(hash, &mut moves);
        assert_eq!(moves[3].score, 10_000);
        assert_eq!(moves[5].score, 7_000);

        // a different position with the same low bits fails verification
        let mut fresh = moves.clone();
        for board in &mut fresh {
            board.score = 0;
        }
        table.apply_hints(hash ^ (1 << 40), &mut fresh);
        assert!(fresh.iter().all(|board| board.score == 0));
    }

    #[test]
    fn collisions_displace() {
        let (mut table, mut moves) = fixture();
        let hash = 0x0123_4567_89ab_cdef;

        table.store_killer(hash, 1);
        table.store_killer(hash, 9);
        table.apply_hints(hash, &mut moves);
        assert_eq!(moves[1].score, 0);
        assert_eq!(moves[9].score, 10_000);
    }

    #[test]
    fn out_of_range_hints_are_ignored() {
        let (mut table, mut moves) = fixture();
        let hash = 0x0123_4567_89ab_cdef;
        table.store_killer(hash, 200);
        table.apply_hints(hash, &mut moves);
        assert!(moves.iter().all(|board| board.score == 0));
    }

    #[test]
    fn lazy_sort_brings_the_best_forward() {
        let (_, mut moves) = fixture();
        moves[7].score = 50;
        moves[12].score = 99;
        lazy_sort(&mut moves, 0);
        assert_eq!(moves[0].score, 99);
        // one pass guarantees only slot 0
        lazy_sort(&mut moves, 1);
        assert_eq!(moves[1].score, 50);
    }

    #[test]
    fn hint_set_membership() {
        let mut set = HintSet::new();
        set.merge(&[0xabc_def, 0x123]);
        assert!(set.contains(0xabc_def));
        assert!(!set.contains(0x999));
        set.clear();
        assert!(!set.contains(0xabc_def));
    }
}
