use shakmaty::Move;

use crate::types::{score_from_tt, score_to_tt, Score};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TTFlag {
    Exact,
    LowerBound, // Beta cutoff (score >= beta)
    UpperBound, // Failed low (score <= alpha)
}

#[derive(Clone)]
pub struct TTEntry {
    pub key: u64, // Zobrist hash (full, for collision detection)
    pub depth: u8,
    pub score: Score,
    pub flag: TTFlag,
    pub best_move: Option<Move>,
    pub age: u8, // Search generation for aging
}

impl Default for TTEntry {
    fn default() -> Self {
        Self {
            key: 0,
            depth: 0,
            score: 0,
            flag: TTFlag::Exact,
            best_move: None,
            age: 0,
        }
    }
}

pub struct TranspositionTable {
    entries: Vec<TTEntry>,
    mask: usize, // size - 1 (for fast modulo)
    generation: u8, // Current search generation
}

impl TranspositionTable {
    /// Create new TT with given size in megabytes
    pub fn new(mb: usize) -> Self {
        let entry_size = std::mem::size_of::<TTEntry>();
        let num_entries = (mb * 1024 * 1024) / entry_size;
        // Round down to power of 2
        let size = num_entries.next_power_of_two() / 2;
        let size = size.max(1024); // Minimum 1024 entries

        Self {
            entries: vec![TTEntry::default(); size],
            mask: size - 1,
            generation: 0,
        }
    }

    /// Increment generation counter (call at start of each search)
    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Probe TT for given hash. The entry's score is still root-relative;
    /// use `retrieve_score` to adjust it to `ply` before trusting a bound.
    pub fn probe(&self, hash: u64) -> Option<&TTEntry> {
        let idx = hash as usize & self.mask;
        let entry = &self.entries[idx];

        if entry.key == hash {
            Some(entry)
        } else {
            None
        }
    }

    /// Turn a stored entry's bound into a usable score at `ply`, or `None`
    /// if the bound doesn't let the caller resolve the window at `alpha`/`beta`.
    pub fn retrieve_score(entry: &TTEntry, ply: usize, alpha: Score, beta: Score) -> Option<Score> {
        let score = score_from_tt(entry.score, ply);

        match entry.flag {
            TTFlag::Exact => Some(score),
            TTFlag::LowerBound => {
                if score >= beta {
                    Some(score)
                } else {
                    None
                }
            }
            TTFlag::UpperBound => {
                if score <= alpha {
                    Some(score)
                } else {
                    None
                }
            }
        }
    }

    /// Store a search result in the TT.
    ///
    /// Replacement policy: always replace an empty slot or a colliding entry
    /// (different key) so that one stale/unrelated position can't pin a slot
    /// forever; for a genuine same-key rewrite, only replace when the new
    /// search is at least as deep, or the existing entry is from an earlier
    /// generation and therefore stale regardless of depth.
    pub fn store(
        &mut self,
        hash: u64,
        depth: u8,
        score: Score,
        flag: TTFlag,
        best_move: Option<Move>,
        ply: usize,
    ) {
        let idx = hash as usize & self.mask;
        let entry = &self.entries[idx];

        let is_empty = entry.key == 0 && entry.depth == 0;
        let same_key = entry.key == hash;
        let stale = entry.age != self.generation;

        let should_replace = is_empty || !same_key || depth >= entry.depth || stale;

        if !should_replace {
            return;
        }

        let stored_score = score_to_tt(score, ply);

        self.entries[idx] = TTEntry {
            key: hash,
            depth,
            score: stored_score,
            flag,
            best_move,
            age: self.generation,
        };
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = TTEntry::default();
        }
        self.generation = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
