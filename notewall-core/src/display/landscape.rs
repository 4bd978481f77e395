//! Landscape scheduler: at most `capacity` free-floating notes, rotated FIFO.
//!
//! Every `displayDuration` the runtime calls [`LandscapeScheduler::tick`].
//! Below capacity the next note in cyclic order is appended (or re-placed if
//! it is already on screen). At capacity the oldest entry starts exiting and
//! the runtime calls [`LandscapeScheduler::complete_exit`] once the exit
//! animation has played, which removes it and appends the replacement.

use std::collections::VecDeque;

use rand::Rng;
use serde::Serialize;

use super::{DisplayRng, LandscapeCard, Note, NoteCaption};

pub const DEFAULT_CAPACITY: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Percent of viewport height.
    pub top_pct: f64,
    /// Percent of viewport width.
    pub left_pct: f64,
    pub rotation_deg: f64,
    pub scale: f64,
}

impl Placement {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            top_pct: rng.gen_range(10.0..=70.0),
            left_pct: rng.gen_range(10.0..=80.0),
            rotation_deg: rng.gen_range(-10.0..=10.0),
            scale: rng.gen_range(0.9..=1.05),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PooledNote {
    pub note_id: String,
    pub placement: Placement,
    pub exiting: bool,
    /// Increments on every (re)entry so renderers restart the enter animation.
    pub entry: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationStep {
    /// Nothing to show, or an exit is still playing.
    Idle,
    Appended(String),
    /// The next note was already on screen; it moved to a fresh position.
    Replaced(String),
    /// Oldest entry is leaving; call `complete_exit` after the animation.
    Exiting(String),
}

pub struct LandscapeScheduler {
    capacity: usize,
    pool: VecDeque<PooledNote>,
    cursor: usize,
    filled: bool,
    next_entry: u64,
    rng: DisplayRng,
}

impl LandscapeScheduler {
    pub fn new(capacity: usize, rng: DisplayRng) -> Self {
        Self {
            capacity: capacity.max(1),
            pool: VecDeque::new(),
            cursor: 0,
            filled: false,
            next_entry: 0,
            rng,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pool(&self) -> impl Iterator<Item = &PooledNote> {
        self.pool.iter()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn is_exiting(&self) -> bool {
        self.pool.iter().any(|p| p.exiting)
    }

    /// Drop everything; the next non-empty live set refills from scratch.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.cursor = 0;
        self.filled = false;
    }

    /// Reconcile the pool with the current live set: notes that left it are
    /// dropped at once, and the first non-empty set fills the pool.
    pub fn sync(&mut self, live: &[Note]) {
        if live.is_empty() {
            if !self.pool.is_empty() {
                tracing::debug!("Live set empty, clearing landscape pool");
            }
            self.reset();
            return;
        }

        self.pool.retain(|p| live.iter().any(|n| n.id == p.note_id));

        if !self.filled {
            for note in live.iter().take(self.capacity) {
                self.push(note.id.clone());
            }
            self.cursor = self.pool.len() % live.len();
            self.filled = true;
            tracing::debug!(count = self.pool.len(), "Landscape pool filled");
        }
    }

    /// One rotation tick.
    pub fn tick(&mut self, live: &[Note]) -> RotationStep {
        self.sync(live);
        if live.is_empty() || self.is_exiting() {
            return RotationStep::Idle;
        }

        let next = &live[self.cursor % live.len()];
        if self.pool.iter().any(|p| p.note_id == next.id) {
            let id = next.id.clone();
            self.pool.retain(|p| p.note_id != id);
            self.push(id.clone());
            self.advance(live.len());
            return RotationStep::Replaced(id);
        }

        if self.pool.len() < self.capacity {
            let id = next.id.clone();
            self.push(id.clone());
            self.advance(live.len());
            return RotationStep::Appended(id);
        }

        match self.pool.front_mut() {
            Some(oldest) => {
                oldest.exiting = true;
                RotationStep::Exiting(oldest.note_id.clone())
            }
            None => RotationStep::Idle,
        }
    }

    /// Finish a pending exit: remove the exiting entry and append the next
    /// note. Returns the appended id.
    pub fn complete_exit(&mut self, live: &[Note]) -> Option<String> {
        let before = self.pool.len();
        self.pool.retain(|p| !p.exiting);
        if before == self.pool.len() {
            return None;
        }

        self.pool.retain(|p| live.iter().any(|n| n.id == p.note_id));
        if live.is_empty() {
            return None;
        }

        let next = live[self.cursor % live.len()].id.clone();
        self.pool.retain(|p| p.note_id != next);
        self.push(next.clone());
        self.advance(live.len());
        Some(next)
    }

    pub fn cards(&self, live: &[Note]) -> Vec<LandscapeCard> {
        self.pool
            .iter()
            .filter_map(|p| {
                let note = live.iter().find(|n| n.id == p.note_id)?;
                Some(LandscapeCard {
                    note: NoteCaption::from(note),
                    placement: p.placement,
                    exiting: p.exiting,
                })
            })
            .collect()
    }

    fn push(&mut self, note_id: String) {
        let placement = Placement::random(&mut self.rng);
        self.next_entry += 1;
        self.pool.push_back(PooledNote {
            note_id,
            placement,
            exiting: false,
            entry: self.next_entry,
        });
    }

    fn advance(&mut self, live_len: usize) {
        self.cursor = (self.cursor + 1) % live_len;
    }
}
