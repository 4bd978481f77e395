//! Portrait scheduler: a 60-slot scrolling grid.
//!
//! The layout is generated once per column count. Slots scrolled fully out
//! of view get new content every `displayDuration`; slots on screen are never
//! touched. Independently, one card at a time can be spotlighted full-screen.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::{DisplayRng, FocusView, Note, NoteCaption, PortraitCell};
use crate::models::FocusFrequency;

pub const SLOT_COUNT: usize = 60;
pub const SPACER_PROBABILITY: f64 = 0.25;
pub const WIDE_CARD_PROBABILITY: f64 = 0.2;
pub const MAX_FOCUS_TILT_DEG: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CardSize {
    #[serde(rename = "1x1")]
    Single,
    #[serde(rename = "2x3")]
    Wide,
}

impl CardSize {
    pub fn col_span(&self) -> usize {
        match self {
            CardSize::Single => 1,
            CardSize::Wide => 2,
        }
    }

    pub fn row_span(&self) -> usize {
        match self {
            CardSize::Single => 1,
            CardSize::Wide => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "size", rename_all = "lowercase")]
pub enum SlotKind {
    Spacer,
    Card(CardSize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub kind: SlotKind,
    pub row: usize,
    pub column: usize,
    pub col_span: usize,
    pub row_span: usize,
}

impl Slot {
    pub fn is_card(&self) -> bool {
        matches!(self.kind, SlotKind::Card(_))
    }

    pub fn rows(&self) -> std::ops::Range<usize> {
        self.row..self.row + self.row_span
    }
}

/// Grid cells taken so far, row-major.
struct Occupancy {
    columns: usize,
    cells: Vec<bool>,
}

impl Occupancy {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            cells: Vec::new(),
        }
    }

    fn taken(&self, row: usize, column: usize) -> bool {
        self.cells.get(row * self.columns + column).copied().unwrap_or(false)
    }

    fn fits(&self, row: usize, column: usize, size: CardSize) -> bool {
        column + size.col_span() <= self.columns
            && (row..row + size.row_span())
                .all(|r| (column..column + size.col_span()).all(|c| !self.taken(r, c)))
    }

    fn take(&mut self, slot: &Slot) {
        for r in slot.rows() {
            for c in slot.column..slot.column + slot.col_span {
                let index = r * self.columns + c;
                if index >= self.cells.len() {
                    self.cells.resize(index + 1, false);
                }
                self.cells[index] = true;
            }
        }
    }

    /// First free cell at or after `(row, column)`.
    fn next_free(&self, mut row: usize, mut column: usize) -> (usize, usize) {
        loop {
            if column >= self.columns {
                row += 1;
                column = 0;
            }
            if !self.taken(row, column) {
                return (row, column);
            }
            column += 1;
        }
    }
}

/// Pack `SLOT_COUNT` slots into rows of `columns` grid columns. Wide cards
/// cover cells in the rows below them; later slots flow around those cells.
pub fn generate_layout<R: Rng + ?Sized>(columns: usize, rng: &mut R) -> Vec<Slot> {
    let columns = columns.max(1);
    let mut slots = Vec::with_capacity(SLOT_COUNT);
    let mut grid = Occupancy::new(columns);
    let (mut row, mut column) = (0, 0);
    let mut pending: Option<CardSize> = None;

    let spacer = |row: usize, column: usize| Slot {
        kind: SlotKind::Spacer,
        row,
        column,
        col_span: 1,
        row_span: 1,
    };

    while slots.len() < SLOT_COUNT {
        (row, column) = grid.next_free(row, column);

        let size = match pending.take() {
            Some(size) => size,
            None => {
                if column + 1 < columns && rng.gen_bool(SPACER_PROBABILITY) {
                    let slot = spacer(row, column);
                    grid.take(&slot);
                    slots.push(slot);
                    continue;
                }
                if columns >= 2 && rng.gen_bool(WIDE_CARD_PROBABILITY) {
                    CardSize::Wide
                } else {
                    CardSize::Single
                }
            }
        };

        if grid.fits(row, column, size) {
            let slot = Slot {
                kind: SlotKind::Card(size),
                row,
                column,
                col_span: size.col_span(),
                row_span: size.row_span(),
            };
            grid.take(&slot);
            slots.push(slot);
            continue;
        }

        // Overflow pads the rest of the row. A cell that only fails because
        // an earlier wide card reaches into the rows below is padded alone.
        pending = Some(size);
        let pad_to = if column + size.col_span() > columns { columns } else { column + 1 };
        while column < pad_to && slots.len() < SLOT_COUNT {
            if !grid.taken(row, column) {
                let slot = spacer(row, column);
                grid.take(&slot);
                slots.push(slot);
            }
            column += 1;
        }
    }
    slots
}

/// Rows the layout occupies.
pub fn row_count(layout: &[Slot]) -> usize {
    layout.iter().map(|s| s.row + s.row_span).max().unwrap_or(0)
}

/// Whether any part of `row` is inside the viewport at the given scroll
/// offset. The grid repeats vertically, so the wrapped copy counts too.
pub fn row_on_screen(row: usize, rows: usize, scroll_offset: f64, viewport_height: f64, row_height: f64) -> bool {
    let content_height = rows as f64 * row_height;
    if content_height <= 0.0 || content_height <= viewport_height {
        return true;
    }
    let offset = scroll_offset.rem_euclid(content_height);
    let top = row as f64 * row_height - offset;
    [top, top + content_height]
        .iter()
        .any(|&t| t < viewport_height && t + row_height > 0.0)
}

/// Focus interval for a frequency; `None` disables spotlighting.
pub fn focus_interval(base: Duration, frequency: FocusFrequency) -> Option<Duration> {
    frequency.multiplier().map(|m| base.mul_f64(m))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Focus {
    pub slot: usize,
    pub note_id: String,
    pub tilt_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FocusPhase {
    #[default]
    Idle,
    Holding(Focus),
    Exiting(Focus),
}

/// Geometry used to decide which rows are visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub height: f64,
    pub row_height: f64,
}

pub struct PortraitScheduler {
    columns: usize,
    layout: Vec<Slot>,
    assignments: Vec<Option<String>>,
    scroll_offset: f64,
    focus: FocusPhase,
    rng: DisplayRng,
}

impl PortraitScheduler {
    pub fn new(columns: usize, rng: DisplayRng) -> Self {
        let mut scheduler = Self {
            columns,
            layout: Vec::new(),
            assignments: Vec::new(),
            scroll_offset: 0.0,
            focus: FocusPhase::Idle,
            rng,
        };
        scheduler.layout = generate_layout(columns, &mut scheduler.rng);
        scheduler.assignments = vec![None; scheduler.layout.len()];
        scheduler
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn layout(&self) -> &[Slot] {
        &self.layout
    }

    pub fn assignment(&self, slot: usize) -> Option<&str> {
        self.assignments.get(slot).and_then(|a| a.as_deref())
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn focus(&self) -> &FocusPhase {
        &self.focus
    }

    /// Discard the layout and generate a new one for `columns`.
    pub fn set_columns(&mut self, columns: usize, live: &[Note]) {
        if columns == self.columns {
            return;
        }
        tracing::debug!(from = self.columns, to = columns, "Regenerating portrait layout");
        self.columns = columns;
        self.layout = generate_layout(columns, &mut self.rng);
        self.focus = FocusPhase::Idle;
        self.assign_all(live);
    }

    /// Index-modulo assignment over every card slot.
    pub fn assign_all(&mut self, live: &[Note]) {
        self.assignments = self
            .layout
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                if slot.is_card() && !live.is_empty() {
                    Some(live[i % live.len()].id.clone())
                } else {
                    None
                }
            })
            .collect();
    }

    /// Reconcile with the live set. Slots holding a note that left the set
    /// are reassigned immediately; the rest keep their content.
    pub fn sync(&mut self, live: &[Note]) {
        if live.is_empty() {
            self.assignments.iter_mut().for_each(|a| *a = None);
            self.focus = FocusPhase::Idle;
            return;
        }
        if self.assignments.iter().all(Option::is_none) {
            self.assign_all(live);
            return;
        }

        let ids: HashSet<&str> = live.iter().map(|n| n.id.as_str()).collect();
        for (i, slot) in self.layout.iter().enumerate() {
            let stale = match &self.assignments[i] {
                Some(id) => !ids.contains(id.as_str()),
                None => slot.is_card(),
            };
            if stale {
                self.assignments[i] = Some(live[i % live.len()].id.clone());
            }
        }

        let focus_gone = match &self.focus {
            FocusPhase::Holding(f) | FocusPhase::Exiting(f) => !ids.contains(f.note_id.as_str()),
            FocusPhase::Idle => false,
        };
        if focus_gone {
            self.focus = FocusPhase::Idle;
        }
    }

    pub fn reset(&mut self) {
        self.assignments.iter_mut().for_each(|a| *a = None);
        self.scroll_offset = 0.0;
        self.focus = FocusPhase::Idle;
    }

    /// Advance the scroll by `pixels`. The offset grows without bound;
    /// visibility math wraps it.
    pub fn scroll_by(&mut self, pixels: f64) {
        self.scroll_offset += pixels;
    }

    pub fn slot_on_screen(&self, slot: usize, viewport: Viewport) -> bool {
        match self.layout.get(slot) {
            Some(s) => {
                let rows = row_count(&self.layout);
                s.rows()
                    .any(|r| row_on_screen(r, rows, self.scroll_offset, viewport.height, viewport.row_height))
            }
            None => false,
        }
    }

    /// Give every fully off-screen card a different note, preferring notes
    /// shown nowhere in the grid, then notes not currently visible. Returns
    /// the slots that changed.
    pub fn rotate_offscreen(&mut self, live: &[Note], viewport: Viewport) -> Vec<usize> {
        if live.is_empty() {
            return Vec::new();
        }

        let mut shown: HashMap<String, usize> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut visible: HashSet<String> = HashSet::new();
        for (i, assigned) in self.assignments.iter().enumerate() {
            if let Some(id) = assigned {
                *shown.entry(id.clone()).or_default() += 1;
                seen.insert(id.clone());
                if self.slot_on_screen(i, viewport) {
                    visible.insert(id.clone());
                }
            }
        }

        let offscreen: Vec<usize> = (0..self.layout.len())
            .filter(|&i| self.layout[i].is_card() && !self.slot_on_screen(i, viewport))
            .collect();

        let mut changed = Vec::new();
        for i in offscreen {
            let current = self.assignments[i].clone();

            // A note freed earlier in this pass was still in the grid a
            // moment ago; it does not count as unused.
            let unused: Vec<&Note> = live
                .iter()
                .filter(|n| !shown.contains_key(&n.id) && !seen.contains(&n.id))
                .collect();
            let choice = match unused.choose(&mut self.rng) {
                Some(note) => Some(*note),
                None => {
                    let hidden: Vec<&Note> = live
                        .iter()
                        .filter(|n| !visible.contains(&n.id) && Some(&n.id) != current.as_ref())
                        .collect();
                    hidden.choose(&mut self.rng).copied()
                }
            };
            let Some(note) = choice else {
                continue;
            };

            if let Some(old) = &current {
                if let Some(count) = shown.get_mut(old) {
                    *count -= 1;
                    if *count == 0 {
                        shown.remove(old);
                    }
                }
            }
            *shown.entry(note.id.clone()).or_default() += 1;
            self.assignments[i] = Some(note.id.clone());
            changed.push(i);
        }
        changed
    }

    /// Spotlight a random assigned card. `None` if a focus is already
    /// active or there is nothing to show.
    pub fn begin_focus(&mut self) -> Option<Focus> {
        if self.focus != FocusPhase::Idle {
            return None;
        }
        let candidates: Vec<usize> = (0..self.layout.len())
            .filter(|&i| self.layout[i].is_card() && self.assignments[i].is_some())
            .collect();
        let slot = *candidates.choose(&mut self.rng)?;
        let note_id = self.assignments[slot].clone()?;
        let focus = Focus {
            slot,
            note_id,
            tilt_deg: self.rng.gen_range(-MAX_FOCUS_TILT_DEG..=MAX_FOCUS_TILT_DEG),
        };
        self.focus = FocusPhase::Holding(focus.clone());
        Some(focus)
    }

    /// Hold is over; start the exit animation.
    pub fn release_focus(&mut self) -> bool {
        match std::mem::take(&mut self.focus) {
            FocusPhase::Holding(f) => {
                self.focus = FocusPhase::Exiting(f);
                true
            }
            other => {
                self.focus = other;
                false
            }
        }
    }

    pub fn clear_focus(&mut self) {
        self.focus = FocusPhase::Idle;
    }

    pub fn cells(&self, live: &[Note]) -> Vec<PortraitCell> {
        let by_id: HashMap<&str, &Note> = live.iter().map(|n| (n.id.as_str(), n)).collect();
        self.layout
            .iter()
            .zip(&self.assignments)
            .map(|(slot, assigned)| PortraitCell {
                slot: *slot,
                note: assigned
                    .as_deref()
                    .and_then(|id| by_id.get(id))
                    .map(|n| NoteCaption::from(*n)),
            })
            .collect()
    }

    pub fn focus_view(&self, live: &[Note]) -> Option<FocusView> {
        let (focus, exiting) = match &self.focus {
            FocusPhase::Idle => return None,
            FocusPhase::Holding(f) => (f, false),
            FocusPhase::Exiting(f) => (f, true),
        };
        let note = live.iter().find(|n| n.id == focus.note_id)?;
        Some(FocusView {
            note: NoteCaption::from(note),
            slot: focus.slot,
            tilt_deg: focus.tilt_deg,
            exiting,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::seeded_rng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const VIEWPORT: Viewport = Viewport {
        height: 1920.0,
        row_height: 320.0,
    };

    fn notes(n: usize) -> Vec<Note> {
        (0..n)
            .map(|i| Note {
                id: format!("n{}", i),
                recipient: "Sarah".to_string(),
                sender: "Mike".to_string(),
                template_theme: "watercolor".to_string(),
                drawing_image: String::new(),
                created_at: i as i64,
            })
            .collect()
    }

    // ========================================================================
    // Layout
    // ========================================================================

    #[test]
    fn test_layout_never_overflows_row() {
        for columns in 2..=4 {
            for seed in 0..200 {
                let layout = generate_layout(columns, &mut StdRng::seed_from_u64(seed));
                assert_eq!(layout.len(), SLOT_COUNT);

                let mut used: HashMap<usize, usize> = HashMap::new();
                for slot in &layout {
                    assert!(
                        slot.column + slot.col_span <= columns,
                        "slot {:?} overflows {} columns",
                        slot,
                        columns
                    );
                    *used.entry(slot.row).or_default() += slot.col_span;
                }
                assert!(used.values().all(|&w| w <= columns));
            }
        }
    }

    #[test]
    fn test_layout_slots_do_not_overlap() {
        for columns in 2..=4 {
            for seed in 0..100 {
                let layout = generate_layout(columns, &mut StdRng::seed_from_u64(seed));
                let mut cells = HashSet::new();
                for slot in &layout {
                    for r in slot.rows() {
                        for c in slot.column..slot.column + slot.col_span {
                            assert!(cells.insert((r, c)), "cell ({}, {}) used twice", r, c);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_wide_cards_span_three_rows() {
        let layout = generate_layout(4, &mut StdRng::seed_from_u64(7));
        for slot in &layout {
            match slot.kind {
                SlotKind::Card(CardSize::Wide) => assert_eq!((slot.col_span, slot.row_span), (2, 3)),
                _ => assert_eq!((slot.col_span, slot.row_span), (1, 1)),
            }
        }
        assert!(layout.iter().any(|s| s.kind == SlotKind::Card(CardSize::Wide)));
    }

    #[test]
    fn test_spacers_roll_in_every_column_but_the_last() {
        // Spacers are rolled at any cell with room after it, so the first
        // column gets them too, and two-column grids are not spacer-free.
        let mut rng = StdRng::seed_from_u64(99);
        let (mut first_column, mut first_column_spacers) = (0usize, 0usize);
        for _ in 0..300 {
            for slot in generate_layout(2, &mut rng) {
                if slot.column == 0 {
                    first_column += 1;
                    if slot.kind == SlotKind::Spacer {
                        first_column_spacers += 1;
                    }
                }
            }
        }
        let rate = first_column_spacers as f64 / first_column as f64;
        assert!((0.12..0.3).contains(&rate), "first-column spacer rate {}", rate);

        for columns in 3..=4 {
            let layout = generate_layout(columns, &mut StdRng::seed_from_u64(3));
            let spacers = layout.iter().filter(|s| s.kind == SlotKind::Spacer).count();
            assert!(spacers > 0, "no spacers with {} columns", columns);
        }
    }

    #[test]
    fn test_layout_size_weights() {
        let mut rng = StdRng::seed_from_u64(2024);
        let (mut single, mut wide) = (0usize, 0usize);
        for _ in 0..300 {
            for slot in generate_layout(4, &mut rng) {
                match slot.kind {
                    SlotKind::Card(CardSize::Single) => single += 1,
                    SlotKind::Card(CardSize::Wide) => wide += 1,
                    SlotKind::Spacer => {}
                }
            }
        }
        let ratio = wide as f64 / (single + wide) as f64;
        assert!((0.15..0.25).contains(&ratio), "wide ratio {}", ratio);
    }

    #[test]
    fn test_layout_is_deterministic_for_seed() {
        let a = generate_layout(3, &mut StdRng::seed_from_u64(5));
        let b = generate_layout(3, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_assignment_by_index_modulo() {
        let live = notes(4);
        let mut s = PortraitScheduler::new(3, seeded_rng(1));
        s.assign_all(&live);
        for (i, slot) in s.layout().iter().enumerate() {
            if slot.is_card() {
                assert_eq!(s.assignment(i), Some(live[i % 4].id.as_str()));
            } else {
                assert_eq!(s.assignment(i), None);
            }
        }
    }

    #[test]
    fn test_set_columns_regenerates() {
        let live = notes(4);
        let mut s = PortraitScheduler::new(3, seeded_rng(1));
        s.sync(&live);
        s.set_columns(2, &live);
        assert_eq!(s.columns(), 2);
        assert!(s.layout().iter().all(|slot| slot.column + slot.col_span <= 2));
        assert!(s.layout().iter().enumerate().all(|(i, slot)| slot.is_card() == s.assignment(i).is_some()));
    }

    // ========================================================================
    // Visibility and rotation
    // ========================================================================

    #[test]
    fn test_row_visibility_wraps() {
        // 20 rows of 100px, viewport 300px.
        assert!(row_on_screen(0, 20, 0.0, 300.0, 100.0));
        assert!(row_on_screen(2, 20, 0.0, 300.0, 100.0));
        assert!(!row_on_screen(3, 20, 0.0, 300.0, 100.0));
        assert!(!row_on_screen(0, 20, 150.0, 300.0, 100.0));
        assert!(row_on_screen(1, 20, 150.0, 300.0, 100.0));
        // Scrolled near the end: the first rows come around again.
        assert!(row_on_screen(0, 20, 1900.0, 300.0, 100.0));
        assert!(row_on_screen(19, 20, 1900.0, 300.0, 100.0));
        assert!(!row_on_screen(10, 20, 1900.0, 300.0, 100.0));
    }

    #[test]
    fn test_rotation_never_touches_on_screen_slots() {
        let live = notes(30);
        for seed in 0..50 {
            let mut s = PortraitScheduler::new(3, seeded_rng(seed));
            s.sync(&live);
            s.scroll_by(seed as f64 * 137.0);

            let before: Vec<Option<String>> =
                (0..SLOT_COUNT).map(|i| s.assignment(i).map(str::to_string)).collect();
            let changed = s.rotate_offscreen(&live, VIEWPORT);

            for i in 0..SLOT_COUNT {
                if s.slot_on_screen(i, VIEWPORT) {
                    assert_eq!(s.assignment(i).map(str::to_string), before[i]);
                    assert!(!changed.contains(&i));
                }
            }
        }
    }

    #[test]
    fn test_rotation_prefers_unshown_notes() {
        // Far more notes than card slots: every rotated slot gets a note
        // that was not in the grid before.
        let live = notes(200);
        let mut s = PortraitScheduler::new(4, seeded_rng(3));
        s.sync(&live);
        let before: HashSet<String> = (0..SLOT_COUNT)
            .filter_map(|i| s.assignment(i).map(str::to_string))
            .collect();
        let changed = s.rotate_offscreen(&live, VIEWPORT);
        assert!(!changed.is_empty());
        for i in changed {
            assert!(!before.contains(s.assignment(i).unwrap()));
        }
    }

    #[test]
    fn test_wide_card_visible_by_its_lower_rows() {
        let live = notes(100);
        let (mut s, wide) = (0..50)
            .find_map(|seed| {
                let s = PortraitScheduler::new(3, seeded_rng(seed));
                let wide = s
                    .layout()
                    .iter()
                    .position(|slot| slot.kind == SlotKind::Card(CardSize::Wide) && slot.row > 0)?;
                Some((s, wide))
            })
            .unwrap();
        s.sync(&live);

        // One row tall viewport showing only the bottom row of the card.
        let row_height = 100.0;
        let viewport = Viewport {
            height: row_height,
            row_height,
        };
        let bottom = s.layout()[wide].row + 2;
        s.scroll_by(bottom as f64 * row_height);

        assert!(s.slot_on_screen(wide, viewport));
        let before = s.assignment(wide).map(str::to_string);
        let changed = s.rotate_offscreen(&live, viewport);
        assert!(!changed.contains(&wide));
        assert_eq!(s.assignment(wide).map(str::to_string), before);
    }

    #[test]
    fn test_rotation_with_single_note_changes_nothing() {
        let live = notes(1);
        let mut s = PortraitScheduler::new(3, seeded_rng(3));
        s.sync(&live);
        assert!(s.rotate_offscreen(&live, VIEWPORT).is_empty());
    }

    #[test]
    fn test_sync_replaces_departed_notes() {
        let mut live = notes(3);
        let mut s = PortraitScheduler::new(3, seeded_rng(4));
        s.sync(&live);
        live.retain(|n| n.id != "n1");
        s.sync(&live);
        assert!((0..SLOT_COUNT).all(|i| s.assignment(i) != Some("n1")));
        assert!(s.cells(&live).iter().all(|c| c.slot.is_card() == c.note.is_some()));
    }

    // ========================================================================
    // Focus
    // ========================================================================

    #[test]
    fn test_focus_interval() {
        let base = Duration::from_secs(60);
        assert_eq!(focus_interval(base, FocusFrequency::Never), None);
        assert_eq!(focus_interval(base, FocusFrequency::Rare), Some(Duration::from_secs(180)));
        assert_eq!(focus_interval(base, FocusFrequency::Normal), Some(Duration::from_secs(60)));
        assert_eq!(focus_interval(base, FocusFrequency::Frequent), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_single_focus_at_a_time() {
        let live = notes(5);
        let mut s = PortraitScheduler::new(3, seeded_rng(8));
        s.sync(&live);

        let focus = s.begin_focus().unwrap();
        assert!(focus.tilt_deg.abs() <= MAX_FOCUS_TILT_DEG);
        assert!(s.layout()[focus.slot].is_card());
        assert!(s.begin_focus().is_none());

        assert!(s.release_focus());
        assert!(s.begin_focus().is_none(), "no new focus while exiting");
        assert!(s.focus_view(&live).unwrap().exiting);

        s.clear_focus();
        assert!(s.begin_focus().is_some());
    }

    #[test]
    fn test_focus_needs_content() {
        let mut s = PortraitScheduler::new(3, seeded_rng(8));
        s.sync(&[]);
        assert!(s.begin_focus().is_none());
        assert!(!s.release_focus());
    }

    #[test]
    fn test_focus_cleared_when_note_leaves() {
        let live = notes(2);
        let mut s = PortraitScheduler::new(3, seeded_rng(8));
        s.sync(&live);
        let focus = s.begin_focus().unwrap();
        let remaining: Vec<Note> = live.into_iter().filter(|n| n.id != focus.note_id).collect();
        s.sync(&remaining);
        assert_eq!(s.focus(), &FocusPhase::Idle);
    }
}
