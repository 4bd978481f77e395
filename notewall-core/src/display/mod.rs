//! Display-side scheduling
//!
//! - [`LiveFeed`] - accumulates the live set as the display first sees it
//! - [`landscape::LandscapeScheduler`] - bounded FIFO pool of floating notes
//! - [`portrait::PortraitScheduler`] - fixed slot grid with off-screen
//!   rotation and a focus spotlight
//!
//! Schedulers are plain state machines; the timers that drive them live in
//! the server's display runtime.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;

use crate::models::{DisplayMode, Session};

pub mod landscape;
pub mod portrait;

pub use landscape::{LandscapeScheduler, Placement, RotationStep};
pub use portrait::{Focus, FocusPhase, PortraitScheduler, Slot, SlotKind, Viewport};

/// Injectable randomness for placement and layout.
pub type DisplayRng = Box<dyn RngCore + Send>;

pub fn entropy_rng() -> DisplayRng {
    Box::new(StdRng::from_entropy())
}

pub fn seeded_rng(seed: u64) -> DisplayRng {
    Box::new(StdRng::seed_from_u64(seed))
}

/// A live session as the display sees it. The drawing stays opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: String,
    pub recipient: String,
    pub sender: String,
    pub template_theme: String,
    pub drawing_image: String,
    pub created_at: i64,
}

impl From<&Session> for Note {
    fn from(session: &Session) -> Self {
        Self {
            id: session.session_id.clone(),
            recipient: session.recipient().to_string(),
            sender: session.sender().to_string(),
            template_theme: session.input.template_theme.clone(),
            drawing_image: session.input.drawing_image.clone(),
            created_at: session.created_at,
        }
    }
}

/// Lightweight reference carried in frames; renderers resolve the image by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteCaption {
    pub id: String,
    pub recipient: String,
    pub sender: String,
    pub template_theme: String,
}

impl From<&Note> for NoteCaption {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            recipient: note.recipient.clone(),
            sender: note.sender.clone(),
            template_theme: note.template_theme.clone(),
        }
    }
}

/// Notes accumulated by one display since start or the last reset, newest
/// first by first appearance.
#[derive(Debug, Default)]
pub struct LiveFeed {
    notes: Vec<Note>,
    processed: HashSet<String>,
}

impl LiveFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a sessions snapshot. Returns the sessions seen for the first
    /// time; the caller marks those `displaying`. Notes that left the live
    /// set are dropped so a rejected note never stays on screen.
    pub fn ingest<'a>(&mut self, sessions: &'a [Session]) -> Vec<&'a Session> {
        let live: HashMap<&str, &Session> = sessions
            .iter()
            .filter(|s| s.status.is_live())
            .map(|s| (s.session_id.as_str(), s))
            .collect();

        self.notes.retain(|n| live.contains_key(n.id.as_str()));
        self.processed.retain(|id| live.contains_key(id.as_str()));

        for note in self.notes.iter_mut() {
            if let Some(session) = live.get(note.id.as_str()) {
                *note = Note::from(*session);
            }
        }

        let fresh: Vec<&Session> = sessions
            .iter()
            .filter(|s| s.status.is_live() && !self.processed.contains(&s.session_id))
            .collect();
        if fresh.is_empty() {
            return fresh;
        }

        for session in &fresh {
            self.processed.insert(session.session_id.clone());
        }
        let mut notes: Vec<Note> = fresh.iter().map(|s| Note::from(*s)).collect();
        notes.append(&mut self.notes);
        self.notes = notes;
        fresh
    }

    /// Forget everything; the next snapshot repopulates from scratch.
    pub fn reset(&mut self) {
        self.notes.clear();
        self.processed.clear();
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn caption(&self, id: &str) -> Option<NoteCaption> {
        self.notes.iter().find(|n| n.id == id).map(NoteCaption::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandscapeCard {
    pub note: NoteCaption,
    pub placement: Placement,
    pub exiting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortraitCell {
    pub slot: Slot,
    pub note: Option<NoteCaption>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusView {
    pub note: NoteCaption,
    pub slot: usize,
    pub tilt_deg: f64,
    pub exiting: bool,
}

/// What a display shows at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFrame {
    pub mode: DisplayMode,
    pub connected: bool,
    /// No live notes: the renderer shows its idle screen.
    pub idle: bool,
    pub note_count: usize,
    pub landscape: Vec<LandscapeCard>,
    pub portrait: Vec<PortraitCell>,
    pub scroll_offset: f64,
    pub focus: Option<FocusView>,
}

impl Default for DisplayFrame {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Landscape,
            connected: false,
            idle: true,
            note_count: 0,
            landscape: Vec::new(),
            portrait: Vec::new(),
            scroll_offset: 0.0,
            focus: None,
        }
    }
}
