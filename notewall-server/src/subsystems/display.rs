//! Display runtime
//!
//! Follows the store like a wall display would: keeps the live feed, marks
//! newly seen notes `displaying`, and drives the active scheduler from timers
//! whose cadence comes from the display settings. Every state change is
//! published as a [`DisplayFrame`] on a watch channel.
//!
//! Timers are owned by the run loop. Any settings change that governs a
//! cadence rebuilds the affected timer, so an old cadence never keeps firing
//! next to a new one.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use notewall_core::config::DisplayRuntimeConfig;
use notewall_core::display::portrait::focus_interval;
use notewall_core::display::{
    entropy_rng, DisplayFrame, DisplayRng, LandscapeScheduler, LiveFeed, PortraitScheduler,
    RotationStep, Viewport,
};
use notewall_core::lifecycle::{self, Transition};
use notewall_core::models::{decode_sessions, DisplayMode, DisplaySettings, Session};
use notewall_core::store::{SESSIONS_PATH, SETTINGS_PATH};
use notewall_core::{DisplaySignal, SessionStore, SignalBus};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

/// Nominal animation frame the scroll speeds are expressed against.
const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;

/// Upper bound on any single timer, whatever the config or store holds.
const MAX_TIMER: Duration = Duration::from_secs(24 * 60 * 60);

pub struct DisplayRuntime {
    store: Arc<dyn SessionStore>,
    signals: SignalBus,
    config: DisplayRuntimeConfig,
    frames: watch::Sender<DisplayFrame>,
    feed: LiveFeed,
    settings: DisplaySettings,
    connected: bool,
    landscape: LandscapeScheduler,
    portrait: PortraitScheduler,
    /// Last sessions snapshot, replayed after a reset.
    last_sessions: Value,
}

struct Timers {
    rotation: Interval,
    frame: Interval,
    focus: Option<Interval>,
    exit_done: Option<Instant>,
    focus_release: Option<Instant>,
    focus_clear: Option<Instant>,
}

fn periodic(period: Duration) -> Interval {
    let period = period.clamp(Duration::from_millis(1), MAX_TIMER);
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

fn deadline(after: Duration) -> Instant {
    Instant::now() + after.min(MAX_TIMER)
}

async fn tick_opt(timer: &mut Option<Interval>) {
    match timer {
        Some(t) => {
            t.tick().await;
        }
        None => pending::<()>().await,
    }
}

async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => sleep_until(d).await,
        None => pending::<()>().await,
    }
}

async fn mark_displaying(store: &dyn SessionStore, session: &Session) {
    let now = Utc::now().timestamp_millis();
    let Some(write) = lifecycle::plan(Transition::MarkDisplaying, Some(session), now) else {
        return;
    };
    if let Err(e) = lifecycle::apply(store, &write).await {
        tracing::warn!(session_id = %session.session_id, "Failed to mark displaying: {}", e);
    }
}

impl DisplayRuntime {
    pub fn new(
        store: Arc<dyn SessionStore>,
        signals: SignalBus,
        config: DisplayRuntimeConfig,
    ) -> (Self, watch::Receiver<DisplayFrame>) {
        Self::with_rngs(store, signals, config, entropy_rng(), entropy_rng())
    }

    /// Same as [`DisplayRuntime::new`] with explicit randomness for the
    /// landscape and portrait schedulers.
    pub fn with_rngs(
        store: Arc<dyn SessionStore>,
        signals: SignalBus,
        config: DisplayRuntimeConfig,
        landscape_rng: DisplayRng,
        portrait_rng: DisplayRng,
    ) -> (Self, watch::Receiver<DisplayFrame>) {
        let settings = DisplaySettings::default();
        let (frames, rx) = watch::channel(DisplayFrame::default());
        let runtime = Self {
            landscape: LandscapeScheduler::new(config.landscape_capacity, landscape_rng),
            portrait: PortraitScheduler::new(settings.grid_columns(), portrait_rng),
            store,
            signals,
            config,
            frames,
            feed: LiveFeed::new(),
            settings,
            connected: false,
            last_sessions: Value::Null,
        };
        (runtime, rx)
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let mut sessions = self.store.subscribe(SESSIONS_PATH).await?;
        let mut settings = self.store.subscribe(SETTINGS_PATH).await?;
        let mut connectivity = self.store.connectivity();
        let mut signal_rx = self.signals.subscribe();
        let mut signals_open = true;

        self.connected = *connectivity.borrow_and_update();
        let mut timers = self.build_timers();
        self.publish();
        tracing::info!(mode = ?self.settings.display_mode, "Display runtime started");

        loop {
            let portrait = self.settings.display_mode == DisplayMode::Portrait;
            let scrolling = portrait && !self.feed.is_empty();

            tokio::select! {
                snapshot = sessions.next() => {
                    let Some(snapshot) = snapshot else {
                        tracing::warn!("Sessions feed closed, stopping display");
                        break;
                    };
                    self.on_sessions(snapshot).await;
                }
                snapshot = settings.next() => {
                    let Some(snapshot) = snapshot else {
                        tracing::warn!("Settings feed closed, stopping display");
                        break;
                    };
                    let next = DisplaySettings::from_snapshot(&snapshot);
                    self.on_settings(next, &mut timers);
                }
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.connected = *connectivity.borrow_and_update();
                    if !self.connected {
                        tracing::warn!("Display lost its store connection");
                    }
                }
                signal = signal_rx.recv(), if signals_open => match signal {
                    Ok(DisplaySignal::ResetSlideshow) | Ok(DisplaySignal::ClearNotes) => {
                        self.on_reset(&mut timers).await;
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Display missed signals, resetting");
                        self.on_reset(&mut timers).await;
                    }
                    Err(RecvError::Closed) => signals_open = false,
                },
                _ = timers.rotation.tick() => {
                    self.on_rotation(&mut timers);
                }
                _ = sleep_opt(timers.exit_done), if timers.exit_done.is_some() => {
                    timers.exit_done = None;
                    if let Some(id) = self.landscape.complete_exit(self.feed.notes()) {
                        tracing::debug!(note = %id, "Landscape note entered");
                    }
                }
                _ = timers.frame.tick(), if scrolling => {
                    let pixels = self.settings.scroll_speed.pixels_per_frame()
                        * self.config.frame_interval_ms as f64
                        / NOMINAL_FRAME_MS;
                    self.portrait.scroll_by(pixels);
                }
                _ = tick_opt(&mut timers.focus), if portrait && timers.focus.is_some() => {
                    if let Some(focus) = self.portrait.begin_focus() {
                        tracing::debug!(note = %focus.note_id, slot = focus.slot, "Focus started");
                        timers.focus_release = Some(deadline(self.settings.zoom_hold()));
                    }
                }
                _ = sleep_opt(timers.focus_release), if timers.focus_release.is_some() => {
                    timers.focus_release = None;
                    if self.portrait.release_focus() {
                        timers.focus_clear = Some(deadline(Duration::from_millis(self.config.focus_exit_ms)));
                    }
                }
                _ = sleep_opt(timers.focus_clear), if timers.focus_clear.is_some() => {
                    timers.focus_clear = None;
                    self.portrait.clear_focus();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Display runtime shutting down");
                    break;
                }
            }

            self.publish();
        }

        Ok(())
    }

    fn build_timers(&self) -> Timers {
        Timers {
            rotation: periodic(self.settings.rotation_period()),
            frame: periodic(Duration::from_millis(self.config.frame_interval_ms)),
            focus: self.focus_timer(),
            exit_done: None,
            focus_release: None,
            focus_clear: None,
        }
    }

    fn focus_timer(&self) -> Option<Interval> {
        let base = Duration::from_secs(self.config.focus_base_seconds).min(MAX_TIMER);
        focus_interval(base, self.settings.focus_frequency).map(periodic)
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            height: self.config.viewport_height,
            row_height: self.config.row_height,
        }
    }

    async fn on_sessions(&mut self, snapshot: Value) {
        let sessions = decode_sessions(&snapshot);
        let fresh: Vec<Session> = self.feed.ingest(&sessions).into_iter().cloned().collect();
        self.last_sessions = snapshot;

        for session in &fresh {
            mark_displaying(self.store.as_ref(), session).await;
        }

        let notes = self.feed.notes();
        self.landscape.sync(notes);
        self.portrait.sync(notes);
        if !fresh.is_empty() {
            tracing::info!(new = fresh.len(), total = notes.len(), "Live set updated");
        }
    }

    fn on_settings(&mut self, next: DisplaySettings, timers: &mut Timers) {
        let previous = std::mem::replace(&mut self.settings, next);
        let current = &self.settings;

        // A single push may carry both a mode and a grid width change.
        if self.portrait.columns() != current.grid_columns() {
            self.portrait.set_columns(current.grid_columns(), self.feed.notes());
            timers.focus_release = None;
            timers.focus_clear = None;
        }

        if previous.display_mode != current.display_mode {
            tracing::info!(from = ?previous.display_mode, to = ?current.display_mode, "Display mode changed");
            self.landscape.reset();
            self.portrait.reset();
            self.landscape.sync(self.feed.notes());
            self.portrait.sync(self.feed.notes());
            *timers = self.build_timers();
            return;
        }

        if previous.rotation_period() != current.rotation_period() {
            timers.rotation = periodic(current.rotation_period());
        }
        if previous.focus_frequency != current.focus_frequency {
            timers.focus = self.focus_timer();
        }
    }

    async fn on_reset(&mut self, timers: &mut Timers) {
        tracing::info!(discarded = self.feed.len(), "Slideshow reset");
        self.feed.reset();
        self.landscape.reset();
        self.portrait.reset();
        *timers = self.build_timers();

        // Restart from the current live set.
        let snapshot = self.last_sessions.clone();
        self.on_sessions(snapshot).await;
    }

    fn on_rotation(&mut self, timers: &mut Timers) {
        let viewport = self.viewport();
        let notes = self.feed.notes();
        match self.settings.display_mode {
            DisplayMode::Landscape => {
                if let RotationStep::Exiting(id) = self.landscape.tick(notes) {
                    tracing::debug!(note = %id, "Landscape note exiting");
                    timers.exit_done = Some(deadline(Duration::from_millis(self.config.exit_animation_ms)));
                }
            }
            DisplayMode::Portrait => {
                let changed = self.portrait.rotate_offscreen(notes, viewport);
                if !changed.is_empty() {
                    tracing::debug!(slots = changed.len(), "Rotated off-screen slots");
                }
            }
        }
    }

    fn frame(&self) -> DisplayFrame {
        let notes = self.feed.notes();
        let mode = self.settings.display_mode;
        let (landscape, portrait, focus) = match mode {
            DisplayMode::Landscape => (self.landscape.cards(notes), Vec::new(), None),
            DisplayMode::Portrait => (
                Vec::new(),
                self.portrait.cells(notes),
                self.portrait.focus_view(notes),
            ),
        };
        DisplayFrame {
            mode,
            connected: self.connected,
            idle: notes.is_empty(),
            note_count: notes.len(),
            landscape,
            portrait,
            scroll_offset: self.portrait.scroll_offset(),
            focus,
        }
    }

    fn publish(&self) {
        self.frames.send_replace(self.frame());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notewall_core::display::seeded_rng;
    use notewall_core::models::{CaptureInput, SessionStatus};
    use notewall_core::MemoryStore;
    use serde_json::json;

    fn record(id: &str, status: SessionStatus, created_at: i64) -> Value {
        serde_json::to_value(Session {
            session_id: id.to_string(),
            status,
            created_at,
            displayed_at: None,
            expires_at: created_at + 3_600_000,
            input: CaptureInput {
                recipient: format!("to-{}", id),
                sender: "Mike".to_string(),
                drawing_image: "iVBORw0KGgo=".to_string(),
                ..CaptureInput::default()
            },
        })
        .unwrap()
    }

    async fn seed(store: &MemoryStore, n: usize, status: SessionStatus) {
        for i in 0..n {
            let id = format!("n{}", i);
            store
                .write(&format!("sessions/{}", id), record(&id, status, i as i64))
                .await
                .unwrap();
        }
    }

    fn start(
        store: &MemoryStore,
        signals: &SignalBus,
    ) -> (watch::Receiver<DisplayFrame>, broadcast::Sender<()>) {
        start_with(store, signals, DisplayRuntimeConfig::default())
    }

    fn start_with(
        store: &MemoryStore,
        signals: &SignalBus,
        config: DisplayRuntimeConfig,
    ) -> (watch::Receiver<DisplayFrame>, broadcast::Sender<()>) {
        let (runtime, frames) = DisplayRuntime::with_rngs(
            Arc::new(store.clone()),
            signals.clone(),
            config,
            seeded_rng(1),
            seeded_rng(2),
        );
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(runtime.run(shutdown_rx));
        (frames, shutdown_tx)
    }

    /// Paused-clock config: short focus base, slow frame timer.
    fn paused_config(landscape_capacity: usize) -> DisplayRuntimeConfig {
        DisplayRuntimeConfig {
            landscape_capacity,
            frame_interval_ms: 250,
            focus_base_seconds: 10,
            ..DisplayRuntimeConfig::default()
        }
    }

    /// Let the runtime drain whatever the clock just made ready.
    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    /// Sleep on the paused clock; timers due on the way fire in order.
    async fn elapse(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        settle().await;
    }

    fn card_ids(frame: &DisplayFrame) -> Vec<String> {
        frame.landscape.iter().map(|c| c.note.id.clone()).collect()
    }

    async fn wait_frame<F>(frames: &mut watch::Receiver<DisplayFrame>, f: F) -> DisplayFrame
    where
        F: FnMut(&DisplayFrame) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(3), frames.wait_for(f))
            .await
            .expect("frame did not arrive in time")
            .expect("runtime stopped")
            .clone()
    }

    // ========================================================================
    // TEST 1: live notes are shown and marked displaying
    // ========================================================================

    #[tokio::test]
    async fn test_live_notes_shown_and_marked_displaying() {
        let store = MemoryStore::new();
        seed(&store, 3, SessionStatus::ReadyForDisplay).await;
        store
            .write("sessions/p", record("p", SessionStatus::Pending, 10))
            .await
            .unwrap();

        let signals = SignalBus::new();
        let (mut frames, shutdown) = start(&store, &signals);
        let frame = wait_frame(&mut frames, |f| f.landscape.len() == 3).await;
        assert!(!frame.idle);
        assert!(frame.landscape.iter().all(|c| c.note.id != "p"));

        for _ in 0..50 {
            let sessions = decode_sessions(&store.get("sessions").await.unwrap());
            let done = sessions
                .iter()
                .filter(|s| s.session_id != "p")
                .all(|s| s.status == SessionStatus::Displaying && s.displayed_at.is_some());
            if done {
                let pending = sessions.iter().find(|s| s.session_id == "p").unwrap();
                assert_eq!(pending.status, SessionStatus::Pending);
                let _ = shutdown.send(());
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("live notes were not marked displaying");
    }

    // ========================================================================
    // TEST 2: a rejected note leaves the frame
    // ========================================================================

    #[tokio::test]
    async fn test_rejected_note_leaves_frame() {
        let store = MemoryStore::new();
        seed(&store, 3, SessionStatus::Displaying).await;
        let signals = SignalBus::new();
        let (mut frames, shutdown) = start(&store, &signals);
        wait_frame(&mut frames, |f| f.note_count == 3).await;

        let mut fields = serde_json::Map::new();
        fields.insert("status".to_string(), json!("rejected"));
        store.patch("sessions/n1", fields).await.unwrap();

        let frame = wait_frame(&mut frames, |f| f.note_count == 2).await;
        assert!(frame.landscape.iter().all(|c| c.note.id != "n1"));
        let _ = shutdown.send(());
    }

    // ========================================================================
    // TEST 3: reset restarts from the current live set
    // ========================================================================

    #[tokio::test]
    async fn test_reset_restarts_from_current_live_set() {
        let store = MemoryStore::new();
        seed(&store, 5, SessionStatus::Displaying).await;
        let signals = SignalBus::new();
        let (mut frames, shutdown) = start(&store, &signals);
        let before = wait_frame(&mut frames, |f| f.note_count == 5).await;

        // Give the runtime a moment to subscribe to signals.
        let mut delivered = 0;
        for _ in 0..50 {
            delivered = signals.publish(DisplaySignal::ResetSlideshow);
            if delivered > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(delivered, 1);

        let after = wait_frame(&mut frames, |f| {
            f.note_count == 5
                && f.landscape.len() == 5
                && f.landscape.iter().map(|c| c.placement).ne(before.landscape.iter().map(|c| c.placement))
        })
        .await;
        assert!(!after.idle);
        let _ = shutdown.send(());
    }

    // ========================================================================
    // TEST 4: portrait mode from the first settings snapshot
    // ========================================================================

    #[tokio::test]
    async fn test_portrait_mode_scrolls() {
        let store = MemoryStore::new();
        seed(&store, 4, SessionStatus::Displaying).await;
        store
            .write("displaySettings", json!({"displayMode": "portrait", "cardsPerRow": 2}))
            .await
            .unwrap();

        let signals = SignalBus::new();
        let (mut frames, shutdown) = start(&store, &signals);
        let frame = wait_frame(&mut frames, |f| f.mode == DisplayMode::Portrait && f.note_count == 4).await;
        assert_eq!(frame.portrait.len(), notewall_core::display::portrait::SLOT_COUNT);
        assert!(frame.landscape.is_empty());
        assert!(frame
            .portrait
            .iter()
            .all(|cell| cell.slot.column + cell.slot.col_span <= 2));

        wait_frame(&mut frames, |f| f.scroll_offset > 0.0).await;
        let _ = shutdown.send(());
    }

    // ========================================================================
    // TEST 5: a push changing mode and grid width together applies both
    // ========================================================================

    #[tokio::test]
    async fn test_mode_and_width_change_in_one_push() {
        let store = MemoryStore::new();
        seed(&store, 4, SessionStatus::Displaying).await;
        let signals = SignalBus::new();
        let (mut frames, shutdown) = start(&store, &signals);
        wait_frame(&mut frames, |f| f.note_count == 4 && f.landscape.len() == 4).await;

        store
            .write("displaySettings", json!({"displayMode": "portrait", "cardsPerRow": 4}))
            .await
            .unwrap();
        let frame = wait_frame(&mut frames, |f| f.mode == DisplayMode::Portrait).await;
        assert!(frame.portrait.iter().all(|cell| cell.slot.column + cell.slot.col_span <= 4));
        assert!(
            frame.portrait.iter().any(|cell| cell.slot.column + cell.slot.col_span == 4),
            "layout still three columns wide"
        );
        let _ = shutdown.send(());
    }

    // ========================================================================
    // TEST 6: paused clock - landscape exit then replace
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_exit_then_replace_cadence() {
        let store = MemoryStore::new();
        seed(&store, 3, SessionStatus::Displaying).await;
        let signals = SignalBus::new();
        let (frames, shutdown) = start_with(&store, &signals, paused_config(2));
        settle().await;

        let initial = card_ids(&frames.borrow());
        assert_eq!(initial.len(), 2);
        let incoming = ["n0", "n1", "n2"]
            .into_iter()
            .find(|id| !initial.iter().any(|i| i == id))
            .unwrap();

        // Default displayDuration is 12s.
        elapse(12_001).await;
        let frame = frames.borrow().clone();
        assert_eq!(card_ids(&frame), initial);
        assert!(frame.landscape[0].exiting);
        assert!(!frame.landscape[1].exiting);

        elapse(598).await;
        assert!(frames.borrow().landscape[0].exiting, "exit finished early");

        elapse(2).await;
        let frame = frames.borrow().clone();
        assert!(frame.landscape.iter().all(|c| !c.exiting));
        assert_eq!(card_ids(&frame), vec![initial[1].clone(), incoming.to_string()]);
        let _ = shutdown.send(());
    }

    // ========================================================================
    // TEST 7: paused clock - focus hold, exit, clear
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_focus_hold_exit_clear() {
        let store = MemoryStore::new();
        seed(&store, 6, SessionStatus::Displaying).await;
        store
            .write(
                "displaySettings",
                json!({"displayMode": "portrait", "displayDuration": 30, "zoomDuration": 3}),
            )
            .await
            .unwrap();
        let signals = SignalBus::new();
        let (frames, shutdown) = start_with(&store, &signals, paused_config(12));
        settle().await;
        assert_eq!(frames.borrow().mode, DisplayMode::Portrait);
        assert!(frames.borrow().focus.is_none());

        elapse(10_001).await;
        let focus = frames.borrow().focus.clone().expect("focus did not start");
        assert!(!focus.exiting);

        elapse(2_998).await;
        assert_eq!(frames.borrow().focus.as_ref().map(|f| f.exiting), Some(false));

        elapse(2).await;
        let exiting = frames.borrow().focus.clone().expect("focus cleared before exit");
        assert!(exiting.exiting);
        assert_eq!(exiting.slot, focus.slot);

        // focus_exit_ms defaults to 600.
        elapse(598).await;
        assert!(frames.borrow().focus.is_some());
        elapse(2).await;
        assert!(frames.borrow().focus.is_none());
        let _ = shutdown.send(());
    }

    // ========================================================================
    // TEST 8: paused clock - cadence changes replace the old timers
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_display_duration_change_rebuilds_rotation() {
        let store = MemoryStore::new();
        seed(&store, 2, SessionStatus::Displaying).await;
        let signals = SignalBus::new();
        let (frames, shutdown) = start_with(&store, &signals, paused_config(1));
        settle().await;
        assert_eq!(frames.borrow().landscape.len(), 1);

        elapse(5_000).await;
        store
            .write("displaySettings", json!({"displayDuration": 30}))
            .await
            .unwrap();
        settle().await;

        // The old 12s cadence would have fired here.
        elapse(7_001).await;
        assert!(frames.borrow().landscape.iter().all(|c| !c.exiting));

        elapse(22_998).await;
        assert!(frames.borrow().landscape.iter().all(|c| !c.exiting));

        elapse(2).await;
        assert!(frames.borrow().landscape[0].exiting, "new cadence did not fire");
        let _ = shutdown.send(());
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_frequency_change_rebuilds_focus_timer() {
        let store = MemoryStore::new();
        seed(&store, 6, SessionStatus::Displaying).await;
        store
            .write("displaySettings", json!({"displayMode": "portrait", "displayDuration": 30}))
            .await
            .unwrap();
        let signals = SignalBus::new();
        let (frames, shutdown) = start_with(&store, &signals, paused_config(12));
        settle().await;

        elapse(2_000).await;
        store
            .write(
                "displaySettings",
                json!({"displayMode": "portrait", "displayDuration": 30, "focusFrequency": "rare"}),
            )
            .await
            .unwrap();
        settle().await;

        // Normal would have fired at 10s; rare is 3x the base from the change.
        elapse(8_001).await;
        assert!(frames.borrow().focus.is_none());
        elapse(21_998).await;
        assert!(frames.borrow().focus.is_none());
        elapse(2).await;
        assert!(frames.borrow().focus.is_some(), "rare cadence did not fire");
        let _ = shutdown.send(());
    }

    // ========================================================================
    // TEST 9: out-of-range durations written straight to the store
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_unvalidated_zoom_duration_is_clamped() {
        let store = MemoryStore::new();
        seed(&store, 6, SessionStatus::Displaying).await;
        store
            .write(
                "displaySettings",
                json!({"displayMode": "portrait", "displayDuration": u64::MAX, "zoomDuration": u64::MAX}),
            )
            .await
            .unwrap();
        let signals = SignalBus::new();
        let (frames, shutdown) = start_with(&store, &signals, paused_config(12));
        settle().await;

        elapse(10_001).await;
        assert_eq!(frames.borrow().focus.as_ref().map(|f| f.exiting), Some(false));

        // Held for the 60s ceiling, not forever.
        elapse(60_000).await;
        assert_eq!(frames.borrow().focus.as_ref().map(|f| f.exiting), Some(true));
        assert_eq!(shutdown.receiver_count(), 1, "runtime stopped");
        let _ = shutdown.send(());
    }
}
