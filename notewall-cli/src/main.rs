//! notewall-cli - operator CLI for the Notewall moderation API
//!
//! Talks to `notewall-server` over HTTP. Everything the host panel can do is
//! available here: review the queue, approve or reject notes, delete with a
//! typed confirmation, restart the displays, and tune display settings.
//!
//! # Subcommands
//! - `status`                                 - server health
//! - `list [--partition <p>]`                 - sessions, grouped by partition
//! - `stats`                                  - partition counts, displayed today
//! - `approve|reject|restore|complete <id>`   - status transitions
//! - `delete <id> --confirm DELETE`           - delete one note forever
//! - `clear --confirm "DELETE ALL"`           - delete every note
//! - `reset --confirm RESET`                  - restart every display
//! - `settings [get]`, `settings set ...`     - display settings
//! - `submit --recipient --sender ...`        - capture a note from a PNG
//! - `seed [-n N] [--live]`                   - write demo notes

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8767";
const PARTITIONS: [&str; 4] = ["pending", "live", "rejected", "complete"];

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "notewall-cli", version, about = "Notewall moderation CLI")]
struct Cli {
    /// Notewall HTTP server URL (overrides NOTEWALL_HTTP_URL env var)
    #[arg(long, env = "NOTEWALL_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show server health
    Status,

    /// List sessions, optionally a single partition
    List {
        /// pending | live | rejected | complete
        #[arg(short, long)]
        partition: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show moderation statistics
    Stats,

    /// Approve a pending note for display
    Approve { id: String },

    /// Reject a note, hiding it from every display
    Reject { id: String },

    /// Move a rejected note back to pending
    Restore { id: String },

    /// Mark a note complete
    Complete { id: String },

    /// Delete a note forever
    Delete {
        id: String,

        /// Type DELETE to confirm
        #[arg(long)]
        confirm: String,
    },

    /// Delete every note
    Clear {
        /// Type "DELETE ALL" to confirm
        #[arg(long)]
        confirm: String,
    },

    /// Restart every display from the current live set
    Reset {
        /// Type RESET to confirm
        #[arg(long)]
        confirm: String,
    },

    /// Show or change display settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Submit a note from a drawing file
    Submit {
        #[arg(long)]
        recipient: String,

        #[arg(long)]
        sender: String,

        /// Template theme, e.g. watercolor or sticky_note
        #[arg(long)]
        theme: Option<String>,

        /// PNG drawing to attach
        #[arg(long)]
        image_file: PathBuf,
    },

    /// Write demo notes (at most 100 per call)
    Seed {
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,

        /// Seed straight into the live set
        #[arg(long)]
        live: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Get,

    /// Change one or more settings
    Set {
        /// landscape | portrait
        #[arg(long)]
        mode: Option<String>,

        /// Seconds between rotations
        #[arg(long)]
        duration: Option<u64>,

        /// slow | medium | fast
        #[arg(long)]
        scroll_speed: Option<String>,

        /// Seconds a focused note stays up
        #[arg(long)]
        zoom: Option<u64>,

        /// Portrait columns, 2 to 4
        #[arg(long)]
        cards_per_row: Option<u8>,

        /// never | rare | normal | frequent
        #[arg(long)]
        focus: Option<String>,
    },
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub template_theme: String,
}

/// One session record as served by `GET /sessions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub status: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub displayed_at: Option<i64>,
    #[serde(rename = "iPad_input")]
    pub input: NoteInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub displayed_today: usize,
    pub pending: usize,
    pub live: usize,
    pub rejected: usize,
    pub complete: usize,
}

// ============================================================================
// Formatting
// ============================================================================

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Coarse relative age: "just now", "5m ago", "3h ago", "2d ago".
pub fn age_label(created_at: i64, now: i64) -> String {
    let secs = (now - created_at).max(0) / 1000;
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// First eight characters of an id, enough to tell notes apart on screen.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

pub fn session_line(session: &SessionSummary, now: i64) -> String {
    let theme = if session.input.template_theme.is_empty() {
        "blank"
    } else {
        session.input.template_theme.as_str()
    };
    let shown = if session.displayed_at.is_some() { " *" } else { "" };
    format!(
        "{:<8}  {:<17}  {} -> {}  [{}, {}]{}",
        short_id(&session.session_id),
        session.status,
        session.input.sender,
        session.input.recipient,
        theme,
        age_label(session.created_at, now),
        shown
    )
}

/// Build the body for `PATCH /settings` from the flags that were given.
pub fn settings_patch(
    mode: Option<String>,
    duration: Option<u64>,
    scroll_speed: Option<String>,
    zoom: Option<u64>,
    cards_per_row: Option<u8>,
    focus: Option<String>,
) -> Option<Value> {
    let mut patch = Map::new();
    if let Some(v) = mode {
        patch.insert("displayMode".to_string(), json!(v));
    }
    if let Some(v) = duration {
        patch.insert("displayDuration".to_string(), json!(v));
    }
    if let Some(v) = scroll_speed {
        patch.insert("scrollSpeed".to_string(), json!(v));
    }
    if let Some(v) = zoom {
        patch.insert("zoomDuration".to_string(), json!(v));
    }
    if let Some(v) = cards_per_row {
        patch.insert("cardsPerRow".to_string(), json!(v));
    }
    if let Some(v) = focus {
        patch.insert("focusFrequency".to_string(), json!(v));
    }
    if patch.is_empty() {
        None
    } else {
        Some(Value::Object(patch))
    }
}

/// Drawings travel as bare base64 PNG data, without a data-URL prefix.
pub fn encode_image(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn print_sessions(sessions: &[SessionSummary], now: i64) {
    if sessions.is_empty() {
        println!("  (none)");
        return;
    }
    for s in sessions {
        println!("  {}", session_line(s, now));
    }
}

fn parse_sessions(value: &Value) -> anyhow::Result<Vec<SessionSummary>> {
    Ok(serde_json::from_value(value.clone())?)
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?)
}

/// Send a request and return the JSON body. Exits on transport errors and
/// non-success statuses, printing the server's error message.
fn call(method: reqwest::Method, url: &str, body: Option<Value>) -> anyhow::Result<Value> {
    let mut req = client()?.request(method, url);
    if let Some(body) = body {
        req = req.json(&body);
    }

    let resp = match req.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("notewall-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let status = resp.status();
    let body: Value = resp.json().unwrap_or_default();
    if !status.is_success() {
        let message = body["error"].as_str().unwrap_or("no details");
        eprintln!("notewall-cli: server returned {}: {}", status, message);
        std::process::exit(1);
    }
    Ok(body)
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = match client()?.get(&url).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("notewall-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let healthy = resp.status().is_success();
    let body: Value = resp.json().unwrap_or_default();
    println!("Notewall server: {}", body["status"].as_str().unwrap_or("unknown"));
    println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
    println!("Store connected: {}", body["connected"].as_bool().unwrap_or(false));
    println!("Socket:          {}", body["socket"].as_str().unwrap_or("?"));
    println!(
        "Display:         {}",
        if body["display"].as_bool().unwrap_or(false) { "in-process" } else { "external" }
    );

    if !healthy {
        std::process::exit(1);
    }
    Ok(())
}

fn do_list(server: &str, partition: Option<String>, raw: bool) -> anyhow::Result<()> {
    let url = match &partition {
        Some(p) => format!("{}/sessions?partition={}", server, p),
        None => format!("{}/sessions", server),
    };
    let body = call(reqwest::Method::GET, &url, None)?;

    if raw {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let now = now_ms();
    match partition {
        Some(p) => {
            let sessions = parse_sessions(&body["sessions"])?;
            println!("{} ({})", p, sessions.len());
            print_sessions(&sessions, now);
        }
        None => {
            for p in PARTITIONS {
                let sessions = parse_sessions(&body[p])?;
                println!("{} ({})", p, sessions.len());
                print_sessions(&sessions, now);
            }
        }
    }
    Ok(())
}

fn do_stats(server: &str) -> anyhow::Result<()> {
    let body = call(reqwest::Method::GET, &format!("{}/stats", server), None)?;
    let stats: Stats = serde_json::from_value(body)?;
    println!("Total:           {}", stats.total);
    println!("Pending:         {}", stats.pending);
    println!("Live:            {}", stats.live);
    println!("Rejected:        {}", stats.rejected);
    println!("Complete:        {}", stats.complete);
    println!("Displayed today: {}", stats.displayed_today);
    Ok(())
}

fn do_transition(server: &str, id: &str, action: &str) -> anyhow::Result<()> {
    let url = format!("{}/sessions/{}/{}", server, id, action);
    let body = call(reqwest::Method::POST, &url, None)?;
    if body["updated"].as_bool().unwrap_or(false) {
        println!("{}: {}", action, id);
    } else {
        println!("{}: {} unchanged", action, id);
    }
    Ok(())
}

fn do_delete(server: &str, id: &str, confirm: String) -> anyhow::Result<()> {
    let url = format!("{}/sessions/{}", server, id);
    call(reqwest::Method::DELETE, &url, Some(json!({ "confirmation": confirm })))?;
    println!("Deleted {}", id);
    Ok(())
}

fn do_clear(server: &str, confirm: String) -> anyhow::Result<()> {
    let url = format!("{}/sessions/clear", server);
    let body = call(reqwest::Method::POST, &url, Some(json!({ "confirmation": confirm })))?;
    println!("Deleted {} notes", body["deleted"].as_u64().unwrap_or(0));
    Ok(())
}

fn do_reset(server: &str, confirm: String) -> anyhow::Result<()> {
    let url = format!("{}/slideshow/reset", server);
    let body = call(reqwest::Method::POST, &url, Some(json!({ "confirmation": confirm })))?;
    println!(
        "Reset sent to {} display(s)",
        body["receivers"].as_u64().unwrap_or(0)
    );
    Ok(())
}

fn do_settings(server: &str, action: Option<SettingsAction>) -> anyhow::Result<()> {
    let url = format!("{}/settings", server);
    let body = match action {
        None | Some(SettingsAction::Get) => call(reqwest::Method::GET, &url, None)?,
        Some(SettingsAction::Set {
            mode,
            duration,
            scroll_speed,
            zoom,
            cards_per_row,
            focus,
        }) => {
            let Some(patch) = settings_patch(mode, duration, scroll_speed, zoom, cards_per_row, focus) else {
                eprintln!("notewall-cli: settings set needs at least one option");
                std::process::exit(2);
            };
            call(reqwest::Method::PATCH, &url, Some(patch))?
        }
    };
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn do_submit(
    server: &str,
    recipient: String,
    sender: String,
    theme: Option<String>,
    image_file: &Path,
) -> anyhow::Result<()> {
    let bytes = match std::fs::read(image_file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("notewall-cli: cannot read {}: {}", image_file.display(), e);
            std::process::exit(1);
        }
    };
    let submission = json!({
        "recipient": recipient,
        "sender": sender,
        "drawingImage": encode_image(&bytes),
        "templateTheme": theme,
    });
    let body = call(reqwest::Method::POST, &format!("{}/sessions", server), Some(submission))?;
    println!("Submitted {}", body["sessionId"].as_str().unwrap_or("?"));
    Ok(())
}

fn do_seed(server: &str, count: usize, live: bool) -> anyhow::Result<()> {
    let url = format!("{}/sessions/seed", server);
    let body = call(reqwest::Method::POST, &url, Some(json!({ "count": count, "live": live })))?;
    println!(
        "Seeded {} {} notes",
        body["seeded"].as_u64().unwrap_or(0),
        if live { "live" } else { "pending" }
    );
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Status => do_status(&server),
        Commands::List { partition, json } => do_list(&server, partition, json),
        Commands::Stats => do_stats(&server),
        Commands::Approve { id } => do_transition(&server, &id, "approve"),
        Commands::Reject { id } => do_transition(&server, &id, "reject"),
        Commands::Restore { id } => do_transition(&server, &id, "restore"),
        Commands::Complete { id } => do_transition(&server, &id, "complete"),
        Commands::Delete { id, confirm } => do_delete(&server, &id, confirm),
        Commands::Clear { confirm } => do_clear(&server, confirm),
        Commands::Reset { confirm } => do_reset(&server, confirm),
        Commands::Settings { action } => do_settings(&server, action),
        Commands::Submit {
            recipient,
            sender,
            theme,
            image_file,
        } => do_submit(&server, recipient, sender, theme, &image_file),
        Commands::Seed { count, live } => do_seed(&server, count, live),
    };

    if let Err(e) = result {
        eprintln!("notewall-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
