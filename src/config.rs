/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Minimum time without a frame before the hand counts as gone.
const FEED_STALE_MS: u64 = 500;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub engine: EngineConfig,
    pub gesture: GestureConfig,
    pub display: DisplayConfig,
    pub landmarks: LandmarkConfig,
    pub log_file: PathBuf,
    pub log_filter: String,
    pub frame_sleep_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum gap between two accepted moves, shared by all inputs.
    pub move_cooldown_ms: u64,
    /// Fixed RNG seed for reproducible games; entropy when absent.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Thumb-to-index distance (normalized units) below which we call it a pinch.
    pub pinch_threshold: f32,
    pub swipe_threshold_px: f32,
    pub swipe_time_limit_ms: u64,
    /// Padding around the board where the cursor is still shown.
    pub bounds_padding_px: f32,
    pub cursor_margin_px: f32,
}

/// Virtual screen the palm position is projected onto.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub screen_width: f32,
    pub screen_height: f32,
    pub board_size_px: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LandmarkSourceKind {
    None,
    Udp(SocketAddr),
    Replay(PathBuf),
}

#[derive(Clone, Debug)]
pub struct LandmarkConfig {
    pub source: LandmarkSourceKind,
    pub replay_frame_ms: u64,
    pub replay_loop: bool,
}

impl LandmarkConfig {
    /// No frame for this long reads as "no hand". Spans at least two
    /// replay frames.
    pub fn stale_after_ms(&self) -> u64 {
        FEED_STALE_MS.max(self.replay_frame_ms.saturating_mul(2))
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    gesture: GestureConfig,
    #[serde(default)]
    display: DisplayConfig,
    #[serde(default)]
    landmarks: TomlLandmarks,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlLandmarks {
    #[serde(default = "default_source")]
    source: String,
    #[serde(default = "default_udp_bind")]
    udp_bind: String,
    #[serde(default = "default_replay_file")]
    replay_file: String,
    #[serde(default = "default_replay_frame")]
    replay_frame_ms: u64,
    #[serde(default)]
    replay_loop: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_filter")]
    log_filter: String,
    #[serde(default = "default_frame_sleep")]
    frame_sleep_ms: u64,
}

// ── Defaults ──

fn default_source() -> String { "udp".into() }
fn default_udp_bind() -> String { "127.0.0.1:5005".into() }
fn default_replay_file() -> String { "hand.jsonl".into() }
fn default_replay_frame() -> u64 { 33 }     // ~30 fps camera
fn default_log_file() -> String { "pinch2048.log".into() }
fn default_log_filter() -> String { "pinch2048=info".into() }
fn default_frame_sleep() -> u64 { 5 }

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { move_cooldown_ms: 300, seed: None }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            pinch_threshold: 0.08,
            swipe_threshold_px: 80.0,
            swipe_time_limit_ms: 700,
            bounds_padding_px: 80.0,
            cursor_margin_px: 25.0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig { screen_width: 1280.0, screen_height: 720.0, board_size_px: 500.0 }
    }
}

impl DisplayConfig {
    fn is_valid(&self) -> bool {
        [self.screen_width, self.screen_height, self.board_size_px]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

impl Default for TomlLandmarks {
    fn default() -> Self {
        TomlLandmarks {
            source: default_source(),
            udp_bind: default_udp_bind(),
            replay_file: default_replay_file(),
            replay_frame_ms: default_replay_frame(),
            replay_loop: false,
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            log_file: default_log_file(),
            log_filter: default_log_filter(),
            frame_sleep_ms: default_frame_sleep(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    ///
    /// Runs before logging is set up, so problems are returned as warnings
    /// for the caller to log.
    pub fn load() -> (Self, Vec<String>) {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        let cfg = GameConfig::from_toml(toml_cfg, &search_dirs, &mut warnings);
        (cfg, warnings)
    }

    fn from_toml(t: TomlConfig, search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> Self {
        let source = match t.landmarks.source.to_lowercase().as_str() {
            "none" | "off" | "keyboard" => LandmarkSourceKind::None,
            "replay" => LandmarkSourceKind::Replay(resolve_path(&t.landmarks.replay_file, search_dirs)),
            "udp" => match t.landmarks.udp_bind.parse() {
                Ok(addr) => LandmarkSourceKind::Udp(addr),
                Err(e) => {
                    warnings.push(format!("invalid udp_bind {:?}: {e}; hand input disabled", t.landmarks.udp_bind));
                    LandmarkSourceKind::None
                }
            },
            other => {
                warnings.push(format!("unknown landmark source {other:?}; hand input disabled"));
                LandmarkSourceKind::None
            }
        };

        let display = if t.display.is_valid() {
            t.display
        } else {
            warnings.push(format!(
                "display sizes must be positive (got {}x{}, board {}); using defaults",
                t.display.screen_width, t.display.screen_height, t.display.board_size_px,
            ));
            DisplayConfig::default()
        };

        GameConfig {
            engine: t.engine,
            gesture: t.gesture,
            display,
            landmarks: LandmarkConfig {
                source,
                replay_frame_ms: t.landmarks.replay_frame_ms.max(1),
                replay_loop: t.landmarks.replay_loop,
            },
            log_file: PathBuf::from(&t.general.log_file),
            log_filter: t.general.log_filter,
            frame_sleep_ms: t.general.frame_sleep_ms,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[], &mut vec![])
    }
}

/// Absolute paths pass through; relative ones are looked up in the
/// candidate dirs and otherwise left relative to the CWD.
fn resolve_path(s: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let p = PathBuf::from(s);
    if p.is_absolute() {
        return p;
    }
    search_dirs.iter()
        .map(|d| d.join(s))
        .find(|c| c.is_file())
        .unwrap_or(p)
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so /usr/bin/pinch2048 → /opt/pinch2048/pinch2048
        // still finds data relative to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/pinch2048)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/pinch2048");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warnings.push(format!("config.toml parse error: {e}; using default settings"));
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}
