//! Project layout and runtime settings.
//!
//! The source and output layout is fixed relative to a project root; only the
//! root itself, the dev server port and the watch debounce window can change.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default port for the dev server.
pub const DEFAULT_PORT: u16 = 3000;

/// Default window in which change events for one source kind are coalesced.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Source and output directories of a site, all derived from one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ============================================================
    // Source tree
    // ============================================================

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("src").join("pug")
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.root.join("src").join("stylus")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("src").join("img")
    }

    /// Images under this directory are never optimized into the output.
    pub fn sprite_dir(&self) -> PathBuf {
        self.images_dir().join("svg-sprite")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join("src").join("js")
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.root.join("src").join("fonts")
    }

    // ============================================================
    // Output tree
    // ============================================================

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    pub fn stylesheet_output(&self) -> PathBuf {
        self.output_dir().join("css").join("style.min.css")
    }

    pub fn script_output(&self) -> PathBuf {
        self.output_dir().join("js").join("scripts.min.js")
    }

    pub fn images_output_dir(&self) -> PathBuf {
        self.output_dir().join("img")
    }

    pub fn fonts_output_dir(&self) -> PathBuf {
        self.output_dir().join("fonts")
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Dev server settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    /// Loopback address the server binds to. Port `0` picks a free port.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// Source watch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Events for one source kind arriving within this window trigger a single
    /// re-run. `Duration::ZERO` re-runs on every event.
    pub debounce: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Everything a [`crate::Site`] needs to run any target.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: Layout,
    pub server: ServerConfig,
    pub watch: WatchConfig,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: Layout::new(root),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.watch.debounce = debounce;
        self
    }
}
