//! `deduper.ron` loading.
//!
//! Every field has a default, so a partial file only overrides what it names.
//! Durations are stored as milliseconds.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use deduper_core::{ConvergenceRule, DEFAULT_CHUNK_SIZE, MAX_UNCHANGED_ITERATIONS};
use deduper_engine::{
    AnalysisOptions, BackendSettings, ContentSettings, DiscoverySettings, EngineSettings,
    DEFAULT_WAIT_TIMEOUT,
};
use deduper_logging::deduper_info;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "deduper.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    /// Opened once analysis has started.
    pub app_url: String,
    pub session_cookie: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub upload_chunk_size: usize,
    /// Longest silence from the engine before a command is abandoned.
    pub event_timeout_ms: u64,
    pub wait_timeout_ms: u64,
    pub analysis: AnalysisConfig,
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub resolution: u32,
    pub similarity_threshold: f64,
    pub download_original: bool,
    pub chunk_size: u32,
    pub image_store_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub settle_delay_ms: u64,
    pub navigation_delay_ms: u64,
    pub max_unchanged_iterations: u32,
    pub convergence: ConvergenceRule,
}

impl Default for AppConfig {
    fn default() -> Self {
        let backend = BackendSettings::default();
        Self {
            backend_url: backend.base_url,
            app_url: "http://localhost:3000".to_string(),
            session_cookie: None,
            connect_timeout_ms: millis(backend.connect_timeout),
            request_timeout_ms: millis(backend.request_timeout),
            upload_chunk_size: DEFAULT_CHUNK_SIZE,
            event_timeout_ms: 120_000,
            wait_timeout_ms: millis(DEFAULT_WAIT_TIMEOUT),
            analysis: AnalysisConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let options = AnalysisOptions::default();
        Self {
            resolution: options.resolution,
            similarity_threshold: options.similarity_threshold,
            download_original: options.download_original,
            chunk_size: options.chunk_size,
            image_store_path: options.image_store_path,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let settings = DiscoverySettings::default();
        Self {
            settle_delay_ms: millis(settings.settle_delay),
            navigation_delay_ms: millis(settings.navigation_delay),
            max_unchanged_iterations: MAX_UNCHANGED_ITERATIONS,
            convergence: ConvergenceRule::default(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl AppConfig {
    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                deduper_info!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        let config = ron::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        deduper_info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            backend: BackendSettings {
                base_url: self.backend_url.clone(),
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                session_cookie: self.session_cookie.clone(),
            },
            chunk_size: self.upload_chunk_size,
            analysis: AnalysisOptions {
                resolution: self.analysis.resolution,
                similarity_threshold: self.analysis.similarity_threshold,
                download_original: self.analysis.download_original,
                chunk_size: self.analysis.chunk_size,
                image_store_path: self.analysis.image_store_path.clone(),
            },
        }
    }

    pub fn content_settings(&self) -> ContentSettings {
        ContentSettings {
            discovery: DiscoverySettings {
                settle_delay: Duration::from_millis(self.discovery.settle_delay_ms),
                navigation_delay: Duration::from_millis(self.discovery.navigation_delay_ms),
                max_unchanged_iterations: self.discovery.max_unchanged_iterations,
                convergence: self.discovery.convergence,
                ..DiscoverySettings::default()
            },
            wait_timeout: Duration::from_millis(self.wait_timeout_ms),
            ..ContentSettings::default()
        }
    }

    pub fn event_timeout(&self) -> Duration {
        Duration::from_millis(self.event_timeout_ms)
    }
}
