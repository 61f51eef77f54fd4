//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `SVCNODE_NODE_NAME` and `SVCNODE_LOG_LEVEL` env overrides.

use std::{env, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::AppError;
use crate::logger;

/// Run-loop dispatch settings.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Buffer size of the request queue between adapters and the run loop.
    pub queue_size: usize,
    /// Per-dispatch timeout; `None` lets handlers run to completion.
    pub timeout: Option<Duration>,
}

/// Which reference services the node registers at startup.
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub add_two_ints: bool,
    pub empty_srv: bool,
}

/// Fully-resolved node configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub node_name: String,
    pub log_level: String,
    pub dispatch: DispatchConfig,
    pub services: ServicesConfig,
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    node: RawNode,
    #[serde(default)]
    dispatch: RawDispatch,
    #[serde(default)]
    services: RawServices,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default = "default_node_name")]
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawNode {
    fn default() -> Self {
        Self { name: default_node_name(), log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawDispatch {
    #[serde(default = "default_queue_size")]
    queue_size: usize,
    /// Milliseconds; `0` means no timeout.
    #[serde(default)]
    timeout_ms: u64,
}

impl Default for RawDispatch {
    fn default() -> Self {
        Self { queue_size: default_queue_size(), timeout_ms: 0 }
    }
}

#[derive(Deserialize)]
struct RawServices {
    #[serde(default = "default_true")]
    add_two_ints: bool,
    #[serde(default = "default_true")]
    empty_srv: bool,
}

impl Default for RawServices {
    fn default() -> Self {
        Self { add_two_ints: true, empty_srv: true }
    }
}

fn default_node_name() -> String { "add_two_ints_server".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_queue_size() -> usize { 32 }

fn default_true() -> bool {
    true
}

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let node_name_override = env::var("SVCNODE_NODE_NAME").ok();
    let log_level_override = env::var("SVCNODE_LOG_LEVEL").ok();
    load_from(
        Path::new("config/default.toml"),
        node_name_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    node_name_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let node_name = node_name_override.unwrap_or(&parsed.node.name).to_string();
    if node_name.trim().is_empty() {
        return Err(AppError::Config("node name must not be empty".into()));
    }

    let log_level = log_level_override.unwrap_or(&parsed.node.log_level).to_string();
    logger::parse_directives(&log_level)?;

    if parsed.dispatch.queue_size == 0 {
        return Err(AppError::Config("dispatch.queue_size must be at least 1".into()));
    }

    Ok(Config {
        node_name,
        log_level,
        dispatch: DispatchConfig {
            queue_size: parsed.dispatch.queue_size,
            timeout: match parsed.dispatch.timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        },
        services: ServicesConfig {
            add_two_ints: parsed.services.add_two_ints,
            empty_srv: parsed.services.empty_srv,
        },
    })
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Config for unit tests — both reference services, no dispatch timeout.
#[cfg(test)]
impl Config {
    pub fn test_default() -> Self {
        Self {
            node_name: "test_node".into(),
            log_level: "info".into(),
            dispatch: DispatchConfig { queue_size: 8, timeout: None },
            services: ServicesConfig { add_two_ints: true, empty_srv: true },
        }
    }
}
