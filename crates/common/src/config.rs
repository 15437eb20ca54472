//! Planner, cache and pre-warm configuration.
//!
//! Resolution order for every option: built-in default, then `SSP_*`
//! environment override, then the per-table option map.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SspError};

const DEFAULT_CACHE_NAME: &str = "default";
const DEFAULT_CACHE_MAX_SIZE_BYTES: u64 = 200 * 1024 * 1024;
const DEFAULT_CACHE_MAX_CONCURRENT_LOADS: usize = 8;
const DEFAULT_PREWARM_MAX_TASKS_PER_HOST: usize = 4;

/// Remote-storage credentials and endpoints that distinguish cache instances.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudCredentials {
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub aws_region: Option<String>,
    pub aws_endpoint: Option<String>,
    pub azure_account_name: Option<String>,
    pub azure_account_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub gcs_endpoint: Option<String>,
}

impl fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(v: &Option<String>) -> &'static str {
            if v.is_some() { "<redacted>" } else { "<unset>" }
        }
        f.debug_struct("CloudCredentials")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &redact(&self.aws_secret_access_key))
            .field("aws_session_token", &redact(&self.aws_session_token))
            .field("aws_region", &self.aws_region)
            .field("aws_endpoint", &self.aws_endpoint)
            .field("azure_account_name", &self.azure_account_name)
            .field("azure_account_key", &redact(&self.azure_account_key))
            .field("azure_endpoint", &self.azure_endpoint)
            .field("gcs_endpoint", &self.gcs_endpoint)
            .finish()
    }
}

/// Split cache sizing plus the credentials used to fetch split bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Logical cache name.
    pub name: String,
    /// Resident byte capacity.
    pub max_size_bytes: u64,
    /// Max concurrent split loads.
    pub max_concurrent_loads: usize,
    /// Storage credentials/endpoints.
    #[serde(default)]
    pub credentials: CloudCredentials,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CACHE_NAME.to_string(),
            max_size_bytes: DEFAULT_CACHE_MAX_SIZE_BYTES,
            max_concurrent_loads: DEFAULT_CACHE_MAX_CONCURRENT_LOADS,
            credentials: CloudCredentials::default(),
        }
    }
}

/// Best-effort cache pre-warm settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrewarmConfig {
    pub enabled: bool,
    /// Upper bound on warm-up tasks dispatched to a single host per planning call.
    pub max_tasks_per_host: usize,
}

impl Default for PrewarmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_tasks_per_host: DEFAULT_PREWARM_MAX_TASKS_PER_HOST,
        }
    }
}

/// Top-level planner configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Fast-field fallback used when no split capability descriptor exists yet.
    pub fast_fields: Vec<String>,
    /// Compare min/max as strings when typed conversion fails instead of keeping the split.
    ///
    /// Off by default: string ordering diverges from numeric ordering for unpadded numbers.
    pub stats_string_fallback: bool,
    pub cache: CacheConfig,
    pub prewarm: PrewarmConfig,
}

impl PlannerConfig {
    /// Builds configuration from a table option map, honoring `SSP_*` env overrides.
    ///
    /// # Errors
    /// Returns [`SspError::InvalidConfig`] naming the offending key for unparsable
    /// values and for zero load or per-host task bounds.
    pub fn from_options(options: &HashMap<String, String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(v) = lookup(options, "fast_fields", Some("SSP_FAST_FIELDS")) {
            cfg.fast_fields = parse_field_list(&v);
        }
        if let Some(v) = lookup(
            options,
            "stats.string_fallback",
            Some("SSP_STATS_STRING_FALLBACK"),
        ) {
            cfg.stats_string_fallback = parse_bool("stats.string_fallback", &v)?;
        }

        if let Some(v) = lookup(options, "cache.name", None) {
            cfg.cache.name = v;
        }
        if let Some(v) = lookup(options, "cache.max_size", Some("SSP_CACHE_MAX_SIZE")) {
            cfg.cache.max_size_bytes = parse_size("cache.max_size", &v)?;
        }
        if let Some(v) = lookup(
            options,
            "cache.max_concurrent_loads",
            Some("SSP_CACHE_MAX_CONCURRENT_LOADS"),
        ) {
            cfg.cache.max_concurrent_loads = parse_positive("cache.max_concurrent_loads", &v)?;
        }

        let creds = &mut cfg.cache.credentials;
        creds.aws_access_key_id = lookup(options, "aws.access_key_id", None);
        creds.aws_secret_access_key = lookup(options, "aws.secret_access_key", None);
        creds.aws_session_token = lookup(options, "aws.session_token", None);
        creds.aws_region = lookup(options, "aws.region", None);
        creds.aws_endpoint = lookup(options, "aws.endpoint", None);
        creds.azure_account_name = lookup(options, "azure.account_name", None);
        creds.azure_account_key = lookup(options, "azure.account_key", None);
        creds.azure_endpoint = lookup(options, "azure.endpoint", None);
        creds.gcs_endpoint = lookup(options, "gcs.endpoint", None);

        if let Some(v) = lookup(options, "prewarm.enabled", Some("SSP_PREWARM_ENABLED")) {
            cfg.prewarm.enabled = parse_bool("prewarm.enabled", &v)?;
        }
        if let Some(v) = lookup(
            options,
            "prewarm.max_tasks_per_host",
            Some("SSP_PREWARM_MAX_TASKS_PER_HOST"),
        ) {
            cfg.prewarm.max_tasks_per_host = parse_positive("prewarm.max_tasks_per_host", &v)?;
        }

        Ok(cfg)
    }
}

fn lookup(options: &HashMap<String, String>, key: &str, env: Option<&str>) -> Option<String> {
    if let Some(v) = options.get(key) {
        return Some(v.trim().to_string());
    }
    env.and_then(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
}

/// Splits a comma-separated column list, dropping blanks and duplicates while keeping order.
pub fn parse_field_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|existing| existing == name) {
            out.push(name.to_string());
        }
    }
    out
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(SspError::InvalidConfig(format!(
            "option '{key}' expects a boolean, got '{raw}'"
        ))),
    }
}

fn parse_usize(key: &str, raw: &str) -> Result<usize> {
    raw.parse::<usize>().map_err(|e| {
        SspError::InvalidConfig(format!("option '{key}' expects an integer, got '{raw}': {e}"))
    })
}

fn parse_positive(key: &str, raw: &str) -> Result<usize> {
    match parse_usize(key, raw)? {
        0 => Err(SspError::InvalidConfig(format!(
            "option '{key}' must be at least 1, got '{raw}'"
        ))),
        n => Ok(n),
    }
}

/// Parses a byte size with an optional binary suffix (`K`, `KB`, `M`, `MB`, `G`, `GB`).
pub fn parse_size(key: &str, raw: &str) -> Result<u64> {
    let upper = raw.trim().to_ascii_uppercase();
    let digits_end = upper
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(upper.len());
    let (digits, suffix) = upper.split_at(digits_end);
    let multiplier: u64 = match suffix.trim() {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        other => {
            return Err(SspError::InvalidConfig(format!(
                "option '{key}' has unknown size suffix '{other}'"
            )));
        }
    };
    let base = digits.parse::<u64>().map_err(|e| {
        SspError::InvalidConfig(format!("option '{key}' expects a size, got '{raw}': {e}"))
    })?;
    base.checked_mul(multiplier)
        .ok_or_else(|| SspError::InvalidConfig(format!("option '{key}' overflows: '{raw}'")))
}
