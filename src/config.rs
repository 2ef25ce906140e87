#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "output";
pub const DEFAULT_MAX_WORKERS: usize = 3;
pub const DEFAULT_CATALOG_URL: &str = "https://www.tele5.de/schlefaz/mediathek/";
pub const DEFAULT_SITE_ORIGIN: &str = "https://www.tele5.de";
pub const DEFAULT_PLATFORM_API_BASE: &str = "https://cdn.jwplayer.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_YT_DLP_PATH: &str = "yt-dlp";

/// Everything a mirror run needs to know, resolved once at startup and shared
/// read-only by every component afterwards.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub output_directory: PathBuf,
    pub save_json: bool,
    pub download_cover: bool,
    pub skip_existing: bool,
    pub quiet_mode: bool,
    pub max_workers: usize,
    pub catalog_url: String,
    pub site_origin: Url,
    pub platform_api_base: String,
    pub http_timeout: Duration,
    pub yt_dlp_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_directory: Option<PathBuf>,
    pub max_workers: Option<usize>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_config(overrides: ConfigOverrides) -> Result<MirrorConfig> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_config_with_overrides(&file_vars, env_var_string, overrides)
}

#[cfg(test)]
fn build_config(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<MirrorConfig> {
    build_config_with_overrides(file_vars, env_lookup, ConfigOverrides::default())
}

fn build_config_with_overrides(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: ConfigOverrides,
) -> Result<MirrorConfig> {
    let lookup = |key: &str| lookup_value(key, file_vars, &env_lookup);
    let flag = |key: &str, default: bool| {
        lookup(key)
            .and_then(|value| parse_bool(&value))
            .unwrap_or(default)
    };

    let output_directory = overrides
        .output_directory
        .or_else(|| lookup("OUTPUT_DIRECTORY").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIRECTORY));
    let max_workers = overrides
        .max_workers
        .filter(|workers| *workers > 0)
        .or_else(|| {
            lookup("MAX_WORKERS")
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|workers| *workers > 0)
        })
        .unwrap_or(DEFAULT_MAX_WORKERS);
    let http_timeout = lookup("HTTP_TIMEOUT_SECS")
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

    let origin_raw = lookup("SITE_ORIGIN").unwrap_or_else(|| DEFAULT_SITE_ORIGIN.to_string());
    let site_origin =
        Url::parse(&origin_raw).with_context(|| format!("SITE_ORIGIN is not a URL: {origin_raw}"))?;
    if site_origin.cannot_be_a_base() {
        return Err(anyhow!("SITE_ORIGIN cannot be used as a base URL: {origin_raw}"));
    }

    Ok(MirrorConfig {
        output_directory,
        save_json: flag("SAVE_JSON", true),
        download_cover: flag("DOWNLOAD_COVER", true),
        skip_existing: flag("SKIP_EXISTING_MOVIES", true),
        quiet_mode: flag("QUIET_MODE", true),
        max_workers,
        catalog_url: lookup("CATALOG_URL").unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
        site_origin,
        platform_api_base: lookup("PLATFORM_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_PLATFORM_API_BASE.to_string()),
        http_timeout: Duration::from_secs(http_timeout),
        yt_dlp_path: lookup("YT_DLP_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_YT_DLP_PATH)),
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key)
        .or_else(|| file_vars.get(key).cloned())
        .filter(|value| !value.trim().is_empty())
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
