//! Configuration file loading and merging with command-line values.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use deckgen_core::executor::{CONNECT_TIMEOUT_SECS, DEFAULT_ENDPOINT, REQUEST_TIMEOUT_SECS};
use deckgen_core::progress::{DEFAULT_MAX_STEP, DEFAULT_MIN_STEP, SimulatorSettings};
use deckgen_core::request::{MAX_SLIDE_COUNT, MIN_SLIDE_COUNT};

use crate::cli::Args;

/// Environment variable overriding the configured endpoint.
pub(crate) const ENDPOINT_ENV: &str = "DECKGEN_ENDPOINT";

/// Upper bound for a single progress increment.
const MAX_STEP_LIMIT: f64 = 50.0;

/// `key = value` file configuration for deckgen defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FileConfig {
    /// Generation endpoint URL.
    pub(crate) endpoint: Option<String>,
    /// Directory decks are saved into.
    pub(crate) output_dir: Option<PathBuf>,
    /// Default slide count.
    pub(crate) slides: Option<u8>,
    /// Default tone.
    pub(crate) tone: Option<String>,
    /// Progress tick cadence in milliseconds.
    pub(crate) tick_interval_ms: Option<u64>,
    pub(crate) step_min: Option<f64>,
    pub(crate) step_max: Option<f64>,
    pub(crate) connect_timeout_secs: Option<u64>,
    pub(crate) request_timeout_secs: Option<u64>,
    /// Default verbosity mode.
    pub(crate) verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(slides) = self.slides
            && !(MIN_SLIDE_COUNT..=MAX_SLIDE_COUNT).contains(&slides)
        {
            bail!("Invalid config value for `slides`: {slides}. Expected range: 1..=15");
        }

        if let Some(tick) = self.tick_interval_ms
            && !(50..=10_000).contains(&tick)
        {
            bail!("Invalid config value for `tick_interval_ms`: {tick}. Expected range: 50..=10000");
        }

        let min = self.step_min.unwrap_or(DEFAULT_MIN_STEP);
        let max = self.step_max.unwrap_or(DEFAULT_MAX_STEP);
        if !(min > 0.0 && min < max && max <= MAX_STEP_LIMIT) {
            bail!(
                "Invalid config values for `step_min`/`step_max`: {min}/{max}. Expected 0 < step_min < step_max <= 50"
            );
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("request_timeout_secs", self.request_timeout_secs)?;

        if let Some(endpoint) = &self.endpoint
            && endpoint.trim().is_empty()
        {
            bail!("Invalid config value for `endpoint`: must not be empty");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    if let Some(value) = value
        && !(1..=3600).contains(&value)
    {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

/// Everything a run needs, after merging CLI, environment, file and defaults.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunSettings {
    pub(crate) topic: String,
    pub(crate) tone: Option<String>,
    pub(crate) slides: Option<u8>,
    pub(crate) endpoint: String,
    pub(crate) output_dir: PathBuf,
    pub(crate) simulator: SimulatorSettings,
    pub(crate) connect_timeout_secs: u64,
    pub(crate) request_timeout_secs: u64,
    pub(crate) quiet: bool,
    pub(crate) verbose: u8,
}

/// Merges values: command line, then environment (endpoint only), then file,
/// then built-in defaults.
pub(crate) fn resolve_settings(
    args: &Args,
    file: Option<&FileConfig>,
    endpoint_env: Option<String>,
) -> RunSettings {
    let file = file.cloned().unwrap_or_default();

    let endpoint = args
        .endpoint
        .clone()
        .or(endpoint_env)
        .or(file.endpoint)
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let (quiet, verbose) = match (args.quiet, args.verbose, file.verbosity) {
        (true, _, _) => (true, 0),
        (false, v, _) if v > 0 => (false, v),
        (false, _, Some(VerbositySetting::Quiet)) => (true, 0),
        (false, _, Some(VerbositySetting::Verbose)) => (false, 1),
        (false, _, Some(VerbositySetting::Debug)) => (false, 2),
        (false, _, Some(VerbositySetting::Default) | None) => (false, 0),
    };

    let defaults = SimulatorSettings::default();
    let simulator = SimulatorSettings {
        cadence: file
            .tick_interval_ms
            .map_or(defaults.cadence, Duration::from_millis),
        min_step: file.step_min.unwrap_or(defaults.min_step),
        max_step: file.step_max.unwrap_or(defaults.max_step),
    };

    RunSettings {
        topic: args.topic(),
        tone: args.tone.clone().or(file.tone),
        slides: args.slides.or(file.slides),
        endpoint,
        output_dir: args
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(".")),
        simulator,
        connect_timeout_secs: file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
        request_timeout_secs: file.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS),
        quiet,
        verbose,
    }
}

/// Reads the endpoint override from the environment, ignoring blank values.
pub(crate) fn endpoint_from_env() -> Option<String> {
    env::var(ENDPOINT_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/deckgen/config.toml`
/// 2. `$HOME/.config/deckgen/config.toml`
#[must_use]
pub(crate) fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("deckgen")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("deckgen")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Config file '{}' does not exist", path.display());
        }
        return load_file_config(path).map(Some);
    }

    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;

        match key {
            "endpoint" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `endpoint` value on line {line_no}"))?;
                cfg.endpoint = Some(parsed);
            }
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "tone" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `tone` value on line {line_no}"))?;
                cfg.tone = Some(parsed).filter(|tone| !tone.trim().is_empty());
            }
            "slides" => {
                let parsed = parse_integer_u8(value)
                    .with_context(|| format!("Invalid `slides` value on line {line_no}"))?;
                cfg.slides = Some(parsed);
            }
            "tick_interval_ms" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `tick_interval_ms` value on line {line_no}")
                })?;
                cfg.tick_interval_ms = Some(parsed);
            }
            "step_min" => {
                let parsed = parse_float(value)
                    .with_context(|| format!("Invalid `step_min` value on line {line_no}"))?;
                cfg.step_min = Some(parsed);
            }
            "step_max" => {
                let parsed = parse_float(value)
                    .with_context(|| format!("Invalid `step_max` value on line {line_no}"))?;
                cfg.step_max = Some(parsed);
            }
            "connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `connect_timeout_secs` value on line {line_no}")
                })?;
                cfg.connect_timeout_secs = Some(parsed);
            }
            "request_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `request_timeout_secs` value on line {line_no}")
                })?;
                cfg.request_timeout_secs = Some(parsed);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `verbosity` value on line {line_no}"))?;
                cfg.verbosity = Some(
                    parse_verbosity(&parsed)
                        .with_context(|| format!("Invalid `verbosity` value on line {line_no}"))?,
                );
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u8(raw_value: &str) -> Result<u8> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<u16>()?;
    u8::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u8"))
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_float(raw_value: &str) -> Result<f64> {
    let value = raw_value.trim().parse::<f64>()?;
    if !value.is_finite() {
        bail!("Expected a finite number");
    }
    Ok(value)
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}
