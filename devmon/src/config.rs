//! Runtime configuration
//!
//! Sources, lowest to highest precedence:
//! - built-in defaults
//! - TOML file (`PT_CONFIG`, else `<config dir>/devmon/config.toml`)
//! - environment variables (a `.env` file is loaded first by `main`)
//! - command-line flags

use crate::error::{MonitorError, Result};
use getopts::Options;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const ENV_CONFIG: &str = "PT_CONFIG";
pub const ENV_BASE_URL: &str = "PT_BASE_URL";
pub const ENV_POLL_INTERVAL: &str = "PT_POLL_INTERVAL";
pub const ENV_REQUEST_TIMEOUT: &str = "PT_REQUEST_TIMEOUT";
pub const ENV_NO_COLOR: &str = "PT_NO_COLOR";
pub const ENV_NO_TIMESTAMP: &str = "NO_TIMESTAMP";
pub const ENV_USERNAME: &str = "PT_API_USERNAME";
pub const ENV_PASSWORD: &str = "PT_API_PASSWORD";
pub const ENV_LOG_FILE: &str = "PT_LOG_FILE";
pub const ENV_ACCEPT_INVALID_CERTS: &str = "PT_ACCEPT_INVALID_CERTS";

const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Always ends in `/`
    pub base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub username: String,
    pub password: String,
    pub color_output: bool,
    pub show_timestamp: bool,
    pub accept_invalid_certs: bool,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub stale_after: Duration,
    pub log_file: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(1),
            username: "admin".to_string(),
            password: "admin".to_string(),
            color_output: true,
            show_timestamp: true,
            // the appliances ship self-signed certificates
            accept_invalid_certs: true,
            max_retries: 2,
            retry_backoff: Duration::from_secs(1),
            stale_after: Duration::from_secs(60),
            log_file: None,
        }
    }
}

/// On-disk form. Durations are strings such as `"5s"` or `"1m 30s"`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub poll_interval: Option<String>,
    pub request_timeout: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub color_output: Option<bool>,
    pub show_timestamp: Option<bool>,
    pub accept_invalid_certs: Option<bool>,
    pub max_retries: Option<u32>,
    pub retry_backoff: Option<String>,
    pub stale_after: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// What the command line asked for
#[derive(Debug)]
pub enum Command {
    Run(MonitorConfig),
    Help(String),
}

impl MonitorConfig {
    /// Load from the real environment, config file and `args` (including the
    /// program name in position 0).
    pub fn load(args: &[String]) -> Result<Command> {
        let env = |key: &str| std::env::var(key).ok();
        let file = match config_file_path(&env) {
            Some(path) if path.exists() => Some(read_config_file(&path)?),
            _ => None,
        };
        Self::from_sources(args, env, file)
    }

    /// Layer `file`, then `env`, then `args` over the defaults and validate.
    pub fn from_sources(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
        file: Option<FileConfig>,
    ) -> Result<Command> {
        let opts = options();
        let matches = opts
            .parse(args.iter().skip(1))
            .map_err(|e| MonitorError::Config(e.to_string()))?;
        if matches.opt_present("help") {
            return Ok(Command::Help(usage(&opts, program_name(args))));
        }

        let mut config = MonitorConfig::default();
        if let Some(file) = file {
            config.apply_file(file)?;
        }
        config.apply_env(&env)?;

        if let Some(url) = matches.opt_str("base_url") {
            config.base_url = url;
        }
        if let Some(interval) = matches.opt_str("interval") {
            config.poll_interval = parse_duration("--interval", &interval)?;
        }
        if let Some(timeout) = matches.opt_str("timeout") {
            config.request_timeout = parse_duration("--timeout", &timeout)?;
        }
        if let Some(username) = matches.opt_str("username") {
            config.username = username;
        }
        if let Some(password) = matches.opt_str("password") {
            config.password = password;
        }
        if matches.opt_present("no-color") {
            config.color_output = false;
        }

        config.validate()?;
        Ok(Command::Run(config))
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(url) = file.base_url {
            self.base_url = url;
        }
        if let Some(value) = file.poll_interval {
            self.poll_interval = parse_duration("poll_interval", &value)?;
        }
        if let Some(value) = file.request_timeout {
            self.request_timeout = parse_duration("request_timeout", &value)?;
        }
        if let Some(username) = file.username {
            self.username = username;
        }
        if let Some(password) = file.password {
            self.password = password;
        }
        if let Some(color) = file.color_output {
            self.color_output = color;
        }
        if let Some(show) = file.show_timestamp {
            self.show_timestamp = show;
        }
        if let Some(accept) = file.accept_invalid_certs {
            self.accept_invalid_certs = accept;
        }
        if let Some(retries) = file.max_retries {
            self.max_retries = retries;
        }
        if let Some(value) = file.retry_backoff {
            self.retry_backoff = parse_duration("retry_backoff", &value)?;
        }
        if let Some(value) = file.stale_after {
            self.stale_after = parse_duration("stale_after", &value)?;
        }
        if file.log_file.is_some() {
            self.log_file = file.log_file;
        }
        Ok(())
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = env(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(value) = env(ENV_POLL_INTERVAL) {
            self.poll_interval = parse_duration(ENV_POLL_INTERVAL, &value)?;
        }
        if let Some(value) = env(ENV_REQUEST_TIMEOUT) {
            self.request_timeout = parse_duration(ENV_REQUEST_TIMEOUT, &value)?;
        }
        if let Some(value) = env(ENV_NO_COLOR) {
            if parse_bool(ENV_NO_COLOR, &value)? {
                self.color_output = false;
            }
        }
        if let Some(value) = env(ENV_NO_TIMESTAMP) {
            if parse_bool(ENV_NO_TIMESTAMP, &value)? {
                self.show_timestamp = false;
            }
        }
        if let Some(username) = env(ENV_USERNAME) {
            self.username = username;
        }
        if let Some(password) = env(ENV_PASSWORD) {
            self.password = password;
        }
        if let Some(value) = env(ENV_ACCEPT_INVALID_CERTS) {
            self.accept_invalid_certs = parse_bool(ENV_ACCEPT_INVALID_CERTS, &value)?;
        }
        if let Some(path) = env(ENV_LOG_FILE).filter(|p| !p.is_empty()) {
            self.log_file = Some(PathBuf::from(path));
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(MonitorError::Config(format!(
                "base URL is required (--base_url or {ENV_BASE_URL})"
            )));
        }
        self.base_url = trimmed.to_string();
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }

        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(MonitorError::Config(format!(
                "poll interval must be at least {}",
                humantime::format_duration(MIN_POLL_INTERVAL)
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(MonitorError::Config("request timeout must be positive".into()));
        }
        Ok(())
    }
}

fn options() -> Options {
    let mut opts = Options::new();
    opts.optopt("", "base_url", "Management API base URL (required)", "URL");
    opts.optopt("", "interval", "Poll interval, e.g. 5s or 1m (default 5s)", "DURATION");
    opts.optopt("", "username", "API username (default admin)", "NAME");
    opts.optopt("", "password", "API password (default admin)", "PASSWORD");
    opts.optopt("", "timeout", "Per-request timeout (default 1s)", "DURATION");
    opts.optflag("", "no-color", "Disable colored output");
    opts.optflag("h", "help", "Show help");
    opts
}

/// Usage text for `program`, listing flags, environment variables and examples.
pub fn usage_text(program: &str) -> String {
    usage(&options(), program)
}

pub fn program_name(args: &[String]) -> &str {
    args.first().map(String::as_str).unwrap_or("devmon")
}

fn usage(opts: &Options, program: &str) -> String {
    let brief = format!(
        "Usage: {program} --base_url URL [options]\n\n\
         Live dashboard of physical devices grouped by logical device."
    );
    format!(
        "{}\n\
         Environment:\n    \
         {ENV_BASE_URL}          base URL\n    \
         {ENV_POLL_INTERVAL}     poll interval\n    \
         {ENV_REQUEST_TIMEOUT}   per-request timeout\n    \
         {ENV_USERNAME}     API username\n    \
         {ENV_PASSWORD}     API password\n    \
         {ENV_NO_COLOR}          disable colors (true/false)\n    \
         {ENV_NO_TIMESTAMP}         hide the header timestamp (true/false)\n    \
         {ENV_LOG_FILE}          write logs to this file\n    \
         {ENV_ACCEPT_INVALID_CERTS} skip TLS certificate validation (default true)\n    \
         {ENV_CONFIG}            config file path\n\n\
         Examples:\n    \
         {program} --base_url https://10.0.0.1/api/v2/\n    \
         {program} --base_url https://mgmt.local/api/v2/ --interval 10s --no-color\n",
        opts.usage(&brief),
    )
}

fn config_file_path(env: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(path) = env(ENV_CONFIG) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("devmon").join("config.toml"))
}

pub fn read_config_file(path: &Path) -> Result<FileConfig> {
    debug!("reading config file {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(|e| MonitorError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| MonitorError::Config(format!("invalid config file {}: {}", path.display(), e)))
}

/// Plain seconds (`"30"`) or a humantime duration (`"30s"`, `"1m 30s"`).
pub fn parse_duration(name: &str, value: &str) -> Result<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value)
        .map_err(|e| MonitorError::Config(format!("{name}: invalid duration {value:?}: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(MonitorError::Config(format!("{name}: expected a boolean, got {other:?}"))),
    }
}
