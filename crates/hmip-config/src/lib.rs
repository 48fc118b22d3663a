//! Shared configuration for HomematicIP mirror consumers.
//!
//! TOML profiles merged with `HMIP_` environment variables, token
//! resolution (env var indirection + plaintext), and translation to
//! `hmip_core::HomeConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hmip_api::{ClientCharacteristics, DEFAULT_LOOKUP_URL};
use hmip_core::{HomeConfig, TlsVerification, normalize_access_point_id};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("no {token} configured for profile '{profile}'")]
    NoCredentials { profile: String, token: &'static str },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named home profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick `name`, or the default profile when `name` is `None`.
    pub fn profile<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }

    /// Resolve a profile straight into a runtime `HomeConfig`.
    pub fn home_config(&self, name: Option<&str>) -> Result<HomeConfig, ConfigError> {
        let (name, profile) = self.profile(name)?;
        profile_to_home_config(profile, name, &self.defaults)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_lookup_url")]
    pub lookup_url: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_events")]
    pub events: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            lookup_url: default_lookup_url(),
            language: default_language(),
            insecure: false,
            timeout: default_timeout(),
            events: default_events(),
        }
    }
}

fn default_lookup_url() -> String {
    DEFAULT_LOOKUP_URL.into()
}
fn default_language() -> String {
    "en_US".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_events() -> bool {
    true
}

/// A named home profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Access point SGTIN as printed on the device (dashes allowed).
    pub access_point: String,

    /// Auth token (plaintext, prefer `auth_token_env`).
    pub auth_token: Option<String>,

    /// Environment variable name containing the auth token.
    pub auth_token_env: Option<String>,

    /// Client-auth token (plaintext, prefer `client_auth_token_env`).
    pub client_auth_token: Option<String>,

    /// Environment variable name containing the client-auth token.
    pub client_auth_token_env: Option<String>,

    /// Known REST host; skips the lookup together with `websocket_url`.
    pub rest_url: Option<String>,

    pub websocket_url: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override push-event subscription.
    pub events: Option<bool>,

    /// Override client language.
    pub language: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "hmip-mirror", "hmip-mirror").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hmip-mirror");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file only yields defaults.
///
/// Environment keys nest with a double underscore:
/// `HMIP_PROFILES__HOME__AUTH_TOKEN`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HMIP_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

// ── Token resolution ────────────────────────────────────────────────

fn resolve_token(
    env_name: Option<&str>,
    plaintext: Option<&str>,
    profile_name: &str,
    token: &'static str,
) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(val) = env_name.and_then(|name| std::env::var(name).ok()) {
        return Ok(SecretString::from(val));
    }

    // 2. Plaintext in config
    if let Some(val) = plaintext {
        return Ok(SecretString::from(val.to_owned()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
        token,
    })
}

pub fn resolve_tokens(
    profile: &Profile,
    profile_name: &str,
) -> Result<(SecretString, SecretString), ConfigError> {
    let auth = resolve_token(
        profile.auth_token_env.as_deref(),
        profile.auth_token.as_deref(),
        profile_name,
        "auth token",
    )?;
    let client_auth = resolve_token(
        profile.client_auth_token_env.as_deref(),
        profile.client_auth_token.as_deref(),
        profile_name,
        "client auth token",
    )?;
    Ok((auth, client_auth))
}

fn parse_url(field: &str, raw: Option<&str>) -> Result<Option<url::Url>, ConfigError> {
    raw.map(|raw| {
        raw.parse().map_err(|_| ConfigError::Validation {
            field: field.into(),
            reason: format!("invalid URL: {raw}"),
        })
    })
    .transpose()
}

/// Build a `HomeConfig` from a profile, falling back to `defaults`.
pub fn profile_to_home_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<HomeConfig, ConfigError> {
    let access_point_id = normalize_access_point_id(&profile.access_point);
    if access_point_id.is_empty() || !access_point_id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::Validation {
            field: "access_point".into(),
            reason: format!("expected a hexadecimal SGTIN, got '{}'", profile.access_point),
        });
    }

    let (auth_token, client_auth_token) = resolve_tokens(profile, profile_name)?;
    let rest_url = parse_url("rest_url", profile.rest_url.as_deref())?;
    let websocket_url = parse_url("websocket_url", profile.websocket_url.as_deref())?;
    // HomeConfig keeps the lookup URL as text, so reject garbage here
    parse_url("lookup_url", Some(&defaults.lookup_url))?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let language = profile.language.as_deref().unwrap_or(&defaults.language);

    let mut config = HomeConfig::new(&access_point_id, auth_token, client_auth_token);
    config.lookup_url.clone_from(&defaults.lookup_url);
    config.rest_url = rest_url;
    config.websocket_url = websocket_url;
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.characteristics = ClientCharacteristics::new(
        "hmip-mirror",
        env!("CARGO_PKG_VERSION"),
        language,
    );
    config.events_enabled = profile.events.unwrap_or(defaults.events);
    Ok(config)
}
