//! Shared configuration for the bayview dashboard.
//!
//! TOML profiles merged with `BAYVIEW_` environment variables, and
//! translation to `bayview_core::ControllerConfig`. The TUI layers its
//! command-line flags on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bayview_core::{ControllerConfig, DEFAULT_SERVER_URL, TlsVerification};

/// Prefix for environment overrides (`BAYVIEW_DEFAULTS__TIMEOUT=5`).
pub const ENV_PREFIX: &str = "BAYVIEW_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named status-server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

/// Screen the dashboard opens on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StartView {
    #[default]
    Grid,
    Sections,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// REST timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub view: StartView,

    /// Log filter used when neither `-v` nor `RUST_LOG` is given.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            insecure: false,
            view: StartView::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

/// A named status-server profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Status server base URL (e.g., "http://10.0.0.5:12000").
    pub server: String,

    /// Socket.IO mount path, when not `/socket.io/`.
    pub socket_path: Option<String>,

    /// Section to open on.
    pub section: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Subscribe to live pushes (default on).
    pub push: Option<bool>,
}

impl Profile {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            socket_path: None,
            section: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            push: None,
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

impl Config {
    /// Pick the profile to use: the named one (which must exist), else the
    /// default profile if configured, else none.
    pub fn resolve_profile<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<Option<(&'a str, &'a Profile)>, ConfigError> {
        if let Some(name) = name {
            return self
                .profiles
                .get(name)
                .map(|p| Some((name, p)))
                .ok_or_else(|| ConfigError::UnknownProfile {
                    profile: name.into(),
                });
        }

        Ok(self
            .default_profile
            .as_deref()
            .and_then(|name| self.profiles.get(name).map(|p| (name, p))))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "bayview", "bayview").map_or_else(
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
    p.push("bayview");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file is fine.
///
/// Nested keys use a double underscore in the environment, so
/// `BAYVIEW_DEFAULT_PROFILE` and `BAYVIEW_DEFAULTS__TIMEOUT` both work.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Controller config ───────────────────────────────────────────────

/// Build a `ControllerConfig` from a profile and the global defaults.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let url: url::Url = profile
        .server
        .parse()
        .map_err(|e: url::ParseError| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL '{}': {e}", profile.server),
        })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "server".into(),
            reason: format!("expected an http(s) URL, got '{}'", profile.server),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ControllerConfig::new(url);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.websocket_enabled = profile.push.unwrap_or(true);
    if let Some(ref socket_path) = profile.socket_path {
        config.socket_path.clone_from(socket_path);
    }
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.timeout, 30);
        assert_eq!(cfg.defaults.view, StartView::Grid);
        assert!(cfg.profiles.is_empty());
        assert!(cfg.resolve_profile(None).unwrap().is_none());
    }

    #[test]
    fn profiles_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "plant"

[defaults]
timeout = 10
view = "sections"

[profiles.plant]
server = "https://status.plant.local"
section = "North"
ca_cert = "/etc/ssl/plant.pem"

[profiles.lab]
server = "http://10.0.0.5:12000"
socket_path = "/live/socket.io"
push = false
"#,
        );

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.view, StartView::Sections);
        assert_eq!(cfg.defaults.log_level, "info");

        let (name, plant) = cfg.resolve_profile(None).unwrap().unwrap();
        assert_eq!(name, "plant");
        assert_eq!(plant.section.as_deref(), Some("North"));

        let (_, lab) = cfg.resolve_profile(Some("lab")).unwrap().unwrap();
        assert_eq!(lab.push, Some(false));

        assert!(matches!(
            cfg.resolve_profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn controller_config_from_profile() {
        let defaults = Defaults {
            timeout: 12,
            ..Defaults::default()
        };

        let mut plant = Profile::new("https://status.plant.local");
        plant.ca_cert = Some("/etc/ssl/plant.pem".into());
        let cc = profile_to_controller_config(&plant, &defaults).unwrap();
        assert_eq!(cc.url.as_str(), "https://status.plant.local/");
        assert_eq!(cc.tls, TlsVerification::CustomCa("/etc/ssl/plant.pem".into()));
        assert_eq!(cc.timeout, Duration::from_secs(12));
        assert!(cc.websocket_enabled);
        assert_eq!(cc.socket_path, "/socket.io/");

        let mut lab = Profile::new("http://10.0.0.5:12000");
        lab.insecure = Some(true);
        lab.timeout = Some(3);
        lab.push = Some(false);
        lab.socket_path = Some("/live/socket.io".into());
        let cc = profile_to_controller_config(&lab, &defaults).unwrap();
        assert_eq!(cc.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(cc.timeout, Duration::from_secs(3));
        assert!(!cc.websocket_enabled);
        assert_eq!(cc.socket_path, "/live/socket.io");
    }

    #[test]
    fn bad_server_urls_are_rejected() {
        let defaults = Defaults::default();
        for server in ["not a url", "ftp://files.local"] {
            let err = profile_to_controller_config(&Profile::new(server), &defaults).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "server"));
        }
    }
}
