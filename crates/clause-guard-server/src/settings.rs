use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "clause-guard.toml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:clause-guard.db?mode=rwc";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024;
/// Longest accepted session lifetime (ten years).
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Runtime configuration for the HTTP service.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    pub phrases_file: Option<PathBuf>,
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    host: String,
    port: u16,
    database_url: String,
    max_upload_bytes: usize,
    session_ttl: String,
    #[serde(default)]
    phrases_file: Option<PathBuf>,
    secure_cookies: bool,
}

impl Settings {
    const ENV_PREFIX: &'static str = "CLAUSE_GUARD";

    /// Load settings from defaults, an optional TOML file and `CLAUSE_GUARD_*` variables.
    ///
    /// * `config_file` — explicit file (must exist); when `None`, `clause-guard.toml`
    ///   in the working directory is read if present.
    /// * `CLAUSE_GUARD_DATABASE_URL`, `CLAUSE_GUARD_PORT`, … override file values.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let (file, required) = match config_file {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let raw: RawSettings = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 5000_i64)?
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES as i64)?
            .set_default("session_ttl", "7days")?
            .set_default("secure_cookies", false)?
            .add_source(File::from(file.clone()).required(required))
            .add_source(Environment::with_prefix(Self::ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to load settings (file: {})", file.display()))?
            .try_deserialize()
            .context("invalid settings")?;
        raw.try_into()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            phrases_file: None,
            secure_cookies: false,
        }
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = anyhow::Error;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let session_ttl = humantime::parse_duration(raw.session_ttl.trim())
            .with_context(|| format!("invalid session_ttl `{}`", raw.session_ttl))?;
        if session_ttl.is_zero() {
            anyhow::bail!("session_ttl must be greater than zero");
        }
        if session_ttl > MAX_SESSION_TTL {
            anyhow::bail!(
                "session_ttl `{}` exceeds the maximum of {}",
                raw.session_ttl,
                humantime::format_duration(MAX_SESSION_TTL)
            );
        }
        if raw.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than zero");
        }
        Ok(Self {
            host: raw.host.trim().to_string(),
            port: raw.port,
            database_url: raw.database_url,
            max_upload_bytes: raw.max_upload_bytes,
            session_ttl,
            phrases_file: raw
                .phrases_file
                .filter(|path| !path.as_os_str().is_empty()),
            secure_cookies: raw.secure_cookies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::env;
    use std::fs::write;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const KEYS: [&str; 7] = [
        "CLAUSE_GUARD_HOST",
        "CLAUSE_GUARD_PORT",
        "CLAUSE_GUARD_DATABASE_URL",
        "CLAUSE_GUARD_MAX_UPLOAD_BYTES",
        "CLAUSE_GUARD_SESSION_TTL",
        "CLAUSE_GUARD_PHRASES_FILE",
        "CLAUSE_GUARD_SECURE_COOKIES",
    ];

    fn with_clean_env<F: FnOnce()>(func: F) {
        let _guard = ENV_LOCK.lock().unwrap();
        for key in KEYS {
            env::remove_var(key);
        }
        func();
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn defaults_without_file_or_env() {
        with_clean_env(|| {
            let settings = Settings::load(None).expect("defaults should load");
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.bind_addr(), "127.0.0.1:5000");
        });
    }

    #[test]
    fn file_values_apply_and_env_overrides_them() {
        with_clean_env(|| {
            let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
            write(
                file.path(),
                "port = 8080\nsession_ttl = \"2h\"\nphrases_file = \"phrases/custom.txt\"\n",
            )
            .unwrap();
            env::set_var("CLAUSE_GUARD_PORT", "9090");
            env::set_var("CLAUSE_GUARD_DATABASE_URL", "sqlite::memory:");

            let settings = Settings::load(Some(file.path())).expect("file should load");
            assert_eq!(settings.port, 9090);
            assert_eq!(settings.database_url, "sqlite::memory:");
            assert_eq!(settings.session_ttl, Duration::from_secs(2 * 60 * 60));
            assert_eq!(
                settings.phrases_file.as_deref(),
                Some(Path::new("phrases/custom.txt"))
            );
        });
    }

    #[test]
    fn explicit_missing_file_errors() {
        with_clean_env(|| {
            let err = Settings::load(Some(Path::new("/definitely/missing.toml")))
                .expect_err("explicit file must exist");
            assert!(format!("{err:#}").contains("missing.toml"));
        });
    }

    #[test]
    fn rejects_invalid_session_ttl() {
        with_clean_env(|| {
            env::set_var("CLAUSE_GUARD_SESSION_TTL", "forever");
            let err = Settings::load(None).expect_err("bad duration should fail");
            assert!(err.to_string().contains("session_ttl"));
        });
    }

    #[test]
    fn rejects_session_ttl_beyond_maximum() {
        with_clean_env(|| {
            env::set_var("CLAUSE_GUARD_SESSION_TTL", "1000000years");
            let err = Settings::load(None).expect_err("huge duration should fail");
            assert!(format!("{err:#}").contains("exceeds the maximum"));

            env::set_var("CLAUSE_GUARD_SESSION_TTL", "3650days");
            let settings = Settings::load(None).expect("ten years is allowed");
            assert_eq!(settings.session_ttl, MAX_SESSION_TTL);
        });
    }
}
