use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::log::LogLevel;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 25;
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RING_TIMEOUT_SECS: u64 = 45;
pub const DEFAULT_STUN_URL: &str = "stun:stun.l.google.com:19302";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for [{section}] {key}: '{value}'")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

/// INI-style configuration: optional `[Section]` headers, `key = value` lines,
/// `#` comments. Keys before the first section are globals.
#[derive(Debug)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut globals = HashMap::new();
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = &line[1..line.len() - 1];
                current_section = Some(name.to_string());
                continue;
            }

            if let Some(pos) = line.find('=') {
                let key = line[..pos].trim().to_string();
                let value = line[pos + 1..].trim().trim_matches('"').to_string();

                match &current_section {
                    None => {
                        globals.insert(key, value);
                    }
                    Some(sec) => {
                        sections.entry(sec.clone()).or_default().insert(key, value);
                    }
                }
            }
        }
        Config { globals, sections }
    }

    pub fn empty() -> Self {
        Self {
            globals: HashMap::new(),
            sections: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_non_empty_or_default<'a>(
        &'a self,
        section: &str,
        key: &str,
        default: &'a str,
    ) -> &'a str {
        self.get_non_empty(section, key)
            .or_else(|| self.get_global(key).filter(|s| !s.is_empty()))
            .unwrap_or(default)
    }

    /// Parse a typed value, falling back to `default` when the key is absent.
    pub fn get_parsed_or<T: FromStr>(
        &self,
        section: &str,
        key: &str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.get_non_empty(section, key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn get_bool_or(&self, section: &str, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get_non_empty(section, key) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    section: section.to_string(),
                    key: key.to_string(),
                    value: raw.to_string(),
                }),
            },
        }
    }
}

/// TLS material for `wss://` serving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Everything the signaling server needs from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// How long a connection thread blocks on its socket before checking
    /// its outbound queue.
    pub poll_interval: Duration,
    pub handshake_timeout: Duration,
    pub tls: Option<TlsSettings>,
    pub log_level: LogLevel,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
            tls: None,
            log_level: LogLevel::Info,
        }
    }
}

impl ServerSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let bind_addr = config
            .get_non_empty_or_default("Signaling", "bind_addr", DEFAULT_BIND_ADDR)
            .to_string();
        let poll_ms = config.get_parsed_or("Signaling", "poll_interval_ms", DEFAULT_POLL_INTERVAL_MS)?;
        let handshake_ms = config.get_parsed_or(
            "Signaling",
            "handshake_timeout_ms",
            DEFAULT_HANDSHAKE_TIMEOUT_MS,
        )?;

        let tls = if config.get_bool_or("TLS", "enabled", false)? {
            Some(TlsSettings {
                cert_path: PathBuf::from(config.get_non_empty_or_default(
                    "TLS",
                    "cert",
                    "certs/signaling/cert.pem",
                )),
                key_path: PathBuf::from(config.get_non_empty_or_default(
                    "TLS",
                    "key",
                    "certs/signaling/key.pem",
                )),
            })
        } else {
            None
        };

        let log_level = config.get_parsed_or("Logging", "level", LogLevel::Info)?;

        Ok(Self {
            bind_addr,
            poll_interval: Duration::from_millis(poll_ms.max(1)),
            handshake_timeout: Duration::from_millis(handshake_ms),
            tls,
            log_level,
        })
    }
}

/// What a `SignalingClient` needs from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub poll_interval: Duration,
    pub handshake_timeout: Duration,
    /// CA to pin for `wss://`; `None` means plain `ws://` only.
    pub ca_path: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
            ca_path: None,
        }
    }
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let poll_ms = config.get_parsed_or("Signaling", "poll_interval_ms", DEFAULT_POLL_INTERVAL_MS)?;
        let handshake_ms = config.get_parsed_or(
            "Signaling",
            "handshake_timeout_ms",
            DEFAULT_HANDSHAKE_TIMEOUT_MS,
        )?;
        Ok(Self {
            poll_interval: Duration::from_millis(poll_ms.max(1)),
            handshake_timeout: Duration::from_millis(handshake_ms),
            ca_path: config.get_non_empty("TLS", "ca").map(PathBuf::from),
        })
    }
}

/// Client-side call behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSettings {
    /// Unanswered `calling`/`receiving` sessions are ended after this long.
    /// `None` disables the timeout.
    pub ring_timeout: Option<Duration>,
    pub stun_urls: Vec<String>,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            ring_timeout: Some(Duration::from_secs(DEFAULT_RING_TIMEOUT_SECS)),
            stun_urls: vec![DEFAULT_STUN_URL.to_string()],
        }
    }
}

impl CallSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let secs = config.get_parsed_or("Call", "ring_timeout_secs", DEFAULT_RING_TIMEOUT_SECS)?;
        let stun_urls = config
            .get_non_empty_or_default("Call", "stun_url", DEFAULT_STUN_URL)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            ring_timeout: (secs > 0).then(|| Duration::from_secs(secs)),
            stun_urls,
        })
    }
}
