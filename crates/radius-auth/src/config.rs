use crate::client::{ClientConfig, MAX_TIMEOUT};
use crate::session::MAX_SESSION_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Reverse-proxy convention used to answer unauthenticated `/auth` requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// nginx `auth_request`: answer 401 and let nginx handle the redirect
    Nginx,
    /// Traefik ForwardAuth: redirect to the login page
    Traefik,
    /// Caddy `forward_auth`: redirect to the login page
    Caddy,
    #[default]
    Generic,
}

impl ProxyType {
    /// Whether unauthenticated requests get a 401 instead of a redirect
    pub fn answers_unauthorized(self) -> bool {
        matches!(self, ProxyType::Nginx)
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProxyType::Nginx => "nginx",
            ProxyType::Traefik => "traefik",
            ProxyType::Caddy => "caddy",
            ProxyType::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// Service configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// RADIUS server host name or IP address
    #[serde(default = "default_radius_server")]
    pub radius_server: String,

    /// RADIUS authentication port
    #[serde(default = "default_radius_port")]
    pub radius_port: u16,

    /// Shared secret with the RADIUS server
    pub radius_secret: String,

    /// NAS-Identifier sent with every Access-Request
    #[serde(default = "default_nas_identifier")]
    pub radius_nas_identifier: String,

    /// Hard deadline for one RADIUS exchange, in seconds
    #[serde(default = "default_radius_timeout")]
    pub radius_timeout: u64,

    /// Wait before resending an unanswered Access-Request, in seconds
    #[serde(default = "default_retry_interval")]
    pub radius_retry_interval: u64,

    /// Number of times one Access-Request may be sent
    #[serde(default = "default_max_attempts")]
    pub radius_max_attempts: u8,

    /// Replies with a foreign identifier tolerated per exchange
    #[serde(default = "default_max_discarded_replies")]
    pub radius_max_discarded_replies: usize,

    /// Session lifetime in seconds (also the cookie Max-Age)
    #[serde(default = "default_session_timeout")]
    pub session_timeout: u64,

    /// Interval between expired-session sweeps, in seconds
    #[serde(default = "default_sweep_interval")]
    pub session_sweep_interval: u64,

    #[serde(default)]
    pub proxy_type: ProxyType,

    /// Name shown on the login page
    #[serde(default = "default_proxy_name")]
    pub proxy_name: String,

    /// HTTP listen address
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_radius_server() -> String {
    "radius".to_string()
}

fn default_radius_port() -> u16 {
    1812
}

fn default_nas_identifier() -> String {
    "auth-backend".to_string()
}

fn default_radius_timeout() -> u64 {
    10
}

fn default_retry_interval() -> u64 {
    3
}

fn default_max_attempts() -> u8 {
    3
}

fn default_max_discarded_replies() -> usize {
    32
}

fn default_session_timeout() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    crate::session::DEFAULT_SWEEP_INTERVAL.as_secs()
}

fn default_proxy_name() -> String {
    "Auth".to_string()
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8999
}

impl Default for Config {
    fn default() -> Self {
        Config {
            radius_server: default_radius_server(),
            radius_port: default_radius_port(),
            radius_secret: String::new(),
            radius_nas_identifier: default_nas_identifier(),
            radius_timeout: default_radius_timeout(),
            radius_retry_interval: default_retry_interval(),
            radius_max_attempts: default_max_attempts(),
            radius_max_discarded_replies: default_max_discarded_replies(),
            session_timeout: default_session_timeout(),
            session_sweep_interval: default_sweep_interval(),
            proxy_type: ProxyType::default(),
            proxy_name: default_proxy_name(),
            listen_address: default_listen_address(),
            port: default_port(),
            log_level: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("radius_server", &self.radius_server)
            .field("radius_port", &self.radius_port)
            .field("radius_secret", &"<redacted>")
            .field("radius_nas_identifier", &self.radius_nas_identifier)
            .field("radius_timeout", &self.radius_timeout)
            .field("radius_retry_interval", &self.radius_retry_interval)
            .field("radius_max_attempts", &self.radius_max_attempts)
            .field(
                "radius_max_discarded_replies",
                &self.radius_max_discarded_replies,
            )
            .field("session_timeout", &self.session_timeout)
            .field("session_sweep_interval", &self.session_sweep_interval)
            .field("proxy_type", &self.proxy_type)
            .field("proxy_name", &self.proxy_name)
            .field("listen_address", &self.listen_address)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.radius_server.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "RADIUS server cannot be empty".to_string(),
            ));
        }

        if self.radius_port == 0 {
            return Err(ConfigError::Invalid("RADIUS port cannot be 0".to_string()));
        }

        if self.radius_secret.is_empty() {
            return Err(ConfigError::Invalid(
                "RADIUS secret cannot be empty".to_string(),
            ));
        }

        if self.radius_nas_identifier.len() > radius_proto::Attribute::MAX_VALUE_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "NAS identifier longer than {} bytes",
                radius_proto::Attribute::MAX_VALUE_LENGTH
            )));
        }

        if self.radius_timeout == 0 || self.radius_timeout > MAX_TIMEOUT.as_secs() {
            return Err(ConfigError::Invalid(format!(
                "RADIUS timeout must be between 1 and {} seconds",
                MAX_TIMEOUT.as_secs()
            )));
        }

        if self.radius_retry_interval == 0 || self.radius_retry_interval > self.radius_timeout {
            return Err(ConfigError::Invalid(format!(
                "RADIUS retry interval must be between 1 and {} seconds",
                self.radius_timeout
            )));
        }

        if self.radius_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "RADIUS max attempts cannot be 0".to_string(),
            ));
        }

        if self.session_timeout > MAX_SESSION_TIMEOUT.as_secs() {
            return Err(ConfigError::Invalid(format!(
                "Session timeout cannot exceed {} seconds",
                MAX_SESSION_TIMEOUT.as_secs()
            )));
        }

        if self.session_sweep_interval == 0 {
            return Err(ConfigError::Invalid(
                "Session sweep interval cannot be 0".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid("Port cannot be 0".to_string()));
        }

        self.socket_addr()?;
        Ok(())
    }

    /// Get socket address for the HTTP listener
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr: IpAddr = self.listen_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("Invalid IP address: {}", self.listen_address))
        })?;
        Ok(SocketAddr::new(addr, self.port))
    }

    /// RADIUS client settings derived from this configuration
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server_host: self.radius_server.clone(),
            server_port: self.radius_port,
            secret: self.radius_secret.clone().into_bytes(),
            nas_identifier: self.radius_nas_identifier.clone(),
            timeout: Duration::from_secs(self.radius_timeout),
            retry_interval: Duration::from_secs(self.radius_retry_interval),
            max_attempts: self.radius_max_attempts,
            max_discarded_replies: self.radius_max_discarded_replies,
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval)
    }
}
