//! Configuration management for the voice chat gateway

use std::path::PathBuf;

use crate::{Error, Result};

/// Default server port
pub const DEFAULT_PORT: u16 = 3000;

/// Default browser origin allowed by CORS
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Default session server endpoint for clients
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Default reverse-geocoding service
pub const DEFAULT_GEOCODE_URL: &str = "https://maps.devsecit.com";

/// Where user records are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// `SQLite` file on disk
    File(PathBuf),
    /// Private in-memory database
    Memory,
}

impl DatabaseLocation {
    /// Parse a connection string (`:memory:`, `sqlite://path` or a plain path)
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let trimmed = url.trim();
        match trimmed {
            ":memory:" | "sqlite::memory:" | "sqlite://:memory:" => Self::Memory,
            _ => {
                let path = trimmed
                    .strip_prefix("sqlite://")
                    .or_else(|| trimmed.strip_prefix("sqlite:"))
                    .unwrap_or(trimmed);
                Self::File(PathBuf::from(path))
            }
        }
    }
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Record store location (from `DATABASE_URL`)
    pub database: DatabaseLocation,

    /// Single origin allowed for cross-origin requests
    pub cors_origin: String,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,

    /// Reverse-geocoding base URL
    pub geocode_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database: DatabaseLocation::Memory,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            static_dir: None,
            geocode_url: DEFAULT_GEOCODE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if `PORT` is set but not a valid port number
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT: {raw}")))?,
            Err(_) => DEFAULT_PORT,
        };

        let database = std::env::var("DATABASE_URL")
            .map_or_else(|_| DatabaseLocation::File(default_database_path()), |url| {
                DatabaseLocation::parse(&url)
            });

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string());

        let static_dir = std::env::var("VOICECHAT_STATIC_DIR").ok().map(PathBuf::from);

        let geocode_url =
            std::env::var("GEOCODE_URL").unwrap_or_else(|_| DEFAULT_GEOCODE_URL.to_string());

        Ok(Self {
            port,
            database,
            cors_origin,
            static_dir,
            geocode_url,
        })
    }

    /// Override the listen port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Default database file in the XDG data directory, creating it if needed
///
/// Uses `~/.local/share/voicechat/voicechat.db` on Linux
fn default_database_path() -> PathBuf {
    let data_dir = directories::ProjectDirs::from("dev", "voicechat", "voicechat")
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().to_path_buf());

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::warn!(
            path = %data_dir.display(),
            error = %e,
            "failed to create data directory"
        );
    }

    data_dir.join("voicechat.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_memory_urls() {
        assert_eq!(DatabaseLocation::parse(":memory:"), DatabaseLocation::Memory);
        assert_eq!(
            DatabaseLocation::parse("sqlite::memory:"),
            DatabaseLocation::Memory
        );
    }

    #[test]
    fn parses_file_urls() {
        assert_eq!(
            DatabaseLocation::parse("sqlite:///var/lib/users.db"),
            DatabaseLocation::File(PathBuf::from("/var/lib/users.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("users.db"),
            DatabaseLocation::File(PathBuf::from("users.db"))
        );
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origin, "http://localhost:5173");
        assert!(config.static_dir.is_none());
    }
}
