//! Server configuration loaded from environment variables

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_PLAYERS: usize = 8;
const DEFAULT_EMPTY_ROOM_GRACE_SECS: u64 = 60;
const DEFAULT_RECONNECT_GRACE_SECS: u64 = 10 * 60;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Capacity applied when a new token tries to join
    pub max_players: usize,
    /// How long an empty room survives before deletion
    pub empty_room_grace: Duration,
    /// How long a disconnected player keeps their seat
    pub reconnect_grace: Duration,
    /// Whether Spy/Infiltrator voters may vote for themselves
    pub allow_self_vote: bool,
    /// JSON catalog file (None = embedded default)
    pub catalog_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_players: DEFAULT_MAX_PLAYERS,
            empty_room_grace: Duration::from_secs(DEFAULT_EMPTY_ROOM_GRACE_SECS),
            reconnect_grace: Duration::from_secs(DEFAULT_RECONNECT_GRACE_SECS),
            allow_self_vote: true,
            catalog_path: None,
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let port = parse_env("PORT", DEFAULT_PORT);
        let max_players = parse_env("MAX_PLAYERS_PER_ROOM", DEFAULT_MAX_PLAYERS).max(2);
        let empty_room_grace = Duration::from_secs(parse_env(
            "EMPTY_ROOM_GRACE_SECS",
            DEFAULT_EMPTY_ROOM_GRACE_SECS,
        ));
        let reconnect_grace = Duration::from_secs(parse_env(
            "RECONNECT_GRACE_SECS",
            DEFAULT_RECONNECT_GRACE_SECS,
        ));

        let allow_self_vote = std::env::var("ALLOW_SELF_VOTE")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(true);

        let catalog_path = std::env::var("CATALOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        tracing::info!(
            port,
            max_players,
            empty_room_grace_secs = empty_room_grace.as_secs(),
            reconnect_grace_secs = reconnect_grace.as_secs(),
            allow_self_vote,
            "Server config loaded"
        );

        Self {
            port,
            max_players,
            empty_room_grace,
            reconnect_grace,
            allow_self_vote,
            catalog_path,
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Invalid value {:?} for {}, using {}", raw, key, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "PORT",
        "MAX_PLAYERS_PER_ROOM",
        "EMPTY_ROOM_GRACE_SECS",
        "RECONNECT_GRACE_SECS",
        "ALLOW_SELF_VOTE",
        "CATALOG_PATH",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = ServerConfig::from_env();

        assert_eq!(config.port, 3000);
        assert_eq!(config.max_players, 8);
        assert_eq!(config.empty_room_grace, Duration::from_secs(60));
        assert_eq!(config.reconnect_grace, Duration::from_secs(600));
        assert!(config.allow_self_vote);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    #[serial]
    fn test_overrides_from_env() {
        clear_env();
        std::env::set_var("PORT", "8080");
        std::env::set_var("RECONNECT_GRACE_SECS", "5");
        std::env::set_var("ALLOW_SELF_VOTE", "false");
        std::env::set_var("CATALOG_PATH", "  /tmp/catalog.json ");

        let config = ServerConfig::from_env();
        clear_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.reconnect_grace, Duration::from_secs(5));
        assert!(!config.allow_self_vote);
        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/tmp/catalog.json"))
        );
    }

    #[test]
    #[serial]
    fn test_invalid_numbers_fall_back() {
        clear_env();
        std::env::set_var("MAX_PLAYERS_PER_ROOM", "lots");
        std::env::set_var("EMPTY_ROOM_GRACE_SECS", "-3");

        let config = ServerConfig::from_env();
        clear_env();

        assert_eq!(config.max_players, 8);
        assert_eq!(config.empty_room_grace, Duration::from_secs(60));
    }
}
