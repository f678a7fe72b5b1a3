use std::time::Duration;

/// What the gateway does with room/relay events sent before `authenticate`
/// has succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedPolicy {
    /// Drop the event and log a warning.
    Reject,
    /// Process the event as if the connection were authenticated.
    Permissive,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bot_token: String,
    pub auth_max_age_secs: i64,
    pub unauthenticated: UnauthenticatedPolicy,
    pub save_max_attempts: u32,
    pub save_backoff: Duration,
}

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub static_dir: std::path::PathBuf,
    pub relay: RelayConfig,
}

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_AUTH_MAX_AGE_SECS: i64 = 86_400;
pub const DEFAULT_SAVE_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_SAVE_BACKOFF_MS: u64 = 1000;

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let bot_token = std::env::var("BOT_TOKEN").expect("BOT_TOKEN is required");

        let unauthenticated = match std::env::var("RELAY_REQUIRE_AUTH")
            .unwrap_or_else(|_| "true".to_string())
            .to_lowercase()
            .as_str()
        {
            "0" | "false" | "no" => UnauthenticatedPolicy::Permissive,
            _ => UnauthenticatedPolicy::Reject,
        };

        let save_max_attempts = env_parse::<u32>("RELAY_SAVE_MAX_ATTEMPTS")
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SAVE_MAX_ATTEMPTS);

        let relay = RelayConfig {
            bot_token,
            auth_max_age_secs: env_parse("RELAY_AUTH_MAX_AGE_SECS")
                .unwrap_or(DEFAULT_AUTH_MAX_AGE_SECS),
            unauthenticated,
            save_max_attempts,
            save_backoff: Duration::from_millis(
                env_parse("RELAY_SAVE_BACKOFF_MS").unwrap_or(DEFAULT_SAVE_BACKOFF_MS),
            ),
        };

        Self {
            port: env_parse("PORT").unwrap_or(DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:gestures.db?mode=rwc".to_string()),
            static_dir: std::env::var("RELAY_STATIC_DIR")
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|_| std::path::PathBuf::from("public")),
            relay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("PORT");
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("RELAY_STATIC_DIR");
        std::env::remove_var("RELAY_REQUIRE_AUTH");
        std::env::remove_var("RELAY_AUTH_MAX_AGE_SECS");
        std::env::remove_var("RELAY_SAVE_MAX_ATTEMPTS");
        std::env::remove_var("RELAY_SAVE_BACKOFF_MS");
        std::env::set_var("BOT_TOKEN", "123456:test-token");
    }

    #[test]
    #[serial]
    fn test_default_config() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "sqlite:gestures.db?mode=rwc");
        assert_eq!(config.static_dir, std::path::PathBuf::from("public"));
        assert_eq!(config.relay.bot_token, "123456:test-token");
        assert_eq!(config.relay.auth_max_age_secs, 86_400);
        assert_eq!(config.relay.unauthenticated, UnauthenticatedPolicy::Reject);
        assert_eq!(config.relay.save_max_attempts, 3);
        assert_eq!(config.relay.save_backoff, Duration::from_millis(1000));
    }

    #[test]
    #[serial]
    fn test_port_from_env() {
        clear_env();
        std::env::set_var("PORT", "8080");
        let config = Config::from_env();
        assert_eq!(config.port, 8080);
    }

    #[test]
    #[serial]
    fn test_invalid_port_falls_back_to_default() {
        clear_env();
        std::env::set_var("PORT", "not_a_number");
        let config = Config::from_env();
        assert_eq!(config.port, 3000);
    }

    #[test]
    #[serial]
    fn test_permissive_policy() {
        clear_env();
        std::env::set_var("RELAY_REQUIRE_AUTH", "false");
        let config = Config::from_env();
        assert_eq!(
            config.relay.unauthenticated,
            UnauthenticatedPolicy::Permissive
        );
    }

    #[test]
    #[serial]
    fn test_retry_settings_from_env() {
        clear_env();
        std::env::set_var("RELAY_SAVE_MAX_ATTEMPTS", "5");
        std::env::set_var("RELAY_SAVE_BACKOFF_MS", "250");
        let config = Config::from_env();
        assert_eq!(config.relay.save_max_attempts, 5);
        assert_eq!(config.relay.save_backoff, Duration::from_millis(250));
    }

    #[test]
    #[serial]
    fn test_zero_attempts_falls_back_to_default() {
        clear_env();
        std::env::set_var("RELAY_SAVE_MAX_ATTEMPTS", "0");
        let config = Config::from_env();
        assert_eq!(config.relay.save_max_attempts, 3);
    }

    #[test]
    #[serial]
    #[should_panic(expected = "BOT_TOKEN is required")]
    fn test_missing_bot_token_panics() {
        clear_env();
        std::env::remove_var("BOT_TOKEN");
        Config::from_env();
    }
}
