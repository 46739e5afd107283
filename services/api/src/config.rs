use screener_core::{
    llm_client::{DEFAULT_CHAT_MODEL, DEFAULT_TEMPERATURE},
    quota::{DEFAULT_INTERVIEW_LIMIT, DEFAULT_TRANSCRIPT_PREFIX},
    storage::{DEFAULT_API_URL, DEFAULT_CONTENT_URL},
    topic::DEFAULT_TERMINAL_PHRASE,
};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_TOKEN_URL: &str = "https://api.dropbox.com/oauth2/token";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// How the service authenticates against the storage API.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageAuth {
    /// A long-lived access token.
    Static { token: String },
    /// A refresh token exchanged for a short-lived access token on every call.
    Refresh {
        refresh_token: String,
        app_key: String,
        app_secret: String,
        token_url: String,
    },
}

// Secrets stay out of logs.
impl std::fmt::Debug for StorageAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageAuth::Static { .. } => write!(f, "Static"),
            StorageAuth::Refresh { token_url, .. } => {
                f.debug_struct("Refresh").field("token_url", token_url).finish()
            }
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub chat_model: String,
    pub temperature: f32,
    pub log_level: Level,
    pub storage_auth: StorageAuth,
    pub dropbox_api_url: String,
    pub dropbox_content_url: String,
    pub transcript_folder: String,
    pub transcript_prefix: String,
    pub interview_limit: usize,
    pub terminal_phrase: String,
    /// Sessions untouched for this long are dropped.
    pub session_idle_timeout: Duration,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let openai_api_base = var_or("OPENAI_API_BASE", "https://api.openai.com/v1");
        let chat_model = var_or("CHAT_MODEL", DEFAULT_CHAT_MODEL);
        let temperature = parse_var("CHAT_TEMPERATURE", DEFAULT_TEMPERATURE)?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let storage_auth = Self::storage_auth_from_env()?;

        let interview_limit = parse_var("INTERVIEW_LIMIT", DEFAULT_INTERVIEW_LIMIT)?;
        let terminal_phrase = var_or("TERMINAL_PHRASE", DEFAULT_TERMINAL_PHRASE);
        if terminal_phrase.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "TERMINAL_PHRASE".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let idle_secs = parse_var("SESSION_IDLE_TIMEOUT_SECS", DEFAULT_SESSION_IDLE_SECS)?;
        if idle_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_IDLE_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            openai_api_key,
            openai_api_base,
            chat_model,
            temperature,
            log_level,
            storage_auth,
            dropbox_api_url: var_or("DROPBOX_API_URL", DEFAULT_API_URL),
            dropbox_content_url: var_or("DROPBOX_CONTENT_URL", DEFAULT_CONTENT_URL),
            transcript_folder: var_or("TRANSCRIPT_FOLDER", "/interview_transcripts"),
            transcript_prefix: var_or("TRANSCRIPT_PREFIX", DEFAULT_TRANSCRIPT_PREFIX),
            interview_limit,
            terminal_phrase,
            session_idle_timeout: Duration::from_secs(idle_secs),
        })
    }

    /// Prefers the refresh-token flow when a refresh token is configured.
    fn storage_auth_from_env() -> Result<StorageAuth, ConfigError> {
        if let Ok(refresh_token) = std::env::var("DROPBOX_REFRESH_TOKEN") {
            let app_key = std::env::var("DROPBOX_APP_KEY").map_err(|_| {
                ConfigError::MissingVar(
                    "DROPBOX_APP_KEY must be set with DROPBOX_REFRESH_TOKEN".to_string(),
                )
            })?;
            let app_secret = std::env::var("DROPBOX_APP_SECRET").map_err(|_| {
                ConfigError::MissingVar(
                    "DROPBOX_APP_SECRET must be set with DROPBOX_REFRESH_TOKEN".to_string(),
                )
            })?;
            return Ok(StorageAuth::Refresh {
                refresh_token,
                app_key,
                app_secret,
                token_url: var_or("DROPBOX_TOKEN_URL", DEFAULT_TOKEN_URL),
            });
        }

        std::env::var("DROPBOX_TOKEN")
            .map(|token| StorageAuth::Static { token })
            .map_err(|_| {
                ConfigError::MissingVar(
                    "DROPBOX_TOKEN or DROPBOX_REFRESH_TOKEN must be set".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            for var in [
                "BIND_ADDRESS",
                "OPENAI_API_KEY",
                "OPENAI_API_BASE",
                "CHAT_MODEL",
                "CHAT_TEMPERATURE",
                "RUST_LOG",
                "DROPBOX_TOKEN",
                "DROPBOX_REFRESH_TOKEN",
                "DROPBOX_APP_KEY",
                "DROPBOX_APP_SECRET",
                "DROPBOX_TOKEN_URL",
                "DROPBOX_API_URL",
                "DROPBOX_CONTENT_URL",
                "TRANSCRIPT_FOLDER",
                "TRANSCRIPT_PREFIX",
                "INTERVIEW_LIMIT",
                "TERMINAL_PHRASE",
                "SESSION_IDLE_TIMEOUT_SECS",
            ] {
                env::remove_var(var);
            }
        }
    }

    fn set_minimal_env() {
        unsafe {
            env::set_var("OPENAI_API_KEY", "test-openai-key");
            env::set_var("DROPBOX_TOKEN", "sl.static-token");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    fn test_storage_auth_debug_hides_secrets() {
        let auth = StorageAuth::Refresh {
            refresh_token: "secret-refresh".to_string(),
            app_key: "key".to_string(),
            app_secret: "secret-app".to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        };
        let debug = format!("{:?}", auth);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("oauth2/token"));
        assert_eq!(
            format!("{:?}", StorageAuth::Static { token: "sl.x".into() }),
            "Static"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal() {
        clear_env_vars();
        set_minimal_env();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.openai_api_key, "test-openai-key");
        assert_eq!(config.openai_api_base, "https://api.openai.com/v1");
        assert_eq!(config.chat_model, "gpt-4");
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(
            config.storage_auth,
            StorageAuth::Static {
                token: "sl.static-token".to_string()
            }
        );
        assert_eq!(config.dropbox_api_url, "https://api.dropboxapi.com");
        assert_eq!(config.dropbox_content_url, "https://content.dropboxapi.com");
        assert_eq!(config.transcript_folder, "/interview_transcripts");
        assert_eq!(config.transcript_prefix, "transcript_");
        assert_eq!(config.interview_limit, 10_000);
        assert_eq!(config.terminal_phrase, "let's move on");
        assert_eq!(config.session_idle_timeout, Duration::from_secs(1800));
    }

    #[test]
    #[serial]
    fn test_config_prefers_refresh_token() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("DROPBOX_REFRESH_TOKEN", "refresh-abc");
            env::set_var("DROPBOX_APP_KEY", "app-key");
            env::set_var("DROPBOX_APP_SECRET", "app-secret");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(
            config.storage_auth,
            StorageAuth::Refresh {
                refresh_token: "refresh-abc".to_string(),
                app_key: "app-key".to_string(),
                app_secret: "app-secret".to_string(),
                token_url: DEFAULT_TOKEN_URL.to_string(),
            }
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("CHAT_MODEL", "gpt-4o");
            env::set_var("CHAT_TEMPERATURE", "0.2");
            env::set_var("RUST_LOG", "debug");
            env::set_var("TRANSCRIPT_FOLDER", "/screening");
            env::set_var("TRANSCRIPT_PREFIX", "run_");
            env::set_var("INTERVIEW_LIMIT", "25");
            env::set_var("TERMINAL_PHRASE", "next topic");
            env::set_var("SESSION_IDLE_TIMEOUT_SECS", "90");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.chat_model, "gpt-4o");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.transcript_folder, "/screening");
        assert_eq!(config.transcript_prefix, "run_");
        assert_eq!(config.interview_limit, 25);
        assert_eq!(config.terminal_phrase, "next topic");
        assert_eq!(config.session_idle_timeout, Duration::from_secs(90));
    }

    #[test]
    #[serial]
    fn test_config_missing_openai_key() {
        clear_env_vars();
        unsafe {
            env::set_var("DROPBOX_TOKEN", "sl.static-token");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("OPENAI_API_KEY")),
            _ => panic!("Expected MissingVar for OPENAI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_storage_credentials() {
        clear_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("DROPBOX_TOKEN")),
            _ => panic!("Expected MissingVar for DROPBOX_TOKEN"),
        }
    }

    #[test]
    #[serial]
    fn test_config_refresh_token_requires_app_credentials() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("DROPBOX_REFRESH_TOKEN", "refresh-abc");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("DROPBOX_APP_KEY")),
            _ => panic!("Expected MissingVar for DROPBOX_APP_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_values() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("INTERVIEW_LIMIT", "lots");
        }
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "INTERVIEW_LIMIT"),
            _ => panic!("Expected InvalidValue for INTERVIEW_LIMIT"),
        }

        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }

        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }

        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("SESSION_IDLE_TIMEOUT_SECS", "0");
        }
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "SESSION_IDLE_TIMEOUT_SECS"),
            _ => panic!("Expected InvalidValue for SESSION_IDLE_TIMEOUT_SECS"),
        }
    }
}
