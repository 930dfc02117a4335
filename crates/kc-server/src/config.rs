//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Base URL for the server (used in generated URLs).
    pub base_url: String,

    /// CORS allowed origins (comma-separated).
    pub cors_origins: Vec<String>,

    /// Enable admin API.
    pub admin_api_enabled: bool,

    /// Bearer token accepted by the admin API.
    pub admin_token: String,

    /// Username recorded in admin events for the admin token.
    pub admin_username: String,

    /// Log level.
    pub log_level: String,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin API is enabled and `KC_ADMIN_TOKEN`
    /// is unset or empty.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let host = std::env::var("KC_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("KC_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let base_url = std::env::var("KC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));

        let cors_origins = std::env::var("KC_CORS_ORIGINS")
            .map(|s| s.split(',').map(str::trim).map(String::from).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let admin_api_enabled = std::env::var("KC_ADMIN_API_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);

        let admin_token = std::env::var("KC_ADMIN_TOKEN").unwrap_or_default();
        if admin_api_enabled && admin_token.trim().is_empty() {
            anyhow::bail!("KC_ADMIN_TOKEN environment variable is required when the admin API is enabled");
        }

        let admin_username =
            std::env::var("KC_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            host,
            port,
            base_url,
            cors_origins,
            admin_api_enabled,
            admin_token,
            admin_username,
            log_level,
        })
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub fn for_testing(admin_token: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            base_url: "http://localhost:8080".to_string(),
            cors_origins: vec!["*".to_string()],
            admin_api_enabled: true,
            admin_token: admin_token.to_string(),
            admin_username: "admin".to_string(),
            log_level: "debug".to_string(),
        }
    }

    /// Returns the address to bind to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            cors_origins: vec!["*".to_string()],
            admin_api_enabled: true,
            admin_token: String::new(),
            admin_username: "admin".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testing_config_binds_random_port() {
        let config = ServerConfig::for_testing("secret");
        assert_eq!(config.port, 0);
        assert_eq!(config.bind_address(), "127.0.0.1:0");
        assert_eq!(config.admin_token, "secret");
        assert!(config.admin_api_enabled);
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.admin_username, "admin");
        assert!(config.admin_token.is_empty());
    }
}
