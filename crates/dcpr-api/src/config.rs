use std::env;

/// HTTP server settings loaded from environment variables.
///
/// Retrieval settings come from the shared layered configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origin: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3001, cors_origin: "http://localhost:3000".to_string() }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("DCPR_API_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let cors_origin = env::var("DCPR_CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Self { port, cors_origin }
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("DCPR_API_PORT", "8088");
        env::set_var("DCPR_CORS_ORIGIN", "https://dcpr.example");

        let config = ApiConfig::from_env();
        assert_eq!(config.port, 8088);
        assert_eq!(config.cors_origin, "https://dcpr.example");
        assert_eq!(config.bind_address(), "0.0.0.0:8088");

        env::remove_var("DCPR_API_PORT");
        env::remove_var("DCPR_CORS_ORIGIN");
    }

    #[test]
    #[serial]
    fn test_unparseable_port_uses_default() {
        env::set_var("DCPR_API_PORT", "not-a-port");

        assert_eq!(ApiConfig::from_env().port, 3001);

        env::remove_var("DCPR_API_PORT");
    }
}
