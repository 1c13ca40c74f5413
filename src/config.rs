use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub care: CareConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for auth endpoints (e.g. /api/auth/login)
    pub auth_per_second: u32,
    /// Burst size for auth endpoints
    pub auth_burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CareConfig {
    /// Maximum caregivers per patient circle, enforced at invite time.
    pub max_caregivers: i64,
    /// Default daily hydration goal (fluid ounces) for new circles.
    pub default_hydration_goal_oz: i64,
    /// Default daily juice goal (fluid ounces); 0 disables juice tracking.
    pub default_juice_goal_oz: i64,
    /// Hours since the last positive bowel log before the status turns cautionary.
    pub bm_caution_hours: i64,
    /// Hours since the last positive bowel log before intervention is flagged.
    pub bm_alert_hours: i64,
    /// Maximum number of team messages returned per fetch.
    pub message_history_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/carecircle.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .map_err(|_| ConfigError::MissingEnv("JWT_SECRET".to_string()))?,
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .unwrap_or(24),
            },
            rate_limit: RateLimitConfig {
                auth_per_second: env::var("RATE_LIMIT_AUTH_PER_SECOND")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
                auth_burst: env::var("RATE_LIMIT_AUTH_BURST")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            care: CareConfig {
                max_caregivers: env::var("CARE_MAX_CAREGIVERS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
                default_hydration_goal_oz: env::var("CARE_DEFAULT_HYDRATION_GOAL_OZ")
                    .unwrap_or_else(|_| "128".to_string())
                    .parse()
                    .unwrap_or(128),
                default_juice_goal_oz: env::var("CARE_DEFAULT_JUICE_GOAL_OZ")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()
                    .unwrap_or(0),
                bm_caution_hours: env::var("CARE_BM_CAUTION_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .unwrap_or(24),
                bm_alert_hours: env::var("CARE_BM_ALERT_HOURS")
                    .unwrap_or_else(|_| "48".to_string())
                    .parse()
                    .unwrap_or(48),
                message_history_limit: env::var("CARE_MESSAGE_HISTORY_LIMIT")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .unwrap_or(100),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/carecircle.db".to_string(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: String::new(),
                expiration_hours: 24,
            },
            rate_limit: RateLimitConfig {
                auth_per_second: 3,
                auth_burst: 10,
            },
            care: CareConfig {
                max_caregivers: 5,
                default_hydration_goal_oz: 128,
                default_juice_goal_oz: 0,
                bm_caution_hours: 24,
                bm_alert_hours: 48,
                message_history_limit: 100,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_care_team_expectations() {
        let config = Config::default();
        assert_eq!(config.care.max_caregivers, 5);
        assert_eq!(config.care.default_hydration_goal_oz, 128);
        assert_eq!(config.care.bm_alert_hours, 48);
        assert!(config.care.bm_caution_hours < config.care.bm_alert_hours);
    }
}
