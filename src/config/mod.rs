use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration, built once at startup and passed down
/// explicitly to the components that need it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub app: AppSettings,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Local,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub port: u16,
    pub language: String,
    pub timezone: String,
    pub enable_cors: bool,
    pub enable_logger: bool,
    pub enable_request_id: bool,
    pub debug_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual parts
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub refresh_token_expiry_hours: u64,
    pub reset_token_expiry_minutes: u64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Prefix used to turn an avatar uuid into a public URL
    pub asset_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Local,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Local => Self::local(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // App overrides
        if let Some(v) = lookup("APP_PORT") {
            self.app.port = v.parse().unwrap_or(self.app.port);
        }
        if let Some(v) = lookup("APP_LANG") {
            self.app.language = v;
        }
        if let Some(v) = lookup("APP_TIMEZONE") {
            self.app.timezone = v;
        }
        if let Some(v) = lookup("ENABLE_CORS") {
            self.app.enable_cors = v.parse().unwrap_or(self.app.enable_cors);
        }
        if let Some(v) = lookup("ENABLE_LOGGER") {
            self.app.enable_logger = v.parse().unwrap_or(self.app.enable_logger);
        }
        if let Some(v) = lookup("ENABLE_REQUEST_ID") {
            self.app.enable_request_id = v.parse().unwrap_or(self.app.enable_request_id);
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = lookup("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("DB_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Some(v) = lookup("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = lookup("DB_NAME") {
            self.database.name = v;
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Some(v) = lookup("APP_PRIVATE_KEY") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Some(v) = lookup("REFRESH_TOKEN_EXPIRY_HOURS") {
            self.security.refresh_token_expiry_hours =
                v.parse().unwrap_or(self.security.refresh_token_expiry_hours);
        }
        if let Some(v) = lookup("RESET_TOKEN_EXPIRY_MINUTES") {
            self.security.reset_token_expiry_minutes =
                v.parse().unwrap_or(self.security.reset_token_expiry_minutes);
        }
        if let Some(v) = lookup("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Storage overrides
        if let Some(v) = lookup("ASSET_BASE_URL") {
            self.storage.asset_base_url = v.trim_end_matches('/').to_string();
        }

        self.app.debug_mode = self.environment != Environment::Production;
        self
    }

    pub fn local() -> Self {
        Self {
            environment: Environment::Local,
            app: AppSettings {
                port: 8888,
                language: "en".to_string(),
                timezone: "Asia/Jakarta".to_string(),
                enable_cors: true,
                enable_logger: true,
                enable_request_id: true,
                debug_mode: true,
            },
            database: DatabaseConfig {
                url: None,
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                name: "rest_skeleton".to_string(),
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "default-private-key".to_string(),
                jwt_expiry_hours: 24 * 7,
                refresh_token_expiry_hours: 24 * 30,
                reset_token_expiry_minutes: 60,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                cors_origins: vec!["*".to_string()],
            },
            storage: StorageConfig {
                asset_base_url: "http://localhost:9000/rest-skeleton".to_string(),
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::local();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.security.jwt_expiry_hours = 24;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::local();
        config.environment = Environment::Production;
        config.app.debug_mode = false;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.security.jwt_expiry_hours = 4;
        config.security.refresh_token_expiry_hours = 24 * 7;
        config.security.reset_token_expiry_minutes = 15;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config
    }
}

impl DatabaseConfig {
    /// Connection URL, either given directly or assembled from the parts
    pub fn connection_url(&self) -> Result<String, url::ParseError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let mut url = url::Url::parse("postgres://localhost")?;
        url.set_host(Some(&self.host))?;
        // postgres:// URLs always accept credentials and a port
        let _ = url.set_port(Some(self.port));
        let _ = url.set_username(&self.user);
        if !self.password.is_empty() {
            let _ = url.set_password(Some(&self.password));
        }
        url.set_path(&format!("/{}", self.name));
        Ok(url.into())
    }
}
