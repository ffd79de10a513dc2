use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Runtime mode
    pub environment: Environment,
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Photo upload configuration
    pub upload: UploadConfig,
    /// Geocoding provider configuration
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Public base URL, used when building password reset links
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(skip_serializing)]
    pub secret: String,
    pub expiration_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Photo size ceiling in bytes
    pub max_file_size: u64,
    /// Upper bound for any request body (checked against content-length)
    pub max_request_size: u64,
    pub upload_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        // Load config/config.env, then .env, if they exist
        let _ = dotenvy::from_filename("config/config.env");
        let _ = dotenvy::dotenv();

        let environment = match env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .as_str()
        {
            "production" => Environment::Production,
            "development" => Environment::Development,
            other => anyhow::bail!("Invalid APP_ENV value: {}", other),
        };

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid PORT value"))?;

        let config = Self {
            environment,
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                cors_origins: env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                public_url: env::var("PUBLIC_URL")
                    .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            },
            database: DatabaseConfig {
                uri: env::var("MONGO_URI")
                    .map_err(|_| anyhow::anyhow!("MONGO_URI is required"))?,
                name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "devcamper".to_string()),
            },
            jwt: JwtConfig {
                secret: match env::var("JWT_SECRET") {
                    Ok(secret) => secret,
                    Err(_) if environment.is_development() => {
                        // Random secret for local runs; tokens die with the process
                        use rand::Rng;
                        let mut rng = rand::thread_rng();
                        (0..32).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
                    }
                    Err(_) => anyhow::bail!("JWT_SECRET is required in production"),
                },
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "720".to_string())
                    .parse()
                    .unwrap_or(720),
            },
            upload: UploadConfig {
                max_file_size: env::var("MAX_FILE_UPLOAD")
                    .unwrap_or_else(|_| "1000000".to_string())
                    .parse()
                    .unwrap_or(1_000_000),
                max_request_size: env::var("MAX_REQUEST_SIZE")
                    .unwrap_or_else(|_| "20971520".to_string()) // 20MB
                    .parse()
                    .unwrap_or(20_971_520),
                upload_path: env::var("FILE_UPLOAD_PATH")
                    .unwrap_or_else(|_| "./public/uploads".to_string())
                    .into(),
            },
            geocoder: GeocoderConfig {
                base_url: env::var("GEOCODER_URL")
                    .unwrap_or_else(|_| "https://www.mapquestapi.com".to_string()),
                api_key: env::var("GEOCODER_API_KEY").ok().filter(|k| !k.is_empty()),
            },
        };

        Ok(config)
    }
}
