use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub allowed_origins: Vec<String>,
    pub jwt_secret: String,
    pub token_expiry: Duration,
    /// Argon2 iteration count used when hashing new passwords.
    pub hash_cost: u32,
    pub storage_url: String,
    pub storage_key: String,
    pub storage_bucket: String,
    pub upload_path: PathBuf,
    pub max_upload_size: usize,
}

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "dev-secret-change-me"];

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("{key} must be set"))
        };

        let host = var("HOST", "0.0.0.0");
        let port = var("PORT", "4000").parse().map_err(|_| "Invalid PORT")?;

        let database_path = var("DATABASE_PATH", "sharedspace.db").into();

        let allowed_origins = var("ALLOWED_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let jwt_secret = required("JWT_SECRET")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err("JWT_SECRET is still a placeholder".to_string());
        }

        let token_expiry = parse_expiry(&var("TOKEN_EXPIRY", "2d"))?;

        let hash_cost = var("HASH_COST", "2")
            .parse()
            .ok()
            .filter(|cost: &u32| *cost >= 1)
            .ok_or("Invalid HASH_COST")?;

        let storage_url = required("STORAGE_URL")?;
        let storage_key = required("STORAGE_KEY")?;
        let storage_bucket = required("STORAGE_BUCKET")?;

        let upload_path = var("UPLOAD_PATH", "uploads").into();

        let max_upload_size = var("MAX_UPLOAD_SIZE", "5242880")
            .parse()
            .map_err(|_| "Invalid MAX_UPLOAD_SIZE")?;

        Ok(Config {
            host,
            port,
            database_path,
            allowed_origins,
            jwt_secret,
            token_expiry,
            hash_cost,
            storage_url,
            storage_key,
            storage_bucket,
            upload_path,
            max_upload_size,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a token lifetime such as `90`, `30m`, `12h` or `2d`.
/// A bare number is a count of seconds.
pub fn parse_expiry(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let invalid = || format!("Invalid TOKEN_EXPIRY: {raw:?}");

    let (digits, unit_secs) = match raw.char_indices().last() {
        Some((idx, 's')) => (&raw[..idx], 1),
        Some((idx, 'm')) => (&raw[..idx], 60),
        Some((idx, 'h')) => (&raw[..idx], 3600),
        Some((idx, 'd')) => (&raw[..idx], 86_400),
        Some(_) => (raw, 1),
        None => return Err(invalid()),
    };

    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    if amount == 0 {
        return Err(invalid());
    }

    amount
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}
