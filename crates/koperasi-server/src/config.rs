use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// JWT secrets that MUST NOT be used in production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEV_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub public_dir: PathBuf,
    pub jwt_secret: String,
    pub geo_base_url: String,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let production = match get("KOPERASI_ENV") {
            Some(env) => env == "production",
            None => !cfg!(debug_assertions),
        };

        let host = var("KOPERASI_HOST", "0.0.0.0");
        let port: u16 = var("KOPERASI_PORT", "3000")
            .parse()
            .context("KOPERASI_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("KOPERASI_HOST must be an IP address")?;

        let jwt_secret = get("KOPERASI_JWT_SECRET").unwrap_or_default();
        let jwt_secret = if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            if production {
                bail!("KOPERASI_JWT_SECRET is unset or still a placeholder");
            }
            DEV_SECRET.to_string()
        } else {
            jwt_secret
        };

        Ok(Self {
            addr,
            db_path: var("KOPERASI_DB_PATH", "koperasi.db").into(),
            public_dir: var("KOPERASI_PUBLIC_DIR", "./public").into(),
            jwt_secret,
            geo_base_url: var("KOPERASI_GEO_BASE_URL", "https://wilayah.id/api"),
            production,
        })
    }
}
