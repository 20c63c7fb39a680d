use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Bearer token required on mutating endpoints. Optional: when unset the
    /// service runs in trusted-backend mode and skips the check.
    pub api_token: Option<String>,
    /// TTL in seconds for cached credit analyses.
    pub credito_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            api_token: std::env::var("API_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            credito_cache_ttl_secs: std::env::var("CREDITO_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("CREDITO_CACHE_TTL_SECS must be a number of seconds")
                })?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        if config.api_token.is_some() {
            tracing::info!("API token configured; mutating endpoints require authorization");
        } else {
            tracing::warn!("API_TOKEN not set; mutating endpoints are unauthenticated");
        }
        tracing::debug!("Credit cache TTL: {}s", config.credito_cache_ttl_secs);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
