use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub default_radius_km: f64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let default_radius_km = env::var("DEFAULT_RADIUS_KM")
            .ok()
            .and_then(|r| r.parse::<f64>().ok())
            .unwrap_or(5.0);
        Ok(Self {
            database_url,
            host,
            port,
            default_radius_km,
        })
    }
}
