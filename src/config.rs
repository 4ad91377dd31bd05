use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Where the congestion feed reads occupancy from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionSource {
    Live,
    Snapshot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub gemini: GeminiConfig,
    pub auth0_domain: Option<String>,
    pub google_client_id: Option<String>,
    pub congestion_url: String,
    pub congestion_source: CongestionSource,
    pub utc_offset_hours: i8,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "campusfit".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "campusfit-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let gemini = GeminiConfig {
            api_key: non_empty_var("GEMINI_API_KEY"),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-pro".into()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".into()),
        };
        let congestion_source = match std::env::var("CONGESTION_SOURCE").as_deref() {
            Ok("snapshot") => CongestionSource::Snapshot,
            Ok("live") | Err(_) => CongestionSource::Live,
            Ok(other) => anyhow::bail!("CONGESTION_SOURCE must be live or snapshot, got {other}"),
        };
        let utc_offset_hours = std::env::var("CAMPUS_UTC_OFFSET_HOURS")
            .ok()
            .and_then(|v| v.parse::<i8>().ok())
            .filter(|h| (-23..=23).contains(h))
            .unwrap_or(-5);

        Ok(Self {
            database_url,
            jwt,
            gemini,
            auth0_domain: non_empty_var("AUTH0_DOMAIN"),
            google_client_id: non_empty_var("GOOGLE_CLIENT_ID"),
            congestion_url: std::env::var("CONGESTION_URL").unwrap_or_else(|_| {
                "https://www.purdue.edu/recwell/facility-usage/index.php".into()
            }),
            congestion_source,
            utc_offset_hours,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
