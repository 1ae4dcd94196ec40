use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public base URL, used to build the verification link sent by email.
    pub app_url: String,
    /// Gates the Secure cookie attribute.
    pub production: bool,
    pub session: SessionConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let app_url =
            std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8080".into());
        let production = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")?,
            ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };
        let email = EmailConfig {
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "QA System <onboarding@resend.dev>".into()),
        };
        Ok(Self {
            database_url,
            app_url,
            production,
            session,
            email,
        })
    }
}
