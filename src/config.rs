// src/config.rs

use std::{env, fmt, net::SocketAddr};

use dotenvy::dotenv;
use url::Url;

use crate::models::subscription::PlanType;

/// Payment provider settings.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Base URL of the REST API, always ending in `/`.
    pub api_base: Url,
    pub price_monthly: String,
    pub price_yearly: String,
}

impl StripeConfig {
    /// Provider price id for a plan.
    pub fn price_for(&self, plan: PlanType) -> &str {
        match plan {
            PlanType::Monthly => &self.price_monthly,
            PlanType::Yearly => &self.price_yearly,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL. When unset the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub report_price_cents: i64,
    pub report_currency: String,
    pub stripe: StripeConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, reason } => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let invalid = |key: &'static str, reason: String| ConfigError::Invalid { key, reason };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = match lookup("JWT_EXPIRATION") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| invalid("JWT_EXPIRATION", e.to_string()))?,
            None => 86_400,
        };

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e.to_string()))?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let report_price_cents = match lookup("REPORT_PRICE_CENTS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|cents| *cents > 0)
                .ok_or_else(|| invalid("REPORT_PRICE_CENTS", "must be a positive integer".into()))?,
            None => 999,
        };

        let report_currency = lookup("REPORT_CURRENCY")
            .unwrap_or_else(|| "usd".to_string())
            .to_ascii_lowercase();
        if report_currency.len() != 3 {
            return Err(invalid("REPORT_CURRENCY", "must be a 3-letter ISO code".into()));
        }

        let mut api_base = lookup("STRIPE_API_BASE")
            .unwrap_or_else(|| "https://api.stripe.com/".to_string());
        if !api_base.ends_with('/') {
            api_base.push('/');
        }
        let api_base = Url::parse(&api_base).map_err(|e| invalid("STRIPE_API_BASE", e.to_string()))?;

        let stripe = StripeConfig {
            secret_key: required("STRIPE_SECRET_KEY")?,
            api_base,
            price_monthly: required("STRIPE_PRICE_MONTHLY")?,
            price_yearly: required("STRIPE_PRICE_YEARLY")?,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            cors_origins,
            report_price_cents,
            report_currency,
            stripe,
        })
    }
}
