use std::time::Duration;

use anyhow::Context;
use jsonwebtoken::Algorithm;
use tracing::warn;

const DEFAULT_SECRET: &str = "change-this-secret-in-production";

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub max_results: usize,
    pub region: String,
    pub timelimit: String,
}

/// Credential seeded into the static user directory at startup.
#[derive(Debug, Clone)]
pub struct BootstrapUser {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub gemini: Option<GeminiConfig>,
    pub rate_limit: RateLimitConfig,
    pub news: NewsConfig,
    pub upstream_timeout: Duration,
    pub bootstrap_user: BootstrapUser,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("SECRET_KEY").unwrap_or_else(|_| {
            warn!("SECRET_KEY not set; using the built-in development secret");
            DEFAULT_SECRET.into()
        });
        let algorithm = parse_algorithm(
            &std::env::var("ALGORITHM").unwrap_or_else(|_| "HS256".into()),
        )?;
        let jwt = JwtConfig {
            secret,
            algorithm,
            ttl_minutes: env_parse("ACCESS_TOKEN_EXPIRE_MINUTES", 30),
        };

        let gemini = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|api_key| GeminiConfig {
                api_key,
                model: std::env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-1.5-flash".into()),
            });
        if gemini.is_none() {
            warn!("GEMINI_API_KEY not set; reports will be served in fallback mode");
        }

        Ok(Self {
            jwt,
            gemini,
            rate_limit: RateLimitConfig {
                max_requests: env_parse("RATE_LIMIT_REQUESTS", 5),
                window_seconds: env_parse("RATE_LIMIT_WINDOW_SECONDS", 60),
            },
            news: NewsConfig {
                max_results: env_parse("NEWS_MAX_RESULTS", 5),
                region: std::env::var("NEWS_REGION").unwrap_or_else(|_| "in-en".into()),
                timelimit: std::env::var("NEWS_TIMELIMIT").unwrap_or_else(|_| "w".into()),
            },
            upstream_timeout: Duration::from_secs(env_parse("UPSTREAM_TIMEOUT_SECONDS", 20)),
            bootstrap_user: BootstrapUser {
                username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
                password: std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "secret".into()),
            },
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Only the symmetric HMAC family is accepted; the secret is a shared key.
pub fn parse_algorithm(name: &str) -> anyhow::Result<Algorithm> {
    let alg: Algorithm = name
        .trim()
        .parse()
        .with_context(|| format!("unknown signing algorithm {name:?}"))?;
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(alg),
        other => anyhow::bail!("signing algorithm {other:?} is not a symmetric HMAC algorithm"),
    }
}
