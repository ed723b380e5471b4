use std::{sync::Arc, time::Duration};

use anyhow::Context;

use crate::{
    analysis::{
        generator::{GeminiClient, TextGenerator},
        news::{DuckDuckGoSearch, NewsRetriever, SearchProvider},
        orchestrator::Analyzer,
        synthesizer::ReportSynthesizer,
    },
    auth::{
        jwt::JwtKeys,
        password::hash_password,
        repo::{CredentialStore, StaticUserDirectory},
        repo_types::UserRecord,
    },
    clock::{Clock, SystemClock},
    config::AppConfig,
    rate_limit::RateLimiter,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub users: Arc<dyn CredentialStore>,
    pub limiter: Arc<RateLimiter>,
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let admin = &config.bootstrap_user;
        let users = Arc::new(StaticUserDirectory::new([UserRecord {
            username: admin.username.clone(),
            password_hash: hash_password(&admin.password).context("hash bootstrap password")?,
            disabled: false,
        }]));

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.upstream_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;

        let search = Arc::new(DuckDuckGoSearch::new(http.clone())) as Arc<dyn SearchProvider>;
        let generator = config
            .gemini
            .as_ref()
            .map(|g| Arc::new(GeminiClient::new(http.clone(), g)) as Arc<dyn TextGenerator>);

        Ok(Self::from_parts(
            Arc::new(config),
            users,
            search,
            generator,
            Arc::new(SystemClock),
        ))
    }

    /// Wire the pipeline from explicit collaborators.
    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn CredentialStore>,
        search: Arc<dyn SearchProvider>,
        generator: Option<Arc<dyn TextGenerator>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let keys = JwtKeys::new(&config.jwt, clock.clone());
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit, clock.clone()));
        let analyzer = Arc::new(Analyzer::new(
            NewsRetriever::new(search, config.news.clone(), config.upstream_timeout),
            ReportSynthesizer::new(generator, config.upstream_timeout),
            clock,
        ));

        Self {
            config,
            keys,
            users,
            limiter,
            analyzer,
        }
    }
}
