use tracing::{error, info, warn};

use crate::{
    analysis::dto::SectorReport, auth::password::verify_password, error::ApiError,
    state::AppState,
};

/// Directory lookup, password check, token issue.
pub async fn login(state: &AppState, username: &str, password: &str) -> Result<String, ApiError> {
    let user = match state.users.find(username) {
        Some(u) if !u.disabled => u,
        Some(_) => {
            warn!(username = %username, "login for disabled user");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            warn!(username = %username, "login unknown user");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let plain = password.to_owned();
    let hash = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(|e| {
            error!(error = %e, "password verification task failed");
            ApiError::Internal
        })?
        .map_err(|e| {
            error!(error = %e, username = %username, "stored password hash unusable");
            ApiError::Internal
        })?;

    if !ok {
        warn!(username = %username, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.keys.issue(&user.username).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        ApiError::Internal
    })?;
    info!(username = %user.username, "user logged in");
    Ok(token)
}

/// Rate limit, token check, sector validation, analysis. Cheap rejections
/// come before anything that reaches a provider.
pub async fn analyze(
    state: &AppState,
    identity: &str,
    token: Option<&str>,
    sector: &str,
) -> Result<SectorReport, ApiError> {
    let admission = state.limiter.hit(identity);
    if !admission.allowed {
        warn!(identity = %identity, count = admission.count, "rate limited");
        let retry_after_secs = admission.retry_after.as_seconds_f64().ceil().max(1.0) as u64;
        return Err(ApiError::RateLimited { retry_after_secs });
    }

    let Some(token) = token else {
        warn!(identity = %identity, "missing bearer token");
        return Err(ApiError::Unauthenticated);
    };
    let username = state.keys.verify(token).map_err(|e| {
        warn!(identity = %identity, error = %e, "token rejected");
        ApiError::from(e)
    })?;

    // the subject must still name an enabled user
    match state.users.find(&username) {
        Some(u) if !u.disabled => {}
        _ => {
            warn!(username = %username, "token subject not in directory");
            return Err(ApiError::Unauthenticated);
        }
    }

    let report = state.analyzer.analyze(sector).await.map_err(|e| {
        warn!(username = %username, sector = %sector, error = %e, "invalid sector");
        ApiError::from(e)
    })?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::{
        analysis::synthesizer::ANALYSIS_ERROR_MARKDOWN,
        state::fixtures::harness,
        testing::FakeGenerator,
    };

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let h = harness(None);
        let token = login(&h.state, "admin", "secret").await.unwrap();
        assert_eq!(h.state.keys.verify(&token).unwrap(), "admin");
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_uniformly() {
        let h = harness(None);
        for (user, pass) in [
            ("admin", "wrong"),
            ("admin", ""),
            ("nobody", "secret"),
            ("retired", "secret"),
        ] {
            let err = login(&h.state, user, pass).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidCredentials), "{user}/{pass}");
        }
    }

    #[tokio::test]
    async fn analyze_with_valid_token_returns_report() {
        let h = harness(Some(FakeGenerator::replying("## Executive Summary\nok")));
        let token = login(&h.state, "admin", "secret").await.unwrap();
        let report = analyze(&h.state, "10.0.0.1", Some(&token), "Pharma")
            .await
            .unwrap();
        assert_eq!(report.sector, "pharma");
        assert_eq!(report.body, "## Executive Summary\nok");
    }

    #[tokio::test]
    async fn analyze_rejects_expired_token() {
        let h = harness(None);
        let token = login(&h.state, "admin", "secret").await.unwrap();
        h.clock.advance(Duration::minutes(31));
        let err = analyze(&h.state, "10.0.0.1", Some(&token), "tech")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
        assert_eq!(h.search.calls(), 0);
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated() {
        let h = harness(None);
        let err = analyze(&h.state, "10.0.0.1", None, "tech").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn token_for_disabled_user_is_refused() {
        let h = harness(None);
        let token = h.state.keys.issue("retired").unwrap();
        let err = analyze(&h.state, "10.0.0.1", Some(&token), "tech")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }

    #[tokio::test]
    async fn rate_limit_runs_before_authentication() {
        let h = harness(None);
        for _ in 0..5 {
            let err = analyze(&h.state, "10.0.0.9", Some("garbage"), "tech")
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Unauthenticated));
        }
        let err = analyze(&h.state, "10.0.0.9", Some("garbage"), "tech")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { retry_after_secs: 60 }));

        // a different client is unaffected
        let token = login(&h.state, "admin", "secret").await.unwrap();
        assert!(analyze(&h.state, "10.0.0.10", Some(&token), "tech").await.is_ok());
    }

    #[tokio::test]
    async fn invalid_sector_is_rejected_after_auth_without_provider_calls() {
        let h = harness(Some(FakeGenerator::replying("report")));
        let token = login(&h.state, "admin", "secret").await.unwrap();
        let err = analyze(&h.state, "10.0.0.1", Some(&token), "xy")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert_eq!(h.search.calls(), 0);
        assert_eq!(h.generator.as_ref().unwrap().calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_absorbed() {
        let h = harness(Some(FakeGenerator::failing()));
        let token = login(&h.state, "admin", "secret").await.unwrap();
        let report = analyze(&h.state, "10.0.0.1", Some(&token), "tech")
            .await
            .unwrap();
        assert_eq!(report.body, ANALYSIS_ERROR_MARKDOWN);
    }
}
