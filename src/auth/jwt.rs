use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::Duration;
use tracing::debug;

use crate::{auth::claims::Claims, clock::Clock, config::JwtConfig, error::AuthError};

/// Signing and verification keys with the token policy. Built once at
/// startup; read-only afterwards.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    access_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(cfg.algorithm);
        // expiry is checked against the injected clock, without leeway
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            validation,
            access_ttl: Duration::minutes(cfg.ttl_minutes),
            clock,
        }
    }

    pub fn issue(&self, username: &str) -> anyhow::Result<String> {
        let now = self.clock.now();
        let exp = now + self.access_ttl;
        let claims = Claims {
            sub: Some(username.to_owned()),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(username = %username, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Returns the token subject when the signature, algorithm and expiry
    /// all check out.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AuthError::InvalidToken
        })?;
        let claims = data.claims;

        if claims.exp <= self.clock.now().unix_timestamp() {
            return Err(AuthError::ExpiredToken);
        }

        match claims.sub {
            Some(sub) if !sub.is_empty() => {
                debug!(username = %sub, "jwt verified");
                Ok(sub)
            }
            _ => Err(AuthError::UnknownSubject),
        }
    }
}
