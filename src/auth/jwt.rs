use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError, state::AppState, users::repo_types::UserId};

/// The presented credential could not be decoded to a user.
#[derive(Debug, thiserror::Error)]
#[error("invalid credential")]
pub struct InvalidCredential;

impl From<InvalidCredential> for AppError {
    fn from(_: InvalidCredential) -> Self {
        AppError::Unauthorized
    }
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs((ttl_minutes.max(1) as u64) * 60),
        }
    }
}

impl JwtKeys {
    /// Issue a fresh credential for `user_id`.
    pub fn sign(&self, user_id: UserId) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, InvalidCredential> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            InvalidCredential
        })?;
        Ok(data.claims)
    }

    /// Map an optional credential to a user id without touching the store.
    /// Whether the id must also match the user's stored credential is the
    /// caller's decision.
    pub fn resolve(&self, credential: Option<&str>) -> Result<Option<UserId>, InvalidCredential> {
        match credential {
            None => Ok(None),
            Some(token) => self.verify(token).map(|c| Some(c.sub)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::sync::Arc;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        let mut state = AppState::fake();
        let mut config = AppConfig::clone(&state.config);
        config.jwt.secret = secret.into();
        config.jwt.issuer = issuer.into();
        config.jwt.audience = audience.into();
        state.config = Arc::new(config);
        JwtKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.sign(42).expect("sign");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn each_login_gets_a_distinct_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert_ne!(keys.sign(7).unwrap(), keys.sign(7).unwrap());
    }

    #[tokio::test]
    async fn resolve_absent_credential_is_anonymous() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert_eq!(keys.resolve(None).unwrap(), None);
    }

    #[tokio::test]
    async fn resolve_rejects_garbage() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(keys.resolve(Some("not.a.jwt")).is_err());
        assert!(keys.resolve(Some("")).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_secret_issuer_or_audience() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let token = good.sign(1).unwrap();
        assert!(make_keys("same-secret", "bad-iss", "good-aud").verify(&token).is_err());
        assert!(make_keys("same-secret", "good-iss", "bad-aud").verify(&token).is_err());
        assert!(make_keys("other-secret", "good-iss", "good-aud").verify(&token).is_err());
        assert_eq!(good.resolve(Some(&token)).unwrap(), Some(1));
    }
}
