//! Bearer-token authentication for protected operations.
//!
//! Cached market data is public; only user features consult an [`Authenticator`].
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::error::AuthError;

/// Who is making a protected request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id:       i32,
    pub username: String,
}

pub trait Authenticator: Debug + Send + Sync + 'static {
    fn authenticate(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty());
    let Some(header) = header
    else {
        return Err(AuthError::MissingCredential);
    };

    let mut parts = header.splitn(2, ' ');
    match (parts.next(), parts.next().map(str::trim)) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => Ok(token),
        (Some(scheme), None) if scheme.eq_ignore_ascii_case("bearer") => Err(AuthError::MissingCredential),
        _ => Err(AuthError::InvalidCredential("expected a bearer token".into())),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id:       i32,
    username: String,
    exp:      i64,
}

/// HS256 JWT verifier with claims `{ id, username, exp }`.
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    clock:    Arc<dyn Clock>,
}

impl Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator").field("clock", &self.clock).finish_non_exhaustive()
    }
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            clock,
        }
    }

    /// Sign a token for `identity` valid for `ttl`.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String, AuthError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|err| AuthError::InvalidCredential(err.to_string()))?;
        let claims = Claims {
            id:       identity.id,
            username: identity.username.clone(),
            exp:      (self.clock.now() + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::InvalidCredential(err.to_string()))
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        // Signature only; expiry is checked against our own clock below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = ["exp".to_string()].into();

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|err| {
                debug!("rejected token: {err}");
                match err.kind() {
                    ErrorKind::InvalidSignature => AuthError::InvalidCredential("bad signature".into()),
                    _ => AuthError::InvalidCredential(err.to_string()),
                }
            })?
            .claims;

        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::InvalidCredential("token expired".into()));
        }

        Ok(Identity {
            id:       claims.id,
            username: claims.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn alice() -> Identity {
        Identity {
            id:       7,
            username: "alice".into(),
        }
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token(None), Err(AuthError::MissingCredential));
        assert_eq!(bearer_token(Some("  ")), Err(AuthError::MissingCredential));
        assert_eq!(bearer_token(Some("Bearer")), Err(AuthError::MissingCredential));
        assert_eq!(bearer_token(Some("Bearer abc.def")), Ok("abc.def"));
        assert_eq!(bearer_token(Some("bearer  abc.def ")), Ok("abc.def"));
        assert!(matches!(bearer_token(Some("Basic Zm9v")), Err(AuthError::InvalidCredential(_))));
    }

    #[test]
    fn issued_token_round_trips() {
        let auth = JwtAuthenticator::new("s3cret");
        let token = auth.issue(&alice(), Duration::from_secs(3600)).unwrap();
        assert_eq!(auth.authenticate(&token), Ok(alice()));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let token = JwtAuthenticator::new("other")
            .issue(&alice(), Duration::from_secs(3600))
            .unwrap();
        assert!(matches!(
            JwtAuthenticator::new("s3cret").authenticate(&token),
            Err(AuthError::InvalidCredential(_))
        ));
        assert!(matches!(
            JwtAuthenticator::new("s3cret").authenticate("not-a-jwt"),
            Err(AuthError::InvalidCredential(_))
        ));
    }

    #[test]
    fn expired_token_is_invalid() {
        let clock = ManualClock::default();
        let auth = JwtAuthenticator::with_clock("s3cret", Arc::new(clock.clone()));
        let token = auth.issue(&alice(), Duration::from_secs(3600)).unwrap();

        clock.advance(Duration::from_secs(3599));
        assert!(auth.authenticate(&token).is_ok());
        clock.advance(Duration::from_secs(1));
        assert_eq!(
            auth.authenticate(&token),
            Err(AuthError::InvalidCredential("token expired".into()))
        );
    }
}
