use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AuthError;

/// Claims carried inside the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub username: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
}

/// Claims as they arrive. Shapes are checked only after expiry.
#[derive(Deserialize)]
struct UncheckedClaims {
    username: Option<Value>,
    exp: Option<Value>,
}

impl TryFrom<UncheckedClaims> for SessionClaims {
    type Error = AuthError;

    fn try_from(claims: UncheckedClaims) -> Result<Self, Self::Error> {
        match (claims.username, claims.exp.as_ref().and_then(Value::as_i64)) {
            (Some(Value::String(username)), Some(exp)) => Ok(SessionClaims { username, exp }),
            _ => Err(AuthError::MalformedClaims),
        }
    }
}

/// HS256 key pair derived from the configured secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(AuthError::Signing)
    }

    /// Checks the signature, then the expiry, then the claim shapes, in that order.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        // Header problems are token problems, not claim problems.
        decode_header(token).map_err(|_| AuthError::InvalidToken)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<UncheckedClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => {
                    AuthError::MalformedClaims
                }
                _ => AuthError::InvalidToken,
            })?;

        SessionClaims::try_from(claims)
    }
}
