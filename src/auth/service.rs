use std::sync::Arc;

use chrono::{Duration, Utc};
use rocket::http::{Cookie, SameSite};
use sqlx::{Pool, Sqlite};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::db;
use crate::error::{is_unique_violation, AppError};

use super::token::{SessionClaims, SessionKeys};
use super::{DbUser, NewUser, User};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "Authorization";

/// bcrypt work factor for stored password hashes.
pub const PASSWORD_HASH_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Username '{0}' already exists")]
    DuplicateUser(String),

    #[error("User not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token payload")]
    MalformedClaims,

    #[error("User not found")]
    UserNotFound,

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidInput(msg) => AppError::Validation(msg),
            AuthError::DuplicateUser(_) => AppError::Conflict(error.to_string()),
            // Unknown users and wrong passwords look the same from outside.
            AuthError::NotFound | AuthError::InvalidCredentials => {
                AppError::Authentication(AuthError::InvalidCredentials.to_string())
            }
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::MalformedClaims
            | AuthError::UserNotFound => AppError::Authentication(error.to_string()),
            AuthError::Persistence(err) => AppError::Database(err),
            AuthError::Hash(err) => err.into(),
            AuthError::Signing(err) => AppError::Internal(format!("Token signing failed: {}", err)),
        }
    }
}

/// Where user credentials live.
#[rocket::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert_user(&self, user: &NewUser<'_>) -> Result<(), sqlx::Error>;

    async fn find_user(&self, username: &str) -> Result<Option<DbUser>, sqlx::Error>;
}

#[rocket::async_trait]
impl CredentialStore for Pool<Sqlite> {
    async fn insert_user(&self, user: &NewUser<'_>) -> Result<(), sqlx::Error> {
        db::insert_user(self, user).await.map(|_| ())
    }

    async fn find_user(&self, username: &str) -> Result<Option<DbUser>, sqlx::Error> {
        db::find_user_by_username(self, username).await
    }
}

/// A freshly issued session: the identity, its token and the cookie carrying it.
pub struct IssuedSession {
    pub user: User,
    pub token: String,
    pub cookie: Cookie<'static>,
}

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    keys: SessionKeys,
    domain: String,
    secure: bool,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, config: &AppConfig) -> Self {
        Self {
            store,
            keys: SessionKeys::from_secret(config.jwt_secret.as_bytes()),
            domain: config.domain.clone(),
            secure: config.secure_cookies(),
            session_ttl: Duration::hours(config.session_ttl_hours),
        }
    }

    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        name: &str,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if name.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "name, username and password are required".to_string(),
            ));
        }

        if self.store.find_user(username).await?.is_some() {
            return Err(AuthError::DuplicateUser(username.to_string()));
        }

        let password_hash = bcrypt::hash(password, PASSWORD_HASH_COST)?;

        let new_user = NewUser {
            name,
            username,
            password_hash: &password_hash,
        };

        match self.store.insert_user(&new_user).await {
            Ok(()) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(AuthError::DuplicateUser(username.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        info!("User signed up");
        Ok(User {
            name: name.to_string(),
            username: username.to_string(),
        })
    }

    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError> {
        let user = self
            .store
            .find_user(username)
            .await?
            .ok_or(AuthError::NotFound)?;

        // A corrupt stored hash is treated as a failed comparison.
        let valid = bcrypt::verify(password, &user.password).unwrap_or(false);
        if !valid {
            warn!("Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let claims = SessionClaims {
            username: user.username.clone(),
            exp: (Utc::now() + self.session_ttl).timestamp(),
        };
        let token = self.keys.sign(&claims)?;
        let cookie = self.session_cookie(token.clone());

        info!("Session issued");
        Ok(IssuedSession {
            user: User::from(user),
            token,
            cookie,
        })
    }

    /// Cookie directive that makes the client drop its session cookie.
    pub fn logout(&self) -> Cookie<'static> {
        let mut cookie = self.base_cookie(String::new());
        cookie.set_max_age(rocket::time::Duration::ZERO);
        cookie.set_expires(rocket::time::OffsetDateTime::UNIX_EPOCH);
        cookie
    }

    #[instrument(skip_all)]
    pub async fn validate_session(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.keys.verify(token)?;

        match self.store.find_user(&claims.username).await? {
            Some(user) => Ok(User::from(user)),
            None => {
                warn!(username = %claims.username, "Token refers to a missing user");
                Err(AuthError::UserNotFound)
            }
        }
    }

    fn session_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = self.base_cookie(token);
        cookie.set_max_age(rocket::time::Duration::seconds(
            self.session_ttl.num_seconds(),
        ));
        cookie
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        let same_site = if self.secure {
            SameSite::None
        } else {
            SameSite::Lax
        };

        let mut cookie = Cookie::new(SESSION_COOKIE, value);
        cookie.set_path("/");
        cookie.set_domain(self.domain.clone());
        cookie.set_secure(self.secure);
        cookie.set_http_only(true);
        cookie.set_same_site(same_site);
        cookie
    }

    #[cfg(test)]
    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }
}
