use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::Value;
use tracing::Instrument;

use crate::error::status_body;

use super::{AuthError, AuthService, User, SESSION_COOKIE};

/// Why the session guard turned a request away, kept for the catchers.
struct SessionRejection(Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("user_auth_guard");

        async move {
            let token = request
                .cookies()
                .get(SESSION_COOKIE)
                .map(|c| c.value().to_string());

            let Some(token) = token else {
                return reject(request, Status::Unauthorized, AuthError::MissingToken);
            };

            let auth = match request.rocket().state::<AuthService>() {
                Some(auth) => auth,
                _ => {
                    tracing::error!("Auth service not found in managed state");
                    return Outcome::Error((Status::InternalServerError, AuthError::InvalidToken));
                }
            };

            match auth.validate_session(&token).await {
                Ok(user) => {
                    tracing::info!(
                        username = %user.username,
                        "User authenticated via session token"
                    );
                    Outcome::Success(user)
                }
                Err(err @ AuthError::Persistence(_)) => {
                    tracing::error!(error = %err, "Failed to fetch user for session");
                    reject(request, Status::InternalServerError, err)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Rejected session token");
                    reject(request, Status::Unauthorized, err)
                }
            }
        }
        .instrument(auth_span)
        .await
    }
}

fn reject(request: &Request<'_>, status: Status, err: AuthError) -> Outcome<User, AuthError> {
    let message = match &err {
        AuthError::Persistence(_) => "Failed to query user".to_string(),
        other => other.to_string(),
    };
    request.local_cache(|| SessionRejection(Some(message)));
    Outcome::Error((status, err))
}

fn rejection_message(req: &Request<'_>, fallback: &str) -> String {
    req.local_cache(|| SessionRejection(None))
        .0
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Custom<Json<Value>> {
    status_body(Status::BadRequest, "Invalid request")
}

#[catch(401)]
pub fn unauthorized_api(req: &Request) -> Custom<Json<Value>> {
    tracing::warn!(uri = %req.uri(), "Unauthorized access attempt");
    status_body(
        Status::Unauthorized,
        &rejection_message(req, "Authentication required"),
    )
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Custom<Json<Value>> {
    status_body(Status::NotFound, "Resource not found")
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Custom<Json<Value>> {
    status_body(Status::UnprocessableEntity, "Invalid request body")
}

#[catch(500)]
pub fn internal_error(req: &Request) -> Custom<Json<Value>> {
    status_body(
        Status::InternalServerError,
        &rejection_message(req, "Internal server error"),
    )
}

#[catch(default)]
pub fn default_catcher(status: Status, _req: &Request) -> Custom<Json<Value>> {
    status_body(status, status.reason().unwrap_or("An error occurred"))
}
