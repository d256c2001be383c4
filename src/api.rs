use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rocket::http::{CookieJar, Status};
use rocket::serde::json::{self, Json};
use rocket::serde::{Deserialize, Serialize};
use rocket::State;
use sqlx::{Pool, Sqlite};
use tracing::info;
use validator::Validate;

use crate::auth::{AuthService, User};
use crate::db::{
    count_tagged_questions, delete_tags, get_all_questions, get_submissions_between,
    get_submissions_by_slug, get_submissions_page, get_tags, insert_submission, upsert_question,
    upsert_tags,
};
use crate::error::AppError;
use crate::models::{NewSubmission, Question, QuestionTags, Submission};
use crate::validation::{required_param, JsonValidateExt, SLUG_REGEX};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[get("/health")]
pub fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
    })
}

#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    username: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    password: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    username: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct DataResponse {
    pub data: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub data: String,
    pub user: String,
}

#[post("/signup", data = "<signup>")]
pub async fn api_signup(
    signup: Result<Json<SignupRequest>, json::Error<'_>>,
    auth: &State<AuthService>,
) -> Result<Json<DataResponse>, AppError> {
    let validated = signup.validate_body()?;

    let user = auth
        .signup(&validated.name, &validated.username, &validated.password)
        .await?;

    Ok(Json(DataResponse { data: user.name }))
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Result<Json<LoginRequest>, json::Error<'_>>,
    cookies: &CookieJar<'_>,
    auth: &State<AuthService>,
) -> Result<Json<LoginResponse>, AppError> {
    let validated = login.validate_body()?;
    info!(username = %validated.username, "Login attempt");

    let session = auth
        .login(&validated.username, &validated.password)
        .await?;

    cookies.add(session.cookie);

    Ok(Json(LoginResponse {
        data: "Successfully logged in!".to_string(),
        user: session.user.username,
    }))
}

#[post("/validate")]
pub fn api_validate(_user: User) -> Json<DataResponse> {
    Json(DataResponse {
        data: "You are logged in!".to_string(),
    })
}

#[post("/logout")]
pub fn api_logout(
    user: User,
    cookies: &CookieJar<'_>,
    auth: &State<AuthService>,
) -> Json<DataResponse> {
    info!(username = %user.username, "Logging out");
    cookies.add(auth.logout());

    Json(DataResponse {
        data: "You are logged out!".to_string(),
    })
}

#[derive(Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

#[derive(Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
}

#[derive(Serialize)]
pub struct SubmissionsResponse {
    pub submissions: Vec<Submission>,
}

#[derive(Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn new(status: &str) -> Json<Self> {
        Json(Self {
            status: status.to_string(),
        })
    }
}

#[get("/questions/count")]
pub async fn api_questions_count(
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<CountResponse>, AppError> {
    let count = count_tagged_questions(db).await?;
    Ok(Json(CountResponse { count }))
}

#[get("/questions/all")]
pub async fn api_all_questions(
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<QuestionsResponse>, AppError> {
    let questions = get_all_questions(db).await?;
    Ok(Json(QuestionsResponse { questions }))
}

#[get("/submissions/<slug>")]
pub async fn api_submissions_by_slug(
    slug: &str,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SubmissionsResponse>, AppError> {
    let submissions = get_submissions_by_slug(db, slug).await?;
    Ok(Json(SubmissionsResponse { submissions }))
}

/// Inclusive UTC window covering the whole of `date` (`YYYY-MM-DD`).
pub fn day_window(date: &str) -> Result<(NaiveDateTime, NaiveDateTime), AppError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format".to_string()))?;

    let start = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::Internal(format!("No start of day for {}", day)))?;
    let end = day
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| AppError::Internal(format!("No end of day for {}", day)))?;

    Ok((start, end))
}

#[get("/submissions?<date>")]
pub async fn api_submissions_for_day(
    date: Option<&str>,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SubmissionsResponse>, AppError> {
    let date = required_param(date, "Date")?;
    let (start, end) = day_window(date)?;

    let submissions = get_submissions_between(db, start, end).await?;
    Ok(Json(SubmissionsResponse { submissions }))
}

/// Converts the inclusive `from..=to` index range into `(limit, offset)`.
pub fn page_window(from: Option<&str>, to: Option<&str>) -> Result<(i64, i64), AppError> {
    let from: i64 = from
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| AppError::Validation("invalid 'from' query parameter".to_string()))?;
    let to: i64 = to
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| AppError::Validation("invalid 'to' query parameter".to_string()))?;

    if from < 0 {
        return Err(AppError::Validation(
            "'from' must not be negative".to_string(),
        ));
    }
    if to < from {
        return Err(AppError::Validation(
            "'to' must not be less than 'from'".to_string(),
        ));
    }

    let limit = to
        .checked_sub(from)
        .and_then(|span| span.checked_add(1))
        .ok_or_else(|| AppError::Validation("page range is too large".to_string()))?;

    Ok((limit, from))
}

#[get("/pages?<from>&<to>")]
pub async fn api_submissions_page(
    from: Option<&str>,
    to: Option<&str>,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SubmissionsResponse>, AppError> {
    let (limit, offset) = page_window(from, to)?;

    let submissions = get_submissions_page(db, limit, offset).await?;
    Ok(Json(SubmissionsResponse { submissions }))
}

#[get("/tags?<slug>")]
pub async fn api_get_tags(
    slug: Option<&str>,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<TagsResponse>, AppError> {
    let slug = required_param(slug, "Slug")?;

    let tags = get_tags(db, slug).await?;
    Ok(Json(TagsResponse { tags }))
}

#[derive(Deserialize, Validate)]
pub struct UpsertTagsRequest {
    #[validate(regex(path = *SLUG_REGEX, message = "must be a lowercase slug"))]
    slug: String,
    #[validate(length(min = 1, message = "must contain at least one tag"))]
    tags: Vec<String>,
}

#[post("/tags/editor/upsert", data = "<request>")]
pub async fn api_upsert_tags(
    request: Result<Json<UpsertTagsRequest>, json::Error<'_>>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<StatusResponse>, AppError> {
    let validated = request.validate_body()?;
    info!(username = %user.username, slug = %validated.slug, "Upserting tags");

    upsert_tags(
        db,
        &QuestionTags {
            slug: validated.slug,
            tags: validated.tags,
        },
    )
    .await?;

    Ok(StatusResponse::new("Tags updated successfully"))
}

#[delete("/tags/editor?<slug>")]
pub async fn api_delete_tags(
    slug: Option<&str>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<StatusResponse>, AppError> {
    let slug = required_param(slug, "Slug")?;

    let removed = delete_tags(db, slug).await?;
    info!(username = %user.username, slug = %slug, removed, "Deleted tags");

    Ok(StatusResponse::new("Tags deleted successfully"))
}

#[derive(Deserialize, Validate)]
pub struct InsertQuestionRequest {
    #[validate(regex(path = *SLUG_REGEX, message = "must be a lowercase slug"))]
    slug: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    title: String,
    description: String,
}

#[post("/questions/insert", data = "<request>")]
pub async fn api_insert_question(
    request: Result<Json<InsertQuestionRequest>, json::Error<'_>>,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<StatusResponse>, AppError> {
    let validated = request.validate_body()?;

    upsert_question(
        db,
        &Question {
            slug: validated.slug,
            title: validated.title,
            description: validated.description,
        },
    )
    .await?;

    Ok(StatusResponse::new("Question upserted successfully"))
}

#[derive(Deserialize, Validate)]
pub struct InsertSubmissionRequest {
    #[validate(range(min = 1, message = "must be a positive integer"))]
    submission_id: i64,
    #[validate(length(min = 1, message = "must not be empty"))]
    question_slug: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    code: String,
    submitted_at: DateTime<Utc>,
}

#[post("/submissions/insert", data = "<request>")]
pub async fn api_insert_submission(
    request: Result<Json<InsertSubmissionRequest>, json::Error<'_>>,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<StatusResponse>, AppError> {
    let validated = request.validate_body()?;

    insert_submission(
        db,
        &NewSubmission {
            submission_id: validated.submission_id,
            question_slug: validated.question_slug,
            code: validated.code,
            submitted_at: validated.submitted_at,
        },
    )
    .await?;

    Ok(StatusResponse::new("Submission inserted successfully"))
}

/// Answers CORS preflight requests for every path.
#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_window_covers_whole_day() {
        let (start, end) = day_window("2024-03-09").expect("valid date");

        assert_eq!(start.to_string(), "2024-03-09 00:00:00");
        assert_eq!(end.to_string(), "2024-03-09 23:59:59");
    }

    #[test]
    fn test_day_window_rejects_malformed_dates() {
        for bad in ["", "2024-13-01", "09-03-2024", "2024/03/09", "yesterday"] {
            assert!(
                matches!(day_window(bad), Err(AppError::Validation(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(Some("0"), Some("1")).unwrap(), (2, 0));
        assert_eq!(page_window(Some("10"), Some("19")).unwrap(), (10, 10));
        assert_eq!(page_window(Some("3"), Some("3")).unwrap(), (1, 3));
    }

    #[test]
    fn test_page_window_rejects_bad_input() {
        let cases = [
            (None, Some("1")),
            (Some("0"), None),
            (Some("zero"), Some("1")),
            (Some("0"), Some("1.5")),
            (Some("-1"), Some("1")),
            (Some("5"), Some("4")),
            (Some("0"), Some("9223372036854775807")),
        ];

        for (from, to) in cases {
            assert!(
                matches!(page_window(from, to), Err(AppError::Validation(_))),
                "{:?}..{:?} should be rejected",
                from,
                to
            );
        }
    }
}
