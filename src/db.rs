use chrono::NaiveDateTime;
use sqlx::types::Json;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::{DbUser, NewUser};
use crate::error::{is_unique_violation, AppError};
use crate::models::{DbSubmission, NewSubmission, Question, QuestionTags, Submission};

#[instrument(skip_all, fields(username = %user.username))]
pub async fn insert_user(pool: &Pool<Sqlite>, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
    info!("Creating new user");
    let res = sqlx::query("INSERT INTO users (name, username, password) VALUES (?, ?, ?)")
        .bind(user.name)
        .bind(user.username)
        .bind(user.password_hash)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn find_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<DbUser>, sqlx::Error> {
    info!("Getting user by username");
    sqlx::query_as::<_, DbUser>("SELECT name, username, password FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Counts the questions that have a tag entry.
#[instrument(skip(pool))]
pub async fn count_tagged_questions(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    info!("Counting tagged questions");
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM question_tags")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[instrument(skip(pool))]
pub async fn get_all_questions(pool: &Pool<Sqlite>) -> Result<Vec<Question>, AppError> {
    info!("Getting all questions");
    let questions = sqlx::query_as::<_, Question>(
        "SELECT slug, title, description FROM questions ORDER BY slug",
    )
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

#[instrument(skip(pool))]
pub async fn question_exists(pool: &Pool<Sqlite>, slug: &str) -> Result<bool, AppError> {
    let found = sqlx::query_scalar::<_, String>("SELECT slug FROM questions WHERE slug = ? LIMIT 1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(found.is_some())
}

#[instrument(skip(pool, question), fields(slug = %question.slug))]
pub async fn upsert_question(pool: &Pool<Sqlite>, question: &Question) -> Result<(), AppError> {
    info!("Upserting question");
    sqlx::query(
        "INSERT INTO questions (slug, title, description)
         VALUES (?, ?, ?)
         ON CONFLICT (slug)
         DO UPDATE SET title = excluded.title, description = excluded.description",
    )
    .bind(&question.slug)
    .bind(&question.title)
    .bind(&question.description)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_tags(pool: &Pool<Sqlite>, slug: &str) -> Result<Vec<String>, AppError> {
    info!("Getting tags for question");
    let row = sqlx::query_scalar::<_, Json<Vec<String>>>(
        "SELECT tags FROM question_tags WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(Json(tags)) => Ok(tags),
        _ => Err(AppError::NotFound("Tags not found".to_string())),
    }
}

#[instrument(skip(pool, question_tags), fields(slug = %question_tags.slug))]
pub async fn upsert_tags(
    pool: &Pool<Sqlite>,
    question_tags: &QuestionTags,
) -> Result<(), AppError> {
    info!("Upserting tags");
    sqlx::query(
        "INSERT INTO question_tags (slug, tags)
         VALUES (?, ?)
         ON CONFLICT (slug)
         DO UPDATE SET tags = excluded.tags",
    )
    .bind(&question_tags.slug)
    .bind(Json(&question_tags.tags))
    .execute(pool)
    .await?;

    Ok(())
}

/// Removes the tag entry for `slug`. Missing entries are not an error.
#[instrument(skip(pool))]
pub async fn delete_tags(pool: &Pool<Sqlite>, slug: &str) -> Result<u64, AppError> {
    info!("Deleting tags");
    let res = sqlx::query("DELETE FROM question_tags WHERE slug = ?")
        .bind(slug)
        .execute(pool)
        .await?;

    Ok(res.rows_affected())
}

/// Inserts a submission after checking that its question exists.
///
/// The check and the insert are separate statements; the foreign key on
/// `submissions.question_slug` still rejects a row whose question vanished in
/// between.
#[instrument(
    skip(pool, submission),
    fields(submission_id = submission.submission_id, slug = %submission.question_slug)
)]
pub async fn insert_submission(
    pool: &Pool<Sqlite>,
    submission: &NewSubmission,
) -> Result<(), AppError> {
    info!("Inserting submission");
    if !question_exists(pool, &submission.question_slug).await? {
        return Err(AppError::ReferenceNotFound {
            slug: submission.question_slug.clone(),
        });
    }

    let res = sqlx::query(
        "INSERT INTO submissions (submission_id, question_slug, code, submitted_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(submission.submission_id)
    .bind(&submission.question_slug)
    .bind(&submission.code)
    .bind(submission.submitted_at.naive_utc())
    .execute(pool)
    .await;

    match res {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => Err(AppError::Conflict(format!(
            "Submission {} already exists",
            submission.submission_id
        ))),
        Err(err) => Err(err.into()),
    }
}

#[instrument(skip(pool))]
pub async fn get_submissions_by_slug(
    pool: &Pool<Sqlite>,
    slug: &str,
) -> Result<Vec<Submission>, AppError> {
    info!("Getting submissions for question");
    if !question_exists(pool, slug).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    let rows = sqlx::query_as::<_, DbSubmission>(
        "SELECT s.submission_id, s.question_slug, s.code, s.submitted_at, q.title, q.description
         FROM submissions s
         JOIN questions q ON s.question_slug = q.slug
         WHERE s.question_slug = ?
         ORDER BY s.submitted_at DESC",
    )
    .bind(slug)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Submission::from).collect())
}

/// Submissions whose timestamp falls inside `[start, end]`, newest first.
#[instrument(skip(pool))]
pub async fn get_submissions_between(
    pool: &Pool<Sqlite>,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Submission>, AppError> {
    info!("Getting submissions in time window");
    let rows = sqlx::query_as::<_, DbSubmission>(
        "SELECT s.submission_id, s.question_slug, s.code, s.submitted_at, q.title, q.description
         FROM submissions s
         JOIN questions q ON s.question_slug = q.slug
         WHERE s.submitted_at BETWEEN ? AND ?
         ORDER BY s.submitted_at DESC",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    // No error thrown if there are no submissions found
    Ok(rows.into_iter().map(Submission::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_submissions_page(
    pool: &Pool<Sqlite>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Submission>, AppError> {
    info!("Getting page of submissions");
    let rows = sqlx::query_as::<_, DbSubmission>(
        "SELECT s.submission_id, s.question_slug, s.code, s.submitted_at, q.title, q.description
         FROM submissions s
         JOIN questions q ON s.question_slug = q.slug
         ORDER BY s.submission_id
         LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Submission::from).collect())
}
