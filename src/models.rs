use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub slug: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTags {
    pub slug: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub submission_id: i64,
    pub question_slug: String,
    pub code: String,
    pub submitted_at: DateTime<Utc>,
}

/// A stored submission together with the question it answers.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub submission_id: i64,
    pub question_slug: String,
    pub code: String,
    pub submitted_at: DateTime<Utc>,
    pub question: Question,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbSubmission {
    pub submission_id: i64,
    pub question_slug: String,
    pub code: String,
    pub submitted_at: NaiveDateTime,
    pub title: String,
    pub description: String,
}

impl From<DbSubmission> for Submission {
    fn from(row: DbSubmission) -> Self {
        Self {
            submission_id: row.submission_id,
            question: Question {
                slug: row.question_slug.clone(),
                title: row.title,
                description: row.description,
            },
            question_slug: row.question_slug,
            code: row.code,
            submitted_at: DateTime::<Utc>::from_naive_utc_and_offset(row.submitted_at, Utc),
        }
    }
}
