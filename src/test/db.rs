#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use crate::auth::NewUser;
    use crate::db::{
        count_tagged_questions, delete_tags, find_user_by_username, get_all_questions,
        get_submissions_between, get_submissions_by_slug, get_submissions_page, get_tags,
        insert_submission, insert_user, question_exists, upsert_question, upsert_tags,
    };
    use crate::error::{is_unique_violation, AppError};
    use crate::models::{NewSubmission, Question, QuestionTags};
    use crate::test::test_utils::{create_standard_test_db, test_pool};

    #[rocket::async_test]
    async fn test_insert_and_find_user() {
        let pool = test_pool().await.expect("Failed to create pool");

        let new_user = NewUser {
            name: "Test User",
            username: "test_user",
            password_hash: "not-a-real-hash",
        };

        insert_user(&pool, &new_user)
            .await
            .expect("Failed to create test user");

        let user = find_user_by_username(&pool, "test_user")
            .await
            .expect("Failed to get user")
            .expect("User should exist");
        assert_eq!(user.name, "Test User");
        assert_eq!(user.password, "not-a-real-hash");

        let err = insert_user(&pool, &new_user)
            .await
            .expect_err("Duplicate username should fail");
        assert!(is_unique_violation(&err));

        assert!(find_user_by_username(&pool, "someone_else")
            .await
            .expect("Lookup should succeed")
            .is_none());
    }

    #[rocket::async_test]
    async fn test_questions() {
        let test_db = create_standard_test_db().await;
        let pool = &test_db.pool;

        assert!(question_exists(pool, "3sum").await.unwrap());
        assert!(!question_exists(pool, "word-ladder").await.unwrap());

        upsert_question(
            pool,
            &Question {
                slug: "word-ladder".to_string(),
                title: "Word Ladder".to_string(),
                description: String::new(),
            },
        )
        .await
        .expect("Failed to insert question");

        let slugs: Vec<String> = get_all_questions(pool)
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.slug)
            .collect();
        assert_eq!(
            slugs,
            vec!["3sum", "lru-cache", "two-sum", "valid-parentheses", "word-ladder"]
        );
    }

    #[rocket::async_test]
    async fn test_tags_do_not_need_a_question() {
        let test_db = create_standard_test_db().await;
        let pool = &test_db.pool;

        assert_eq!(count_tagged_questions(pool).await.unwrap(), 2);
        assert_eq!(
            get_tags(pool, "orphan-slug").await.unwrap(),
            vec!["graph".to_string()]
        );

        upsert_tags(
            pool,
            &QuestionTags {
                slug: "orphan-slug".to_string(),
                tags: vec!["graph".to_string(), "bfs".to_string()],
            },
        )
        .await
        .unwrap();
        assert_eq!(count_tagged_questions(pool).await.unwrap(), 2);
        assert_eq!(get_tags(pool, "orphan-slug").await.unwrap(), vec!["graph", "bfs"]);

        assert_eq!(delete_tags(pool, "orphan-slug").await.unwrap(), 1);
        assert_eq!(delete_tags(pool, "orphan-slug").await.unwrap(), 0);
        assert!(matches!(
            get_tags(pool, "orphan-slug").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(count_tagged_questions(pool).await.unwrap(), 1);
    }

    #[rocket::async_test]
    async fn test_insert_submission_checks_reference_and_duplicates() {
        let test_db = create_standard_test_db().await;
        let pool = &test_db.pool;

        let mut submission = NewSubmission {
            submission_id: 9,
            question_slug: "no-such-question".to_string(),
            code: "print(1)".to_string(),
            submitted_at: Utc::now(),
        };

        assert!(matches!(
            insert_submission(pool, &submission).await,
            Err(AppError::ReferenceNotFound { slug }) if slug == "no-such-question"
        ));

        submission.question_slug = "3sum".to_string();
        insert_submission(pool, &submission)
            .await
            .expect("Failed to insert submission");

        assert!(matches!(
            insert_submission(pool, &submission).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(test_db.submission_count().await, 5);
    }

    #[rocket::async_test]
    async fn test_submission_queries() {
        let test_db = create_standard_test_db().await;
        let pool = &test_db.pool;

        let by_slug = get_submissions_by_slug(pool, "two-sum").await.unwrap();
        assert_eq!(
            by_slug.iter().map(|s| s.submission_id).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert_eq!(by_slug[0].question.title, "Two Sum");
        assert_eq!(by_slug[0].submitted_at.to_rfc3339(), "2024-03-09T21:30:00+00:00");

        assert!(matches!(
            get_submissions_by_slug(pool, "missing").await,
            Err(AppError::NotFound(_))
        ));

        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let in_day = get_submissions_between(
            pool,
            day.and_hms_opt(0, 0, 0).unwrap(),
            day.and_hms_opt(23, 59, 59).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(
            in_day.iter().map(|s| s.submission_id).collect::<Vec<_>>(),
            vec![2, 1]
        );

        let page = get_submissions_page(pool, 3, 1).await.unwrap();
        assert_eq!(
            page.iter().map(|s| s.submission_id).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert!(get_submissions_page(pool, 5, 10).await.unwrap().is_empty());
    }
}
