use chrono::Utc;

use crate::db::CoinStore;
use crate::error::StoreResult;
use crate::models::{Feedback, FeedbackInput};

impl CoinStore {
    pub async fn create_feedback(&self, input: &FeedbackInput) -> StoreResult<Feedback> {
        input.validate()?;

        let row = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO user_feedback (author, feedback, created_at)
            VALUES (?, ?, ?)
            RETURNING id, author, feedback, created_at
            "#,
        )
        .bind(normalized_author(input))
        .bind(input.feedback.trim())
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }

    /// All feedback, newest first.
    pub async fn list_feedback(&self) -> StoreResult<Vec<Feedback>> {
        let rows = sqlx::query_as::<_, Feedback>(
            "SELECT id, author, feedback, created_at FROM user_feedback ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_feedback(&self, id: i64) -> StoreResult<Option<Feedback>> {
        let row = sqlx::query_as::<_, Feedback>(
            "SELECT id, author, feedback, created_at FROM user_feedback WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// Returns `None` when no row has this id.
    pub async fn update_feedback(&self, id: i64, input: &FeedbackInput) -> StoreResult<Option<Feedback>> {
        input.validate()?;

        let row = sqlx::query_as::<_, Feedback>(
            r#"
            UPDATE user_feedback SET author = ?, feedback = ?
            WHERE id = ?
            RETURNING id, author, feedback, created_at
            "#,
        )
        .bind(normalized_author(input))
        .bind(input.feedback.trim())
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    pub async fn delete_feedback(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_feedback WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn normalized_author(input: &FeedbackInput) -> Option<String> {
    input
        .author
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn input(author: Option<&str>, text: &str) -> FeedbackInput {
        FeedbackInput {
            author: author.map(str::to_string),
            feedback: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_feedback_crud() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();

        let created = store.create_feedback(&input(Some(" ana "), " Nice app ")).await.unwrap();
        assert_eq!(created.author.as_deref(), Some("ana"));
        assert_eq!(created.feedback, "Nice app");

        let updated = store
            .update_feedback(created.id, &input(None, "Needs dark mode"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.feedback, "Needs dark mode");
        assert!(updated.author.is_none());

        assert_eq!(store.list_feedback().await.unwrap().len(), 1);
        assert!(store.delete_feedback(created.id).await.unwrap());
        assert!(!store.delete_feedback(created.id).await.unwrap());
        assert!(store.get_feedback(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_and_invalid() {
        let store = CoinStore::connect("sqlite::memory:").await.unwrap();
        assert!(store.update_feedback(42, &input(None, "hello")).await.unwrap().is_none());
        assert!(matches!(
            store.create_feedback(&input(None, "")).await,
            Err(StoreError::Validation(_))
        ));
    }
}
