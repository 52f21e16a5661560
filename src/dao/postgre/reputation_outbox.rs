use chrono::{DateTime, Utc};
use sqlx::Error;

use crate::model::{OutboxStatus, Reputation_Outbox, Table};

impl Table<Reputation_Outbox> {
    /// Returns `false` when a row with the same id already exists.
    pub async fn insert_if_absent(
        &self,
        data: &Reputation_Outbox,
    ) -> Result<bool, Error> {
        const SQL: &str = r#"
        INSERT INTO "reputation_outbox" (
            "id",
            "target",
            "status",
            "score",
            "submitted",
            "attempts",
            "last_error",
            "seen_at",
            "next_attempt_at"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT ("id") DO NOTHING
        "#;

        let result = sqlx::query(SQL)
            .bind(data.id)
            .bind(&data.target)
            .bind(&data.status)
            .bind(data.score)
            .bind(data.submitted)
            .bind(data.attempts)
            .bind(&data.last_error)
            .bind(data.seen_at)
            .bind(data.next_attempt_at)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_one(
        &self,
        id: i64,
    ) -> Result<Option<Reputation_Outbox>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "reputation_outbox"
        WHERE "id" = $1
        "#;

        sqlx::query_as(SQL).bind(id).fetch_optional(&self.pool).await
    }

    pub async fn get_by_status(
        &self,
        status: OutboxStatus,
        limit: i64,
    ) -> Result<Vec<Reputation_Outbox>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "reputation_outbox"
        WHERE "status" = $1
        ORDER BY "id" ASC
        LIMIT $2
        "#;

        sqlx::query_as(SQL)
            .bind(status.to_string())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>, Error> {
        const SQL: &str = r#"
        SELECT "status", COUNT(*)
        FROM "reputation_outbox"
        GROUP BY "status"
        ORDER BY "status"
        "#;

        sqlx::query_as(SQL).fetch_all(&self.pool).await
    }

    pub async fn mark_submitted(
        &self,
        id: i64,
        score: i64,
    ) -> Result<bool, Error> {
        const SQL: &str = r#"
        UPDATE "reputation_outbox"
        SET
            "submitted" = TRUE,
            "score" = COALESCE("score", $2)
        WHERE "id" = $1
        "#;

        let result = sqlx::query(SQL)
            .bind(id)
            .bind(score)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Moves due `seen` rows to `forwarding` and returns them.
    pub async fn claim_due(
        &self,
        seen_before: DateTime<Utc>,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Reputation_Outbox>, Error> {
        const SQL: &str = r#"
        UPDATE "reputation_outbox"
        SET
            "status" = $1,
            "claimed_at" = $2
        WHERE "id" IN (
            SELECT "id"
            FROM "reputation_outbox"
            WHERE
                "status" = $3 AND
                "seen_at" <= $4 AND
                "next_attempt_at" <= $2
            ORDER BY "id" ASC
            LIMIT $5
            FOR UPDATE SKIP LOCKED
        )
        RETURNING *
        "#;

        sqlx::query_as(SQL)
            .bind(OutboxStatus::Forwarding.to_string())
            .bind(now)
            .bind(OutboxStatus::Seen.to_string())
            .bind(seen_before)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn store_score(&self, id: i64, score: i64) -> Result<(), Error> {
        const SQL: &str = r#"
        UPDATE "reputation_outbox"
        SET "score" = $2
        WHERE "id" = $1
        "#;

        sqlx::query(SQL)
            .bind(id)
            .bind(score)
            .execute(&self.pool)
            .await
            .map(drop)
    }

    pub async fn set_submitted(&self, id: i64) -> Result<(), Error> {
        const SQL: &str = r#"
        UPDATE "reputation_outbox"
        SET "submitted" = TRUE
        WHERE "id" = $1
        "#;

        sqlx::query(SQL).bind(id).execute(&self.pool).await.map(drop)
    }

    pub async fn mark_forwarded(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), Error> {
        const SQL: &str = r#"
        UPDATE "reputation_outbox"
        SET
            "status" = $2,
            "forwarded_at" = $3,
            "claimed_at" = NULL,
            "last_error" = NULL
        WHERE "id" = $1
        "#;

        sqlx::query(SQL)
            .bind(id)
            .bind(OutboxStatus::Forwarded.to_string())
            .bind(at)
            .execute(&self.pool)
            .await
            .map(drop)
    }

    pub async fn reschedule(
        &self,
        id: i64,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), Error> {
        const SQL: &str = r#"
        UPDATE "reputation_outbox"
        SET
            "status" = $2,
            "attempts" = "attempts" + 1,
            "next_attempt_at" = $3,
            "last_error" = $4,
            "claimed_at" = NULL
        WHERE "id" = $1
        "#;

        sqlx::query(SQL)
            .bind(id)
            .bind(OutboxStatus::Seen.to_string())
            .bind(next_attempt_at)
            .bind(error)
            .execute(&self.pool)
            .await
            .map(drop)
    }

    pub async fn mark_failed(&self, id: i64, error: &str) -> Result<(), Error> {
        const SQL: &str = r#"
        UPDATE "reputation_outbox"
        SET
            "status" = $2,
            "attempts" = "attempts" + 1,
            "last_error" = $3,
            "claimed_at" = NULL
        WHERE "id" = $1
        "#;

        sqlx::query(SQL)
            .bind(id)
            .bind(OutboxStatus::Failed.to_string())
            .bind(error)
            .execute(&self.pool)
            .await
            .map(drop)
    }

    /// Returns rows stuck in `forwarding` since before `claimed_before` to
    /// `seen`.
    pub async fn recover_stale(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> Result<u64, Error> {
        const SQL: &str = r#"
        UPDATE "reputation_outbox"
        SET
            "status" = $1,
            "claimed_at" = NULL
        WHERE
            "status" = $2 AND
            "claimed_at" < $3
        "#;

        let result = sqlx::query(SQL)
            .bind(OutboxStatus::Seen.to_string())
            .bind(OutboxStatus::Forwarding.to_string())
            .bind(claimed_before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
