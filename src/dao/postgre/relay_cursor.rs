use sqlx::Error;

use crate::model::{Relay_Cursor, Table};

impl Table<Relay_Cursor> {
    pub async fn get_one(
        &self,
        name: &str,
    ) -> Result<Option<Relay_Cursor>, Error> {
        const SQL: &str = r#"
        SELECT *
        FROM "relay_cursor"
        WHERE "name" = $1
        "#;

        sqlx::query_as(SQL)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn upsert(&self, data: Relay_Cursor) -> Result<(), Error> {
        const SQL: &str = r#"
        INSERT INTO "relay_cursor" ("name", "sequence", "updated_at")
        VALUES ($1, $2, $3)
        ON CONFLICT ("name") DO UPDATE SET
            "sequence" = GREATEST("relay_cursor"."sequence", EXCLUDED."sequence"),
            "updated_at" = EXCLUDED."updated_at"
        "#;

        sqlx::query(SQL)
            .bind(data.name)
            .bind(data.sequence)
            .bind(data.updated_at)
            .execute(&self.pool)
            .await
            .map(drop)
    }
}
