use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{split_sentinels, Direction, Document, DocumentStore, StoreError, WriteFields};
use crate::database::DatabaseManager;

/// `$3` literal fields merged with every key in `$4` set to the transaction's
/// `now()`, rendered like `format_timestamp`. `now()` is fixed per
/// transaction, so all stamped keys of one write carry the same instant.
const STAMPED_FIELDS: &str = r#"$3::jsonb || COALESCE(
    (SELECT jsonb_object_agg(key, to_jsonb(to_char(now() AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS.US"Z"')))
     FROM unnest($4::text[]) AS key),
    '{}'::jsonb)"#;

/// Documents kept as JSONB rows of the `documents` table
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(db: &DatabaseManager) -> Self {
        Self { pool: db.pool().clone() }
    }

    fn parse_id(id: &str) -> Result<Uuid, StoreError> {
        Uuid::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
    }

    fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
        let id: Uuid = row.try_get("id")?;
        let fields: Value = row.try_get("fields")?;
        match fields {
            Value::Object(fields) => Ok(Document {
                id: id.to_string(),
                fields,
            }),
            _ => Err(StoreError::NotAnObject),
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, fields: WriteFields) -> Result<String, StoreError> {
        let id = Uuid::new_v4();
        let (fields, stamped) = split_sentinels(fields);

        let sql = format!(
            "INSERT INTO documents (collection, id, fields) VALUES ($1, $2, {})",
            STAMPED_FIELDS
        );
        sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .bind(Value::Object(fields))
            .bind(stamped)
            .execute(&self.pool)
            .await?;

        tracing::debug!("inserted document {}/{}", collection, id);
        Ok(id.to_string())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        // A malformed id cannot name a stored document
        let Ok(id) = Self::parse_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query("SELECT id, fields FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn list_ordered(
        &self,
        collection: &str,
        sort_field: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, StoreError> {
        // Direction comes from a closed enum; the field name is bound
        let sql = format!(
            "SELECT id, fields FROM documents WHERE collection = $1 ORDER BY fields ->> $2 {}, id",
            direction.as_sql()
        );

        let rows = sqlx::query(&sql)
            .bind(collection)
            .bind(sort_field)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn merge(&self, collection: &str, id: &str, fields: WriteFields) -> Result<(), StoreError> {
        let uuid = Self::parse_id(id).map_err(|_| StoreError::not_found(collection, id))?;
        let (fields, stamped) = split_sentinels(fields);

        let sql = format!(
            "UPDATE documents SET fields = fields || ({}) WHERE collection = $1 AND id = $2",
            STAMPED_FIELDS
        );
        let result = sqlx::query(&sql)
            .bind(collection)
            .bind(uuid)
            .bind(Value::Object(fields))
            .bind(stamped)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let uuid = Self::parse_id(id).map_err(|_| StoreError::not_found(collection, id))?;

        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_come_from_the_database_clock() {
        assert!(STAMPED_FIELDS.contains("now() AT TIME ZONE 'UTC'"));
        assert!(STAMPED_FIELDS.contains("unnest($4::text[])"));
        // Same shape as format_timestamp: fixed-width micros with a Z suffix
        assert!(STAMPED_FIELDS.contains(r#"'YYYY-MM-DD"T"HH24:MI:SS.US"Z"'"#));
    }
}
