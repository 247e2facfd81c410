use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, EventId, TransactionId, UserId};
use domain::{
    Category, Money, NewTransaction, Transaction, TransactionEvent, TransactionKind, User,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    CategoryRepository, OutboxEnvelope, OutboxRecord, OutboxStore, Result, StorageError,
    TransactionRepository, UserRepository,
};

/// PostgreSQL-backed storage implementation.
///
/// Every pair write runs inside one database transaction, so the business
/// row and the outbox envelope commit or roll back together.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Creates new storage over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the schema if it does not exist yet.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../migrations/001_create_tables.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_transaction(row: PgRow) -> Result<Transaction> {
        let kind_str: String = row.try_get("kind")?;
        let kind: TransactionKind = serde_json::from_value(serde_json::Value::String(kind_str))?;

        Ok(Transaction {
            id: TransactionId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            category_id: CategoryId::new(row.try_get("category_id")?),
            amount: Money::from_cents(row.try_get("amount_cents")?),
            kind,
            description: row.try_get("description")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }

    fn row_to_record(row: PgRow) -> Result<OutboxRecord> {
        let payload_text: String = row.try_get("payload")?;

        Ok(OutboxRecord {
            sequence_id: row.try_get("id")?,
            envelope: OutboxEnvelope {
                event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
                event_type: row.try_get("event_type")?,
                payload: serde_json::from_str(&payload_text)?,
                created_at: row.try_get("created_at")?,
            },
            delivered: row.try_get("processed")?,
            delivered_at: row.try_get::<Option<DateTime<Utc>>, _>("processed_at")?,
        })
    }
}

async fn insert_envelope(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    envelope: &OutboxEnvelope,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO outbox_events (event_id, event_type, payload, created_at, processed)
        VALUES ($1, $2, $3, $4, FALSE)
        "#,
    )
    .bind(envelope.event_id.as_uuid())
    .bind(&envelope.event_type)
    .bind(envelope.payload.to_string())
    .bind(envelope.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl UserRepository for PostgresStorage {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name FROM users WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(User {
                id: UserId::new(row.try_get("id")?),
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CategoryRepository for PostgresStorage {
    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Category {
                id: CategoryId::new(row.try_get("id")?),
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TransactionRepository for PostgresStorage {
    async fn create_with_event(&self, new: NewTransaction) -> Result<Transaction> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (user_id, category_id, amount_cents, kind, description, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(new.user_id.as_i64())
        .bind(new.category_id.as_i64())
        .bind(new.amount.as_cents())
        .bind(new.kind.as_str())
        .bind(&new.description)
        .bind(new.occurred_at)
        .fetch_one(&mut *tx)
        .await?;

        let txn = new.with_id(TransactionId::new(id));
        let envelope = OutboxEnvelope::for_event(&TransactionEvent::created(&txn))?;
        insert_envelope(&mut tx, &envelope).await?;

        tx.commit().await?;
        Ok(txn)
    }

    async fn update_with_event(
        &self,
        txn: Transaction,
        envelope: OutboxEnvelope,
    ) -> Result<Transaction> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET user_id = $2, category_id = $3, amount_cents = $4, kind = $5,
                description = $6, occurred_at = $7
            WHERE id = $1
            "#,
        )
        .bind(txn.id.as_i64())
        .bind(txn.user_id.as_i64())
        .bind(txn.category_id.as_i64())
        .bind(txn.amount.as_cents())
        .bind(txn.kind.as_str())
        .bind(&txn.description)
        .bind(txn.occurred_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::TransactionNotFound(txn.id));
        }

        insert_envelope(&mut tx, &envelope).await?;
        tx.commit().await?;
        Ok(txn)
    }

    async fn delete_with_event(&self, id: TransactionId, envelope: OutboxEnvelope) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::TransactionNotFound(id));
        }

        insert_envelope(&mut tx, &envelope).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: TransactionId) -> Result<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::TransactionNotFound(id));
        }
        Ok(())
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            "SELECT id, user_id, category_id, amount_cents, kind, description, occurred_at
             FROM transactions WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_transaction).transpose()
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            "SELECT id, user_id, category_id, amount_cents, kind, description, occurred_at
             FROM transactions ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_transaction).collect()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            "SELECT id, user_id, category_id, amount_cents, kind, description, occurred_at
             FROM transactions WHERE user_id = $1 ORDER BY id ASC",
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_transaction).collect()
    }
}

#[async_trait]
impl OutboxStore for PostgresStorage {
    async fn fetch_undelivered(&self, max: usize) -> Result<Vec<OutboxRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, event_type, payload, created_at, processed, processed_at
            FROM outbox_events
            WHERE processed = FALSE
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(max as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn mark_delivered(&self, event_id: EventId) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET processed = TRUE, processed_at = NOW()
            WHERE event_id = $1 AND processed = FALSE
            "#,
        )
        .bind(event_id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Either already delivered (no-op) or unknown.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM outbox_events WHERE event_id = $1)")
                .bind(event_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Ok(())
        } else {
            Err(StorageError::OutboxRecordNotFound(event_id))
        }
    }
}
