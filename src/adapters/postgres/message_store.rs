//! PostgreSQL implementation of MessageStore.
//!
//! Sequence numbers come from the `chat_sequences` counter row, bumped in the
//! same transaction as the message insert. The row lock taken by the upsert
//! serializes concurrent inserts into one chat; the unique
//! `(chat_id, sequence)` constraint backs it up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::chat::{ContentUpdate, Message, NewMessage, SortDirection};
use crate::domain::foundation::{
    ChatId, DomainError, ErrorCode, MessageId, Timestamp, UserId,
};
use crate::ports::{MessageStore, SequenceRange, WriteStep};

/// PostgreSQL implementation of MessageStore.
#[derive(Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    /// Creates a new PostgresMessageStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        new: NewMessage,
    ) -> Result<(), DomainError> {
        new.validate()?;

        if let Some(parent_id) = new.parent_id {
            let parent_chat: Option<Uuid> =
                sqlx::query_scalar("SELECT chat_id FROM messages WHERE id = $1")
                    .bind(parent_id.as_uuid())
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(|e| DomainError::database("Failed to fetch parent message", e))?;

            match parent_chat {
                Some(chat) if chat == *new.chat_id.as_uuid() => {}
                Some(_) => {
                    return Err(DomainError::invalid_argument(
                        "parent_id",
                        "Parent message belongs to another chat",
                    ))
                }
                None => {
                    return Err(DomainError::invalid_argument(
                        "parent_id",
                        format!("Parent message {} not found", parent_id),
                    ))
                }
            }
        }

        let sequence: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO chat_sequences (chat_id, last_sequence)
            VALUES ($1, 1)
            ON CONFLICT (chat_id)
            DO UPDATE SET last_sequence = chat_sequences.last_sequence + 1
            RETURNING last_sequence
            "#,
        )
        .bind(new.chat_id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| DomainError::database("Failed to allocate sequence", e))?;

        let siblings: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE chat_id = $1 AND parent_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(new.chat_id.as_uuid())
        .bind(new.parent_id.map(|p| *p.as_uuid()))
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| DomainError::database("Failed to count sibling versions", e))?;

        let now = Timestamp::now();
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, chat_id, author_id, sequence, version_index, parent_id,
                content, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(new.id.as_uuid())
        .bind(new.chat_id.as_uuid())
        .bind(new.author_id.as_str())
        .bind(sequence)
        .bind(siblings as i32)
        .bind(new.parent_id.map(|p| *p.as_uuid()))
        .bind(&new.content)
        .bind(now.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert message", e))?;

        Ok(())
    }

    async fn update_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        update: ContentUpdate,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET content = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(update.id.as_uuid())
        .bind(&update.content)
        .bind(Timestamp::now().as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| DomainError::database("Failed to update message", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::MessageNotFound,
                format!("Message {} not found", update.id),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn get_by_id(&self, id: &MessageId) -> Result<Option<Message>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, chat_id, author_id, sequence, version_index, parent_id,
                   content, created_at, updated_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch message", e))?;

        row.as_ref().map(row_to_message).transpose()
    }

    async fn list_by_sequence_range(
        &self,
        chat_id: &ChatId,
        range: SequenceRange,
        limit: u32,
        direction: SortDirection,
    ) -> Result<Vec<Message>, DomainError> {
        let order = match direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let sql = format!(
            r#"
            SELECT id, chat_id, author_id, sequence, version_index, parent_id,
                   content, created_at, updated_at
            FROM messages
            WHERE chat_id = $1
              AND ($2::BIGINT IS NULL OR sequence >= $2)
              AND ($3::BIGINT IS NULL OR sequence <= $3)
            ORDER BY sequence {}
            LIMIT $4
            "#,
            order
        );

        let rows = sqlx::query(&sql)
            .bind(chat_id.as_uuid())
            .bind(range.from)
            .bind(range.to)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to list messages", e))?;

        rows.iter().map(row_to_message).collect()
    }

    async fn transact(&self, steps: Vec<WriteStep>) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to start transaction", e))?;

        for step in steps {
            match step {
                WriteStep::InsertMessage(new) => Self::insert_in_tx(&mut tx, new).await?,
                WriteStep::UpdateContent(update) => Self::update_in_tx(&mut tx, update).await?,
            }
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit transaction", e))?;

        Ok(())
    }
}

fn row_to_message(row: &PgRow) -> Result<Message, DomainError> {
    let id: Uuid = row.get("id");
    let chat_id: Uuid = row.get("chat_id");
    let author_id: String = row.get("author_id");
    let parent_id: Option<Uuid> = row.get("parent_id");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    Ok(Message {
        id: MessageId::from_uuid(id),
        chat_id: ChatId::from_uuid(chat_id),
        author_id: UserId::new(author_id)
            .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?,
        sequence: row.get("sequence"),
        version_index: row.get("version_index"),
        parent_id: parent_id.map(MessageId::from_uuid),
        content: row.get("content"),
        created_at: Timestamp::from_datetime(created_at),
        updated_at: Timestamp::from_datetime(updated_at),
    })
}

#[cfg(test)]
mod tests {
    // PostgreSQL integration tests require a running database and are run
    // separately from unit tests:
    //
    // #[tokio::test]
    // #[ignore] // Run with: cargo test -- --ignored
    // async fn test_postgres_message_store() {
    //     let pool = PgPool::connect("postgresql://localhost/chatline_test").await.unwrap();
    //     sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    //     let store = PostgresMessageStore::new(pool);
    //     // ... test code
    // }
}
