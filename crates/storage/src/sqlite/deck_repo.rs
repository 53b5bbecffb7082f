use flashdeck_core::model::{Deck, DeckId};

use super::SqliteRepository;
use super::card_repo::replace_cards;
use super::mapping::{deck_id_from_i64, deck_id_to_i64, map_deck_row};
use crate::repository::{DeckRepository, NewDeckRecord, StorageError};

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        let res = sqlx::query(
            r"
            INSERT INTO decks (topic, difficulty, bloom_level, format, input_kind, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(&deck.topic)
        .bind(deck.difficulty.as_str())
        .bind(deck.bloom_level.as_str())
        .bind(deck.format.as_str())
        .bind(deck.input_kind.as_str())
        .bind(deck.created_at)
        .bind(deck.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?;

        let raw_id = res.last_insert_rowid();
        replace_cards(&mut *tx, raw_id, &deck.cards).await?;
        tx.commit().await.map_err(conn_err)?;

        let id = deck_id_from_i64(raw_id)?;
        tracing::debug!(deck_id = %id, cards = deck.cards.len(), "inserted deck");
        Ok(id)
    }

    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let id = deck_id_to_i64(deck.id())?;
        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        sqlx::query(
            r"
            INSERT INTO decks (id, topic, difficulty, bloom_level, format, input_kind, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                topic = excluded.topic,
                difficulty = excluded.difficulty,
                bloom_level = excluded.bloom_level,
                format = excluded.format,
                input_kind = excluded.input_kind,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id)
        .bind(deck.topic())
        .bind(deck.difficulty().as_str())
        .bind(deck.bloom_level().as_str())
        .bind(deck.format().as_str())
        .bind(deck.input_kind().as_str())
        .bind(deck.created_at())
        .bind(deck.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?;

        replace_cards(&mut *tx, id, deck.cards()).await?;
        tx.commit().await.map_err(conn_err)?;
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, topic, difficulty, bloom_level, format, input_kind, created_at, updated_at
            FROM decks WHERE id = ?1
            ",
        )
        .bind(deck_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        match row {
            Some(row) => {
                let cards = self.load_cards(id).await?;
                map_deck_row(&row, cards).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn list_decks(&self, limit: u32) -> Result<Vec<Deck>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, topic, difficulty, bloom_level, format, input_kind, created_at, updated_at
            FROM decks
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut decks = Vec::with_capacity(rows.len());
        for row in rows {
            let id = deck_id_from_i64(sqlx::Row::try_get(&row, "id").map_err(conn_err)?)?;
            let cards = self.load_cards(id).await?;
            decks.push(map_deck_row(&row, cards)?);
        }
        Ok(decks)
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM decks WHERE id = ?1")
            .bind(deck_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
