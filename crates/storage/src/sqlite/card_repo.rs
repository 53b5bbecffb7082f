use flashdeck_core::model::{Card, DeckId};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{card_id_to_i64, deck_id_to_i64, map_card_row};
use crate::repository::StorageError;

impl SqliteRepository {
    /// Cards of one deck, ascending by order.
    pub(crate) async fn load_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, ord, question, answer
            FROM cards
            WHERE deck_id = ?1
            ORDER BY ord ASC
            ",
        )
        .bind(deck_id_to_i64(deck_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_card_row(&row)?);
        }
        Ok(cards)
    }
}

/// Replaces the stored card set of a deck. Runs on the caller's transaction.
pub(crate) async fn replace_cards(
    conn: &mut SqliteConnection,
    deck_id: i64,
    cards: &[Card],
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM cards WHERE deck_id = ?1")
        .bind(deck_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    for card in cards {
        sqlx::query(
            r"
            INSERT INTO cards (id, deck_id, ord, question, answer)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(card_id_to_i64(card.id())?)
        .bind(deck_id)
        .bind(card.order())
        .bind(card.question())
        .bind(card.answer())
        .execute(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => StorageError::Connection(other.to_string()),
        })?;
    }
    Ok(())
}
