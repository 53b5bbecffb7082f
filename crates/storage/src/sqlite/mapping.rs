use std::str::FromStr;

use chrono::{DateTime, Utc};
use flashdeck_core::model::{Card, CardId, Deck, DeckId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn deck_id_to_i64(id: DeckId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("deck_id overflow".into()))
}

pub(crate) fn card_id_to_i64(id: CardId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("card_id overflow".into()))
}

fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    row.try_get::<String, _>(column)
        .map_err(ser)?
        .parse::<T>()
        .map_err(ser)
}

pub(crate) fn map_card_row(row: &SqliteRow) -> Result<Card, StorageError> {
    Ok(Card::new(
        CardId::new(i64_to_u64("card_id", row.try_get("id").map_err(ser)?)?),
        row.try_get::<i64, _>("ord").map_err(ser)?,
        row.try_get::<String, _>("question").map_err(ser)?,
        row.try_get::<String, _>("answer").map_err(ser)?,
    ))
}

pub(crate) fn map_deck_row(row: &SqliteRow, cards: Vec<Card>) -> Result<Deck, StorageError> {
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(ser)?;

    Deck::new(
        deck_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("topic").map_err(ser)?,
        parse_column(row, "difficulty")?,
        parse_column(row, "bloom_level")?,
        parse_column(row, "format")?,
        parse_column(row, "input_kind")?,
        cards,
        created_at,
        updated_at,
    )
    .map_err(ser)
}
