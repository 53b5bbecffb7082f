use thiserror::Error;

use crate::model::{DeckError, ParseEnumError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error(transparent)]
    Parse(#[from] ParseEnumError),
}
