mod answer;
mod card;
mod deck;
mod ids;
mod kinds;

pub use answer::{AnswerFace, FaceSegment, answer_face};
pub use card::{Card, CardDraft};
pub use deck::{Deck, DeckDraft, DeckError, MoveDirection};
pub use ids::{CardId, DeckId, ParseIdError};
pub use kinds::{BloomLevel, DeckFormat, Difficulty, InputKind, ParseEnumError};
