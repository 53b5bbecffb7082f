use serde::{Deserialize, Serialize};

use crate::model::ids::CardId;

//
// ─── CARD TYPES ────────────────────────────────────────────────────────────────
//

/// An unsaved question/answer pair, as produced by the generator or an editor.
///
/// `order` only needs to be comparable; it is renumbered when the draft is
/// attached to a deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDraft {
    pub order: i64,
    pub question: String,
    pub answer: String,
}

impl CardDraft {
    #[must_use]
    pub fn new(order: i64, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            order,
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub(crate) fn assign_id(self, id: CardId, order: i64) -> Card {
        Card {
            id,
            order,
            question: self.question,
            answer: self.answer,
        }
    }
}

/// One question/answer pair with its position in the deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    id: CardId,
    order: i64,
    question: String,
    answer: String,
}

impl Card {
    #[must_use]
    pub fn new(
        id: CardId,
        order: i64,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id,
            order,
            question: question.into(),
            answer: answer.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub(crate) fn set_order(&mut self, order: i64) {
        self.order = order;
    }

    pub(crate) fn set_text(&mut self, question: String, answer: String) {
        self.question = question;
        self.answer = answer;
    }
}
