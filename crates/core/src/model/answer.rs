use std::fmt;

use crate::model::kinds::DeckFormat;

/// Shortest underscore run treated as a cloze blank.
const BLANK_MIN_LEN: usize = 3;

/// One piece of a rendered answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceSegment {
    /// Plain text taken from the card.
    Text(String),
    /// The answer value, to be shown distinctly (e.g. underlined).
    Filled(String),
}

/// The back side of a card as it should be presented after reveal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerFace {
    segments: Vec<FaceSegment>,
}

impl AnswerFace {
    #[must_use]
    pub fn segments(&self) -> &[FaceSegment] {
        &self.segments
    }

    /// The text of the `Filled` segment, if any.
    #[must_use]
    pub fn filled(&self) -> Option<&str> {
        self.segments.iter().find_map(|s| match s {
            FaceSegment::Filled(text) => Some(text.as_str()),
            FaceSegment::Text(_) => None,
        })
    }

    fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.segments.push(FaceSegment::Text(text.to_owned()));
        }
    }

    fn push_filled(&mut self, text: &str) {
        self.segments.push(FaceSegment::Filled(text.to_owned()));
    }
}

impl fmt::Display for AnswerFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                FaceSegment::Text(text) | FaceSegment::Filled(text) => f.write_str(text)?,
            }
        }
        Ok(())
    }
}

/// Renders the answer side of a card.
///
/// Cloze cards substitute the answer into the first run of three or more
/// underscores in the question; with no blank present the whole question is
/// followed by the answer in parentheses. Other formats show the answer alone.
#[must_use]
pub fn answer_face(question: &str, answer: &str, format: DeckFormat) -> AnswerFace {
    let mut face = AnswerFace::default();
    if format != DeckFormat::Cloze {
        face.push_filled(answer);
        return face;
    }

    match find_blank(question) {
        Some((start, end)) => {
            face.push_text(&question[..start]);
            face.push_filled(answer);
            face.push_text(&question[end..]);
        }
        None => {
            face.push_text(question);
            face.push_text(" (");
            face.push_filled(answer);
            face.push_text(")");
        }
    }
    face
}

/// Byte range of the first run of `BLANK_MIN_LEN`+ underscores.
fn find_blank(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'_' {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b'_' {
            i += 1;
        }
        if i - start >= BLANK_MIN_LEN {
            return Some((start, i));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloze_fills_trailing_blank() {
        let face = answer_face("The capital of France is ___", "Paris", DeckFormat::Cloze);
        assert_eq!(
            face.segments(),
            &[
                FaceSegment::Text("The capital of France is ".into()),
                FaceSegment::Filled("Paris".into()),
            ]
        );
        assert_eq!(face.to_string(), "The capital of France is Paris");
    }

    #[test]
    fn cloze_without_blank_appends_parenthesised_answer() {
        let face = answer_face("What is the capital of France?", "Paris", DeckFormat::Cloze);
        assert_eq!(face.to_string(), "What is the capital of France? (Paris)");
        assert_eq!(face.filled(), Some("Paris"));
    }

    #[test]
    fn cloze_replaces_only_first_long_run() {
        let face = answer_face("a __ b _____ c ___ d", "X", DeckFormat::Cloze);
        assert_eq!(face.to_string(), "a __ b X c ___ d");
    }

    #[test]
    fn two_underscores_are_not_a_blank() {
        let face = answer_face("snake__case", "ok", DeckFormat::Cloze);
        assert_eq!(face.to_string(), "snake__case (ok)");
    }

    #[test]
    fn blank_after_multibyte_text() {
        let face = answer_face("Größe: ____ cm", "42", DeckFormat::Cloze);
        assert_eq!(face.to_string(), "Größe: 42 cm");
    }

    #[test]
    fn other_formats_show_answer_only() {
        for format in [DeckFormat::Qa, DeckFormat::Mcq] {
            let face = answer_face("The capital of France is ___", "Paris", format);
            assert_eq!(face.segments(), &[FaceSegment::Filled("Paris".into())]);
        }
    }
}
