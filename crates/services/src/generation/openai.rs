use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use flashdeck_core::model::{CardDraft, DeckFormat, Difficulty};

use super::{CardGenerator, GeneratedCards, GenerationConfig, GenerationRequest};
use crate::error::GenerationError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const INSTRUCTIONS: &str = "You are an expert tutor and quiz generator. You will be given a topic, \
a difficulty level and a number of questions to generate and you will create that number of \
question and answer flash cards for the user to test themselves on that topic. Reply with a JSON \
object of the form {\"flashcards\": [{\"question\": string, \"answer\": string, \"order\": number}], \
\"difficulty\": \"easy\" | \"medium\" | \"difficult\" | \"expert\", \"topic\": string}.";

/// Generator backed by an OpenAI-compatible HTTP API.
///
/// Every request is screened by the moderation endpoint before any cards are
/// generated.
#[derive(Clone)]
pub struct OpenAiCardGenerator {
    client: Client,
    config: GenerationConfig,
}

impl OpenAiCardGenerator {
    #[must_use]
    pub fn new(config: GenerationConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn moderate(&self, input: &str) -> Result<(), GenerationError> {
        let response = self
            .client
            .post(self.endpoint("moderations"))
            .bearer_auth(&self.config.api_key)
            .json(&ModerationRequest { input })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ModerationResponse = response.json().await?;
        let Some(result) = body.results.into_iter().next() else {
            return Err(GenerationError::Malformed("moderation returned no results".into()));
        };
        if result.flagged {
            let categories: Vec<String> = result
                .categories
                .into_iter()
                .filter_map(|(name, hit)| hit.then_some(name))
                .collect();
            warn!(?categories, "generation input flagged by moderation");
            return Err(GenerationError::Flagged(categories));
        }
        Ok(())
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let payload = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: INSTRUCTIONS.to_owned(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(request),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.2,
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl CardGenerator for OpenAiCardGenerator {
    #[instrument(skip(self, request), fields(model = %self.config.model, count = request.question_count))]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedCards, GenerationError> {
        self.moderate(request.topic.trim()).await?;
        let content = self.complete(request).await?;
        let generated = parse_question_set(&content)?;
        info!(cards = generated.cards.len(), "cards generated");
        Ok(generated)
    }
}

fn user_prompt(request: &GenerationRequest) -> String {
    format!(
        "Please create a set of {count} flashcards of {difficulty} difficulty targeting the \
         \"{bloom}\" level of Bloom's taxonomy. {format_rule} The user's topic is written as {input}. \
         The topic is stated between the two sets of ### below:\n###\n{topic}\n###\n\
         Ensure that the output follows the JSON schema described in the instructions.",
        count = request.question_count,
        difficulty = request.difficulty,
        bloom = request.bloom_level,
        format_rule = format_rule(request.format),
        input = request.input_kind,
        topic = request.topic.trim(),
    )
}

fn format_rule(format: DeckFormat) -> &'static str {
    match format {
        DeckFormat::Qa => "Each card is a plain question with a short answer.",
        DeckFormat::Cloze => {
            "Each question is a sentence with the key term replaced by ___ and the answer is the missing term."
        }
        DeckFormat::Mcq => {
            "Each question lists its options labelled A to D and the answer is the correct option."
        }
    }
}

/// Parses the model's JSON reply into drafts. Missing orders fall back to
/// reply position.
fn parse_question_set(content: &str) -> Result<GeneratedCards, GenerationError> {
    let set: WireQuestionSet =
        serde_json::from_str(content).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    if set.flashcards.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let cards = set
        .flashcards
        .into_iter()
        .zip(1_i64..)
        .map(|(card, position)| {
            let order = card.order.map_or(position, round_order);
            CardDraft::new(order, card.question.trim(), card.answer.trim())
        })
        .collect();

    Ok(GeneratedCards {
        topic: set.topic.trim().to_owned(),
        difficulty: set.difficulty.and_then(|d| d.parse::<Difficulty>().ok()),
        cards,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn round_order(order: f64) -> i64 {
    order.round() as i64
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, bool>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireQuestionSet {
    flashcards: Vec<WireCard>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    topic: String,
}

#[derive(Debug, Deserialize)]
struct WireCard {
    question: String,
    answer: String,
    #[serde(default)]
    order: Option<f64>,
}
