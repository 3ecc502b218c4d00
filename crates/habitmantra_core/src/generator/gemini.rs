//! Gemini `generateContent` client producing structured mantras.
//!
//! The request asks for JSON output constrained by a response schema with
//! the three required mantra fields; the first candidate's text is decoded
//! into `MantraParts`.

use super::{GenerationError, GenerationResult, MantraGenerator};
use crate::model::habit::MantraParts;
use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const TEMPERATURE: f32 = 0.7;
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

/// Connection settings for [`GeminiMantraGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiSettings {
    /// Missing keys are reported per call, not at construction.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct GeminiMantraGenerator {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiMantraGenerator {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait]
impl MantraGenerator for GeminiMantraGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, goal: &str) -> GenerationResult<MantraParts> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(GenerationError::EmptyGoal);
        }
        let api_key = match self.settings.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(GenerationError::MissingApiKey),
        };

        let started_at = Instant::now();
        info!(
            "event=mantra_generate module=generator status=start model={} goal_chars={}",
            self.settings.model,
            goal.chars().count()
        );

        let result = self.request_mantra(api_key, goal).await;
        match &result {
            Ok(_) => info!(
                "event=mantra_generate module=generator status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=mantra_generate module=generator status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

impl GeminiMantraGenerator {
    async fn request_mantra(&self, api_key: &str, goal: &str) -> GenerationResult<MantraParts> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiTextPart {
                    text: build_prompt(goal),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_mime_type: "application/json",
                response_schema: mantra_schema(),
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            // Never put the key in the URL: reqwest errors echo it.
            .header("x-goog-api-key", api_key)
            .json(&request)
            .timeout(self.settings.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_mantra_response(&body)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Decodes a `generateContent` body into a validated mantra.
///
/// # Errors
/// - `MalformedResponse` when there is no candidate text, the text is not a
///   JSON object with the three string fields, or any field is blank.
pub fn parse_mantra_response(body: &str) -> GenerationResult<MantraParts> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|err| GenerationError::MalformedResponse(format!("invalid envelope: {err}")))?;

    let text = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GenerationError::MalformedResponse(
            "no response text".to_string(),
        ));
    }

    let mantra: MantraParts = serde_json::from_str(text.trim())
        .map_err(|err| GenerationError::MalformedResponse(format!("invalid mantra: {err}")))?;
    mantra
        .validate()
        .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
    Ok(mantra)
}

fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());
    message
        .replace(['\n', '\r'], " ")
        .chars()
        .take(MAX_ERROR_MESSAGE_CHARS)
        .collect()
}

fn mantra_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "identity": {
                "type": "STRING",
                "description": "The identity part of the mantra. MUST be a 'Micro Habit' - an extremely simple, easy version of the habit. Starts with '我是一个...' (I am a person who...). Example: '我是一个每天都要看一页书的人' (I am a person who reads one page daily)."
            },
            "benefit": {
                "type": "STRING",
                "description": "The benefit/reason part. Explains why this small step is good. Example: '它让我保持进步的惯性'"
            },
            "emotion": {
                "type": "STRING",
                "description": "The emotional result. Starts with '所以...' (So...). Example: '所以我会很轻松快乐'"
            }
        },
        "required": ["identity", "benefit", "emotion"]
    })
}

fn build_prompt(goal: &str) -> String {
    format!(
        r#"User Goal: "{goal}"

You are a Habit Formation Expert specializing in "Atomic Habits", "Tiny Habits", and "Micro Habits".

CORE PHILOSOPHY:
To build a new habit, the starting action must be "laughably simple" - so easy that the user cannot say no, even on their worst, busiest, most tired day.
Reduce the friction to near zero.

YOUR TASK:
Convert the user's goal into a "Micro-Habit Identity Mantra" in Chinese.

RULES FOR 'IDENTITY':
1. Drastically reduce the scope of the action.
2. Reading -> reads 1 page (看一页书).
3. Fitness -> does 1 squat (做一个深蹲) or puts on gym shoes (穿上运动鞋).
4. Writing -> writes 1 sentence (写一个句子).
5. Cleaning -> picks up 1 item (捡起一件东西).
6. The format MUST be: "我是一个每天都[Micro Action]的人".

OUTPUT:
1. Identity: the micro-habit identity.
2. Benefit: why this small consistency matters.
3. Emotion: the feeling of success and lack of pressure, starting with "所以".

Tone: empowering, absolute, positive, present tense.
Language: Chinese."#
    )
}
