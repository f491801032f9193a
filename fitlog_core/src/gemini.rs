//! Google Gemini implementation of [`AdviceClient`].
//!
//! Talks to the `generateContent` REST endpoint with a blocking client;
//! the CLI waits for one request at a time.
//!
//! ## Configuration
//!
//! The API key is read from the environment (`GEMINI_API_KEY` unless the
//! config names another variable). Model, base URL and timeout come from
//! the `[advice]` config section.

use crate::advice::{parse_chat_reply, AdviceClient, ChatReply};
use crate::config::AdviceConfig;
use crate::{Error, LogEntry, Result, UserProfile};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

/// Environment variable for the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default model to use
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Base URL for the Gemini API
pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const CHAT_INSTRUCTION: &str = "You are a nutrition and fitness assistant inside a personal \
tracker. Read the user's message and:\n\
1. If it reports a meal, a workout or sleep, extract it as logData.\n\
2. Always answer with a short, friendly, expert textResponse.\n\
Meals: estimate calories and protein, carbs and fats in grams.\n\
Workouts: estimate calories burned from the exercise, its intensity and the user's weight; \
put the duration in durationMinutes.\n\
Sleep: extract the hours slept into sleepHours.\n\
Whenever something should be logged, include logData and set type to \"log\"; \
otherwise set type to \"advice\".";

const COACH_INSTRUCTION: &str = "You are an experienced coach. Look at the calorie balance \
and sleep quality in the history and give one short, punchy tip for the week \
(two sentences at most). Answer in plain text.";

/// Response schema handed to the model for chat requests
static CHAT_RESPONSE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "type": { "type": "STRING", "enum": ["log", "advice"] },
            "textResponse": { "type": "STRING" },
            "logData": {
                "type": "OBJECT",
                "properties": {
                    "type": { "type": "STRING", "enum": ["meal", "sleep", "activity"] },
                    "description": { "type": "STRING" },
                    "calories": { "type": "NUMBER" },
                    "protein": { "type": "NUMBER" },
                    "carbs": { "type": "NUMBER" },
                    "fats": { "type": "NUMBER" },
                    "sleepHours": { "type": "NUMBER" },
                    "durationMinutes": { "type": "NUMBER" }
                }
            }
        },
        "required": ["type", "textResponse"]
    })
});

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_owned),
            parts: vec![ContentPart { text: Some(text.into()) }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

// ============================================================================
// Client Implementation
// ============================================================================

/// Blocking Gemini client
pub struct GeminiClient {
    api_key: String,
    client: Client,
    model: String,
    base_url: String,
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client with an API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            client: build_http_client(DEFAULT_TIMEOUT_SECS)?,
            model: DEFAULT_MODEL.to_owned(),
            base_url: API_BASE_URL.to_owned(),
        })
    }

    /// Create a client reading the API key from `var`
    pub fn from_env(var: &str) -> Result<Self> {
        let api_key = std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{} environment variable not set", var)))?;
        Self::new(api_key)
    }

    /// Create a client from the `[advice]` config section
    pub fn from_config(config: &AdviceConfig) -> Result<Self> {
        Ok(Self::from_env(&config.api_key_env)?
            .with_model(&config.model)
            .with_base_url(&config.base_url)
            .with_timeout(config.timeout_secs)?)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Result<Self> {
        self.client = build_http_client(secs)?;
        Ok(self)
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send one request and return the first candidate's text
    fn generate(&self, request: &GeminiRequest) -> Result<String> {
        tracing::debug!("Sending request to Gemini model {}", self.model);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            tracing::error!("Gemini API returned {}", status);
            return Err(map_api_error(status.as_u16(), &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Advice(format!("failed to parse Gemini response: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(Error::Advice(format!("Gemini API error: {}", error.message)));
        }

        extract_text(parsed)
    }
}

impl AdviceClient for GeminiClient {
    fn classify_and_respond(&self, text: &str, profile: &UserProfile) -> Result<ChatReply> {
        let profile_json = serde_json::to_string(profile)?;
        let request = GeminiRequest {
            contents: vec![GeminiContent::text(
                Some("user"),
                format!("User message: \"{}\"\nUser profile: {}", text, profile_json),
            )],
            system_instruction: Some(GeminiContent::text(
                None,
                format!(
                    "{}\nThe user weighs {} kg.",
                    CHAT_INSTRUCTION,
                    profile.input().weight_kg
                ),
            )),
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".into(),
                response_schema: Some(CHAT_RESPONSE_SCHEMA.clone()),
            }),
        };

        let body = self.generate(&request)?;
        parse_chat_reply(&body)
    }

    fn periodic_advice(&self, history: &[LogEntry], profile: &UserProfile) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent::text(
                Some("user"),
                format!(
                    "Review my progress.\nProfile: {}\nHistory: {}",
                    serde_json::to_string(profile)?,
                    serde_json::to_string(history)?
                ),
            )],
            system_instruction: Some(GeminiContent::text(None, COACH_INSTRUCTION)),
            generation_config: None,
        };

        let text = self.generate(&request)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Advice("empty coaching reply".into()));
        }
        Ok(text.to_owned())
    }
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GeminiResponse) -> Result<String> {
    let content = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .ok_or_else(|| Error::Advice("no content in Gemini response".into()))?;

    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.is_empty() {
        return Err(Error::Advice("Gemini response had no text".into()));
    }
    Ok(text)
}

/// Map an error status to an error carrying Gemini's own message when present
fn map_api_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<GeminiResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .map_or_else(|| body.to_owned(), |e| e.message);

    match status {
        401 | 403 => Error::Advice(format!("authentication failed: {}", message)),
        429 => Error::Advice(format!("rate limited: {}", message)),
        _ => Error::Advice(format!("HTTP {}: {}", status, message)),
    }
}
