//! Contract with the natural-language advice service.
//!
//! The service classifies a chat message, optionally extracts a log
//! entry from it, and always answers with a short text. Its JSON reply
//! is validated here; nothing downstream sees the raw shape.

use crate::{Error, LogDraft, LogEntry, LogKind, Measures, Result, UserProfile};
use serde::Deserialize;

/// Shown when a chat request fails for any reason
pub const CHAT_FALLBACK: &str =
    "Sorry, I couldn't process that right now. Nothing was logged; please try again.";

/// Shown when the periodic coaching request fails
pub const ADVICE_FALLBACK: &str = "Keep it up! Consistency is the key to success.";

/// A natural-language advice and extraction service
pub trait AdviceClient {
    /// Classify `text`, extracting a log draft when it reports a meal,
    /// sleep or activity
    fn classify_and_respond(&self, text: &str, profile: &UserProfile) -> Result<ChatReply>;

    /// A short coaching tip over recent history
    fn periodic_advice(&self, history: &[LogEntry], profile: &UserProfile) -> Result<String>;
}

/// How the service classified a message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyKind {
    Log,
    Advice,
}

/// A validated chat reply
#[derive(Clone, Debug, PartialEq)]
pub struct ChatReply {
    pub kind: ReplyKind,
    pub text: String,
    pub draft: Option<LogDraft>,
}

/// Reply as sent on the wire
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReply {
    #[serde(rename = "type")]
    kind: Option<String>,
    text_response: Option<String>,
    log_data: Option<RawLogData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLogData {
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
    calories: Option<serde_json::Value>,
    protein: Option<serde_json::Value>,
    carbs: Option<serde_json::Value>,
    fats: Option<serde_json::Value>,
    sleep_hours: Option<serde_json::Value>,
    duration_minutes: Option<serde_json::Value>,
}

/// Read a number the model may have sent as a number or a numeric string
fn number(value: Option<serde_json::Value>) -> f64 {
    let parsed = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
}

impl RawLogData {
    fn into_draft(self) -> Option<LogDraft> {
        let kind_name = self.kind?;
        let Some(kind) = LogKind::parse(&kind_name) else {
            tracing::warn!("Ignoring log data with unknown type {:?}", kind_name);
            return None;
        };

        let measures = Measures {
            calories: number(self.calories),
            protein: number(self.protein),
            carbs: number(self.carbs),
            fats: number(self.fats),
            sleep_hours: number(self.sleep_hours),
            duration_minutes: number(self.duration_minutes),
        }
        .for_kind(kind);

        Some(LogDraft {
            kind,
            description: self.description,
            measures,
        })
    }
}

/// Strip a Markdown code fence some models wrap around JSON output
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Validate a chat reply body.
///
/// `textResponse` is required. Log data with a missing or unknown type
/// is dropped; missing or invalid numbers become zero.
pub fn parse_chat_reply(body: &str) -> Result<ChatReply> {
    let raw: RawReply = serde_json::from_str(strip_code_fence(body))
        .map_err(|e| Error::Advice(format!("unparsable reply: {}", e)))?;

    let text = raw
        .text_response
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::Advice("reply has no textResponse".into()))?;

    let draft = raw.log_data.and_then(RawLogData::into_draft);

    let kind = match raw.kind.as_deref() {
        Some("log") => ReplyKind::Log,
        Some("advice") => ReplyKind::Advice,
        _ if draft.is_some() => ReplyKind::Log,
        _ => ReplyKind::Advice,
    };

    Ok(ChatReply { kind, text, draft })
}
