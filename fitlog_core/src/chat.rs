//! Chat submission and periodic coaching.
//!
//! A chat message goes to the advice service together with the profile.
//! When the reply carries log data, an entry is built and recorded; the
//! reply text is always handed back. A failed request never logs
//! anything and is answered with a fixed apology instead.

use crate::advice::{AdviceClient, ReplyKind, ADVICE_FALLBACK, CHAT_FALLBACK};
use crate::store::KeyValueStore;
use crate::tracker::Tracker;
use crate::{Error, LogEntry, Result};
use chrono::{DateTime, FixedOffset};

/// What a chat submission produced
#[derive(Clone, Debug, PartialEq)]
pub struct ChatOutcome {
    /// Text to show the user
    pub text: String,
    /// The entry recorded from this message, if any
    pub logged: Option<LogEntry>,
    /// False when the service failed and `text` is the fallback
    pub answered: bool,
}

/// Send one message and record whatever it reports.
///
/// Fails only on empty input, a missing profile, or a storage error;
/// advice-service errors turn into the fallback reply.
pub fn submit_message<S, C>(
    tracker: &mut Tracker<S>,
    client: &C,
    text: &str,
    now: DateTime<FixedOffset>,
) -> Result<ChatOutcome>
where
    S: KeyValueStore,
    C: AdviceClient + ?Sized,
{
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput("message is empty".into()));
    }
    let profile = tracker.require_profile()?;

    let reply = match client.classify_and_respond(text, profile) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Chat request failed: {}", e);
            return Ok(ChatOutcome {
                text: CHAT_FALLBACK.to_string(),
                logged: None,
                answered: false,
            });
        }
    };

    let logged = match reply.draft {
        Some(draft) => {
            let entry = draft.into_entry(text, now);
            Some(tracker.record(entry)?.clone())
        }
        None => {
            if reply.kind == ReplyKind::Log {
                tracing::debug!("Reply classified as log but carried no usable data");
            }
            None
        }
    };

    Ok(ChatOutcome {
        text: reply.text,
        logged,
        answered: true,
    })
}

/// Ask for a coaching tip over the last `limit` entries
pub fn periodic_advice<S, C>(tracker: &Tracker<S>, client: &C, limit: usize) -> Result<String>
where
    S: KeyValueStore,
    C: AdviceClient + ?Sized,
{
    let profile = tracker.require_profile()?;
    let history = tracker.log().recent(limit);

    match client.periodic_advice(history, profile) {
        Ok(tip) => Ok(tip),
        Err(e) => {
            tracing::warn!("Coaching request failed: {}", e);
            Ok(ADVICE_FALLBACK.to_string())
        }
    }
}
