//! Conversation turns, prompt-history truncation and the per-user active
//! context (rolling window of recent exchanges plus emotional history).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prompt history keeps only this many of the most recent turns.
pub const HISTORY_LIMIT: usize = 15;
/// Each turn is cut to this many characters when rendered into a prompt.
pub const TURN_CHAR_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  #[serde(alias = "model", alias = "bot", alias = "mitra")]
  Assistant,
}

/// One message in a conversation as the client sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
  pub role: Role,
  #[serde(alias = "content")]
  pub text: String,
}

impl Turn {
  pub fn user(text: impl Into<String>) -> Self {
    Self { role: Role::User, text: text.into() }
  }

  pub fn assistant(text: impl Into<String>) -> Self {
    Self { role: Role::Assistant, text: text.into() }
  }
}

/// A turn as persisted in the `conversations` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTurn {
  pub user_id: String,
  pub role:    Role,
  pub text:    String,
  pub emotion: Option<String>,
  pub at:      DateTime<Utc>,
}

/// Cut `text` to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> &str {
  match text.char_indices().nth(max) {
    Some((idx, _)) => &text[..idx],
    None => text,
  }
}

/// The last `limit` entries of `history`.
pub fn recent(history: &[Turn], limit: usize) -> &[Turn] {
  &history[history.len().saturating_sub(limit)..]
}

/// Render the most recent [`HISTORY_LIMIT`] turns as prompt lines, each cut
/// to [`TURN_CHAR_LIMIT`] characters.
pub fn render_history(history: &[Turn]) -> String {
  recent(history, HISTORY_LIMIT)
    .iter()
    .map(|turn| {
      let speaker = match turn.role {
        Role::User => "User",
        Role::Assistant => "Mitra",
      };
      format!("{speaker}: {}", truncate_chars(turn.text.trim(), TURN_CHAR_LIMIT))
    })
    .collect::<Vec<_>>()
    .join("\n")
}

// ─── Active context ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionSample {
  pub label:     String,
  pub intensity: f32,
  pub at:        DateTime<Utc>,
}

/// Rolling per-user conversation state, stored under the user's id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveContext {
  #[serde(default)]
  pub turns:      Vec<Turn>,
  #[serde(default)]
  pub emotions:   Vec<EmotionSample>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl ActiveContext {
  pub const MAX_PAIRS: usize = 10;
  pub const MAX_EMOTIONS: usize = 20;

  /// Append a user/assistant exchange, keeping the last [`Self::MAX_PAIRS`].
  pub fn push_exchange(&mut self, user: &str, assistant: &str, at: DateTime<Utc>) {
    self.turns.push(Turn::user(user));
    self.turns.push(Turn::assistant(assistant));
    let excess = self.turns.len().saturating_sub(Self::MAX_PAIRS * 2);
    self.turns.drain(..excess);
    self.updated_at = Some(at);
  }

  pub fn push_emotion(&mut self, label: &str, intensity: f32, at: DateTime<Utc>) {
    self.emotions.push(EmotionSample { label: label.to_owned(), intensity, at });
    let excess = self.emotions.len().saturating_sub(Self::MAX_EMOTIONS);
    self.emotions.drain(..excess);
  }

  /// The most frequent recorded emotion; ties go to the most recent label.
  pub fn dominant_emotion(&self) -> Option<&str> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, sample) in self.emotions.iter().enumerate() {
      let entry = counts.entry(sample.label.as_str()).or_default();
      entry.0 += 1;
      entry.1 = idx;
    }
    counts
      .into_iter()
      .max_by_key(|(_, (count, last))| (*count, *last))
      .map(|(label, _)| label)
  }
}
