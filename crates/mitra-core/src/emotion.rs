//! Emotion analysis: a small secondary generation that classifies the user's
//! message into a constrained JSON object, with a fixed default whenever the
//! output is unusable.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
  conversation::truncate_chars,
  generate::{GenerationRequest, Generator},
  parse::{Parsed, Validate, generate_parsed},
};

/// Longest message excerpt embedded in the analysis prompt.
const MESSAGE_CHAR_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
  Positive,
  Negative,
  #[default]
  Neutral,
  Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionLabel {
  pub label:      String,
  /// 0.0 – 1.0
  pub intensity:  f32,
  /// 0.0 – 1.0
  pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
  pub emotion:   EmotionLabel,
  pub sentiment: Sentiment,
  #[serde(default)]
  pub needs:     Vec<String>,
  pub strategy:  String,
  pub tone:      String,
}

impl Default for EmotionAnalysis {
  fn default() -> Self {
    Self {
      emotion:   EmotionLabel {
        label:      "neutral".into(),
        intensity:  0.5,
        confidence: 0.3,
      },
      sentiment: Sentiment::Neutral,
      needs:     vec!["support".into()],
      strategy:  "validate".into(),
      tone:      "warm".into(),
    }
  }
}

fn unit(x: f32) -> bool { x.is_finite() && (0.0..=1.0).contains(&x) }

fn short_word(s: &str) -> bool {
  let len = s.trim().chars().count();
  len > 0 && len <= 40
}

impl Validate for EmotionAnalysis {
  fn is_valid(&self) -> bool {
    short_word(&self.emotion.label)
      && unit(self.emotion.intensity)
      && unit(self.emotion.confidence)
      && short_word(&self.strategy)
      && short_word(&self.tone)
      && self.needs.len() <= 5
      && self.needs.iter().all(|n| short_word(n))
  }
}

impl EmotionAnalysis {
  /// Compact one-line summary embedded in the chat prompt.
  pub fn summary(&self) -> String {
    let needs = if self.needs.is_empty() {
      "none stated".to_owned()
    } else {
      self.needs.join(", ")
    };
    format!(
      "Emotional read: {} (intensity {:.1}, confidence {:.1}); sentiment {:?}; \
       needs: {needs}; approach: {}; tone: {}.",
      self.emotion.label,
      self.emotion.intensity,
      self.emotion.confidence,
      self.sentiment,
      self.strategy,
      self.tone,
    )
    .to_lowercase()
  }
}

pub fn analysis_prompt(message: &str) -> String {
  format!(
    "Classify the emotional content of the message below. Reply with JSON \
     only, exactly in this shape:\n\
     {{\"emotion\":{{\"label\":\"<one word>\",\"intensity\":<0-1>,\"confidence\":<0-1>}},\
     \"sentiment\":\"positive|negative|neutral|mixed\",\
     \"needs\":[\"<short need>\"],\"strategy\":\"<validate|reframe|ground|encourage|inform>\",\
     \"tone\":\"<one word>\"}}\n\n\
     Message: \"\"\"{}\"\"\"",
    truncate_chars(message.trim(), MESSAGE_CHAR_LIMIT)
  )
}

/// Classify `message`. Never fails: unusable output yields
/// `Parsed::Fallback(EmotionAnalysis::default())`.
pub async fn analyze<G: Generator>(generator: &G, message: &str) -> Parsed<EmotionAnalysis> {
  let request = GenerationRequest::json(analysis_prompt(message))
    .with_temperature(0.2)
    .with_max_tokens(256);
  generate_parsed(generator, request, EmotionAnalysis::default).await
}

// ─── Inline emotion tags ─────────────────────────────────────────────────────

static EMOTION_TAG: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)\[\s*emotion\s*:\s*([a-z][a-z \-]{0,30}?)\s*\]").expect("valid regex")
});

/// Strip `[emotion: label]` tags the model sometimes emits, returning the
/// cleaned text and the lowercase labels found.
pub fn extract_emotion_tags(text: &str) -> (String, Vec<String>) {
  let labels = EMOTION_TAG
    .captures_iter(text)
    .map(|c| c[1].trim().to_lowercase())
    .collect();
  let cleaned = EMOTION_TAG.replace_all(text, "");
  let cleaned = cleaned
    .lines()
    .map(str::trim_end)
    .collect::<Vec<_>>()
    .join("\n")
    .replace("  ", " ");
  (cleaned.trim().to_owned(), labels)
}
