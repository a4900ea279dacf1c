//! Memory facts: short statements pattern-matched out of user messages and
//! re-injected into later prompts.
//!
//! This is a heuristic text scan. Each pattern carries a fixed confidence;
//! there is no disambiguation, and conflicting facts resolve by last write.

use std::{collections::BTreeMap, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Longest stored fact value, in characters.
const VALUE_CHAR_LIMIT: usize = 60;
/// Facts recalled into a chat prompt.
pub const RECALL_LIMIT: usize = 3;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FactKind {
  Name,
  Age,
  Location,
  Occupation,
  Preference,
  Aversion,
}

impl FactKind {
  /// Single-valued kinds keep only the latest value.
  pub fn is_single_valued(self) -> bool {
    matches!(self, Self::Name | Self::Age | Self::Location | Self::Occupation)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryFact {
  pub kind:         FactKind,
  pub value:        String,
  pub confidence:   f32,
  pub extracted_at: DateTime<Utc>,
}

impl MemoryFact {
  /// Key under which the fact is merged into a [`MemoryProfile`].
  pub fn key(&self) -> String {
    if self.kind.is_single_valued() {
      self.kind.to_string()
    } else {
      let slug: String = self
        .value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
      format!("{}_{slug}", self.kind)
    }
  }

  pub fn render(&self) -> String { format!("{}: {}", self.kind, self.value) }
}

// ─── Extraction ──────────────────────────────────────────────────────────────

struct Pattern {
  kind:       FactKind,
  confidence: f32,
  regex:      Regex,
}

static PATTERNS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
  let p = |kind, confidence, re: &str| Pattern {
    kind,
    confidence,
    regex: Regex::new(re).expect("valid regex"),
  };
  vec![
    p(FactKind::Name, 0.9, r"(?i)\b(?:my name is|call me)\s+([^.,!?;\n]+)"),
    p(FactKind::Age, 0.85, r"(?i)\bi(?:'m|\s+am)\s+(\d{1,3})\s+years?\s+old\b"),
    p(FactKind::Location, 0.8, r"(?i)\bi\s+(?:live|stay)\s+in\s+([^.,!?;\n]+)"),
    p(
      FactKind::Occupation,
      0.75,
      r"(?i)\bi\s+work\s+(?:as|at|in)\s+(?:an?\s+)?([^.,!?;\n]+)",
    ),
    p(
      FactKind::Preference,
      0.7,
      r"(?i)\bi\s+(?:really\s+)?(?:love|like|enjoy)\s+([^.,!?;\n]+)",
    ),
    p(
      FactKind::Aversion,
      0.6,
      r"(?i)\bi\s+(?:really\s+)?(?:hate|dislike|don't like|do not like)\s+([^.,!?;\n]+)",
    ),
  ]
});

static CONJUNCTION: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i) (?:and|but|because|so|although) ").expect("valid regex")
});

/// Cut a captured phrase at the first conjunction, trim it, and cap its
/// length. Names keep at most three words.
fn clean_value(kind: FactKind, raw: &str) -> Option<String> {
  let cut = CONJUNCTION.find(raw).map_or(raw.len(), |m| m.start());
  let mut value = raw[..cut].trim().trim_end_matches(['\'', '"', ')']).to_owned();
  if kind == FactKind::Name {
    value = value.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
  }
  let value: String = value.chars().take(VALUE_CHAR_LIMIT).collect();
  let value = value.trim().to_owned();
  (!value.is_empty()).then_some(value)
}

/// Scan `text` for memorable statements.
pub fn extract_facts(text: &str, at: DateTime<Utc>) -> Vec<MemoryFact> {
  let mut facts: Vec<MemoryFact> = Vec::new();
  for pattern in PATTERNS.iter() {
    for caps in pattern.regex.captures_iter(text) {
      let Some(value) = clean_value(pattern.kind, &caps[1]) else { continue };
      let fact = MemoryFact {
        kind: pattern.kind,
        value,
        confidence: pattern.confidence,
        extracted_at: at,
      };
      if !facts.iter().any(|f| f.key() == fact.key()) {
        facts.push(fact);
      }
    }
  }
  facts
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// All facts known about a user, keyed by [`MemoryFact::key`]. Stored as one
/// document whose top-level keys are the fact keys, so a store merge is a
/// per-fact last-write-wins update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryProfile {
  pub facts: BTreeMap<String, MemoryFact>,
}

impl MemoryProfile {
  pub fn merge(&mut self, facts: impl IntoIterator<Item = MemoryFact>) {
    for fact in facts {
      self.facts.insert(fact.key(), fact);
    }
  }

  /// The merge-write body for `facts`.
  pub fn patch(facts: &[MemoryFact]) -> BTreeMap<String, &MemoryFact> {
    facts.iter().map(|f| (f.key(), f)).collect()
  }

  /// Most recently extracted facts first, then higher confidence, capped at
  /// `limit`.
  pub fn recall(&self, limit: usize) -> Vec<MemoryFact> {
    let mut facts: Vec<MemoryFact> = self.facts.values().cloned().collect();
    facts.sort_by(|a, b| {
      b.extracted_at
        .cmp(&a.extracted_at)
        .then(b.confidence.total_cmp(&a.confidence))
    });
    facts.truncate(limit);
    facts
  }
}

/// Render facts for the prompt: `"name: Asha; location: Pune"`.
pub fn summary(facts: &[MemoryFact]) -> String {
  facts.iter().map(MemoryFact::render).collect::<Vec<_>>().join("; ")
}
