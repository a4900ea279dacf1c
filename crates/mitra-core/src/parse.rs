//! Parse-or-default handling for generated output.
//!
//! Generated text is untrusted: it may be wrapped in Markdown fences, carry
//! prose around the JSON, or simply be malformed. Everything here returns a
//! [`Parsed`] value and never an error.

use serde::{
  Deserialize, Serialize,
  de::{DeserializeOwned, IgnoredAny},
};
use tracing::{debug, warn};

use crate::generate::{GenerationRequest, Generator};

/// Where a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  Ai,
  Fallback,
  /// Deterministic rules were the configured path, not a substitute.
  Rules,
}

/// The outcome of parsing generated output: either the parsed value or the
/// deterministic fallback that replaced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
  Ok(T),
  Fallback(T),
}

impl<T> Parsed<T> {
  pub fn is_fallback(&self) -> bool { matches!(self, Self::Fallback(_)) }

  pub fn source(&self) -> Source {
    match self {
      Self::Ok(_) => Source::Ai,
      Self::Fallback(_) => Source::Fallback,
    }
  }

  pub fn value(&self) -> &T {
    match self {
      Self::Ok(v) | Self::Fallback(v) => v,
    }
  }

  pub fn into_inner(self) -> T {
    match self {
      Self::Ok(v) | Self::Fallback(v) => v,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
    match self {
      Self::Ok(v) => Parsed::Ok(f(v)),
      Self::Fallback(v) => Parsed::Fallback(f(v)),
    }
  }
}

/// Field-level checks applied after deserialisation. A value that parses but
/// fails validation is treated exactly like unparseable output.
pub trait Validate {
  fn is_valid(&self) -> bool { true }
}

impl<T: Validate> Validate for Vec<T> {
  fn is_valid(&self) -> bool { self.iter().all(Validate::is_valid) }
}

/// `None` never validates, so an optional payload only counts when present.
impl<T: Validate> Validate for Option<T> {
  fn is_valid(&self) -> bool { self.as_ref().is_some_and(Validate::is_valid) }
}

/// Locate the JSON payload inside generated text: the slice from the first
/// `{` (or `[`) to the last matching closer. Code fences and surrounding prose
/// fall outside that slice. When both an object and an array slice exist, the
/// earlier one wins unless only the other parses.
pub fn extract_json(text: &str) -> Option<&str> {
  let span = |open: char, close: char| {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| (start, &text[start..=end]))
  };
  let mut candidates: Vec<(usize, &str)> =
    [span('{', '}'), span('[', ']')].into_iter().flatten().collect();
  candidates.sort_by_key(|&(start, _)| start);
  candidates
    .iter()
    .find(|(_, slice)| serde_json::from_str::<IgnoredAny>(slice).is_ok())
    .or(candidates.first())
    .map(|&(_, slice)| slice)
}

/// Parse `text` as `T`, substituting `fallback()` on any failure.
pub fn parse_or<T, F>(text: &str, fallback: F) -> Parsed<T>
where
  T: DeserializeOwned + Validate,
  F: FnOnce() -> T,
{
  let Some(json) = extract_json(text) else {
    debug!("generated text contained no JSON payload");
    return Parsed::Fallback(fallback());
  };
  match serde_json::from_str::<T>(json) {
    Ok(value) if value.is_valid() => Parsed::Ok(value),
    Ok(_) => {
      debug!("generated JSON failed validation");
      Parsed::Fallback(fallback())
    }
    Err(e) => {
      debug!(error = %e, "generated JSON did not match the expected shape");
      Parsed::Fallback(fallback())
    }
  }
}

/// Run `request` and parse the result, falling back on generation failure as
/// well as on parse failure.
pub async fn generate_parsed<G, T, F>(
  generator: &G,
  request: GenerationRequest,
  fallback: F,
) -> Parsed<T>
where
  G: Generator,
  T: DeserializeOwned + Validate,
  F: FnOnce() -> T,
{
  match generator.generate(request).await {
    Ok(text) => parse_or(&text, fallback),
    Err(e) => {
      warn!(error = %e, "generation failed; using fallback payload");
      Parsed::Fallback(fallback())
    }
  }
}

/// Deserialises a single non-empty string field named `prompt`, `text` or
/// similar; shared by handlers that ask for one short generated line.
#[derive(Debug, Clone, Deserialize)]
pub struct Line {
  #[serde(alias = "prompt", alias = "text", alias = "reply")]
  pub line: String,
}

impl Validate for Line {
  fn is_valid(&self) -> bool {
    let len = self.line.trim().chars().count();
    len > 0 && len <= 600
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::ScriptedGenerator;

  #[derive(Debug, Deserialize, PartialEq)]
  struct Score {
    value: u8,
  }

  impl Validate for Score {
    fn is_valid(&self) -> bool { self.value <= 10 }
  }

  #[test]
  fn extracts_json_from_fenced_text() {
    let text = "Sure!\n```json\n{\"value\": 3}\n```\nHope that helps.";
    assert_eq!(extract_json(text), Some("{\"value\": 3}"));
  }

  #[test]
  fn extracts_arrays() {
    assert_eq!(extract_json("list: [1, 2]"), Some("[1, 2]"));
  }

  #[test]
  fn bracketed_prose_before_an_object_is_skipped() {
    let text = "[emotion: calm] {\"value\": 3, \"tags\": [\"x\"]}";
    assert_eq!(extract_json(text), Some("{\"value\": 3, \"tags\": [\"x\"]}"));
    let parsed = parse_or(text, || Score { value: 0 });
    assert_eq!(parsed, Parsed::Ok(Score { value: 3 }));
  }

  #[test]
  fn no_json_yields_none() {
    assert_eq!(extract_json("I'm not sure what you mean."), None);
    assert_eq!(extract_json("} backwards {"), None);
  }

  #[test]
  fn valid_payload_parses() {
    let parsed = parse_or("{\"value\": 7}", || Score { value: 0 });
    assert_eq!(parsed, Parsed::Ok(Score { value: 7 }));
    assert_eq!(parsed.source(), Source::Ai);
  }

  #[test]
  fn invalid_payload_falls_back() {
    let parsed = parse_or("{\"value\": 42}", || Score { value: 0 });
    assert_eq!(parsed, Parsed::Fallback(Score { value: 0 }));

    let parsed = parse_or("{\"value\": \"seven\"}", || Score { value: 0 });
    assert!(parsed.is_fallback());

    let parsed = parse_or("{\"value\": 7", || Score { value: 0 });
    assert!(parsed.is_fallback());
  }

  #[tokio::test]
  async fn generator_failure_falls_back() {
    let generator = ScriptedGenerator::failing();
    let parsed = generate_parsed(
      &generator,
      GenerationRequest::json("score this"),
      || Score { value: 1 },
    )
    .await;
    assert_eq!(parsed, Parsed::Fallback(Score { value: 1 }));
  }

  #[test]
  fn line_accepts_aliases() {
    let parsed = parse_or("{\"prompt\": \"What felt heavy today?\"}", || Line {
      line: String::new(),
    });
    assert_eq!(parsed.into_inner().line, "What felt heavy today?");
  }
}
