//! Journal entries, entry analysis and guided reflection sessions.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  conversation::truncate_chars,
  emotion::Sentiment,
  generate::{GenerationRequest, Generator},
  parse::{Line, Parsed, Source, Validate, generate_parsed},
};

/// Longest entry excerpt embedded in an analysis prompt.
const CONTENT_CHAR_LIMIT: usize = 2_000;
/// Fallback themes reported per entry.
const MAX_THEMES: usize = 3;

// ─── Entries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
  pub id:         String,
  pub user_id:    String,
  pub content:    String,
  pub mood:       Option<String>,
  #[serde(default)]
  pub tags:       Vec<String>,
  pub created_at: DateTime<Utc>,
  pub insights:   Option<JournalInsights>,
}

/// Body of `POST /api/journal/entries`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
  pub content: String,
  pub mood:    Option<String>,
  #[serde(default)]
  pub tags:    Vec<String>,
}

impl NewEntry {
  pub fn into_entry(self, id: String, user_id: String, at: DateTime<Utc>) -> Result<JournalEntry> {
    let content = self.content.trim();
    if content.is_empty() {
      return Err(Error::validation("content must not be empty"));
    }
    let tags = self
      .tags
      .iter()
      .map(|t| t.trim().to_lowercase())
      .filter(|t| !t.is_empty())
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();
    Ok(JournalEntry {
      id,
      user_id,
      content: content.to_owned(),
      mood: self.mood.map(|m| m.trim().to_owned()).filter(|m| !m.is_empty()),
      tags,
      created_at: at,
      insights: None,
    })
  }
}

// ─── Analysis ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalAnalysis {
  pub sentiment: Sentiment,
  pub reframing: String,
  #[serde(default)]
  pub themes:    Vec<String>,
}

impl Validate for JournalAnalysis {
  fn is_valid(&self) -> bool {
    let reframing = self.reframing.trim().chars().count();
    reframing > 0
      && reframing <= 600
      && self.themes.len() <= 6
      && self.themes.iter().all(|t| !t.trim().is_empty() && t.len() <= 40)
  }
}

/// An analysis together with where it came from; stored on the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalInsights {
  #[serde(flatten)]
  pub analysis: JournalAnalysis,
  pub source:   Source,
}

impl From<Parsed<JournalAnalysis>> for JournalInsights {
  fn from(parsed: Parsed<JournalAnalysis>) -> Self {
    let source = parsed.source();
    Self { analysis: parsed.into_inner(), source }
  }
}

const POSITIVE_WORDS: &[&str] = &[
  "grateful", "thankful", "happy", "joy", "joyful", "calm", "proud", "excited",
  "hopeful", "relieved", "peaceful", "glad", "content", "loved",
];

const NEGATIVE_WORDS: &[&str] = &[
  "anxious", "anxiety", "stressed", "stress", "sad", "angry", "worried",
  "scared", "afraid", "lonely", "tired", "exhausted", "overwhelmed", "upset",
  "hopeless", "frustrated", "nervous",
];

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
  text
    .split(|c: char| !c.is_alphanumeric() && c != '\'')
    .filter(|w| !w.is_empty())
    .map(str::to_lowercase)
}

/// Keyword-count sentiment. Ties (including no matches) are neutral.
pub fn keyword_sentiment(text: &str) -> Sentiment {
  let (mut positive, mut negative) = (0usize, 0usize);
  for token in tokens(text) {
    if POSITIVE_WORDS.contains(&token.as_str()) {
      positive += 1;
    } else if NEGATIVE_WORDS.contains(&token.as_str()) {
      negative += 1;
    }
  }
  match positive.cmp(&negative) {
    std::cmp::Ordering::Greater => Sentiment::Positive,
    std::cmp::Ordering::Less => Sentiment::Negative,
    std::cmp::Ordering::Equal => Sentiment::Neutral,
  }
}

/// Word prefix → theme.
const THEME_KEYWORDS: &[(&str, &str)] = &[
  ("exam", "academics"),
  ("study", "academics"),
  ("class", "academics"),
  ("school", "academics"),
  ("college", "academics"),
  ("work", "work"),
  ("job", "work"),
  ("boss", "work"),
  ("office", "work"),
  ("mother", "family"),
  ("father", "family"),
  ("mom", "family"),
  ("dad", "family"),
  ("parent", "family"),
  ("family", "family"),
  ("sister", "family"),
  ("brother", "family"),
  ("friend", "friendships"),
  ("sleep", "rest"),
  ("tired", "rest"),
  ("health", "health"),
  ("sick", "health"),
  ("exercise", "health"),
  ("partner", "relationships"),
  ("boyfriend", "relationships"),
  ("girlfriend", "relationships"),
  ("relationship", "relationships"),
];

/// Themes in order of first mention, at most [`MAX_THEMES`].
pub fn keyword_themes(text: &str) -> Vec<String> {
  let mut themes: Vec<String> = Vec::new();
  for token in tokens(text) {
    let found = THEME_KEYWORDS
      .iter()
      .find(|(prefix, _)| token.starts_with(prefix))
      .map(|(_, theme)| *theme);
    if let Some(theme) = found
      && !themes.iter().any(|t| t == theme)
    {
      themes.push(theme.to_owned());
      if themes.len() == MAX_THEMES {
        break;
      }
    }
  }
  themes
}

pub fn fallback_reframing(sentiment: Sentiment) -> &'static str {
  match sentiment {
    Sentiment::Positive => {
      "It sounds like something good happened. Noticing it and writing it \
       down helps it stay with you."
    }
    Sentiment::Negative => {
      "What you're feeling makes sense given what you're carrying. Try \
       naming one small thing within your control right now."
    }
    Sentiment::Neutral | Sentiment::Mixed => {
      "Thank you for taking a moment to reflect. Writing things down is a \
       step towards understanding them."
    }
  }
}

/// Rule-based analysis used when generation is unavailable.
pub fn fallback_analysis(content: &str) -> JournalAnalysis {
  let sentiment = keyword_sentiment(content);
  JournalAnalysis {
    sentiment,
    reframing: fallback_reframing(sentiment).to_owned(),
    themes: keyword_themes(content),
  }
}

pub fn analysis_prompt(content: &str, mood: Option<&str>) -> String {
  let mood = mood.map(|m| format!("The writer tagged their mood as \"{m}\".\n")).unwrap_or_default();
  format!(
    "You are a compassionate journaling assistant. Read the journal entry \
     below and reply with JSON only, in this shape:\n\
     {{\"sentiment\":\"positive|negative|neutral|mixed\",\
     \"reframing\":\"<one or two gentle sentences offering a kinder perspective>\",\
     \"themes\":[\"<one or two word theme>\"]}}\n\
     {mood}\nEntry: \"\"\"{}\"\"\"",
    truncate_chars(content.trim(), CONTENT_CHAR_LIMIT)
  )
}

/// Analyse an entry; never fails.
pub async fn analyze<G: Generator>(
  generator: &G,
  content: &str,
  mood: Option<&str>,
) -> Parsed<JournalAnalysis> {
  let request = GenerationRequest::json(analysis_prompt(content, mood)).with_max_tokens(512);
  generate_parsed(generator, request, || fallback_analysis(content)).await
}

// ─── Reflection sessions ─────────────────────────────────────────────────────

const FALLBACK_PROMPTS: &[&str] = &[
  "What has been on your mind the most today?",
  "When did you feel that most strongly, and what was happening around you?",
  "What would you say to a close friend who felt this way?",
  "What is one thing, however small, that helped even a little?",
  "What do you need more of right now?",
  "Looking back at what you've written, what stands out to you?",
];

/// The fixed prompt for the `n`th exchange; rotates through the list.
pub fn fallback_prompt(n: usize) -> &'static str { FALLBACK_PROMPTS[n % FALLBACK_PROMPTS.len()] }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
  #[default]
  Active,
  Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
  pub prompt:   String,
  pub response: Option<String>,
  pub at:       DateTime<Utc>,
}

/// Self-reported emotional intensity, 1 to 10, before and after a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalState {
  pub before: Option<u8>,
  pub after:  Option<u8>,
}

fn check_scale(value: Option<u8>, field: &str) -> Result<()> {
  match value {
    Some(v) if !(1..=10).contains(&v) => {
      Err(Error::validation(format!("{field} must be between 1 and 10")))
    }
    _ => Ok(()),
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionSession {
  pub id:              String,
  pub user_id:         String,
  pub topic:           Option<String>,
  #[serde(default)]
  pub exchanges:       Vec<Exchange>,
  #[serde(default)]
  pub emotional_state: EmotionalState,
  #[serde(default)]
  pub insights:        Vec<String>,
  #[serde(default)]
  pub status:          SessionStatus,
  pub started_at:      DateTime<Utc>,
  pub completed_at:    Option<DateTime<Utc>>,
}

impl ReflectionSession {
  /// A new active session with no exchanges yet.
  pub fn start(
    id: String,
    user_id: String,
    topic: Option<String>,
    before: Option<u8>,
    at: DateTime<Utc>,
  ) -> Result<Self> {
    check_scale(before, "before")?;
    Ok(Self {
      id,
      user_id,
      topic: topic.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty()),
      exchanges: Vec::new(),
      emotional_state: EmotionalState { before, after: None },
      insights: Vec::new(),
      status: SessionStatus::Active,
      started_at: at,
      completed_at: None,
    })
  }

  pub fn is_active(&self) -> bool { self.status == SessionStatus::Active }

  pub fn push_prompt(&mut self, prompt: impl Into<String>, at: DateTime<Utc>) {
    self.exchanges.push(Exchange { prompt: prompt.into(), response: None, at });
  }

  /// Answer the open prompt.
  pub fn record_response(&mut self, response: &str) -> Result<()> {
    if !self.is_active() {
      return Err(Error::validation("session is already completed"));
    }
    let response = response.trim();
    if response.is_empty() {
      return Err(Error::validation("response must not be empty"));
    }
    match self.exchanges.last_mut() {
      Some(open) if open.response.is_none() => {
        open.response = Some(response.to_owned());
        Ok(())
      }
      _ => Err(Error::validation("session has no open prompt")),
    }
  }

  pub fn complete(
    &mut self,
    after: Option<u8>,
    insights: Vec<String>,
    at: DateTime<Utc>,
  ) -> Result<()> {
    if !self.is_active() {
      return Err(Error::validation("session is already completed"));
    }
    check_scale(after, "after")?;
    self.emotional_state.after = after;
    self.insights = insights;
    self.status = SessionStatus::Completed;
    self.completed_at = Some(at);
    Ok(())
  }

  /// Answered exchanges rendered for a prompt.
  fn transcript(&self) -> String {
    self
      .exchanges
      .iter()
      .filter_map(|e| {
        let response = e.response.as_deref()?;
        Some(format!(
          "Prompt: {}\nResponse: {}",
          e.prompt,
          truncate_chars(response, 400)
        ))
      })
      .collect::<Vec<_>>()
      .join("\n")
  }
}

pub fn opening_prompt_request(topic: Option<&str>) -> GenerationRequest {
  let topic = topic.map(|t| format!(" The user wants to reflect on: {t}.")).unwrap_or_default();
  GenerationRequest::json(format!(
    "You are guiding a gentle journaling reflection.{topic} Ask one open, \
     warm opening question. Reply with JSON only: {{\"prompt\":\"<question>\"}}"
  ))
  .with_temperature(0.7)
  .with_max_tokens(128)
}

pub fn next_prompt_request(session: &ReflectionSession) -> GenerationRequest {
  GenerationRequest::json(format!(
    "You are guiding a gentle journaling reflection. Here is the \
     conversation so far:\n{}\n\nAsk one follow-up question that helps the \
     user go a little deeper. Do not repeat earlier questions. Reply with \
     JSON only: {{\"prompt\":\"<question>\"}}",
    session.transcript()
  ))
  .with_temperature(0.7)
  .with_max_tokens(128)
}

/// Ask for the next reflection prompt, falling back to the rotating list.
pub async fn next_prompt<G: Generator>(
  generator: &G,
  session: &ReflectionSession,
) -> Parsed<String> {
  let n = session.exchanges.len();
  let request = if n == 0 {
    opening_prompt_request(session.topic.as_deref())
  } else {
    next_prompt_request(session)
  };
  generate_parsed(generator, request, || Line { line: fallback_prompt(n).to_owned() })
    .await
    .map(|l| l.line.trim().to_owned())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReflectionInsights {
  pub insights: Vec<String>,
}

impl Validate for ReflectionInsights {
  fn is_valid(&self) -> bool {
    (1..=5).contains(&self.insights.len())
      && self.insights.iter().all(|i| !i.trim().is_empty() && i.chars().count() <= 300)
  }
}

/// Insights derived from the before/after self-report.
pub fn fallback_insights(state: EmotionalState) -> Vec<String> {
  let mut insights = Vec::new();
  match (state.before, state.after) {
    (Some(before), Some(after)) if after < before => insights.push(format!(
      "Your emotional intensity eased from {before} to {after} during this reflection."
    )),
    (Some(before), Some(after)) if after > before => insights.push(format!(
      "Your emotional intensity rose from {before} to {after}. Strong feelings \
       often surface when we look at them closely; be gentle with yourself."
    )),
    (Some(_), Some(after)) => insights.push(format!(
      "Your emotional intensity held steady at {after}. Staying with your \
       feelings is itself a skill."
    )),
    _ => {}
  }
  insights.push("Taking time to reflect is a meaningful act of self-care.".to_owned());
  insights
}

pub fn insights_request(session: &ReflectionSession) -> GenerationRequest {
  GenerationRequest::json(format!(
    "Summarise this journaling reflection into two or three short, kind \
     insights for the writer. Reply with JSON only: \
     {{\"insights\":[\"<insight>\"]}}\n\n{}",
    session.transcript()
  ))
  .with_max_tokens(384)
}

/// Generate closing insights; never fails.
pub async fn closing_insights<G: Generator>(
  generator: &G,
  session: &ReflectionSession,
  after: Option<u8>,
) -> Parsed<Vec<String>> {
  let state = EmotionalState { after, ..session.emotional_state };
  generate_parsed(generator, insights_request(session), || ReflectionInsights {
    insights: fallback_insights(state),
  })
  .await
  .map(|r| r.insights)
}
