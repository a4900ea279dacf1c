//! The chat orchestrator: turns a user message, conversation history and
//! stored memory facts into one prompt, calls the generator, and normalises
//! whatever comes back into a stable [`ChatOutput`].
//!
//! Only input validation can fail a request. Every downstream failure (memory
//! fetch, emotion analysis, generation, memory or history write) is recorded
//! as a [`Warning`] and replaced by a fixed fallback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  conversation::{
    ActiveContext, HISTORY_LIMIT, Role, StoredTurn, Turn, recent, render_history,
    truncate_chars,
  },
  emotion::{self, EmotionAnalysis},
  generate::{GenerationRequest, Generator},
  memory::{self, MemoryFact, MemoryProfile, RECALL_LIMIT},
  persona::{Language, Mode, fallback_reply, persona_template, translation_directive},
  store::{DocumentStore, collections, encode},
};

const PERSONA_CHAR_LIMIT: usize = 1_200;
const EMOTION_CHAR_LIMIT: usize = 300;
const MEMORY_CHAR_LIMIT: usize = 300;
const MESSAGE_CHAR_LIMIT: usize = 2_000;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── Input / output ──────────────────────────────────────────────────────────

/// Body of `POST /api/mitra/chat`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInput {
  pub message:  String,
  #[serde(default)]
  pub history:  Vec<Turn>,
  pub mode:     Option<String>,
  pub language: Option<String>,
  pub metadata: Option<Value>,
}

/// A recoverable failure that degraded the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
  MemoryFetchFailed,
  EmotionAnalysisFallback,
  GenerationFailed,
  MemoryWriteFailed,
  HistoryWriteFailed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReport {
  pub retrieved: Vec<MemoryFact>,
  pub updates:   Vec<MemoryFact>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
  pub received:  DateTime<Utc>,
  pub analyzed:  DateTime<Utc>,
  pub generated: DateTime<Utc>,
  pub completed: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMeta {
  pub warnings:     Vec<Warning>,
  pub timestamps:   Timestamps,
  /// `true` when `text` is the fixed fallback reply.
  pub fallback:     bool,
  pub emotion_tags: Vec<String>,
  pub metadata:     Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutput {
  pub text:     String,
  pub language: Language,
  pub mode:     Mode,
  pub emotion:  EmotionAnalysis,
  pub memory:   MemoryReport,
  pub meta:     ChatMeta,
}

// ─── Prompt ──────────────────────────────────────────────────────────────────

/// Assemble the chat prompt. Sections appear in a fixed order and each one is
/// capped so the prompt size stays bounded regardless of input.
pub fn build_prompt(
  mode: Mode,
  language: Language,
  emotion: &EmotionAnalysis,
  memory: &[MemoryFact],
  history: &[Turn],
  message: &str,
) -> String {
  let mut sections = vec![
    truncate_chars(persona_template(mode, language), PERSONA_CHAR_LIMIT).to_owned(),
    translation_directive(language).to_owned(),
    truncate_chars(&emotion.summary(), EMOTION_CHAR_LIMIT).to_owned(),
  ];

  let memory = &memory[..memory.len().min(RECALL_LIMIT)];
  if !memory.is_empty() {
    let summary = memory::summary(memory);
    sections.push(format!(
      "Things the user has shared before: {}",
      truncate_chars(&summary, MEMORY_CHAR_LIMIT)
    ));
  }

  if !history.is_empty() {
    sections.push(format!("Conversation so far:\n{}", render_history(history)));
  }

  sections.push(format!(
    "User: {}\nMitra:",
    truncate_chars(message.trim(), MESSAGE_CHAR_LIMIT)
  ));
  sections.join("\n\n")
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Orchestrator<'a, S, G> {
  store:     &'a S,
  generator: &'a G,
}

impl<'a, S, G> Orchestrator<'a, S, G>
where
  S: DocumentStore,
  G: Generator,
{
  pub fn new(store: &'a S, generator: &'a G) -> Self { Self { store, generator } }

  /// Produce Mitra's reply to `input` on behalf of `user_id`.
  ///
  /// Returns an error only for an empty message.
  pub async fn respond(&self, user_id: &str, input: ChatInput) -> Result<ChatOutput> {
    let received = Utc::now();
    let message = input.message.trim();
    if message.is_empty() {
      return Err(Error::validation("message must not be empty"));
    }
    let mode = Mode::parse_or_default(input.mode.as_deref());
    let language = Language::parse_or_default(input.language.as_deref());
    let mut warnings = Vec::new();

    let (profile, mut context) = match self.load_memory(user_id).await {
      Ok(loaded) => loaded,
      Err(e) => {
        warn!(error = %e, user_id, "memory fetch failed");
        warnings.push(Warning::MemoryFetchFailed);
        Default::default()
      }
    };
    let retrieved = profile.recall(RECALL_LIMIT);

    let history: &[Turn] = if input.history.is_empty() {
      &context.turns
    } else {
      &input.history
    };
    let history = recent(history, HISTORY_LIMIT).to_vec();

    let analysis = emotion::analyze(self.generator, message).await;
    if analysis.is_fallback() {
      warnings.push(Warning::EmotionAnalysisFallback);
    }
    let analysis_fell_back = analysis.is_fallback();
    let mut emotion = analysis.into_inner();
    let analyzed = Utc::now();

    let prompt = build_prompt(mode, language, &emotion, &retrieved, &history, message);
    debug!(prompt_chars = prompt.chars().count(), %mode, %language, "built chat prompt");

    let request = GenerationRequest::text(prompt)
      .with_temperature(0.8)
      .with_max_tokens(512);
    let generated_text = match self.generator.generate(request).await {
      Ok(raw) => Some(emotion::extract_emotion_tags(&raw)).filter(|(text, _)| !text.is_empty()),
      Err(e) => {
        warn!(error = %e, "chat generation failed");
        None
      }
    };
    let (text, emotion_tags, fallback) = match generated_text {
      Some((text, tags)) => (text, tags, false),
      None => {
        warnings.push(Warning::GenerationFailed);
        (fallback_reply(mode, language).to_owned(), Vec::new(), true)
      }
    };
    let generated = Utc::now();

    if analysis_fell_back && let Some(tag) = emotion_tags.first() {
      emotion.emotion.label = tag.clone();
    }

    let updates = memory::extract_facts(message, generated);
    if !updates.is_empty()
      && let Err(e) = self.write_facts(user_id, &updates).await
    {
      warn!(error = %e, user_id, "memory write failed");
      warnings.push(Warning::MemoryWriteFailed);
    }

    context.push_exchange(message, &text, generated);
    context.push_emotion(&emotion.emotion.label, emotion.emotion.intensity, generated);
    if let Err(e) = self
      .write_history(user_id, &context, message, &text, &emotion.emotion.label, generated)
      .await
    {
      warn!(error = %e, user_id, "history write failed");
      warnings.push(Warning::HistoryWriteFailed);
    }

    Ok(ChatOutput {
      text,
      language,
      mode,
      emotion,
      memory: MemoryReport { retrieved, updates },
      meta: ChatMeta {
        warnings,
        timestamps: Timestamps { received, analyzed, generated, completed: Utc::now() },
        fallback,
        emotion_tags,
        metadata: input.metadata,
      },
    })
  }

  async fn load_memory(
    &self,
    user_id: &str,
  ) -> Result<(MemoryProfile, ActiveContext), BoxError> {
    let profile = match self.store.get(collections::MEMORY_PROFILES, user_id).await? {
      Some(doc) => doc.decode()?,
      None => MemoryProfile::default(),
    };
    let context = match self.store.get(collections::ACTIVE_CONTEXTS, user_id).await? {
      Some(doc) => doc.decode()?,
      None => ActiveContext::default(),
    };
    Ok((profile, context))
  }

  async fn write_facts(&self, user_id: &str, facts: &[MemoryFact]) -> Result<(), BoxError> {
    let patch = encode(&MemoryProfile::patch(facts))?;
    self.store.merge(collections::MEMORY_PROFILES, user_id, patch).await?;
    Ok(())
  }

  async fn write_history(
    &self,
    user_id: &str,
    context: &ActiveContext,
    message: &str,
    reply: &str,
    emotion: &str,
    at: DateTime<Utc>,
  ) -> Result<(), BoxError> {
    let turns = [
      StoredTurn {
        user_id: user_id.to_owned(),
        role:    Role::User,
        text:    message.to_owned(),
        emotion: Some(emotion.to_owned()),
        at,
      },
      StoredTurn {
        user_id: user_id.to_owned(),
        role:    Role::Assistant,
        text:    reply.to_owned(),
        emotion: None,
        at,
      },
    ];
    for turn in &turns {
      let id = Uuid::new_v4().to_string();
      self.store.set(collections::CONVERSATIONS, &id, encode(turn)?).await?;
    }
    self
      .store
      .set(collections::ACTIVE_CONTEXTS, user_id, encode(context)?)
      .await?;
    Ok(())
  }
}
