//! Cloud Speech-to-Text and Text-to-Speech pass-through.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use mitra_core::persona::Language;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{Error, Result, post_json};

pub const DEFAULT_STT_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";
pub const DEFAULT_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

const STT: &str = "speech-to-text";
const TTS: &str = "text-to-speech";

/// Audio to transcribe.
#[derive(Debug, Clone)]
pub struct Recognize {
  pub audio:             Vec<u8>,
  /// e.g. `LINEAR16`, `WEBM_OPUS`; omitted lets the service detect FLAC/WAV.
  pub encoding:          Option<String>,
  pub sample_rate_hertz: Option<u32>,
  pub language:          Language,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTiming {
  pub word:       String,
  pub start_secs: f64,
  pub end_secs:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
  pub transcript: String,
  pub confidence: f32,
  pub words:      Vec<WordTiming>,
}

/// Parse a protobuf JSON duration such as `"1.200s"`.
fn parse_duration(value: Option<&Value>) -> f64 {
  value
    .and_then(Value::as_str)
    .and_then(|s| s.strip_suffix('s'))
    .and_then(|s| s.parse().ok())
    .unwrap_or_default()
}

/// Collapse a `speech:recognize` response: transcripts of each result's
/// best alternative joined, their confidences averaged, word timings
/// concatenated. No results is an empty transcript, not an error.
pub fn transcript_from(body: &Value) -> Transcript {
  let best: Vec<&Value> = body
    .get("results")
    .and_then(Value::as_array)
    .into_iter()
    .flatten()
    .filter_map(|r| r.pointer("/alternatives/0"))
    .collect();

  let transcript = best
    .iter()
    .filter_map(|a| a.get("transcript").and_then(Value::as_str))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

  let confidences: Vec<f64> = best
    .iter()
    .filter_map(|a| a.get("confidence").and_then(Value::as_f64))
    .collect();
  let confidence = if confidences.is_empty() {
    0.0
  } else {
    (confidences.iter().sum::<f64>() / confidences.len() as f64) as f32
  };

  let words = best
    .iter()
    .filter_map(|a| a.get("words").and_then(Value::as_array))
    .flatten()
    .filter_map(|w| {
      Some(WordTiming {
        word:       w.get("word")?.as_str()?.to_owned(),
        start_secs: parse_duration(w.get("startTime")),
        end_secs:   parse_duration(w.get("endTime")),
      })
    })
    .collect();

  Transcript { transcript, confidence, words }
}

pub fn recognize_body(request: &Recognize) -> Value {
  let mut config = json!({
    "languageCode": request.language.locale(),
    "enableWordTimeOffsets": true,
    "enableAutomaticPunctuation": true,
  });
  if let Some(encoding) = &request.encoding {
    config["encoding"] = json!(encoding);
  }
  if let Some(rate) = request.sample_rate_hertz {
    config["sampleRateHertz"] = json!(rate);
  }
  json!({ "config": config, "audio": { "content": STANDARD.encode(&request.audio) } })
}

pub fn synthesize_body(text: &str, language: Language, voice: Option<&str>) -> Value {
  let mut voice_config = json!({ "languageCode": language.locale() });
  if let Some(name) = voice {
    voice_config["name"] = json!(name);
  }
  json!({
    "input": { "text": text },
    "voice": voice_config,
    "audioConfig": { "audioEncoding": "MP3" },
  })
}

/// Client for both speech directions.
#[derive(Clone)]
pub struct SpeechClient {
  client:  reqwest::Client,
  api_key: Option<String>,
  stt_url: String,
  tts_url: String,
}

impl SpeechClient {
  pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
    Self {
      client,
      api_key: api_key.filter(|k| !k.trim().is_empty()),
      stt_url: DEFAULT_STT_URL.to_owned(),
      tts_url: DEFAULT_TTS_URL.to_owned(),
    }
  }

  pub fn is_configured(&self) -> bool { self.api_key.is_some() }

  pub async fn transcribe(&self, request: &Recognize) -> Result<Transcript> {
    let body = post_json(
      &self.client,
      STT,
      &self.stt_url,
      self.api_key.as_deref(),
      &recognize_body(request),
    )
    .await?;
    Ok(transcript_from(&body))
  }

  /// Synthesize `text` as MP3 and return the raw audio bytes.
  pub async fn synthesize(
    &self,
    text: &str,
    language: Language,
    voice: Option<&str>,
  ) -> Result<Vec<u8>> {
    let body = post_json(
      &self.client,
      TTS,
      &self.tts_url,
      self.api_key.as_deref(),
      &synthesize_body(text, language, voice),
    )
    .await?;
    let content = body
      .get("audioContent")
      .and_then(Value::as_str)
      .filter(|c| !c.is_empty())
      .ok_or(Error::Empty(TTS))?;
    Ok(STANDARD.decode(content)?)
  }
}
