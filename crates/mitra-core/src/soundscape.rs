//! Soundscape recommendations: a fixed catalog of ambient tracks and two
//! selection strategies, chosen by configuration.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  generate::{GenerationRequest, Generator},
  parse::{Parsed, Source, Validate, generate_parsed},
};

pub const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
  pub id:            &'static str,
  pub name:          &'static str,
  pub category:      &'static str,
  pub description:   &'static str,
  pub tags:          &'static [&'static str],
  pub duration_mins: u32,
}

pub static CATALOG: &[Sound] = &[
  Sound {
    id:            "gentle-rain",
    name:          "Gentle Rain",
    category:      "nature",
    description:   "Soft rainfall on leaves.",
    tags:          &["calming", "sleep", "sad", "anxious"],
    duration_mins: 30,
  },
  Sound {
    id:            "ocean-waves",
    name:          "Ocean Waves",
    category:      "nature",
    description:   "Slow waves rolling onto a quiet beach.",
    tags:          &["calming", "anxious", "stressed"],
    duration_mins: 45,
  },
  Sound {
    id:            "forest-morning",
    name:          "Forest Morning",
    category:      "nature",
    description:   "Birdsong and rustling trees at dawn.",
    tags:          &["uplifting", "happy", "morning", "neutral"],
    duration_mins: 20,
  },
  Sound {
    id:            "singing-bowls",
    name:          "Tibetan Singing Bowls",
    category:      "meditation",
    description:   "Resonant bowls for guided stillness.",
    tags:          &["meditation", "calming", "stressed", "angry"],
    duration_mins: 15,
  },
  Sound {
    id:            "brown-noise",
    name:          "Deep Brown Noise",
    category:      "noise",
    description:   "Low, steady noise that masks distractions.",
    tags:          &["focus", "sleep", "anxious"],
    duration_mins: 60,
  },
  Sound {
    id:            "lofi-study",
    name:          "Lo-fi Study Beats",
    category:      "music",
    description:   "Mellow beats for long study sessions.",
    tags:          &["focus", "neutral", "tired", "study"],
    duration_mins: 60,
  },
  Sound {
    id:            "sitar-evening",
    name:          "Evening Sitar",
    category:      "music",
    description:   "Slow raga phrases for winding down.",
    tags:          &["evening", "sad", "calming"],
    duration_mins: 25,
  },
  Sound {
    id:            "campfire",
    name:          "Campfire Crackle",
    category:      "nature",
    description:   "A warm fire crackling under the night sky.",
    tags:          &["cozy", "lonely", "evening", "sleep"],
    duration_mins: 40,
  },
  Sound {
    id:            "upbeat-acoustic",
    name:          "Upbeat Acoustic",
    category:      "music",
    description:   "Bright guitar to lift your energy.",
    tags:          &["uplifting", "happy", "excited", "tired", "exercise"],
    duration_mins: 20,
  },
];

pub fn sound(id: &str) -> Option<&'static Sound> { CATALOG.iter().find(|s| s.id == id) }

// ─── Request ─────────────────────────────────────────────────────────────────

/// Which recommender runs; fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SoundStrategy {
  /// Static lookup by mood, stress and time of day.
  #[default]
  Curated,
  /// Generated picks validated against the catalog.
  Generative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeOfDay {
  Morning,
  Afternoon,
  Evening,
  Night,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundRequest {
  pub mood:        String,
  /// 1 – 10
  pub stress:      Option<u8>,
  pub time_of_day: Option<TimeOfDay>,
  pub activity:    Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
  pub sound:  &'static Sound,
  pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
  pub recommendations: Vec<Recommendation>,
  pub strategy:        SoundStrategy,
  pub source:          Source,
}

// ─── Curated ─────────────────────────────────────────────────────────────────

fn mood_tags(mood: &str) -> &'static [&'static str] {
  match mood.trim().to_lowercase().as_str() {
    "anxious" | "worried" | "nervous" => &["anxious", "calming"],
    "stressed" | "overwhelmed" => &["stressed", "calming"],
    "sad" | "down" | "low" => &["sad", "cozy"],
    "angry" | "frustrated" => &["angry", "calming"],
    "lonely" => &["lonely", "cozy"],
    "tired" | "exhausted" => &["tired", "sleep"],
    "happy" | "excited" | "good" => &["happy", "uplifting"],
    _ => &["neutral", "calming"],
  }
}

fn activity_tag(activity: &str) -> Option<&'static str> {
  match activity.trim().to_lowercase().as_str() {
    "study" | "work" | "focus" => Some("focus"),
    "sleep" | "rest" => Some("sleep"),
    "meditate" | "meditation" => Some("meditation"),
    "exercise" | "workout" => Some("exercise"),
    _ => None,
  }
}

/// Deterministic picks for `request`. Sounds matching more wanted tags rank
/// higher; ties keep catalog order.
pub fn curated(request: &SoundRequest) -> Vec<Recommendation> {
  let mut wanted: Vec<&str> = mood_tags(&request.mood).to_vec();
  if request.stress.is_some_and(|s| s >= 7) {
    wanted.push("calming");
  }
  match request.time_of_day {
    Some(TimeOfDay::Night) => wanted.push("sleep"),
    Some(TimeOfDay::Evening) => wanted.push("evening"),
    Some(TimeOfDay::Morning) => wanted.push("morning"),
    _ => {}
  }
  if let Some(tag) = request.activity.as_deref().and_then(activity_tag) {
    wanted.push(tag);
  }

  let mut scored: Vec<(usize, &'static Sound)> = CATALOG
    .iter()
    .map(|s| (s.tags.iter().filter(|t| wanted.contains(*t)).count(), s))
    .filter(|(score, _)| *score > 0)
    .collect();
  scored.sort_by(|a, b| b.0.cmp(&a.0));

  scored
    .into_iter()
    .take(MAX_RECOMMENDATIONS)
    .map(|(_, sound)| {
      let matched: Vec<&str> = sound.tags.iter().copied().filter(|t| wanted.contains(t)).collect();
      Recommendation {
        sound,
        reason: format!("Suited to feeling {} ({}).", request.mood.trim(), matched.join(", ")),
      }
    })
    .collect()
}

// ─── Generative ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Pick {
  pub id:     String,
  pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedPicks {
  pub recommendations: Vec<Pick>,
}

impl Validate for GeneratedPicks {
  fn is_valid(&self) -> bool {
    !self.recommendations.is_empty()
      && self.recommendations.len() <= MAX_RECOMMENDATIONS
      && self
        .recommendations
        .iter()
        .all(|p| sound(&p.id).is_some() && !p.reason.trim().is_empty())
  }
}

pub fn generative_prompt(request: &SoundRequest) -> String {
  let catalog = CATALOG
    .iter()
    .map(|s| format!("- {}: {} ({})", s.id, s.description, s.tags.join(", ")))
    .collect::<Vec<_>>()
    .join("\n");
  let stress = request.stress.map(|s| format!(" Stress level: {s}/10.")).unwrap_or_default();
  let time = request
    .time_of_day
    .map(|t| format!(" Time of day: {t}."))
    .unwrap_or_default();
  let activity = request
    .activity
    .as_deref()
    .map(|a| format!(" Activity: {a}."))
    .unwrap_or_default();
  format!(
    "Recommend up to {MAX_RECOMMENDATIONS} ambient sounds for someone feeling \
     \"{}\".{stress}{time}{activity} Choose only from this catalog:\n{catalog}\n\n\
     Reply with JSON only: {{\"recommendations\":[{{\"id\":\"<catalog id>\",\
     \"reason\":\"<one sentence>\"}}]}}",
    request.mood.trim()
  )
}

/// Resolve generated picks against the catalog.
fn resolve(picks: GeneratedPicks) -> Vec<Recommendation> {
  picks
    .recommendations
    .into_iter()
    .filter_map(|p| Some(Recommendation { sound: sound(&p.id)?, reason: p.reason }))
    .collect()
}

/// Recommend sounds with the configured strategy. The generative strategy
/// falls back to the curated picks.
pub async fn recommend<G: Generator>(
  generator: &G,
  strategy: SoundStrategy,
  request: &SoundRequest,
) -> Recommendations {
  let (recommendations, source) = match strategy {
    SoundStrategy::Curated => (curated(request), Source::Rules),
    SoundStrategy::Generative => {
      let generation = GenerationRequest::json(generative_prompt(request)).with_max_tokens(384);
      let parsed: Parsed<Option<GeneratedPicks>> =
        generate_parsed(generator, generation, || None::<GeneratedPicks>).await;
      let source = parsed.source();
      match parsed.into_inner() {
        Some(picks) => (resolve(picks), source),
        None => (curated(request), source),
      }
    }
  };
  Recommendations { recommendations, strategy, source }
}
