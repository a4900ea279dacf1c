//! The digital twin: one aggregate view over a user's moods, journal,
//! health metrics, practice progress and remembered facts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
  conversation::ActiveContext,
  emotion::Sentiment,
  generate::{GenerationRequest, Generator},
  health::{self, HealthEntry, HealthSummary},
  journal::JournalEntry,
  memory::{MemoryFact, MemoryProfile},
  mood::{self, MoodEntry, Trend},
  parse::{Parsed, Validate, generate_parsed},
  practice::{Badge, PracticeProgress, Skill},
};

const TOP_THEMES: usize = 5;
const TWIN_FACTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodOverview {
  pub entries: usize,
  pub average: Option<f32>,
  pub trend:   Trend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalOverview {
  pub entries:    usize,
  pub sentiments: BTreeMap<String, usize>,
  pub top_themes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeOverview {
  pub level:     u32,
  pub xp:        u32,
  pub badges:    Vec<Badge>,
  pub top_skill: Option<Skill>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwinSnapshot {
  pub mood:             MoodOverview,
  pub journal:          JournalOverview,
  pub health:           HealthSummary,
  pub practice:         PracticeOverview,
  pub memory:           Vec<MemoryFact>,
  pub dominant_emotion: Option<String>,
}

/// Everything the snapshot is built from, already loaded from the store.
#[derive(Debug, Default)]
pub struct TwinSources {
  /// Oldest first.
  pub moods:    Vec<MoodEntry>,
  pub journal:  Vec<JournalEntry>,
  pub health:   Vec<HealthEntry>,
  pub practice: PracticeProgress,
  pub memory:   MemoryProfile,
  pub context:  ActiveContext,
}

fn sentiment_key(sentiment: Sentiment) -> String {
  match sentiment {
    Sentiment::Positive => "positive",
    Sentiment::Negative => "negative",
    Sentiment::Neutral => "neutral",
    Sentiment::Mixed => "mixed",
  }
  .to_owned()
}

pub fn build_snapshot(sources: &TwinSources) -> TwinSnapshot {
  let scores: Vec<u8> = sources.moods.iter().map(|m| m.score).collect();

  let mut journal = JournalOverview { entries: sources.journal.len(), ..Default::default() };
  let mut theme_counts: BTreeMap<&str, usize> = BTreeMap::new();
  for insights in sources.journal.iter().filter_map(|e| e.insights.as_ref()) {
    *journal.sentiments.entry(sentiment_key(insights.analysis.sentiment)).or_default() += 1;
    for theme in &insights.analysis.themes {
      *theme_counts.entry(theme.as_str()).or_default() += 1;
    }
  }
  let mut themes: Vec<(&str, usize)> = theme_counts.into_iter().collect();
  themes.sort_by(|a, b| b.1.cmp(&a.1));
  journal.top_themes = themes.into_iter().take(TOP_THEMES).map(|(t, _)| t.to_owned()).collect();

  let practice = &sources.practice;
  let top_skill = practice
    .skills
    .iter()
    .max_by(|a, b| a.1.total_cmp(b.1))
    .map(|(skill, _)| *skill);

  TwinSnapshot {
    mood: MoodOverview {
      entries: scores.len(),
      average: mood::average(&scores),
      trend:   mood::trend(&scores),
    },
    journal,
    health: health::summarize(&sources.health),
    practice: PracticeOverview {
      level: practice.level,
      xp: practice.xp,
      badges: practice.badges.iter().copied().collect(),
      top_skill,
    },
    memory: sources.memory.recall(TWIN_FACTS),
    dominant_emotion: sources.context.dominant_emotion().map(str::to_owned),
  }
}

// ─── Narrative ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
  pub summary:     String,
  #[serde(default)]
  pub highlights:  Vec<String>,
  #[serde(default)]
  pub suggestions: Vec<String>,
}

impl Validate for Narrative {
  fn is_valid(&self) -> bool {
    let summary = self.summary.trim().chars().count();
    summary > 0
      && summary <= 1_000
      && self.highlights.len() <= 5
      && self.suggestions.len() <= 5
  }
}

/// A narrative assembled from the snapshot's numbers alone.
pub fn fallback_narrative(snapshot: &TwinSnapshot) -> Narrative {
  let mut highlights = Vec::new();
  let mut suggestions = Vec::new();

  match (snapshot.mood.average, snapshot.mood.trend) {
    (Some(avg), Trend::Improving) => {
      highlights.push(format!("Your mood has been improving, averaging {avg:.1}/10."))
    }
    (Some(avg), Trend::Declining) => {
      highlights.push(format!("Your mood has dipped recently, averaging {avg:.1}/10."));
      suggestions.push("A short chat with Mitra or a friend might help.".to_owned());
    }
    (Some(avg), _) => highlights.push(format!("Your mood has averaged {avg:.1}/10.")),
    (None, _) => suggestions.push("Log a daily mood check-in to see patterns.".to_owned()),
  }

  if let Some(theme) = snapshot.journal.top_themes.first() {
    highlights.push(format!("\"{theme}\" comes up most often in your journal."));
  } else {
    suggestions.push("Try writing a few lines in your journal this week.".to_owned());
  }

  if snapshot.health.avg_sleep.is_some_and(|s| s < 7.0) {
    suggestions.push("Aim for at least seven hours of sleep.".to_owned());
  }

  if snapshot.practice.xp > 0 {
    highlights.push(format!(
      "You have reached practice level {} with {} XP.",
      snapshot.practice.level, snapshot.practice.xp
    ));
  } else {
    suggestions.push("Rehearse a conversation in Practice to build confidence.".to_owned());
  }

  let summary = match snapshot.dominant_emotion.as_deref() {
    Some(emotion) => format!(
      "Recently you've most often felt {emotion}. Here is what your check-ins show."
    ),
    None => "Here is a snapshot of your recent wellbeing.".to_owned(),
  };

  highlights.truncate(5);
  suggestions.truncate(5);
  Narrative { summary, highlights, suggestions }
}

pub fn narrative_prompt(snapshot: &TwinSnapshot) -> String {
  let data = serde_json::to_string(snapshot).unwrap_or_default();
  format!(
    "You are Mitra, a warm wellbeing companion. Using the data below, write a \
     short, encouraging reflection for the user. Never diagnose. Reply with \
     JSON only: {{\"summary\":\"<two or three sentences>\",\
     \"highlights\":[\"...\"],\"suggestions\":[\"...\"]}}\n\nData: {data}"
  )
}

pub async fn narrative<G: Generator>(generator: &G, snapshot: &TwinSnapshot) -> Parsed<Narrative> {
  let request = GenerationRequest::json(narrative_prompt(snapshot)).with_max_tokens(512);
  generate_parsed(generator, request, || fallback_narrative(snapshot)).await
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{
    journal::{JournalAnalysis, JournalInsights},
    memory::extract_facts,
    parse::Source,
    practice::SCENARIOS,
    testing::ScriptedGenerator,
  };

  fn mood_entry(score: u8) -> MoodEntry {
    let now = Utc::now();
    MoodEntry {
      id: format!("m{score}"),
      user_id: "u1".into(),
      score,
      label: mood::label_for_score(score).into(),
      note: None,
      date: now.date_naive(),
      created_at: now,
    }
  }

  fn entry(sentiment: Sentiment, themes: &[&str]) -> JournalEntry {
    JournalEntry {
      id:         "j".into(),
      user_id:    "u1".into(),
      content:    "…".into(),
      mood:       None,
      tags:       vec![],
      created_at: Utc::now(),
      insights:   Some(JournalInsights {
        analysis: JournalAnalysis {
          sentiment,
          reframing: "ok".into(),
          themes: themes.iter().map(|t| t.to_string()).collect(),
        },
        source:   Source::Fallback,
      }),
    }
  }

  fn sources() -> TwinSources {
    let now = Utc::now();
    let mut practice = PracticeProgress::default();
    practice.record_completion(&SCENARIOS[1], 8, now).unwrap();
    let mut memory = MemoryProfile::default();
    memory.merge(extract_facts("My name is Asha", now));
    let mut context = ActiveContext::default();
    context.push_emotion("anxious", 0.7, now);

    TwinSources {
      moods: vec![mood_entry(3), mood_entry(4), mood_entry(7), mood_entry(8)],
      journal: vec![
        entry(Sentiment::Negative, &["academics", "family"]),
        entry(Sentiment::Negative, &["academics"]),
        entry(Sentiment::Positive, &[]),
      ],
      health: vec![],
      practice,
      memory,
      context,
    }
  }

  #[test]
  fn snapshot_aggregates_every_source() {
    let snapshot = build_snapshot(&sources());
    assert_eq!(snapshot.mood.entries, 4);
    assert_eq!(snapshot.mood.trend, Trend::Improving);
    assert_eq!(snapshot.journal.sentiments["negative"], 2);
    assert_eq!(snapshot.journal.top_themes, vec!["academics", "family"]);
    assert_eq!(snapshot.practice.top_skill, Some(Skill::Boundaries));
    assert_eq!(snapshot.memory[0].value, "Asha");
    assert_eq!(snapshot.dominant_emotion.as_deref(), Some("anxious"));
    assert_eq!(snapshot.health.days, 0);
  }

  #[test]
  fn empty_sources_give_an_empty_snapshot() {
    let snapshot = build_snapshot(&TwinSources::default());
    assert_eq!(snapshot.mood.trend, Trend::Unknown);
    assert!(snapshot.memory.is_empty());
    let narrative = fallback_narrative(&snapshot);
    assert_eq!(narrative.summary, "Here is a snapshot of your recent wellbeing.");
    assert!(narrative.highlights.is_empty());
    assert_eq!(narrative.suggestions.len(), 3);
  }

  #[tokio::test]
  async fn narrative_falls_back_to_rules() {
    let snapshot = build_snapshot(&sources());
    let parsed = narrative(&ScriptedGenerator::failing(), &snapshot).await;
    assert!(parsed.is_fallback());
    let narrative = parsed.into_inner();
    assert!(narrative.summary.contains("anxious"));
    assert!(narrative.highlights.iter().any(|h| h.contains("improving")));
    assert!(narrative.highlights.iter().any(|h| h.contains("academics")));
  }
}
