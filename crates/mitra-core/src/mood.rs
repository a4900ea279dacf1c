//! Mood check-ins, daily streaks and simple trend statistics.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
  pub id:         String,
  pub user_id:    String,
  /// 1 – 10
  pub score:      u8,
  pub label:      String,
  pub note:       Option<String>,
  pub date:       NaiveDate,
  pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/mood/entries`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMood {
  pub score: i64,
  pub label: Option<String>,
  pub note:  Option<String>,
  pub date:  Option<NaiveDate>,
}

impl NewMood {
  pub fn into_entry(self, id: String, user_id: String, at: DateTime<Utc>) -> Result<MoodEntry> {
    let score = validate_score(self.score)?;
    let label = self
      .label
      .map(|l| l.trim().to_lowercase())
      .filter(|l| !l.is_empty())
      .unwrap_or_else(|| label_for_score(score).to_owned());
    Ok(MoodEntry {
      id,
      user_id,
      score,
      label,
      note: self.note.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty()),
      date: self.date.unwrap_or_else(|| at.date_naive()),
      created_at: at,
    })
  }
}

pub fn validate_score(score: i64) -> Result<u8> {
  u8::try_from(score)
    .ok()
    .filter(|s| (1..=10).contains(s))
    .ok_or_else(|| Error::validation("score must be between 1 and 10"))
}

pub fn label_for_score(score: u8) -> &'static str {
  match score {
    0..=2 => "very low",
    3..=4 => "low",
    5..=6 => "okay",
    7..=8 => "good",
    _ => "great",
  }
}

// ─── Streaks ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
  /// Consecutive days ending today or yesterday.
  pub current:    u32,
  pub longest:    u32,
  pub last_entry: Option<NaiveDate>,
}

/// Compute streaks from entry dates in any order; duplicates count once.
pub fn streak(dates: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> Streak {
  let mut days: Vec<NaiveDate> = dates.into_iter().filter(|d| *d <= today).collect();
  days.sort_unstable();
  days.dedup();

  let mut longest = 0;
  let mut run = 0;
  let mut prev: Option<NaiveDate> = None;
  for day in &days {
    run = match prev {
      Some(p) if *day - p == Duration::days(1) => run + 1,
      _ => 1,
    };
    longest = longest.max(run);
    prev = Some(*day);
  }

  let last_entry = days.last().copied();
  let current = match last_entry {
    Some(last) if today - last <= Duration::days(1) => run,
    _ => 0,
  };
  Streak { current, longest, last_entry }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

pub fn average(scores: &[u8]) -> Option<f32> {
  if scores.is_empty() {
    return None;
  }
  let sum: u32 = scores.iter().map(|&s| u32::from(s)).sum();
  Some(sum as f32 / scores.len() as f32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
  Improving,
  Declining,
  Stable,
  /// Fewer than two data points.
  Unknown,
}

/// Compare the first and second half of chronologically ordered scores.
pub fn trend(scores: &[u8]) -> Trend {
  if scores.len() < 2 {
    return Trend::Unknown;
  }
  let (first, second) = scores.split_at(scores.len() / 2);
  match (average(first), average(second)) {
    (Some(a), Some(b)) if b - a > 0.5 => Trend::Improving,
    (Some(a), Some(b)) if a - b > 0.5 => Trend::Declining,
    _ => Trend::Stable,
  }
}
