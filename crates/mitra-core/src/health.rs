//! Daily health metrics, their averages, and rule-plus-AI insights.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  generate::{GenerationRequest, Generator},
  parse::{Parsed, Validate, generate_parsed},
};

/// Upper bound on insights returned by one request.
pub const MAX_INSIGHTS: usize = 4;

/// One day of metrics, stored under [`HealthEntry::doc_id`]. Every metric is
/// optional so partial updates merge into the day's document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntry {
  #[serde(default)]
  pub user_id:     String,
  pub date:        NaiveDate,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sleep_hours: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub steps:       Option<u32>,
  /// 1 – 10
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stress:      Option<u8>,
  /// 1 – 10
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mood:        Option<u8>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub nutrition:   Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated_at:  Option<DateTime<Utc>>,
}

impl HealthEntry {
  pub fn doc_id(user_id: &str, date: NaiveDate) -> String { format!("{user_id}_{date}") }

  pub fn validate(&self) -> Result<()> {
    if let Some(sleep) = self.sleep_hours
      && !(0.0..=24.0).contains(&sleep)
    {
      return Err(Error::validation("sleepHours must be between 0 and 24"));
    }
    for (name, value) in [("stress", self.stress), ("mood", self.mood)] {
      if let Some(v) = value
        && !(1..=10).contains(&v)
      {
        return Err(Error::validation(format!("{name} must be between 1 and 10")));
      }
    }
    Ok(())
  }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
  /// Number of days with an entry.
  pub days:       usize,
  pub avg_sleep:  Option<f32>,
  pub avg_steps:  Option<f32>,
  pub avg_stress: Option<f32>,
  pub avg_mood:   Option<f32>,
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
  let (sum, n) = values.fold((0.0, 0u32), |(s, n), v| (s + v, n + 1));
  (n > 0).then(|| sum / n as f32)
}

/// Average each metric over the entries that report it.
pub fn summarize(entries: &[HealthEntry]) -> HealthSummary {
  HealthSummary {
    days:       entries.len(),
    avg_sleep:  mean(entries.iter().filter_map(|e| e.sleep_hours)),
    avg_steps:  mean(entries.iter().filter_map(|e| e.steps).map(|s| s as f32)),
    avg_stress: mean(entries.iter().filter_map(|e| e.stress).map(f32::from)),
    avg_mood:   mean(entries.iter().filter_map(|e| e.mood).map(f32::from)),
  }
}

// ─── Insights ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  High,
  Medium,
  Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInsight {
  pub category: String,
  pub title:    String,
  pub message:  String,
  pub priority: Priority,
}

impl HealthInsight {
  fn new(category: &str, title: &str, message: String, priority: Priority) -> Self {
    Self { category: category.into(), title: title.into(), message, priority }
  }
}

impl Validate for HealthInsight {
  fn is_valid(&self) -> bool {
    let bounded = |s: &str, max: usize| {
      let n = s.trim().chars().count();
      n > 0 && n <= max
    };
    bounded(&self.category, 40) && bounded(&self.title, 80) && bounded(&self.message, 400)
  }
}

/// Insights that always apply for the given averages.
pub fn rule_insights(summary: &HealthSummary) -> Vec<HealthInsight> {
  if summary.days == 0 {
    return vec![HealthInsight::new(
      "getting-started",
      "Start tracking",
      "Log your sleep, steps, stress and mood for a few days to see \
       personalised insights."
        .into(),
      Priority::Low,
    )];
  }

  let mut insights = Vec::new();
  if let Some(sleep) = summary.avg_sleep
    && sleep < 7.0
  {
    insights.push(HealthInsight::new(
      "sleep",
      "Prioritise sleep",
      format!(
        "You averaged {sleep:.1} hours of sleep. Aim for 7 to 9 hours; a \
         regular bedtime helps."
      ),
      Priority::High,
    ));
  }
  if let Some(stress) = summary.avg_stress
    && stress > 6.0
  {
    insights.push(HealthInsight::new(
      "stress",
      "Stress is running high",
      format!(
        "Your average stress was {stress:.1}/10. Short breathing breaks \
         through the day can help bring it down."
      ),
      Priority::High,
    ));
  }
  if let Some(steps) = summary.avg_steps
    && steps < 5_000.0
  {
    insights.push(HealthInsight::new(
      "activity",
      "Move a little more",
      format!(
        "You averaged {steps:.0} steps a day. A 15 minute walk adds roughly \
         2,000 steps."
      ),
      Priority::Medium,
    ));
  }
  if let Some(mood) = summary.avg_mood
    && mood < 5.0
  {
    insights.push(HealthInsight::new(
      "mood",
      "Your mood has been low",
      format!(
        "Your average mood was {mood:.1}/10. Consider talking to someone you \
         trust or checking in with Mitra."
      ),
      Priority::Medium,
    ));
  }
  insights
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedInsights {
  pub insights: Vec<HealthInsight>,
}

impl Validate for GeneratedInsights {
  fn is_valid(&self) -> bool { self.insights.len() <= 8 && self.insights.is_valid() }
}

pub fn insights_prompt(summary: &HealthSummary) -> String {
  let fmt = |v: Option<f32>| v.map(|v| format!("{v:.1}")).unwrap_or_else(|| "unknown".into());
  format!(
    "You are a supportive wellbeing assistant. Based on these {} day averages \
     (sleep hours {}, steps {}, stress {}/10, mood {}/10), give up to {MAX_INSIGHTS} \
     short, practical insights. Do not give medical advice. Reply with JSON \
     only: {{\"insights\":[{{\"category\":\"<one word>\",\"title\":\"<short title>\",\
     \"message\":\"<one or two sentences>\",\"priority\":\"high|medium|low\"}}]}}",
    summary.days,
    fmt(summary.avg_sleep),
    fmt(summary.avg_steps),
    fmt(summary.avg_stress),
    fmt(summary.avg_mood),
  )
}

/// Rule insights first, then generated ones for categories not already
/// covered, capped at [`MAX_INSIGHTS`].
pub fn combine(rules: Vec<HealthInsight>, generated: Vec<HealthInsight>) -> Vec<HealthInsight> {
  let mut out = rules;
  for insight in generated {
    if !out.iter().any(|i| i.category.eq_ignore_ascii_case(&insight.category)) {
      out.push(insight);
    }
  }
  out.truncate(MAX_INSIGHTS);
  out
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightReport {
  pub summary:  HealthSummary,
  pub insights: Vec<HealthInsight>,
  pub source:   crate::parse::Source,
}

/// Build the insight report for `entries`. The generator is only consulted
/// when there is data to talk about.
pub async fn report<G: Generator>(generator: &G, entries: &[HealthEntry]) -> InsightReport {
  let summary = summarize(entries);
  let rules = rule_insights(&summary);
  if summary.days == 0 {
    return InsightReport { summary, insights: rules, source: crate::parse::Source::Fallback };
  }
  let request = GenerationRequest::json(insights_prompt(&summary)).with_max_tokens(512);
  let generated: Parsed<GeneratedInsights> =
    generate_parsed(generator, request, || GeneratedInsights { insights: Vec::new() }).await;
  let source = generated.source();
  let insights = combine(rules, generated.into_inner().insights);
  InsightReport { summary, insights, source }
}
