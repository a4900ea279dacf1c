//! Practice scenarios: a fixed catalog of social situations the user can
//! rehearse, simulated replies with feedback, and XP/skill/badge progress.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
  Error, Result,
  conversation::{Turn, render_history, truncate_chars},
  generate::{GenerationRequest, Generator},
  parse::{Parsed, Validate, generate_parsed},
};

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Skill {
  Assertiveness,
  Empathy,
  Boundaries,
  ConflictResolution,
  SelfAdvocacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
  pub id:           &'static str,
  pub title:        &'static str,
  pub description:  &'static str,
  pub skill:        Skill,
  pub difficulty:   Difficulty,
  /// The other party's first line.
  pub opening_line: &'static str,
  /// Who the model plays.
  pub persona:      &'static str,
  /// Used in place of a generated reply.
  #[serde(skip)]
  pub fallback:     &'static str,
}

pub static SCENARIOS: &[Scenario] = &[
  Scenario {
    id:           "parent-exam-pressure",
    title:        "Talking to a parent about exam stress",
    description:  "Your parent expects top marks. Explain how the pressure is \
                   affecting you and ask for support.",
    skill:        Skill::SelfAdvocacy,
    difficulty:   Difficulty::Hard,
    opening_line: "Your results come out next week. You have been studying, haven't you?",
    persona:      "a loving but anxious parent who worries about their child's future",
    fallback:     "I only push because I want the best for you. Tell me what is \
                   really going on.",
  },
  Scenario {
    id:           "saying-no-to-a-friend",
    title:        "Saying no to a friend",
    description:  "A friend wants you at a party the night before a deadline. \
                   Decline without damaging the friendship.",
    skill:        Skill::Boundaries,
    difficulty:   Difficulty::Easy,
    opening_line: "Come on, everyone will be there tonight. You can't skip it again!",
    persona:      "an enthusiastic friend who takes rejection a little personally",
    fallback:     "Okay, I get it, but I really wanted you there. Maybe next time?",
  },
  Scenario {
    id:           "asking-for-help",
    title:        "Asking a teacher or manager for help",
    description:  "You are falling behind and need an extension or support. \
                   Ask for it clearly.",
    skill:        Skill::Assertiveness,
    difficulty:   Difficulty::Medium,
    opening_line: "You wanted to see me? I have a few minutes.",
    persona:      "a busy but fair teacher or manager",
    fallback:     "Thanks for coming to me early. What exactly do you need from me?",
  },
  Scenario {
    id:           "comforting-a-friend",
    title:        "Comforting a friend",
    description:  "A close friend just had a painful breakup. Be there for them \
                   without trying to fix everything.",
    skill:        Skill::Empathy,
    difficulty:   Difficulty::Medium,
    opening_line: "I don't even know why I'm telling you this. It's just... over.",
    persona:      "a hurting friend who mostly needs to feel heard",
    fallback:     "Thanks for listening. I don't really know how I feel yet.",
  },
  Scenario {
    id:           "roommate-conflict",
    title:        "Resolving a roommate conflict",
    description:  "Your roommate keeps leaving a mess. Raise it calmly and agree \
                   on a plan.",
    skill:        Skill::ConflictResolution,
    difficulty:   Difficulty::Hard,
    opening_line: "What? I was going to clean it later. Why is this such a big deal?",
    persona:      "a defensive roommate who dislikes being criticised",
    fallback:     "Fine, maybe I have been a bit messy. What do you want to do about it?",
  },
];

pub fn scenario(id: &str) -> Option<&'static Scenario> { SCENARIOS.iter().find(|s| s.id == id) }

// ─── Simulation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
  /// 0 – 10
  pub score:       u8,
  #[serde(default)]
  pub strengths:   Vec<String>,
  #[serde(default)]
  pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
  pub reply:    String,
  pub feedback: Feedback,
}

impl Validate for SimulationResult {
  fn is_valid(&self) -> bool {
    let short = |v: &[String]| v.len() <= 5 && v.iter().all(|s| !s.trim().is_empty());
    let reply = self.reply.trim().chars().count();
    reply > 0
      && reply <= 800
      && self.feedback.score <= 10
      && short(&self.feedback.strengths)
      && short(&self.feedback.suggestions)
  }
}

/// Score a practice message with simple communication heuristics.
pub fn rule_feedback(message: &str) -> Feedback {
  let lower = message.to_lowercase();
  let len = message.trim().chars().count();
  let mut score: i32 = 5;
  let mut strengths = Vec::new();
  let mut suggestions = Vec::new();

  if ["i feel", "i think", "i need"].iter().any(|p| lower.contains(p)) {
    score += 2;
    strengths.push("You used \"I\" statements to share your perspective.".to_owned());
  } else {
    suggestions.push("Try an \"I feel...\" statement to express your view.".to_owned());
  }

  if message.contains('?') {
    score += 1;
    strengths.push("You asked a question and invited the other person in.".to_owned());
  } else {
    suggestions.push("Asking a question can show you want to understand them.".to_owned());
  }

  if (40..=400).contains(&len) {
    score += 1;
    strengths.push("Your message was clear and a good length.".to_owned());
  } else if len < 40 {
    suggestions.push("Add a little more detail so your point lands.".to_owned());
  } else {
    suggestions.push("Try to keep it shorter and focused on one point.".to_owned());
  }

  if ["always", "never", "you make me"].iter().any(|p| lower.contains(p)) {
    score -= 2;
    suggestions.push("Avoid absolutes like \"always\" or \"never\"; they can sound like blame.".to_owned());
  }

  Feedback { score: score.clamp(0, 10) as u8, strengths, suggestions }
}

pub fn fallback_simulation(scenario: &Scenario, message: &str) -> SimulationResult {
  SimulationResult { reply: scenario.fallback.to_owned(), feedback: rule_feedback(message) }
}

pub fn simulation_prompt(scenario: &Scenario, history: &[Turn], message: &str) -> String {
  let history = if history.is_empty() {
    format!("Mitra: {}", scenario.opening_line)
  } else {
    render_history(history)
  };
  format!(
    "You are role-playing {persona} in a practice conversation titled \
     \"{title}\". The user is practising {skill}. Stay in character and reply \
     in one to three sentences. Then evaluate the user's latest message as a \
     communication coach.\n\nConversation so far:\n{history}\nUser: {message}\n\n\
     Reply with JSON only: {{\"reply\":\"<in-character reply>\",\
     \"feedback\":{{\"score\":<0-10>,\"strengths\":[\"...\"],\"suggestions\":[\"...\"]}}}}",
    persona = scenario.persona,
    title = scenario.title,
    skill = scenario.skill,
    message = truncate_chars(message.trim(), 1_000),
  )
}

/// Simulate the other party's reply; never fails.
pub async fn simulate<G: Generator>(
  generator: &G,
  scenario: &Scenario,
  history: &[Turn],
  message: &str,
) -> Parsed<SimulationResult> {
  let request = GenerationRequest::json(simulation_prompt(scenario, history, message))
    .with_temperature(0.8)
    .with_max_tokens(512);
  generate_parsed(generator, request, || fallback_simulation(scenario, message)).await
}

// ─── Progress ────────────────────────────────────────────────────────────────

pub const XP_PER_POINT: u32 = 10;
pub const FIRST_COMPLETION_BONUS: u32 = 25;
pub const XP_PER_LEVEL: u32 = 250;
/// Fraction of the gap to the new score a skill moves per completion.
const SKILL_STEP: f32 = 0.2;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Badge {
  /// Completed a first scenario.
  FirstSteps,
  /// Practised every skill at least once.
  WellRounded,
  /// Five completions in total.
  Dedicated,
  /// Scored 9 or more.
  HighScorer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeProgress {
  pub xp:                  u32,
  pub level:               u32,
  #[serde(default)]
  pub skills:              BTreeMap<Skill, f32>,
  #[serde(default)]
  pub badges:              BTreeSet<Badge>,
  #[serde(default)]
  pub completed_scenarios: BTreeSet<String>,
  #[serde(default)]
  pub completions:         u32,
  pub updated_at:          Option<DateTime<Utc>>,
}

impl Default for PracticeProgress {
  fn default() -> Self {
    Self {
      xp:                  0,
      level:               1,
      skills:              BTreeMap::new(),
      badges:              BTreeSet::new(),
      completed_scenarios: BTreeSet::new(),
      completions:         0,
      updated_at:          None,
    }
  }
}

pub fn level_for(xp: u32) -> u32 { 1 + xp / XP_PER_LEVEL }

impl PracticeProgress {
  /// Apply a completed scenario and return the badges newly earned.
  pub fn record_completion(
    &mut self,
    scenario: &Scenario,
    score: i64,
    at: DateTime<Utc>,
  ) -> Result<Vec<Badge>> {
    let score = u8::try_from(score)
      .ok()
      .filter(|s| *s <= 10)
      .ok_or_else(|| Error::validation("score must be between 0 and 10"))?;

    let first = self.completed_scenarios.insert(scenario.id.to_owned());
    self.xp += XP_PER_POINT * u32::from(score);
    if first {
      self.xp += FIRST_COMPLETION_BONUS;
    }
    self.level = level_for(self.xp);
    self.completions += 1;

    let target = f32::from(score) / 10.0;
    let skill = self.skills.entry(scenario.skill).or_insert(0.0);
    *skill = (*skill + (target - *skill) * SKILL_STEP).clamp(0.0, 1.0);

    let criteria = [
      (Badge::FirstSteps, true),
      (Badge::WellRounded, Skill::iter().all(|s| self.skills.contains_key(&s))),
      (Badge::Dedicated, self.completions >= 5),
      (Badge::HighScorer, score >= 9),
    ];
    let earned = criteria
      .into_iter()
      .filter(|&(badge, met)| met && self.badges.insert(badge))
      .map(|(badge, _)| badge)
      .collect();

    self.updated_at = Some(at);
    Ok(earned)
  }
}
