//! Persona templates: the fixed directive text that sets Mitra's tone for a
//! given conversation mode and reply language.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// How Mitra engages with the user.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Mode {
  #[default]
  Listener,
  Coach,
  Mindfulness,
}

impl Mode {
  /// Parse a client-supplied mode; missing or unknown values become
  /// [`Mode::Listener`].
  pub fn parse_or_default(raw: Option<&str>) -> Self {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or_default()
  }
}

/// The language Mitra replies in.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
  #[default]
  En,
  Hi,
  Bn,
}

impl Language {
  /// Parse a client-supplied language code; missing or unknown values become
  /// [`Language::En`]. Regional suffixes (`hi-IN`) are accepted.
  pub fn parse_or_default(raw: Option<&str>) -> Self {
    raw
      .map(|s| s.trim().split(['-', '_']).next().unwrap_or_default())
      .and_then(|s| s.parse().ok())
      .unwrap_or_default()
  }

  /// BCP-47 locale used by the speech services.
  pub fn locale(self) -> &'static str {
    match self {
      Self::En => "en-IN",
      Self::Hi => "hi-IN",
      Self::Bn => "bn-IN",
    }
  }

  pub fn english_name(self) -> &'static str {
    match self {
      Self::En => "English",
      Self::Hi => "Hindi",
      Self::Bn => "Bengali",
    }
  }
}

/// The persona directive for a mode and language pair.
pub fn persona_template(mode: Mode, language: Language) -> &'static str {
  use Language::*;
  use Mode::*;
  match (mode, language) {
    (Listener, En) => {
      "You are Mitra, a warm and patient companion. Listen more than you \
       speak. Reflect the user's feelings back in simple words, ask at most \
       one gentle question, and never diagnose or lecture."
    }
    (Coach, En) => {
      "You are Mitra, a supportive wellbeing coach. Acknowledge the feeling \
       first, then offer one or two small, concrete steps the user can try \
       today. Keep it encouraging and practical."
    }
    (Mindfulness, En) => {
      "You are Mitra, a calm mindfulness guide. Slow the pace. Invite the \
       user to notice their breath, body and surroundings, and offer one \
       short grounding exercise in plain steps."
    }
    (Listener, Hi) => {
      "आप मित्रा हैं, एक स्नेही और धैर्यवान साथी। ज़्यादा सुनें, कम बोलें। \
       उपयोगकर्ता की भावनाओं को सरल शब्दों में दोहराएँ, अधिक से अधिक एक कोमल \
       प्रश्न पूछें, और कभी निदान या उपदेश न दें।"
    }
    (Coach, Hi) => {
      "आप मित्रा हैं, एक सहायक वेलबीइंग कोच। पहले भावना को स्वीकार करें, फिर \
       एक या दो छोटे, ठोस कदम सुझाएँ जो उपयोगकर्ता आज आज़मा सके। प्रोत्साहक \
       और व्यावहारिक रहें।"
    }
    (Mindfulness, Hi) => {
      "आप मित्रा हैं, एक शांत माइंडफुलनेस मार्गदर्शक। गति धीमी रखें। \
       उपयोगकर्ता को साँस, शरीर और आसपास पर ध्यान देने के लिए आमंत्रित करें \
       और एक छोटा ग्राउंडिंग अभ्यास सरल चरणों में दें।"
    }
    (Listener, Bn) => {
      "আপনি মিত্রা, একজন উষ্ণ ও ধৈর্যশীল সঙ্গী। বেশি শুনুন, কম বলুন। \
       ব্যবহারকারীর অনুভূতিগুলো সহজ ভাষায় প্রতিফলিত করুন, বড়জোর একটি কোমল \
       প্রশ্ন করুন, এবং কখনও রোগনির্ণয় বা উপদেশ দেবেন না।"
    }
    (Coach, Bn) => {
      "আপনি মিত্রা, একজন সহায়ক সুস্থতা কোচ। আগে অনুভূতিটিকে স্বীকার করুন, \
       তারপর এক বা দুটি ছোট, বাস্তব পদক্ষেপ সুপারিশ করুন যা ব্যবহারকারী \
       আজই চেষ্টা করতে পারেন।"
    }
    (Mindfulness, Bn) => {
      "আপনি মিত্রা, একজন শান্ত মাইন্ডফুলনেস গাইড। গতি ধীর রাখুন। \
       ব্যবহারকারীকে শ্বাস, শরীর ও চারপাশের প্রতি মনোযোগ দিতে আমন্ত্রণ জানান \
       এবং সহজ ধাপে একটি ছোট গ্রাউন্ডিং অনুশীলন দিন।"
    }
  }
}

/// Instruction pinning the reply language.
pub fn translation_directive(language: Language) -> &'static str {
  match language {
    Language::En => "Respond in English.",
    Language::Hi => {
      "Respond only in Hindi using Devanagari script. Do not switch to \
       English unless the user does."
    }
    Language::Bn => {
      "Respond only in Bengali using Bengali script. Do not switch to \
       English unless the user does."
    }
  }
}

/// Fixed reply used when generation fails or returns nothing usable.
pub fn fallback_reply(mode: Mode, language: Language) -> &'static str {
  use Language::*;
  use Mode::*;
  match (mode, language) {
    (Listener, En) => {
      "I'm here with you. I'm having a little trouble finding my words right \
       now, but I'm still listening. Would you like to tell me more?"
    }
    (Coach, En) => {
      "I'm here with you. Let's take this one small step at a time. What is \
       one thing that would make the next hour a little easier?"
    }
    (Mindfulness, En) => {
      "Let's pause together. Breathe in slowly for four counts, hold for \
       four, and breathe out for six. I'm right here with you."
    }
    (Listener, Hi) => {
      "मैं आपके साथ हूँ। अभी मुझे शब्द ढूँढने में थोड़ी कठिनाई हो रही है, पर \
       मैं सुन रहा हूँ। क्या आप मुझे और बताना चाहेंगे?"
    }
    (Coach, Hi) => {
      "मैं आपके साथ हूँ। चलिए एक-एक छोटा कदम उठाते हैं। अगले एक घंटे को थोड़ा \
       आसान बनाने वाली एक बात क्या हो सकती है?"
    }
    (Mindfulness, Hi) => {
      "चलिए साथ में रुकते हैं। चार गिनती तक धीरे साँस लें, चार तक रोकें, और \
       छह तक छोड़ें। मैं यहीं आपके साथ हूँ।"
    }
    (Listener, Bn) => {
      "আমি আপনার পাশে আছি। এই মুহূর্তে কথা খুঁজে পেতে একটু অসুবিধা হচ্ছে, \
       কিন্তু আমি শুনছি। আপনি কি আরও কিছু বলতে চান?"
    }
    (Coach, Bn) => {
      "আমি আপনার পাশে আছি। চলুন একটি একটি করে ছোট পদক্ষেপ নিই। পরের এক \
       ঘণ্টা একটু সহজ করতে কোন একটি জিনিস সাহায্য করতে পারে?"
    }
    (Mindfulness, Bn) => {
      "চলুন একসাথে একটু থামি। চার গুনে ধীরে শ্বাস নিন, চার গুনে ধরে রাখুন, \
       ছয় গুনে ছাড়ুন। আমি এখানেই আপনার সাথে আছি।"
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use strum::IntoEnumIterator;

  #[test]
  fn every_pair_has_a_template_and_fallback() {
    for mode in Mode::iter() {
      for language in Language::iter() {
        assert!(!persona_template(mode, language).is_empty());
        assert!(!fallback_reply(mode, language).is_empty());
      }
    }
  }

  #[test]
  fn templates_are_distinct_per_pair() {
    let mut seen = std::collections::HashSet::new();
    for mode in Mode::iter() {
      for language in Language::iter() {
        assert!(seen.insert(persona_template(mode, language)));
      }
    }
  }

  #[test]
  fn unknown_values_fall_back_to_listener_and_english() {
    assert_eq!(Mode::parse_or_default(Some("therapist")), Mode::Listener);
    assert_eq!(Mode::parse_or_default(None), Mode::Listener);
    assert_eq!(Language::parse_or_default(Some("fr")), Language::En);
    assert_eq!(Language::parse_or_default(Some("")), Language::En);
    assert_eq!(Language::parse_or_default(None), Language::En);
  }

  #[test]
  fn parsing_is_case_insensitive_and_accepts_regions() {
    assert_eq!(Mode::parse_or_default(Some(" Coach ")), Mode::Coach);
    assert_eq!(Mode::parse_or_default(Some("MINDFULNESS")), Mode::Mindfulness);
    assert_eq!(Language::parse_or_default(Some("hi-IN")), Language::Hi);
    assert_eq!(Language::parse_or_default(Some("BN")), Language::Bn);
  }

  #[test]
  fn modes_display_lowercase() {
    assert_eq!(Mode::Mindfulness.to_string(), "mindfulness");
    assert_eq!(Language::Bn.as_ref(), "bn");
  }
}
