//! Seed data: built-in lessons and dictionary entries that keep the app useful
//! without external config or a model API key.

use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{DictionaryEntry, Lesson, LessonSource, Question, QuestionKind, UsageExample};

fn q(id: &str, kind: QuestionKind, prompt: &str, choices: &[&str], answer: &str, explanation: &str) -> Question {
  Question {
    id: id.into(),
    kind,
    prompt: prompt.into(),
    choices: choices.iter().map(|s| s.to_string()).collect(),
    correct_answer: answer.into(),
    explanation: explanation.into(),
  }
}

pub fn seed_lessons() -> Vec<Lesson> {
  use QuestionKind::*;
  vec![
    Lesson {
      id: "l-greetings".into(),
      level: "beginner".into(),
      topic: "greetings".into(),
      title: "Saying hello".into(),
      intro: "ইংরেজিতে সকালে \"Good morning\" আর রাতে বিদায় নেওয়ার সময় \"Good night\" বলা হয়।".into(),
      source: LessonSource::Seed,
      questions: vec![
        q("g1", TranslateToTarget, "সুপ্রভাত", &["Good night", "Good morning", "Good evening", "Goodbye"], "Good morning",
          "সকালের অভিবাদন হলো \"Good morning\"।"),
        q("g2", TranslateToSource, "How are you?", &["তুমি কোথায়?", "তুমি কে?", "তুমি কেমন আছ?", "তুমি কী করো?"], "তুমি কেমন আছ?",
          "\"How are you?\" দিয়ে কারো খোঁজখবর নেওয়া হয়।"),
        q("g3", FillBlank, "Nice to ___ you.", &["meet", "meat", "met", "meeting"], "meet",
          "\"Nice to meet you\" একটি নির্দিষ্ট বাক্যাংশ; \"meat\" মানে মাংস।"),
        q("g4", Pronunciation, "বাক্যটি জোরে বলুন:", &["Good morning, how are you?"], "Good morning, how are you?",
          "প্রতিটি শব্দ স্পষ্ট করে বলুন।"),
        q("g5", WordBuilder, "ধন্যবাদ", &["N", "K", "T", "H", "A", "S"], "THANKS",
          "\"Thanks\" হলো \"Thank you\" এর ঘরোয়া রূপ।"),
      ],
    },
    Lesson {
      id: "l-routine".into(),
      level: "beginner".into(),
      topic: "daily routine".into(),
      title: "My day".into(),
      intro: "অভ্যাস বোঝাতে present simple ব্যবহার হয়: \"I eat rice every day.\"".into(),
      source: LessonSource::Seed,
      questions: vec![
        q("r1", TranslateToTarget, "আমি প্রতিদিন ভাত খাই।",
          &["I eat rice every day.", "I ate rice every day.", "I eating rice every day.", "I eats rice every day."],
          "I eat rice every day.", "\"I\" এর সাথে ক্রিয়ার মূল রূপ বসে: eat।"),
        q("r2", FillBlank, "She ___ to school by bus.", &["go", "goes", "going", "gone"], "goes",
          "He/She/It এর সাথে present simple-এ ক্রিয়ার শেষে -s/-es যোগ হয়।"),
        q("r3", Pronunciation, "বাক্যটি জোরে বলুন:", &["I wake up at seven o'clock."], "I wake up at seven o'clock.",
          "\"o'clock\" উচ্চারণ হয় \"আ-ক্লক\"।"),
        q("r4", WordBuilder, "সকাল", &["R", "O", "N", "M", "G", "I", "N"], "MORNING",
          "morning = সকাল।"),
      ],
    },
  ]
}

/// Absolute last-resort fallback: if all stores are empty, we inject this.
pub fn hard_fallback_lesson(level: String) -> Lesson {
  Lesson {
    id: Uuid::new_v4().to_string(),
    level,
    topic: "basics".into(),
    title: "Hello!".into(),
    intro: "\"Hello\" মানে হ্যালো বা নমস্কার।".into(),
    source: LessonSource::Seed,
    questions: vec![
      q(&Uuid::new_v4().to_string(), QuestionKind::Pronunciation, "বাক্যটি জোরে বলুন:", &["Hello, my name is Rina."],
        "Hello, my name is Rina.", "নিজের পরিচয় দিতে \"My name is ...\" বলুন।"),
      q(&Uuid::new_v4().to_string(), QuestionKind::WordBuilder, "হ্যালো", &["L", "O", "H", "E", "L"], "HELLO",
        "hello = হ্যালো।"),
    ],
  }
}

/// A tiny, hand-curated dictionary used when the model is unavailable.
pub fn seed_dictionary() -> HashMap<String, DictionaryEntry> {
  let entry = |word: &str, meaning: &str, pos: &str, say: &str, en: &str, bn: &str, synonyms: &[&str]| DictionaryEntry {
    word: word.into(),
    meaning_bn: meaning.into(),
    part_of_speech: pos.into(),
    pronunciation: say.into(),
    examples: vec![UsageExample { en: en.into(), bn: bn.into() }],
    synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
  };
  [
    entry("happy", "খুশি, আনন্দিত", "adjective", "হ্যাপি", "I am happy today.", "আজ আমি খুশি।", &["glad", "joyful"]),
    entry("book", "বই", "noun", "বুক", "This is my book.", "এটা আমার বই।", &["volume"]),
    entry("eat", "খাওয়া", "verb", "ঈট", "We eat rice.", "আমরা ভাত খাই।", &["consume"]),
    entry("helpful", "সহায়ক, উপকারী", "adjective", "হেল্পফুল", "She is very helpful.", "সে খুব সহায়ক।", &["useful"]),
    entry("morning", "সকাল", "noun", "মর্নিং", "Good morning!", "সুপ্রভাত!", &[]),
  ]
  .into_iter()
  .map(|e| (e.word.clone(), e))
  .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seed_questions_are_well_formed() {
    let lessons = seed_lessons();
    let fallback = hard_fallback_lesson("beginner".into());
    for lesson in lessons.iter().chain(std::iter::once(&fallback)) {
      assert!(!lesson.questions.is_empty());
      for question in &lesson.questions {
        assert_eq!(question.check_shape(), Ok(()), "{} in {}", question.id, lesson.id);
      }
    }
  }

  #[test]
  fn seeds_cover_every_kind() {
    let kinds: std::collections::HashSet<_> =
      seed_lessons().iter().flat_map(|l| l.questions.iter().map(|q| q.kind)).collect();
    assert_eq!(kinds.len(), 5);
  }

  #[test]
  fn seed_dictionary_is_keyed_by_word() {
    let dict = seed_dictionary();
    assert_eq!(dict["happy"].meaning_bn, "খুশি, আনন্দিত");
  }
}
