//! Application state: in-memory stores, prompts, model client, speech capabilities and progress.
//!
//! This module owns:
//!   - lesson stores (by id, by level, last-served-by-level) and the question index
//!   - the dictionary cache plus the built-in dictionary
//!   - the prompts struct (from TOML or defaults)
//!   - optional OpenAI client and the speech capabilities it provides
//!   - the learner's progress tracker
//!
//! Selection policy: generate a fresh lesson via the model when available.
//! Otherwise we serve the bank/seed pool, and as a last resort a hard fallback.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::capabilities::{Speaker, Transcriber};
use crate::config::{load_app_config_from_env, AppConfig, LessonCfg, Prompts};
use crate::domain::{DictionaryEntry, Lesson, LessonSource, Question};
use crate::openai::OpenAI;
use crate::progress::{JsonFileStore, KeyValueStore, MemoryStore, ProgressTracker};
use crate::seeds::{hard_fallback_lesson, seed_dictionary, seed_lessons};

pub const DEFAULT_TOPIC: &str = "everyday conversation";

#[derive(Clone)]
pub struct AppState {
    pub by_id: Arc<RwLock<HashMap<String, Lesson>>>,
    pub by_level: Arc<RwLock<HashMap<String, Vec<String>>>>,
    pub last_by_level: Arc<RwLock<HashMap<String, String>>>,
    pub questions: Arc<RwLock<HashMap<String, Question>>>,
    pub dictionary: Arc<RwLock<HashMap<String, DictionaryEntry>>>,
    pub seed_dictionary: Arc<HashMap<String, DictionaryEntry>>,
    pub openai: Option<OpenAI>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub speaker: Option<Arc<dyn Speaker>>,
    pub progress: Arc<Mutex<ProgressTracker>>,
    pub prompts: Prompts,
}

impl AppState {
    /// Build state from env: load config, seed lessons, pick the progress store, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_app_config_from_env().unwrap_or_default();

        let store_path = std::env::var("BOLO_PROGRESS_PATH")
            .ok()
            .or_else(|| cfg.progress.store_path.clone());
        let store: Box<dyn KeyValueStore> = match &store_path {
            Some(path) => {
                info!(target: "progress", %path, "Using JSON file progress store");
                Box::new(JsonFileStore::open(path))
            }
            None => {
                info!(target: "progress", "Using in-memory progress store");
                Box::new(MemoryStore::default())
            }
        };
        let tracker = ProgressTracker::new(store, cfg.progress.clone());

        // Build optional OpenAI client (if API key present).
        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "bolo_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, transcribe_model = %oa.transcribe_model, tts_model = %oa.tts_model, "OpenAI enabled.");
        } else {
            info!(target: "bolo_backend", "OpenAI disabled (no OPENAI_API_KEY). Using local/seed logic.");
        }

        let mut state = Self::build(cfg, openai.clone(), tracker);
        if let Some(oa) = openai {
            let oa = Arc::new(oa);
            state.transcriber = Some(oa.clone() as Arc<dyn Transcriber>);
            state.speaker = Some(oa as Arc<dyn Speaker>);
        }
        state
    }

    /// Assemble state from already-loaded parts. Speech capabilities start empty.
    pub fn build(cfg: AppConfig, openai: Option<OpenAI>, tracker: ProgressTracker) -> Self {
        let mut id_map = HashMap::<String, Lesson>::new();
        let mut level_map = HashMap::<String, Vec<String>>::new();
        let mut question_map = HashMap::<String, Question>::new();

        let bank: Vec<Lesson> = cfg.lessons.iter().filter_map(lesson_from_cfg).collect();
        let seeds: Vec<Lesson> = seed_lessons()
            .into_iter()
            .filter(|seed| !bank.iter().any(|l| l.id == seed.id))
            .collect();

        // Built-in question ids are reserved; bank questions may not shadow them.
        for q in seeds.iter().flat_map(|l| &l.questions) {
            question_map.insert(q.id.clone(), q.clone());
        }

        // Bank lessons first (in file order), then built-in seeds.
        for mut lesson in bank {
            if id_map.contains_key(&lesson.id) {
                error!(target: "lesson", id = %lesson.id, "Skipping bank lesson: duplicate lesson id");
                continue;
            }
            lesson.questions.retain(|q| {
                if question_map.contains_key(&q.id) {
                    error!(target: "lesson", lesson = %lesson.id, question = %q.id, "Skipping bank question: id already in use");
                    return false;
                }
                question_map.insert(q.id.clone(), q.clone());
                true
            });
            if lesson.questions.is_empty() {
                error!(target: "lesson", id = %lesson.id, "Skipping bank lesson: no usable questions.");
                continue;
            }
            level_map.entry(lesson.level.clone()).or_default().push(lesson.id.clone());
            id_map.insert(lesson.id.clone(), lesson);
        }
        for lesson in seeds {
            level_map.entry(lesson.level.clone()).or_default().push(lesson.id.clone());
            id_map.insert(lesson.id.clone(), lesson);
        }

        // Inventory summary by level/source.
        let mut count_by_level: HashMap<String, (usize, usize)> = HashMap::new();
        for lesson in id_map.values() {
            let entry = count_by_level.entry(lesson.level.clone()).or_insert((0, 0));
            match lesson.source {
                LessonSource::LocalBank => entry.0 += 1,
                LessonSource::Generated | LessonSource::Seed => entry.1 += 1,
            }
        }
        for (level, (bank, seed)) in count_by_level {
            info!(target: "lesson", %level, local_bank = bank, seed = seed, "Startup lesson inventory");
        }

        Self {
            by_id: Arc::new(RwLock::new(id_map)),
            by_level: Arc::new(RwLock::new(level_map)),
            last_by_level: Arc::new(RwLock::new(HashMap::new())),
            questions: Arc::new(RwLock::new(question_map)),
            dictionary: Arc::new(RwLock::new(HashMap::new())),
            seed_dictionary: Arc::new(seed_dictionary()),
            openai,
            transcriber: None,
            speaker: None,
            progress: Arc::new(Mutex::new(tracker)),
            prompts: cfg.prompts,
        }
    }

    /// Insert a lesson into every store, indexing its questions.
    #[instrument(level = "debug", skip(self, lesson), fields(id = %lesson.id))]
    pub async fn insert_lesson(&self, lesson: Lesson) {
        let mut by_id = self.by_id.write().await;
        let mut by_level = self.by_level.write().await;
        let mut questions = self.questions.write().await;
        for q in &lesson.questions {
            if questions.contains_key(&q.id) {
                error!(target: "lesson", lesson = %lesson.id, question = %q.id, "Question id already indexed; keeping the existing question");
                continue;
            }
            questions.insert(q.id.clone(), q.clone());
        }
        by_level.entry(lesson.level.clone()).or_default().push(lesson.id.clone());
        by_id.insert(lesson.id.clone(), lesson);
    }

    /// Selection policy:
    /// Generate a fresh lesson via OpenAI when available.
    /// Otherwise serve the existing pool, preferring the requested topic.
    /// Otherwise insert a hard fallback.
    #[instrument(level = "info", skip(self), fields(%level))]
    pub async fn choose_lesson(&self, topic: Option<&str>, level: &str) -> (Lesson, &'static str) {
        if let Some(oa) = &self.openai {
            let gen_topic = topic.unwrap_or(DEFAULT_TOPIC);
            match oa.generate_lesson(&self.prompts, gen_topic, level).await {
                Ok(lesson) => {
                    let id = lesson.id.clone();
                    self.insert_lesson(lesson.clone()).await;
                    self.last_by_level.write().await.insert(level.to_string(), id.clone());
                    info!(target: "lesson", %level, chosen = %id, source = "openai_generated_new", "Generated fresh lesson");
                    return (lesson, "openai_generated_new");
                }
                Err(e) => {
                    error!(target: "lesson", %level, error = %e, "OpenAI generation failed; trying existing pool");
                }
            }
        } else {
            warn!(target: "lesson", %level, "OPENAI_API_KEY not set; trying existing pool then hard fallback");
        }

        if let Some(ids) = { self.by_level.read().await.get(level).cloned() } {
            let candidates: Vec<String> = {
                let by_id = self.by_id.read().await;
                let on_topic: Vec<String> = match topic {
                    Some(t) => ids
                        .iter()
                        .filter(|id| by_id.get(*id).is_some_and(|l| l.topic.eq_ignore_ascii_case(t)))
                        .cloned()
                        .collect(),
                    None => Vec::new(),
                };
                if on_topic.is_empty() { ids } else { on_topic }
            };

            if !candidates.is_empty() {
                let last = { self.last_by_level.read().await.get(level).cloned() };
                let chosen_id = match last {
                    Some(last_id) if candidates.len() > 1 => candidates
                        .iter()
                        .find(|id| **id != last_id)
                        .cloned()
                        .unwrap_or_else(|| candidates[0].clone()),
                    _ => candidates[0].clone(),
                };

                if let Some(lesson) = { self.by_id.read().await.get(&chosen_id).cloned() } {
                    self.last_by_level.write().await.insert(level.to_string(), chosen_id.clone());
                    info!(target: "lesson", %level, chosen = %chosen_id, source = %lesson.source, "Serving existing lesson");
                    return (lesson, "existing_pool");
                }
            }
        }

        // Absolute last resort: hard fallback.
        let lesson = hard_fallback_lesson(level.to_string());
        let id = lesson.id.clone();
        self.insert_lesson(lesson.clone()).await;
        self.last_by_level.write().await.insert(level.to_string(), id.clone());
        warn!(target: "lesson", %level, chosen = %id, source = "hard_fallback", "Inserted hard fallback lesson");
        (lesson, "hard_fallback")
    }

    /// Read-only access to a lesson by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_lesson(&self, id: &str) -> Option<Lesson> {
        self.by_id.read().await.get(id).cloned()
    }

    /// Read-only access to a question by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_question(&self, id: &str) -> Option<Question> {
        self.questions.read().await.get(id).cloned()
    }

    /// Dictionary lookup: cache, then the model, then the built-in dictionary.
    #[instrument(level = "info", skip(self), fields(%word))]
    pub async fn lookup_word(&self, word: &str) -> Option<(DictionaryEntry, &'static str)> {
        let key = word.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }

        if let Some(entry) = { self.dictionary.read().await.get(&key).cloned() } {
            return Some((entry, "cache"));
        }

        if let Some(oa) = &self.openai {
            match oa.lookup_word(&self.prompts, &key).await {
                Ok(entry) => {
                    self.dictionary.write().await.insert(key, entry.clone());
                    return Some((entry, "openai"));
                }
                Err(e) => error!(target: "bolo_backend", %key, error = %e, "OpenAI dictionary lookup failed; using built-in dictionary"),
            }
        }

        self.seed_dictionary.get(&key).cloned().map(|e| (e, "seed"))
    }
}

/// Convert a TOML bank entry, dropping malformed questions and repeated question ids.
fn lesson_from_cfg(cfg: &LessonCfg) -> Option<Lesson> {
    let id = cfg.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut seen = HashSet::<String>::new();
    let questions: Vec<Question> = cfg
        .questions
        .iter()
        .filter_map(|qc| {
            let q = Question {
                id: qc.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
                kind: qc.kind,
                prompt: qc.prompt.clone(),
                choices: qc.choices.clone(),
                correct_answer: qc.correct_answer.clone(),
                explanation: qc.explanation.clone(),
            };
            if !seen.insert(q.id.clone()) {
                error!(target: "lesson", lesson = %id, question = %q.id, "Skipping bank question: duplicate id within lesson");
                return None;
            }
            match q.check_shape() {
                Ok(()) => Some(q),
                Err(reason) => {
                    error!(target: "lesson", lesson = %id, question = %q.id, %reason, "Skipping malformed bank question");
                    None
                }
            }
        })
        .collect();

    if questions.is_empty() {
        error!(target: "lesson", %id, level = %cfg.level, "Skipping bank lesson: no usable questions.");
        return None;
    }

    Some(Lesson {
        id: id.clone(),
        level: cfg.level.clone(),
        topic: cfg.topic.clone(),
        title: cfg.title.clone().unwrap_or_else(|| cfg.topic.clone()),
        intro: cfg.intro.clone(),
        source: LessonSource::LocalBank,
        questions,
    })
}
