//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{DictionaryEntry, Lesson, LessonSource, QuestionKind, Sensitivity, Submission};
use crate::progress::Progress;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewLesson {
        #[serde(default)]
        topic: Option<String>,
        level: String,
    },
    SubmitAnswer {
        #[serde(rename = "questionId")]
        question_id: String,
        submission: Submission,
        #[serde(default)]
        sensitivity: Sensitivity,
    },
    CompleteLesson {
        #[serde(rename = "lessonId")]
        lesson_id: String,
    },
    Dictionary {
        word: String,
    },
    TranslateInput {
        text: String,
    },
    SpeechToTextInput {
        #[serde(rename = "audioBase64")]
        audio_base64: String,
        mime: String,
    },
    TextToSpeech {
        text: String,
        #[serde(default)]
        locale: Option<String>,
    },
    GetProgress,
    RefillHearts,
    ResetProgress,
    ImportProgress {
        data: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Lesson {
        lesson: LessonOut,
    },
    AnswerResult(AnswerOut),
    Dictionary {
        entry: DictionaryEntry,
    },
    Translate {
        text: String,
        translation: String,
    },
    SpeechToText {
        text: Option<String>,
    },
    Speech(SpeechOut),
    Progress {
        progress: Progress,
    },
    Error {
        message: String,
    },
}

/// Question as the learner sees it: no answer, no explanation.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub kind: QuestionKind,
    pub prompt: String,
    pub choices: Vec<String>,
}

/// DTO used by both WS and HTTP for lesson delivery.
#[derive(Debug, Serialize)]
pub struct LessonOut {
    pub id: String,
    pub level: String,
    pub topic: String,
    pub title: String,
    pub intro: String,
    pub source: LessonSource,
    pub questions: Vec<QuestionOut>,
}

/// Convert a full `Lesson` (internal) to the public DTO.
pub fn to_out(l: &Lesson) -> LessonOut {
    LessonOut {
        id: l.id.clone(),
        level: l.level.clone(),
        topic: l.topic.clone(),
        title: l.title.clone(),
        intro: l.intro.clone(),
        source: l.source,
        questions: l
            .questions
            .iter()
            .map(|q| QuestionOut {
                id: q.id.clone(),
                kind: q.kind,
                prompt: q.prompt.clone(),
                choices: q.choices.clone(),
            })
            .collect(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct LessonQuery {
    pub topic: Option<String>,
    pub level: Option<String>,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    #[serde(rename = "questionId")]
    pub question_id: String,
    pub submission: Submission,
    #[serde(default)]
    pub sensitivity: Sensitivity,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOut {
    pub question_id: String,
    pub correct: bool,
    pub feedback_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    pub expected: String,
    pub progress: Progress,
}

#[derive(Deserialize)]
pub struct CompleteLessonIn {
    #[serde(rename = "lessonId")]
    pub lesson_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DictionaryQuery {
    pub word: String,
}
#[derive(Serialize)]
pub struct DictionaryOut {
    pub entry: DictionaryEntry,
    pub source: &'static str,
}

#[derive(Deserialize)]
pub struct TranslateIn {
    pub text: String,
}
#[derive(Serialize)]
pub struct TranslateOut {
    pub translation: String,
}

#[derive(Deserialize)]
pub struct SpeechToTextIn {
    #[serde(rename = "audioBase64")]
    pub audio_base64: String,
    pub mime: String,
}
#[derive(Serialize)]
pub struct SpeechToTextOut {
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub struct TextToSpeechIn {
    pub text: String,
    #[serde(default)]
    pub locale: Option<String>,
}
#[derive(Debug, Serialize)]
pub struct SpeechOut {
    #[serde(rename = "audioBase64")]
    pub audio_base64: String,
    pub mime: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
