// src/models/quiz.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Requested difficulty of a generated quiz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One multiple-choice question.
///
/// Field names stay camelCase because this is the exact JSON shape the AI
/// contract produces and the `questions` column stores verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    /// Exactly four options, insertion order significant.
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_answer: usize,
    pub explanation: String,
}

pub const OPTIONS_PER_QUESTION: usize = 4;

impl QuizQuestion {
    /// Checks the structural invariants: four options and an in-bounds
    /// correct-answer index.
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            return Err(format!(
                "expected {} options, got {}",
                OPTIONS_PER_QUESTION,
                self.options.len()
            ));
        }
        if self.correct_answer >= self.options.len() {
            return Err(format!(
                "correct answer index {} out of bounds for {} options",
                self.correct_answer,
                self.options.len()
            ));
        }
        Ok(())
    }
}

/// A generated quiz tied to one document.
///
/// Regeneration appends a new quiz; existing rows are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    pub difficulty: Difficulty,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input for inserting a quiz row.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    pub difficulty: Difficulty,
}

/// Body of `POST /api/documents/{id}/generate`. Both fields optional; the
/// pipeline defaults to 5 questions at medium difficulty.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    #[validate(range(min = 1, max = 20))]
    pub num_questions: Option<u32>,
    pub difficulty: Option<Difficulty>,
}
