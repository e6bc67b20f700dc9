//! Quiz model for the technical stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{QuizId, ValidationError};

/// Questions at positions below this index default to coding questions
/// when the gateway supplies neither a type nor options.
pub const CODING_POSITION_CUTOFF: usize = 15;

/// Category of a quiz question, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "mcqs_questions")]
    MultipleChoice,
    #[serde(rename = "coding_questions")]
    Coding,
    #[serde(rename = "text_questions")]
    FreeText,
}

impl QuestionType {
    /// Wire name used when submitting answers.
    pub fn wire_name(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "mcqs_questions",
            QuestionType::Coding => "coding_questions",
            QuestionType::FreeText => "text_questions",
        }
    }

    /// Resolves the type of the question at `position`.
    ///
    /// An explicit type wins. Otherwise questions with options are multiple
    /// choice, and the rest fall back on their position.
    pub fn resolve(explicit: Option<QuestionType>, has_options: bool, position: usize) -> Self {
        match explicit {
            Some(t) => t,
            None if has_options => QuestionType::MultipleChoice,
            None if position < CODING_POSITION_CUTOFF => QuestionType::Coding,
            None => QuestionType::FreeText,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl FromStr for QuestionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mcqs_questions" => Ok(QuestionType::MultipleChoice),
            "coding_questions" => Ok(QuestionType::Coding),
            "text_questions" => Ok(QuestionType::FreeText),
            other => Err(ValidationError::invalid_format(
                "question_type",
                format!("unknown question type '{}'", other),
            )),
        }
    }
}

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub id: QuizId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub question_type: QuestionType,
}

impl QuizItem {
    /// Builds an item, resolving its type from the position in the quiz.
    pub fn new(
        id: QuizId,
        text: impl Into<String>,
        options: Option<Vec<String>>,
        explicit_type: Option<QuestionType>,
        position: usize,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::empty_field("question_text"));
        }
        let options = options.filter(|opts| !opts.is_empty());
        let question_type = QuestionType::resolve(explicit_type, options.is_some(), position);
        Ok(Self {
            id,
            text,
            options,
            question_type,
        })
    }

    /// Multiple-choice answers must be one of the offered options.
    pub fn accepts(&self, answer: &str) -> bool {
        match (&self.question_type, &self.options) {
            (QuestionType::MultipleChoice, Some(options)) => options.iter().any(|o| o == answer),
            _ => true,
        }
    }
}
