use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A survey definition. Fetched from the remote store and read-only to the
/// sync core; the core carries questions opaquely between quiz and response.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
    /// Estimated completion time in minutes.
    pub estimated_time: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn question_ids(&self) -> Vec<&str> {
        self.questions.iter().map(|q| q.id.as_str()).collect()
    }

    pub fn required_question_ids(&self) -> Vec<&str> {
        self.questions
            .iter()
            .filter(|q| q.required)
            .map(|q| q.id.as_str())
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Closed set of question variants. The renderer matches exhaustively on
/// this; the sync core never branches on it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
    },
    MultipleChoiceCards {
        options: Vec<String>,
    },
    Checkbox {
        options: Vec<String>,
        min_selection: Option<u32>,
        max_selection: Option<u32>,
    },
    Rating {
        min_rating: u8,
        max_rating: u8,
    },
    RatingNumbers {
        min_rating: u8,
        max_rating: u8,
    },
    RatingSlider {
        min_rating: u8,
        max_rating: u8,
    },
    Dropdown {
        options: Vec<String>,
        #[serde(default)]
        searchable: bool,
    },
    Slider {
        min_value: f64,
        max_value: f64,
        step: Option<f64>,
    },
    ShortText {
        min_length: Option<u32>,
        max_length: Option<u32>,
    },
    LongText {
        min_length: Option<u32>,
        max_length: Option<u32>,
    },
    YesNo,
}
