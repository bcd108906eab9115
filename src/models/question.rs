// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Highest value a single answer can take ("Always").
pub const MAX_ANSWER_VALUE: u8 = 3;

/// Symptom dimension a question contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Inattention,
    Hyperactivity,
    Impulsivity,
}

impl Dimension {
    /// All dimensions in report order.
    pub const ALL: [Dimension; 3] = [
        Dimension::Inattention,
        Dimension::Hyperactivity,
        Dimension::Impulsivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Inattention => "inattention",
            Dimension::Hyperactivity => "hyperactivity",
            Dimension::Impulsivity => "impulsivity",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inattention" => Ok(Dimension::Inattention),
            "hyperactivity" => Ok(Dimension::Hyperactivity),
            "impulsivity" => Ok(Dimension::Impulsivity),
            other => Err(format!("unknown dimension '{}'", other)),
        }
    }
}

/// A single question of the self-assessment battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionDefinition {
    /// Presentation index, also the key used in submitted answer sets.
    pub id: usize,
    pub text: &'static str,
    pub dimension: Dimension,
}

const fn question(id: usize, text: &'static str, dimension: Dimension) -> QuestionDefinition {
    QuestionDefinition {
        id,
        text,
        dimension,
    }
}

/// The fixed question battery, in presentation order.
///
/// Per-dimension maximum scores are derived from this list (see
/// [`dimension_question_count`]), so editing the battery keeps the
/// percentage math consistent.
pub const QUESTION_BATTERY: [QuestionDefinition; 15] = [
    question(
        0,
        "How often do you have trouble wrapping up the final details of a project once the challenging parts are done?",
        Dimension::Inattention,
    ),
    question(
        1,
        "How often do you have difficulty getting things in order when you have to do a task that requires organization?",
        Dimension::Inattention,
    ),
    question(
        2,
        "How often do you have problems remembering appointments or obligations?",
        Dimension::Inattention,
    ),
    question(
        3,
        "When you have a task that requires a lot of thought, how often do you avoid or delay getting started?",
        Dimension::Inattention,
    ),
    question(
        4,
        "How often do you make careless mistakes when you have to work on a boring or difficult project?",
        Dimension::Inattention,
    ),
    question(
        5,
        "How often do you have difficulty keeping your attention when you are doing boring or repetitive work?",
        Dimension::Inattention,
    ),
    question(
        6,
        "How often do you have difficulty concentrating on what people say to you, even when they are speaking to you directly?",
        Dimension::Inattention,
    ),
    question(
        7,
        "How often do you misplace or have difficulty finding things at home or at work?",
        Dimension::Inattention,
    ),
    question(
        8,
        "How often are you distracted by activity or noise around you?",
        Dimension::Inattention,
    ),
    question(
        9,
        "How often do you fidget or squirm with your hands or feet when you have to sit down for a long time?",
        Dimension::Hyperactivity,
    ),
    question(
        10,
        "How often do you feel overly active and compelled to do things, like you were driven by a motor?",
        Dimension::Hyperactivity,
    ),
    question(
        11,
        "How often do you leave your seat in meetings or other situations in which you are expected to remain seated?",
        Dimension::Hyperactivity,
    ),
    question(
        12,
        "How often do you find yourself talking too much when you are in social situations?",
        Dimension::Impulsivity,
    ),
    question(
        13,
        "How often do you finish the sentences of the people you are talking to before they can finish them themselves?",
        Dimension::Impulsivity,
    ),
    question(
        14,
        "How often do you have difficulty waiting your turn in situations when turn taking is required?",
        Dimension::Impulsivity,
    ),
];

/// Number of questions in the battery tagged with `dimension`.
pub fn dimension_question_count(battery: &[QuestionDefinition], dimension: Dimension) -> usize {
    battery.iter().filter(|q| q.dimension == dimension).count()
}

/// Human label for an answer value.
pub fn answer_label(value: u8) -> &'static str {
    match value {
        0 => "Never",
        1 => "Rarely",
        2 => "Often",
        _ => "Always",
    }
}

/// DTO for sending a question to the client.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: usize,
    pub text: &'static str,
    pub dimension: Dimension,
}

impl From<&QuestionDefinition> for PublicQuestion {
    fn from(q: &QuestionDefinition) -> Self {
        PublicQuestion {
            id: q.id,
            text: q.text,
            dimension: q.dimension,
        }
    }
}

/// One entry of the answer scale shown next to every question.
#[derive(Debug, Serialize)]
pub struct AnswerOption {
    pub value: u8,
    pub label: &'static str,
}

/// DTO for `GET /api/quiz/questions`.
#[derive(Debug, Serialize)]
pub struct QuestionnaireResponse {
    pub questions: Vec<PublicQuestion>,
    pub scale: Vec<AnswerOption>,
}

impl QuestionnaireResponse {
    pub fn from_battery(battery: &[QuestionDefinition]) -> Self {
        QuestionnaireResponse {
            questions: battery.iter().map(PublicQuestion::from).collect(),
            scale: (0..=MAX_ANSWER_VALUE)
                .map(|value| AnswerOption {
                    value,
                    label: answer_label(value),
                })
                .collect(),
        }
    }
}
