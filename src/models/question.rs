use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One of the four selectable options of a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }

    /// Parses a submitted selection. Clients send either the bare letter or
    /// a prefixed form such as "optionB" / "option B"; the prefix is stripped
    /// case-insensitively, the letter compare itself is case-sensitive.
    pub fn parse_selection(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let stripped = match trimmed.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("option") => &trimmed[6..],
            _ => trimmed,
        };
        match stripped.trim_start_matches([' ', '_', '-']) {
            "A" => Some(AnswerOption::A),
            "B" => Some(AnswerOption::B),
            "C" => Some(AnswerOption::C),
            "D" => Some(AnswerOption::D),
            _ => None,
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single multiple-choice question as stored inside the assessment's
/// question set. The correct answer never leaves the backend; public reads
/// go through `dto::assessment_dto::PublicQuestion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub prompt: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_letters() {
        assert_eq!(AnswerOption::parse_selection("A"), Some(AnswerOption::A));
        assert_eq!(AnswerOption::parse_selection(" D "), Some(AnswerOption::D));
    }

    #[test]
    fn strips_option_prefix() {
        assert_eq!(
            AnswerOption::parse_selection("optionB"),
            Some(AnswerOption::B)
        );
        assert_eq!(
            AnswerOption::parse_selection("Option C"),
            Some(AnswerOption::C)
        );
        assert_eq!(
            AnswerOption::parse_selection("OPTION_A"),
            Some(AnswerOption::A)
        );
    }

    #[test]
    fn letter_compare_is_case_sensitive() {
        assert_eq!(AnswerOption::parse_selection("a"), None);
        assert_eq!(AnswerOption::parse_selection("optionb"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(AnswerOption::parse_selection(""), None);
        assert_eq!(AnswerOption::parse_selection("E"), None);
        assert_eq!(AnswerOption::parse_selection("AB"), None);
        assert_eq!(AnswerOption::parse_selection("ありがとう"), None);
    }
}
