use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    Individual { kyc_level: u8 },
    Business { kyb_status: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityQuestion {
    pub question: String,
    pub answer: String,
}

impl SecurityQuestion {
    pub fn accepts(&self, answer: &str) -> bool {
        normalize_answer(&self.answer) == normalize_answer(answer)
    }
}

pub fn normalize_answer(s: &str) -> String {
    s.trim().to_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    pub subject_id: String,
    pub display_name: Option<String>,
    pub role: String,
    pub account: AccountKind,
    #[serde(default)]
    pub security_questions: Vec<SecurityQuestion>,
}

impl Caller {
    pub fn has_subject(&self) -> bool {
        !self.subject_id.trim().is_empty()
    }

    pub fn challenge_question(&self) -> Option<&SecurityQuestion> {
        self.security_questions.first()
    }

    pub fn find_question(&self, question: &str) -> Option<&SecurityQuestion> {
        let wanted = question.trim();
        self.security_questions
            .iter()
            .find(|q| q.question.trim().eq_ignore_ascii_case(wanted))
    }
}

pub fn ledger_user_id(caller: Option<&Caller>) -> String {
    caller
        .filter(|c| c.has_subject())
        .map(|c| c.subject_id.clone())
        .unwrap_or_else(|| "anonymous".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_compare_trimmed_and_case_insensitive() {
        let q = SecurityQuestion {
            question: "First pet?".to_string(),
            answer: "Rex".to_string(),
        };
        assert!(q.accepts("  rEX "));
        assert!(!q.accepts("max"));
    }
}
