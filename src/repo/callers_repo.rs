use crate::domain::caller::{AccountKind, Caller, SecurityQuestion};
use anyhow::Result;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct CallersRepo {
    pub pool: PgPool,
}

impl CallersRepo {
    pub async fn find_by_subject(&self, subject_id: &str) -> Result<Option<Caller>> {
        let row = sqlx::query(
            r#"
            SELECT subject_id, display_name, role, account_type, kyc_level, kyb_status
            FROM callers
            WHERE subject_id = $1
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let account_type: String = row.get("account_type");
        let account = if account_type.eq_ignore_ascii_case("business") {
            AccountKind::Business {
                kyb_status: row.get("kyb_status"),
            }
        } else {
            let level: i16 = row.get("kyc_level");
            AccountKind::Individual {
                kyc_level: level.clamp(0, u8::MAX as i16) as u8,
            }
        };

        let questions = sqlx::query(
            "SELECT question, answer FROM caller_security_questions WHERE subject_id = $1 ORDER BY position ASC",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Caller {
            subject_id: row.get("subject_id"),
            display_name: row.get("display_name"),
            role: row.get("role"),
            account,
            security_questions: questions
                .into_iter()
                .map(|q| SecurityQuestion {
                    question: q.get("question"),
                    answer: q.get("answer"),
                })
                .collect(),
        }))
    }
}
