use serde::{Deserialize, Deserializer, Serialize};

use crate::services::conversation::ConversationTurn;

pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Cache,
    Generator,
    Fallback,
}

/// Patient lab snapshot sent alongside a chat turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientContext {
    /// eGFR in mL/min/1.73m². Accepts a number or a numeric string.
    #[serde(
        rename = "eGFR",
        alias = "egfr",
        default,
        deserialize_with = "lenient_metric",
        skip_serializing_if = "Option::is_none"
    )]
    pub egfr: Option<f64>,

    #[serde(
        rename = "riskLevel",
        alias = "risk_level",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub risk_level: Option<String>,
}

impl PatientContext {
    /// Numeric metric used for risk bucketing; `None` when absent or not finite
    pub fn risk_metric(&self) -> Option<f64> {
        self.egfr.filter(|v| v.is_finite())
    }
}

fn lenient_metric<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

// ===== REQUEST MODELS =====

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, alias = "session_id")]
    pub session_id: Option<String>,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "patientResults", alias = "patient_context")]
    pub patient_context: Option<PatientContext>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub reply: String,
    pub session_id: SessionId,
    pub conversation_length: usize,
    pub source: ReplySource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub success: bool,
    pub session_id: SessionId,
    pub message_count: usize,
    pub messages: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_context_accepts_numeric_string() {
        let ctx: PatientContext =
            serde_json::from_str(r#"{"eGFR": "78.5", "riskLevel": "Moderate"}"#).unwrap();
        assert_eq!(ctx.risk_metric(), Some(78.5));
        assert_eq!(ctx.risk_level.as_deref(), Some("Moderate"));
    }

    #[test]
    fn test_patient_context_non_numeric_metric_is_absent() {
        let ctx: PatientContext = serde_json::from_str(r#"{"eGFR": "n/a"}"#).unwrap();
        assert_eq!(ctx.risk_metric(), None);

        let ctx: PatientContext = serde_json::from_str(r#"{"eGFR": null}"#).unwrap();
        assert_eq!(ctx.risk_metric(), None);

        let ctx: PatientContext = serde_json::from_str("{}").unwrap();
        assert_eq!(ctx.risk_metric(), None);
    }

    #[test]
    fn test_chat_request_accepts_patient_results_alias() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message": "hi", "sessionId": "s1", "patientResults": {"eGFR": 65}}"#,
        )
        .unwrap();
        assert_eq!(req.session_id.as_deref(), Some("s1"));
        assert_eq!(
            req.patient_context.and_then(|c| c.risk_metric()),
            Some(65.0)
        );
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }
}
