use crate::application::confirmation::PollSnapshot;
use serde::{Deserialize, Deserializer, Serialize};

/// `POST /api/pay` body
#[derive(Debug, Clone, Deserialize)]
pub struct InitiatePaymentRequest {
    /// Amount in XAF; the form posts it either as a string or a number
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: String,

    /// Payer phone number
    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Result of a successful initiation
#[derive(Debug, Clone, Serialize)]
pub struct InitiatePaymentResponse {
    pub success: bool,
    pub reference: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ussd_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

/// `GET /api/status/:reference` body
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    /// `PENDING`, `SUCCESSFUL`, `FAILED` or `UNKNOWN`
    pub status: String,
}

/// Confirmation watch view
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationResponse {
    pub success: bool,
    #[serde(flatten)]
    pub snapshot: PollSnapshot,
    pub message: String,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
