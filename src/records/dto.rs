use serde::Deserialize;

/// Body of `POST /records`. Everything optional so the service can answer
/// a missing field with its own validation message.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateRecordRequest {
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub date: Option<String>,
    /// Hours slept.
    pub amount: Option<f64>,
    pub text: Option<String>,
}
