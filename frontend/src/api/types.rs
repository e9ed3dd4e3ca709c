use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Please enter both email and password"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please enter both email and password"))]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Serialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Please fill all required fields"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please fill all required fields"))]
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    pub phone_number: String,
    pub otp: String,
}

/// Downstream carrier used by the service to deliver messages. Passed through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Twilio,
    Vonage,
    Plivo,
}

/// One batch of a bulk job as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendRequest {
    pub phone_numbers: Vec<String>,
    #[serde(rename = "totalSMS")]
    pub total_sms: u32,
    pub pause_after: u32,
    pub pause_seconds: u64,
    pub provider: Provider,
    pub batch_index: u32,
}

/// Generic acknowledgement. The service body may be empty or carry a message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsCounters {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub success_rate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsAnalytics {
    #[serde(default)]
    pub today: SmsCounters,
    #[serde(default, rename = "last7Days")]
    pub last_7_days: SmsCounters,
    #[serde(default)]
    pub this_month: SmsCounters,
    #[serde(default)]
    pub all_time: SmsCounters,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub total: u64,
}

/// Daily counters keyed by ISO date (`YYYY-MM-DD`), which sorts chronologically.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DailySmsCounts(pub BTreeMap<String, DailyCount>);

impl DailySmsCounts {
    /// The most recent `days` entries, oldest first.
    pub fn recent(&self, days: usize) -> Vec<(&str, DailyCount)> {
        let skip = self.0.len().saturating_sub(days);
        self.0
            .iter()
            .skip(skip)
            .map(|(date, count)| (date.as_str(), *count))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub date: String,
    pub phone_number: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    #[serde(default, rename = "totalSMS")]
    pub total_sms: u64,
    #[serde(default, rename = "successfulSMS")]
    pub successful_sms: u64,
    #[serde(default, rename = "failedSMS")]
    pub failed_sms: u64,
    #[serde(default)]
    pub delivery_rate: Option<String>,
    #[serde(default)]
    pub recent_activity: Vec<ActivityEntry>,
}

/// Error payload returned by the service on non-success responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, alias = "message")]
    pub error: String,
    #[serde(default)]
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl ApiError {
    pub fn new(msg: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: code.into(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_record_accepts_mongo_style_id() {
        let user: UserRecord = serde_json::from_value(json!({
            "_id": "64f0",
            "name": "Ada",
            "email": "ada@example.com",
            "role": "admin"
        }))
        .unwrap();
        assert_eq!(user.id, "64f0");
        assert_eq!(user.role, Role::Admin);
        assert!(user.created_at.is_none());
    }

    #[test]
    fn bulk_send_request_uses_service_field_names() {
        let request = BulkSendRequest {
            phone_numbers: vec!["+15550000001".into()],
            total_sms: 5,
            pause_after: 10,
            pause_seconds: 3,
            provider: Provider::Vonage,
            batch_index: 2,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "phoneNumbers": ["+15550000001"],
                "totalSMS": 5,
                "pauseAfter": 10,
                "pauseSeconds": 3,
                "provider": "vonage",
                "batchIndex": 2
            })
        );
    }

    #[test]
    fn api_error_reads_message_alias() {
        let err: ApiError = serde_json::from_value(json!({ "message": "Invalid OTP" })).unwrap();
        assert_eq!(err.error, "Invalid OTP");
        assert_eq!(format!("{}", err), "Invalid OTP");
    }

    #[test]
    fn recent_daily_counts_keep_latest_days_in_order() {
        let counts: DailySmsCounts = serde_json::from_value(json!({
            "2025-01-03": { "sent": 3, "failed": 1, "total": 4 },
            "2025-01-01": { "sent": 1 },
            "2025-01-02": { "total": 2 }
        }))
        .unwrap();
        let recent = counts.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].0, "2025-01-02");
        assert_eq!(recent[1].0, "2025-01-03");
        assert_eq!(recent[1].1.failed, 1);
        assert_eq!(counts.recent(14).len(), 3);
    }

    #[test]
    fn debug_output_redacts_passwords() {
        let request = LoginRequest {
            email: "ada@example.com".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
