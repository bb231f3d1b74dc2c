//! Row types for the `polls` and `votes` tables.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub type PollId = i64;

/// A poll as stored by the backend. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    /// Display order and vote-key order.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub options: Vec<String>,
    #[serde(
        rename = "createdAt",
        default,
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `polls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `votes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVote {
    pub poll_id: PollId,
    pub option_value: String,
    pub voter_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One row of the grouped `count()` over `votes`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoteCount {
    pub option_value: String,
    pub count: u64,
}

/// Read-only projection of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Local part of the email, or "User" when unknown.
    pub fn display_name(&self) -> &str {
        self.email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("User")
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339 timestamps as well as zone-less `timestamp` columns
/// (read as UTC). Unparseable values become `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_poll_parses_backend_row() {
        let json = r#"{"id":7,"question":"Tabs or spaces?","options":["Tabs","Spaces"],"createdAt":"2025-05-10T12:30:00.123+00:00"}"#;
        let poll: Poll = serde_json::from_str(json).unwrap();
        assert_eq!(poll.id, 7);
        assert_eq!(poll.options, vec!["Tabs", "Spaces"]);
        let created = poll.created_at.unwrap();
        assert_eq!((created.year(), created.hour()), (2025, 12));
    }

    #[test]
    fn test_poll_tolerates_nulls_and_naive_timestamps() {
        let json = r#"{"id":1,"question":"q","options":null,"createdAt":"2025-05-10T08:00:00"}"#;
        let poll: Poll = serde_json::from_str(json).unwrap();
        assert!(poll.options.is_empty());
        assert_eq!(poll.created_at.unwrap().hour(), 8);

        let json = r#"{"id":2,"question":"q","options":["a"],"createdAt":null}"#;
        let poll: Poll = serde_json::from_str(json).unwrap();
        assert!(poll.created_at.is_none());
    }

    #[test]
    fn test_new_poll_uses_camel_case_timestamp() {
        let poll = NewPoll {
            question: "q".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&poll).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_display_name() {
        let mut user = UserProfile {
            id: Uuid::nil(),
            email: Some("ada@example.com".to_string()),
        };
        assert_eq!(user.display_name(), "ada");
        user.email = None;
        assert_eq!(user.display_name(), "User");
        user.email = Some("@example.com".to_string());
        assert_eq!(user.display_name(), "User");
    }
}
