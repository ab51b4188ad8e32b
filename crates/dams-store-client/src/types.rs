//! Types for the preference store API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-dam criterion scores: dam name → scores indexed by criterion position.
pub type Scores = BTreeMap<String, Vec<f64>>;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the store (scheme + host, no trailing path)
    pub base_url: String,
    /// Path of the session-verify endpoint
    pub verify_path: String,
    /// Path of the preference collection
    pub preference_path: String,
    /// Header carrying the CSRF token on every request
    pub csrf_header: String,
    /// Optional request timeout in seconds. Unset means the transport decides.
    pub timeout_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            verify_path: "/api/verify_user_session/".to_string(),
            preference_path: "/api/preference/".to_string(),
            csrf_header: "X-CSRFToken".to_string(),
            timeout_secs: None,
        }
    }
}

/// Group filter for preference queries.
///
/// The store distinguishes "no group parameter" from "group is null":
/// the former matches any group, the latter only group-less records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFilter {
    /// No group parameter
    Any,
    /// `group=null`, individual records only
    Individual,
    /// Records saved under this group
    Group(i64),
}

/// Filter for listing preference records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferenceQuery {
    pub user: Option<i64>,
    pub group: GroupFilter,
}

impl PreferenceQuery {
    /// A user's individual (group-less) record
    pub fn individual(user: i64) -> Self {
        Self {
            user: Some(user),
            group: GroupFilter::Individual,
        }
    }

    /// A user's record within a group
    pub fn member(user: i64, group: i64) -> Self {
        Self {
            user: Some(user),
            group: GroupFilter::Group(group),
        }
    }

    /// Every member's record within a group
    pub fn group(group: i64) -> Self {
        Self {
            user: None,
            group: GroupFilter::Group(group),
        }
    }

    /// Encode as a URL query string (without the leading `?`)
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(user) = self.user {
            params.push(format!("user={}", user));
        }
        match self.group {
            GroupFilter::Any => {}
            GroupFilter::Individual => params.push("group=null".to_string()),
            GroupFilter::Group(id) => params.push(format!("group={}", id)),
        }
        params.join("&")
    }
}

/// A persisted preference record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    /// Store-assigned id
    pub id: i64,
    /// Owning user id
    pub user: i64,
    /// Group id, `None` for individual records
    #[serde(default)]
    pub group: Option<i64>,
    #[serde(default)]
    pub scores: Scores,
}

/// Body of a create or update request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceWrite {
    #[serde(rename = "session-id")]
    pub session_id: String,
    pub user: i64,
    /// Serialized as `null` for individual records
    pub group: Option<i64>,
    pub scores: Scores,
}

/// Credentials posted to the session-verify endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub session_id: String,
    pub user: i64,
    pub group: Option<i64>,
}

impl SessionCredentials {
    /// Form fields in the order the verify endpoint reads them.
    /// A missing group is sent as an empty value.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("session-id", self.session_id.clone()),
            ("user", self.user.to_string()),
            (
                "group",
                self.group.map(|g| g.to_string()).unwrap_or_default(),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_strings() {
        assert_eq!(PreferenceQuery::individual(3).to_query_string(), "user=3&group=null");
        assert_eq!(PreferenceQuery::member(3, 9).to_query_string(), "user=3&group=9");
        assert_eq!(PreferenceQuery::group(9).to_query_string(), "group=9");

        let any = PreferenceQuery {
            user: None,
            group: GroupFilter::Any,
        };
        assert_eq!(any.to_query_string(), "");
    }

    #[test]
    fn test_write_body_shape() {
        let mut scores = Scores::new();
        scores.insert("D1".into(), vec![1.0, 2.5]);

        let body = PreferenceWrite {
            session_id: "sess".into(),
            user: 4,
            group: None,
            scores,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["session-id"], "sess");
        assert!(json["group"].is_null());
        assert_eq!(json["scores"]["D1"][1], 2.5);
    }

    #[test]
    fn test_record_without_group_or_scores() {
        let record: PreferenceRecord =
            serde_json::from_str(r#"{"id": 7, "user": 2, "group": null}"#).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.group, None);
        assert!(record.scores.is_empty());
    }

    #[test]
    fn test_empty_group_form_field() {
        let creds = SessionCredentials {
            session_id: "s".into(),
            user: 1,
            group: None,
        };
        let fields = creds.form_fields();
        assert_eq!(fields[2], ("group", String::new()));
    }
}
