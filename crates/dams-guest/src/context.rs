//! Guest context: identity, app mode and session trust
//!
//! One `GuestContext` lives inside the [`Guest`](crate::Guest) coordinator.
//! It starts empty, is filled by the handshake, and is passed by reference
//! to the session validator and the preference sync. Every reader treats an
//! unset field as "unknown" rather than assuming the handshake happened.

use crate::error::{GuestError, Result};
use dams_store_client::{PreferenceQuery, SessionCredentials};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity transferred from the host page.
///
/// On the wire this is a fixed-order positional array:
/// `[username, userId, groupName, groupId, csrfToken, sessionToken]`,
/// with `null` for a group the user has not been assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ContextPayload", into = "ContextPayload")]
pub struct IdentityBundle {
    pub username: String,
    pub user_id: i64,
    pub group_name: Option<String>,
    pub group_id: Option<i64>,
    pub csrf_token: String,
    pub session_token: String,
}

#[derive(Serialize, Deserialize)]
struct ContextPayload(String, i64, Option<String>, Option<i64>, String, String);

impl From<ContextPayload> for IdentityBundle {
    fn from(p: ContextPayload) -> Self {
        Self {
            username: p.0,
            user_id: p.1,
            group_name: p.2,
            group_id: p.3,
            csrf_token: p.4,
            session_token: p.5,
        }
    }
}

impl From<IdentityBundle> for ContextPayload {
    fn from(b: IdentityBundle) -> Self {
        ContextPayload(
            b.username,
            b.user_id,
            b.group_name,
            b.group_id,
            b.csrf_token,
            b.session_token,
        )
    }
}

impl IdentityBundle {
    /// Credentials for the session-verify endpoint
    pub fn credentials(&self) -> SessionCredentials {
        SessionCredentials {
            session_id: self.session_token.clone(),
            user: self.user_id,
            group: self.group_id,
        }
    }
}

/// Whether the user belongs to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    /// No identity received yet
    Unknown,
    /// Identity received, no group assigned
    Unassigned,
    Assigned(i64),
}

impl GroupStatus {
    /// Host-facing encoding: the group id as a string, the literal `"false"`
    /// when unassigned, `null` while unknown.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            GroupStatus::Unknown => serde_json::Value::Null,
            GroupStatus::Unassigned => serde_json::Value::String("false".to_string()),
            GroupStatus::Assigned(id) => serde_json::Value::String(id.to_string()),
        }
    }
}

/// Application mode set by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    Individual,
    Group,
}

impl FromStr for AppMode {
    type Err = GuestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "individual" => Ok(Self::Individual),
            "group" => Ok(Self::Group),
            other => Err(GuestError::Config(format!("unknown app mode: {}", other))),
        }
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppMode::Individual => write!(f, "individual"),
            AppMode::Group => write!(f, "group"),
        }
    }
}

/// Outcome of the last session verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionTrust {
    #[default]
    Unverified,
    Trusted,
    Rejected,
}

/// Key a record is saved under: `(user, group-or-none)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveKey {
    pub user: i64,
    pub group: Option<i64>,
}

impl SaveKey {
    /// Query that finds the existing record for this key
    pub fn query(&self) -> PreferenceQuery {
        match self.group {
            Some(group) => PreferenceQuery::member(self.user, group),
            None => PreferenceQuery::individual(self.user),
        }
    }
}

/// Identity, mode and trust held by the guest
#[derive(Debug, Clone, Default)]
pub struct GuestContext {
    identity: Option<IdentityBundle>,
    mode: Option<AppMode>,
    trust: SessionTrust,
}

impl GuestContext {
    /// Empty context, as at guest startup
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the identity from the handshake. A new identity starts unverified.
    pub(crate) fn set_identity(&mut self, identity: IdentityBundle) {
        self.identity = Some(identity);
        self.trust = SessionTrust::Unverified;
    }

    pub(crate) fn set_mode(&mut self, mode: AppMode) {
        self.mode = Some(mode);
    }

    /// Record a verification result, returning the previous trust
    pub(crate) fn set_trust(&mut self, trust: SessionTrust) -> SessionTrust {
        std::mem::replace(&mut self.trust, trust)
    }

    /// The transferred identity, or `HandshakeIncomplete`
    pub fn identity(&self) -> Result<&IdentityBundle> {
        self.identity.as_ref().ok_or(GuestError::HandshakeIncomplete)
    }

    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    pub fn mode(&self) -> Option<AppMode> {
        self.mode
    }

    pub fn trust(&self) -> SessionTrust {
        self.trust
    }

    pub fn is_trusted(&self) -> bool {
        self.trust == SessionTrust::Trusted
    }

    pub fn group_status(&self) -> GroupStatus {
        match &self.identity {
            None => GroupStatus::Unknown,
            Some(identity) => match identity.group_id {
                Some(id) => GroupStatus::Assigned(id),
                None => GroupStatus::Unassigned,
            },
        }
    }

    fn require_mode(&self) -> Result<AppMode> {
        self.mode.ok_or(GuestError::ModeUnset)
    }

    fn require_group(&self) -> Result<i64> {
        self.identity()?.group_id.ok_or(GuestError::NoGroupAssigned)
    }

    /// Key the current user's scores are saved under in the current mode
    pub fn save_key(&self) -> Result<SaveKey> {
        let user = self.identity()?.user_id;
        let group = match self.require_mode()? {
            AppMode::Individual => None,
            AppMode::Group => Some(self.require_group()?),
        };
        Ok(SaveKey { user, group })
    }

    /// Query for loading: the user's own record, or every member's record in group mode
    pub fn load_query(&self) -> Result<PreferenceQuery> {
        let user = self.identity()?.user_id;
        match self.require_mode()? {
            AppMode::Individual => Ok(PreferenceQuery::individual(user)),
            AppMode::Group => Ok(PreferenceQuery::group(self.require_group()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dams_store_client::GroupFilter;

    fn identity(group_id: Option<i64>) -> IdentityBundle {
        IdentityBundle {
            username: "alice".into(),
            user_id: 12,
            group_name: group_id.map(|_| "Penobscot".to_string()),
            group_id,
            csrf_token: "csrf".into(),
            session_token: "sess".into(),
        }
    }

    #[test]
    fn test_empty_context_is_unknown() {
        let ctx = GuestContext::new();
        assert!(matches!(ctx.identity(), Err(GuestError::HandshakeIncomplete)));
        assert_eq!(ctx.group_status(), GroupStatus::Unknown);
        assert!(!ctx.is_trusted());
        assert!(matches!(ctx.save_key(), Err(GuestError::HandshakeIncomplete)));
    }

    #[test]
    fn test_positional_payload() {
        let bundle: IdentityBundle =
            serde_json::from_str(r#"["alice", 12, null, null, "csrf", "sess"]"#).unwrap();
        assert_eq!(bundle, identity(None));

        let json = serde_json::to_value(identity(Some(5))).unwrap();
        assert_eq!(json[2], "Penobscot");
        assert_eq!(json[3], 5);
        assert_eq!(json[5], "sess");
    }

    #[test]
    fn test_absent_and_assigned_group_are_distinct() {
        let mut ctx = GuestContext::new();
        ctx.set_identity(identity(None));
        assert_eq!(ctx.group_status(), GroupStatus::Unassigned);

        ctx.set_identity(identity(Some(5)));
        assert_eq!(ctx.group_status(), GroupStatus::Assigned(5));
    }

    #[test]
    fn test_group_status_wire_encoding() {
        assert_eq!(GroupStatus::Assigned(5).to_wire(), "5");
        assert_eq!(GroupStatus::Unassigned.to_wire(), "false");
        assert!(GroupStatus::Unknown.to_wire().is_null());
    }

    #[test]
    fn test_keys_per_mode() {
        let mut ctx = GuestContext::new();
        ctx.set_identity(identity(Some(5)));
        assert!(matches!(ctx.save_key(), Err(GuestError::ModeUnset)));

        ctx.set_mode(AppMode::Individual);
        assert_eq!(ctx.save_key().unwrap(), SaveKey { user: 12, group: None });
        assert_eq!(ctx.load_query().unwrap().group, GroupFilter::Individual);

        ctx.set_mode(AppMode::Group);
        assert_eq!(ctx.save_key().unwrap(), SaveKey { user: 12, group: Some(5) });
        let query = ctx.load_query().unwrap();
        assert_eq!(query.user, None);
        assert_eq!(query.group, GroupFilter::Group(5));
    }

    #[test]
    fn test_group_mode_without_group() {
        let mut ctx = GuestContext::new();
        ctx.set_identity(identity(None));
        ctx.set_mode(AppMode::Group);
        assert!(matches!(ctx.save_key(), Err(GuestError::NoGroupAssigned)));
        assert!(matches!(ctx.load_query(), Err(GuestError::NoGroupAssigned)));
    }

    #[test]
    fn test_new_identity_resets_trust() {
        let mut ctx = GuestContext::new();
        ctx.set_identity(identity(None));
        ctx.set_trust(SessionTrust::Trusted);
        assert!(ctx.is_trusted());

        ctx.set_identity(identity(None));
        assert_eq!(ctx.trust(), SessionTrust::Unverified);
    }

    #[test]
    fn test_app_mode_parse() {
        assert_eq!("GROUP".parse::<AppMode>().unwrap(), AppMode::Group);
        assert_eq!(" individual ".parse::<AppMode>().unwrap(), AppMode::Individual);
        assert!("team".parse::<AppMode>().is_err());
    }
}
