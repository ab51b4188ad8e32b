//! Host ↔ guest messages
//!
//! Commands are the guest's entry points, one variant per operation, carried
//! as `{"op": "...", "payload": ...}`. Events flow back to the host; field
//! keys for score updates are only encoded here, at the boundary.

use crate::aggregate::ScoreUpdate;
use crate::context::{AppMode, GroupStatus, IdentityBundle};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Entry points exposed by the guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "payload", rename_all = "camelCase")]
pub enum GuestCommand {
    /// Positional identity transfer from the host
    SetContext(IdentityBundle),
    SetAppMode(AppMode),
    ValidateSession,
    /// Raw score JSON as produced by the UI
    SaveScores(String),
    LoadScores,
    BindDamNames(Vec<String>),
    BindCritNames(Vec<String>),
    NotifyNoFileSelected,
    NotifyInvalidFile(String),
    CheckUserHasGroup,
}

impl GuestCommand {
    /// Operation name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            GuestCommand::SetContext(_) => "setContext",
            GuestCommand::SetAppMode(_) => "setAppMode",
            GuestCommand::ValidateSession => "validateSession",
            GuestCommand::SaveScores(_) => "saveScores",
            GuestCommand::LoadScores => "loadScores",
            GuestCommand::BindDamNames(_) => "bindDamNames",
            GuestCommand::BindCritNames(_) => "bindCritNames",
            GuestCommand::NotifyNoFileSelected => "notifyNoFileSelected",
            GuestCommand::NotifyInvalidFile(_) => "notifyInvalidFile",
            GuestCommand::CheckUserHasGroup => "checkUserHasGroup",
        }
    }
}

/// How a notice should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    /// Non-blocking; local interaction continues
    Warning,
    /// Must be acknowledged before continuing
    Blocking,
}

/// User-visible message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn blocking(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Blocking,
            message: message.into(),
        }
    }
}

/// Guest → host events
#[derive(Debug, Clone, PartialEq)]
pub enum GuestEvent {
    /// Guest is listening for commands and wants its context
    Ready,
    ScoreUpdate(ScoreUpdate),
    /// Emitted once after all updates of a successful load
    ScoresLoaded,
    Notice(Notice),
    GroupCheck(GroupStatus),
}

impl GuestEvent {
    /// Encode for the host message channel
    pub fn to_wire(&self) -> Value {
        match self {
            GuestEvent::Ready => json!({ "type": "setUpFrame" }),
            GuestEvent::ScoreUpdate(update) => json!({
                "type": "scoreUpdate",
                "fieldKey": update.field_key(),
                "damIndex": update.dam_index,
                "criterionIndex": update.criterion_index,
                "value": update.value,
            }),
            GuestEvent::ScoresLoaded => json!({ "type": "scoresLoaded" }),
            GuestEvent::Notice(notice) => json!({
                "type": "notice",
                "severity": notice.severity,
                "message": notice.message,
            }),
            GuestEvent::GroupCheck(status) => json!({
                "type": "userHasGroup",
                "value": status.to_wire(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_context() {
        let cmd: GuestCommand = serde_json::from_str(
            r#"{"op": "setContext", "payload": ["alice", 12, "Penobscot", 5, "csrf", "sess"]}"#,
        )
        .unwrap();

        let GuestCommand::SetContext(bundle) = cmd else {
            panic!("expected setContext");
        };
        assert_eq!(bundle.group_id, Some(5));
        assert_eq!(bundle.session_token, "sess");
    }

    #[test]
    fn test_parse_unit_and_payload_commands() {
        let cmd: GuestCommand = serde_json::from_str(r#"{"op": "validateSession"}"#).unwrap();
        assert_eq!(cmd, GuestCommand::ValidateSession);

        let cmd: GuestCommand =
            serde_json::from_str(r#"{"op": "setAppMode", "payload": "group"}"#).unwrap();
        assert_eq!(cmd, GuestCommand::SetAppMode(AppMode::Group));

        let cmd: GuestCommand =
            serde_json::from_str(r#"{"op": "bindCritNames", "payload": ["Cost", "Habitat"]}"#).unwrap();
        assert_eq!(cmd.name(), "bindCritNames");
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<GuestCommand>(r#"{"op": "dropTables"}"#).is_err());
    }

    #[test]
    fn test_score_update_wire_key() {
        let event = GuestEvent::ScoreUpdate(ScoreUpdate {
            dam_index: 1,
            criterion_index: 0,
            dam_name: "D2".into(),
            criterion_name: "Cost".into(),
            value: 2.5,
        });
        let wire = event.to_wire();
        assert_eq!(wire["fieldKey"], "Cost2");
        assert_eq!(wire["value"], 2.5);
    }

    #[test]
    fn test_group_check_wire() {
        assert_eq!(GuestEvent::GroupCheck(GroupStatus::Assigned(5)).to_wire()["value"], "5");
        assert_eq!(GuestEvent::GroupCheck(GroupStatus::Unassigned).to_wire()["value"], "false");
    }

    #[test]
    fn test_notice_wire() {
        let wire = GuestEvent::Notice(Notice::blocking("No file selected")).to_wire();
        assert_eq!(wire["severity"], "blocking");
    }
}
