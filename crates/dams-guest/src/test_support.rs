//! In-memory store used by unit tests

use crate::context::IdentityBundle;
use crate::store::{PreferenceStore, StoreConnector};
use async_trait::async_trait;
use dams_store_client::{
    GroupFilter, PreferenceQuery, PreferenceRecord, PreferenceWrite, Scores, SessionCredentials,
    StoreError,
};
use std::sync::{Arc, Mutex};

pub(crate) fn identity(group_id: Option<i64>) -> IdentityBundle {
    IdentityBundle {
        username: "alice".into(),
        user_id: 12,
        group_name: group_id.map(|_| "Penobscot".to_string()),
        group_id,
        csrf_token: "csrf".into(),
        session_token: "sess".into(),
    }
}

pub(crate) fn record(id: i64, user: i64, group: Option<i64>, entries: &[(&str, &[f64])]) -> PreferenceRecord {
    let mut scores = Scores::new();
    for (dam, values) in entries {
        scores.insert(dam.to_string(), values.to_vec());
    }
    PreferenceRecord {
        id,
        user,
        group,
        scores,
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Calls {
    pub verify: usize,
    pub list: Vec<PreferenceQuery>,
    pub created: Vec<PreferenceWrite>,
    pub updated: Vec<(i64, PreferenceWrite)>,
}

impl Calls {
    pub fn writes(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

#[derive(Default)]
struct State {
    records: Vec<PreferenceRecord>,
    reject_sessions: bool,
    fail_lists: bool,
    fail_writes: bool,
    calls: Calls,
}

/// Store fake that filters like the real preference endpoint and records every call
#[derive(Default)]
pub(crate) struct FakeStore {
    state: Mutex<State>,
}

fn unavailable() -> StoreError {
    StoreError::Server {
        status: 503,
        message: "store unavailable".into(),
    }
}

impl FakeStore {
    fn with_state(state: State) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with_records(records: Vec<PreferenceRecord>) -> Self {
        Self::with_state(State {
            records,
            ..Default::default()
        })
    }

    pub fn rejecting_sessions() -> Self {
        Self::with_state(State {
            reject_sessions: true,
            ..Default::default()
        })
    }

    pub fn failing_lists() -> Self {
        Self::with_state(State {
            fail_lists: true,
            ..Default::default()
        })
    }

    pub fn failing_writes() -> Self {
        Self::with_state(State {
            fail_writes: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn records(&self) -> Vec<PreferenceRecord> {
        self.state.lock().unwrap().records.clone()
    }
}

fn matches(query: &PreferenceQuery, record: &PreferenceRecord) -> bool {
    let user_ok = query.user.map_or(true, |u| u == record.user);
    let group_ok = match query.group {
        GroupFilter::Any => true,
        GroupFilter::Individual => record.group.is_none(),
        GroupFilter::Group(g) => record.group == Some(g),
    };
    user_ok && group_ok
}

#[async_trait]
impl PreferenceStore for FakeStore {
    async fn verify_session(&self, _credentials: &SessionCredentials) -> dams_store_client::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.verify += 1;
        if state.reject_sessions {
            return Err(StoreError::Server {
                status: 403,
                message: "invalid session".into(),
            });
        }
        Ok(())
    }

    async fn list_preferences(
        &self,
        query: &PreferenceQuery,
    ) -> dams_store_client::Result<Vec<PreferenceRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.list.push(*query);
        if state.fail_lists {
            return Err(unavailable());
        }
        Ok(state.records.iter().filter(|r| matches(query, r)).cloned().collect())
    }

    async fn create_preference(&self, input: &PreferenceWrite) -> dams_store_client::Result<PreferenceRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.created.push(input.clone());
        if state.fail_writes {
            return Err(unavailable());
        }
        let id = state.records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let created = PreferenceRecord {
            id,
            user: input.user,
            group: input.group,
            scores: input.scores.clone(),
        };
        state.records.push(created.clone());
        Ok(created)
    }

    async fn update_preference(
        &self,
        id: i64,
        input: &PreferenceWrite,
    ) -> dams_store_client::Result<PreferenceRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.updated.push((id, input.clone()));
        if state.fail_writes {
            return Err(unavailable());
        }
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.scores = input.scores.clone();
        Ok(record.clone())
    }
}

/// Connector handing out one shared fake and remembering the CSRF tokens it saw
#[derive(Default)]
pub(crate) struct FakeConnector {
    pub store: Arc<FakeStore>,
    pub tokens: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(store: FakeStore) -> Self {
        Self {
            store: Arc::new(store),
            tokens: Mutex::new(Vec::new()),
        }
    }
}

impl StoreConnector for FakeConnector {
    fn connect(&self, csrf_token: &str) -> dams_store_client::Result<Arc<dyn PreferenceStore>> {
        self.tokens.lock().unwrap().push(csrf_token.to_string());
        Ok(self.store.clone())
    }
}
