//! Per-user conversation sessions
//!
//! Thread-safe session storage using DashMap

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tracing::info;

/// Where a user is in the menu flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Welcome,
    MainMenu,
    TranslationMenu,
    TranslationInput,
    QaInput,
    LocationInput,
    WeatherInput,
}

/// Key under which the chosen translation direction is kept
pub const DIRECTION_KEY: &str = "direction";

/// A single user's conversation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub state: ConversationState,
    pub data: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            state: ConversationState::Welcome,
            data: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Session {
    /// Move to `state` and bump the update time
    pub fn transition(&mut self, state: ConversationState) {
        self.state = state;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Storage for sessions keyed by phone number
pub trait SessionStore: Send + Sync {
    /// Existing session, or a fresh `Welcome` session which is stored
    fn get_or_create(&self, phone: &str) -> Session;

    fn save(&self, phone: &str, session: Session);

    /// Replace the session with a fresh one and return it
    fn reset(&self, phone: &str) -> Session;

    fn remove(&self, phone: &str) -> Option<Session>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory session store; sessions are lost on restart
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop sessions not updated within `max_idle`. Returns how many went.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let now = Utc::now();

        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| now - entry.value().updated_at > max_idle)
            .map(|entry| entry.key().clone())
            .collect();

        for phone in &expired {
            self.sessions.remove(phone);
            info!("Cleaned up idle session for {}", phone);
        }
        expired.len()
    }

    /// Periodically prune sessions idle for longer than `max_idle`
    pub fn start_cleanup_task(self: Arc<Self>, max_idle: Duration) -> tokio::task::JoinHandle<()> {
        let period = (max_idle / 2).clamp(Duration::from_secs(1), Duration::from_secs(300));
        tokio::spawn(async move {
            let mut interval = interval(period);
            loop {
                interval.tick().await;
                self.prune_idle(max_idle);
            }
        })
    }
}

impl SessionStore for InMemorySessionStore {
    fn get_or_create(&self, phone: &str) -> Session {
        self.sessions.entry(phone.to_string()).or_default().clone()
    }

    fn save(&self, phone: &str, session: Session) {
        self.sessions.insert(phone.to_string(), session);
    }

    fn reset(&self, phone: &str) -> Session {
        let session = Session::default();
        self.sessions.insert(phone.to_string(), session.clone());
        session
    }

    fn remove(&self, phone: &str) -> Option<Session> {
        self.sessions.remove(phone).map(|(_, s)| s)
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}
