//! In-memory HTTP sessions for the reference server.

use crate::i18n::SessionStore;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "site_session";

/// Idle time after which a session is forgotten.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 86_400;

/// Most sessions kept at once.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

type SessionData = HashMap<String, String>;

#[derive(Debug, Clone)]
struct StoredSession {
    data: SessionData,
    last_seen: DateTime<Utc>,
}

/// Shared table of all open sessions.
///
/// Only sessions holding data are stored. Entries idle for longer than the
/// TTL are dropped, and once the table is full the least recently seen
/// session makes room for a new one.
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, StoredSession>>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL_SECS, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager forgetting sessions idle for `ttl_secs` and holding at most
    /// `capacity` of them. Out of range values fall back to the defaults.
    pub fn with_limits(ttl_secs: i64, capacity: usize) -> Self {
        let ttl = Duration::try_seconds(ttl_secs)
            .filter(|ttl| *ttl > Duration::zero())
            .unwrap_or_else(|| {
                warn!(
                    "Invalid session TTL of {}s, using {}s",
                    ttl_secs, DEFAULT_SESSION_TTL_SECS
                );
                Duration::seconds(DEFAULT_SESSION_TTL_SECS)
            });

        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Open the session `id`, or start a new one when the id is missing,
    /// unknown or expired.
    pub fn open(&self, id: Option<&str>, now: DateTime<Utc>) -> Session {
        if let Some(id) = id {
            let mut sessions = self.lock();
            let expired = match sessions.get(id) {
                Some(stored) if !self.is_expired(stored, now) => {
                    return Session {
                        id: id.to_string(),
                        data: stored.data.clone(),
                        is_new: false,
                        dirty: false,
                    };
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                debug!("Session {} expired", id);
                sessions.remove(id);
            }
        }

        let id = generate_session_id();
        debug!("Starting session {}", id);
        Session {
            id,
            data: SessionData::new(),
            is_new: true,
            dirty: false,
        }
    }

    /// Store the session and mark it seen at `now`.
    ///
    /// Returns whether the session is held by the manager afterwards. A
    /// session without data is never stored.
    pub fn save(&self, session: &Session, now: DateTime<Utc>) -> bool {
        let mut sessions = self.lock();

        if !session.dirty && !session.is_new {
            return match sessions.get_mut(&session.id) {
                Some(stored) => {
                    stored.last_seen = now;
                    true
                }
                None => false,
            };
        }
        if session.data.is_empty() {
            return false;
        }

        if !sessions.contains_key(&session.id) {
            sessions.retain(|_, stored| !self.is_expired(stored, now));
            if sessions.len() >= self.capacity {
                evict_oldest(&mut sessions);
            }
        }
        sessions.insert(
            session.id.clone(),
            StoredSession {
                data: session.data.clone(),
                last_seen: now,
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, stored: &StoredSession, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(stored.last_seen) > self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredSession>> {
        // Session data stays consistent even if a holder panicked
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn evict_oldest(sessions: &mut HashMap<String, StoredSession>) {
    let oldest = sessions
        .iter()
        .min_by_key(|(_, stored)| stored.last_seen)
        .map(|(id, _)| id.clone());
    if let Some(id) = oldest {
        debug!("Session table full, dropping {}", id);
        sessions.remove(&id);
    }
}

/// One request's copy of its session.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    data: SessionData,
    is_new: bool,
    dirty: bool,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `true` when the client has to be sent the session cookie.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn cookie_header(&self) -> String {
        format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, self.id)
    }
}

impl SessionStore for Session {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        if self.data.get(key) != Some(&value) {
            self.data.insert(key.to_string(), value);
            self.dirty = true;
        }
    }
}

/// 128 random bits, hex encoded.
pub fn generate_session_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Value of cookie `name` in a `Cookie:` request header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
}
