// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use std::collections::{HashMap, VecDeque};
use subtle::ConstantTimeEq;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

pub const SESSION_COOKIE_NAME: &str = "quire_session";
const MAX_SESSIONS: usize = 1000;

/// The handle a handler gets back for a live admin session: the cookie
/// value and the CSRF token bound to it.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: String,
    pub csrf_token: String,
}

/// In-memory admin session store backed by a dedicated worker thread.
/// Handlers talk to the worker over a channel, so no lock is held across
/// await points.
#[derive(Clone)]
pub struct SessionStore {
    sender: mpsc::Sender<SessionCommand>,
}

enum SessionCommand {
    Create {
        reply: mpsc::Sender<SessionHandle>,
    },
    Validate {
        session_id: String,
        reply: mpsc::Sender<Option<SessionHandle>>,
    },
    Destroy {
        session_id: String,
    },
    #[cfg(test)]
    SnapshotCount {
        reply: mpsc::Sender<usize>,
    },
}

struct SessionRecord {
    csrf_token: String,
    expires_at: Instant,
}

impl SessionStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self::with_ttl(Duration::from_secs(ttl_seconds))
    }

    fn with_ttl(ttl: Duration) -> Self {
        SessionStore {
            sender: start_session_worker(ttl),
        }
    }

    /// Creates a fresh session with its own CSRF token.
    pub fn create(&self) -> SessionHandle {
        self.request(
            |reply| SessionCommand::Create { reply },
            SessionHandle {
                session_id: String::new(),
                csrf_token: String::new(),
            },
        )
    }

    /// Looks up a session by cookie value. A hit renews the TTL and returns
    /// the handle; a miss or an expired session returns None.
    pub fn validate(&self, session_id: &str) -> Option<SessionHandle> {
        self.request(
            |reply| SessionCommand::Validate {
                session_id: session_id.to_string(),
                reply,
            },
            None,
        )
    }

    /// Removes a session (logout).
    pub fn destroy(&self, session_id: &str) {
        if self
            .sender
            .send(SessionCommand::Destroy {
                session_id: session_id.to_string(),
            })
            .is_err()
        {
            log::error!("🚨 CRITICAL: SessionStore channel closed");
        }
    }

    #[cfg(test)]
    fn snapshot_count(&self) -> usize {
        self.request(|reply| SessionCommand::SnapshotCount { reply }, 0)
    }

    fn request<T>(&self, build: impl FnOnce(mpsc::Sender<T>) -> SessionCommand, fallback: T) -> T {
        let (reply, receive) = mpsc::channel();
        if self.sender.send(build(reply)).is_err() {
            log::error!("🚨 CRITICAL: SessionStore channel closed");
            return fallback;
        }
        receive.recv().unwrap_or(fallback)
    }
}

fn start_session_worker(ttl: Duration) -> mpsc::Sender<SessionCommand> {
    let (sender, receiver) = mpsc::channel();
    let thread = thread::Builder::new().name("session-store".to_string());
    if let Err(err) = thread.spawn(move || run_session_worker(receiver, ttl)) {
        log::error!("SessionStore worker failed to start: {}", err);
    }
    sender
}

fn run_session_worker(receiver: mpsc::Receiver<SessionCommand>, ttl: Duration) {
    let mut sessions: HashMap<String, SessionRecord> = HashMap::new();
    let mut session_order: VecDeque<String> = VecDeque::new();
    while let Ok(command) = receiver.recv() {
        let now = Instant::now();
        cleanup_expired(&mut sessions, &mut session_order, now);
        match command {
            SessionCommand::Create { reply } => {
                let handle = SessionHandle {
                    session_id: generate_session_id(),
                    csrf_token: generate_csrf_token(),
                };
                sessions.insert(
                    handle.session_id.clone(),
                    SessionRecord {
                        csrf_token: handle.csrf_token.clone(),
                        expires_at: now + ttl,
                    },
                );
                session_order.push_back(handle.session_id.clone());
                prune_overflow(&mut sessions, &mut session_order);
                log::debug!("Created admin session {}", handle.session_id);
                let _ = reply.send(handle);
            }
            SessionCommand::Validate { session_id, reply } => {
                let handle = sessions.get_mut(&session_id).map(|record| {
                    record.expires_at = now + ttl;
                    SessionHandle {
                        session_id: session_id.clone(),
                        csrf_token: record.csrf_token.clone(),
                    }
                });
                let _ = reply.send(handle);
            }
            SessionCommand::Destroy { session_id } => {
                sessions.remove(&session_id);
                session_order.retain(|id| id != &session_id);
                log::debug!("Destroyed admin session {}", session_id);
            }
            #[cfg(test)]
            SessionCommand::SnapshotCount { reply } => {
                let _ = reply.send(sessions.len());
            }
        }
    }
}

fn cleanup_expired(
    sessions: &mut HashMap<String, SessionRecord>,
    session_order: &mut VecDeque<String>,
    now: Instant,
) {
    sessions.retain(|_, record| record.expires_at > now);
    session_order.retain(|id| sessions.contains_key(id));
}

fn prune_overflow(
    sessions: &mut HashMap<String, SessionRecord>,
    session_order: &mut VecDeque<String>,
) {
    while sessions.len() > MAX_SESSIONS {
        if let Some(oldest) = session_order.pop_front() {
            sessions.remove(&oldest);
        } else {
            break;
        }
    }
}

/// Compares a submitted token against the session's token in constant time.
pub fn token_matches(submitted: &str, expected: &str) -> bool {
    submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; 18];
    OsRng.fill_bytes(&mut bytes);
    format!("qsn_{}", URL_SAFE_NO_PAD.encode(bytes))
}

fn generate_csrf_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
