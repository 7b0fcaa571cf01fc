use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use auth::{Access, Role};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Account;
use crate::error::AppError;
use crate::result::Result;
use crate::{metrics, utils};

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    last_active: Instant,
}

impl Session {
    fn new(token: String, username: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            token,
            username,
            role,
            created_at: now,
            last_active_at: now,
            last_active: Instant::now(),
        }
    }

    fn expired(&self, idle_timeout: Duration) -> bool {
        self.last_active.elapsed() > idle_timeout
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
        self.last_active_at = Utc::now();
    }

    pub fn access(&self) -> Access {
        self.role.into()
    }
}

impl From<Session> for api::response::UserInfo {
    fn from(s: Session) -> Self {
        Self {
            username: s.username,
            role: s.role.to_string(),
            login_at: utils::date_time(s.created_at),
            last_active_at: utils::date_time(s.last_active_at),
        }
    }
}

#[derive(Debug, Clone)]
struct User {
    password: String,
    role: Role,
}

/// Operator accounts and their login sessions.
///
/// Tokens are random, a session dies on logout or once it stayed idle for
/// longer than `idle_timeout`. Expired sessions are dropped lazily when they
/// are presented again and by [`SessionManager::sweep`].
#[derive(Clone)]
pub struct SessionManager {
    users: Arc<RwLock<HashMap<String, User>>>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(accounts: Vec<Account>, idle_timeout: Duration) -> Self {
        let users = accounts
            .into_iter()
            .map(|account| {
                (
                    account.username,
                    User {
                        password: auth::digest(&account.password),
                        role: account.role,
                    },
                )
            })
            .collect();
        Self {
            users: Arc::new(RwLock::new(users)),
            sessions: Default::default(),
            idle_timeout,
        }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::bad_request("missing credentials"));
        }

        let role = {
            let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
            match users.get(username) {
                Some(user) if user.password == auth::digest(password) => user.role,
                _ => {
                    warn!(username, "login with wrong credentials");
                    return Err(AppError::auth("wrong credentials"));
                }
            }
        };

        let token = uuid::Uuid::new_v4().simple().to_string();
        let session = Session::new(token.clone(), username.to_string(), role);
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), session);
        metrics::SESSION.inc();
        info!(username, %role, "login");
        Ok(token)
    }

    pub fn logout(&self, token: &str) -> Result<()> {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
        match session {
            Some(session) => {
                metrics::SESSION.dec();
                info!(username = %session.username, "logout");
                Ok(())
            }
            None => Err(AppError::not_found("session not found")),
        }
    }

    /// Returns the live session behind `token` and refreshes its activity time
    pub fn validate(&self, token: &str) -> Result<Session> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let expired = match sessions.get_mut(token) {
            Some(session) if !session.expired(self.idle_timeout) => {
                session.touch();
                return Ok(session.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(token);
            metrics::SESSION.dec();
            debug!("drop expired session on validate");
            Err(AppError::auth("session expired"))
        } else {
            Err(AppError::auth("invalid token"))
        }
    }

    /// Like [`SessionManager::validate`], also checks the role allows the operation
    pub fn authorize(&self, token: &str, permitted: fn(Access) -> bool) -> Result<Session> {
        let session = self.validate(token)?;
        if !permitted(session.access()) {
            return Err(AppError::auth(format!(
                "user {} ({}) is not allowed to do this",
                session.username,
                session.access()
            )));
        }
        Ok(session)
    }

    pub fn user_info(&self, token: &str) -> Result<api::response::UserInfo> {
        Ok(self.validate(token)?.into())
    }

    /// Other sessions of the same user are revoked after the change
    pub fn modify_password(&self, token: &str, old: &str, new: &str) -> Result<()> {
        let session = self.validate(token)?;
        if new.is_empty() {
            return Err(AppError::bad_request("new password cannot be empty"));
        }

        {
            let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
            let user = users
                .get_mut(&session.username)
                .ok_or_else(|| AppError::auth("user not found"))?;
            if user.password != auth::digest(old) {
                return Err(AppError::auth("old password mismatch"));
            }
            user.password = auth::digest(new);
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|t, s| t == token || s.username != session.username);
        let revoked = before - sessions.len();
        metrics::SESSION.sub(revoked as i64);
        info!(username = %session.username, revoked, "password modified");
        Ok(())
    }

    /// Drops every idle session, returns how many were dropped
    pub fn sweep(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, s| !s.expired(self.idle_timeout));
        let purged = before - sessions.len();
        if purged > 0 {
            metrics::SESSION.sub(purged as i64);
            debug!(purged, "sweep idle sessions");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn shutdown(&self) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        metrics::SESSION.sub(sessions.len() as i64);
        sessions.clear();
    }
}
