use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use colosseum_core::{DomainError, DomainResult, UserId};
use colosseum_events::{DomainEvent, EventBus};

pub const USER_REGISTERED: &str = "iam.user.registered";

const USERNAME_MAX_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Directory {
    users: HashMap<UserId, User>,
    /// Lower-cased username -> id; usernames are unique case-insensitively.
    by_username: HashMap<String, UserId>,
}

#[derive(Debug)]
pub struct IdentityService {
    bus: Arc<EventBus>,
    directory: Mutex<Directory>,
}

impl IdentityService {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            directory: Mutex::new(Directory::default()),
        }
    }

    pub fn register(&self, username: &str, display_name: Option<&str>) -> DomainResult<User> {
        let username = username.trim();
        validate_username(username)?;

        let user = {
            let mut dir = self.directory.lock().unwrap_or_else(PoisonError::into_inner);
            let key = username.to_lowercase();
            if dir.by_username.contains_key(&key) {
                return Err(DomainError::conflict(format!("username `{username}` is taken")));
            }

            let user = User {
                id: UserId::new(),
                username: username.to_string(),
                display_name: display_name
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(username)
                    .to_string(),
                registered_at: Utc::now(),
            };
            dir.by_username.insert(key, user.id);
            dir.users.insert(user.id, user.clone());
            user
        };

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        self.bus.publish(
            DomainEvent::builder(USER_REGISTERED, "user", user.id.to_string())
                .field("userId", user.id.to_string())
                .field("username", user.username.clone())
                .field("displayName", user.display_name.clone())
                .build(),
        );

        Ok(user)
    }

    pub fn get(&self, id: UserId) -> DomainResult<User> {
        self.directory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("user {id}")))
    }

    pub fn count(&self) -> usize {
        self.directory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .users
            .len()
    }
}

fn validate_username(username: &str) -> DomainResult<()> {
    let len = username.chars().count();
    if !(3..=USERNAME_MAX_LEN).contains(&len) {
        return Err(DomainError::validation(format!(
            "username must be 3-{USERNAME_MAX_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}
