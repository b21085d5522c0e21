use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use colosseum_core::{TeamId, UserId};
use colosseum_events::{DomainEvent, HandlerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: UserId,
    /// Event type that produced the notification.
    pub kind: String,
    pub message: String,
    pub source_event_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    inboxes: HashMap<UserId, Vec<Notification>>,
    /// Team rosters, rebuilt from team events so tournament entries can fan out.
    rosters: HashMap<TeamId, Vec<UserId>>,
}

impl State {
    fn push(&mut self, user_id: UserId, event: &DomainEvent, message: String) {
        self.inboxes.entry(user_id).or_default().push(Notification {
            id: Uuid::now_v7(),
            user_id,
            kind: event.event_type().to_string(),
            message,
            source_event_id: event.event_id(),
            created_at: Utc::now(),
        });
    }

    fn join(&mut self, team_id: TeamId, user_id: UserId) {
        let roster = self.rosters.entry(team_id).or_default();
        if !roster.contains(&user_id) {
            roster.push(user_id);
        }
    }
}

#[derive(Debug, Default)]
pub struct NotificationCenter {
    state: Mutex<State>,
}

impl NotificationCenter {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Newest last.
    pub fn inbox(&self, user_id: UserId) -> Vec<Notification> {
        self.lock().inboxes.get(&user_id).cloned().unwrap_or_default()
    }

    pub fn on_user_registered(&self, event: &DomainEvent) -> HandlerResult {
        let user_id: UserId = event.payload_field("userId")?;
        let username: String = event.payload_field("username")?;
        self.lock().push(user_id, event, format!("Welcome to Colosseum, {username}!"));
        Ok(())
    }

    pub fn on_team_created(&self, event: &DomainEvent) -> HandlerResult {
        let team_id: TeamId = event.payload_field("teamId")?;
        let owner_id: UserId = event.payload_field("ownerId")?;
        self.lock().join(team_id, owner_id);
        Ok(())
    }

    pub fn on_member_joined(&self, event: &DomainEvent) -> HandlerResult {
        let team_id: TeamId = event.payload_field("teamId")?;
        let user_id: UserId = event.payload_field("userId")?;
        let team_name = event.payload_str("teamName").unwrap_or("a team").to_string();

        let mut state = self.lock();
        state.join(team_id, user_id);
        state.push(user_id, event, format!("You joined {team_name}."));
        Ok(())
    }

    pub fn on_message_sent(&self, event: &DomainEvent) -> HandlerResult {
        let recipients: Vec<UserId> = event.payload_field("recipientIds")?;
        let sender_id: UserId = event.payload_field("senderId")?;

        let mut state = self.lock();
        for recipient in recipients {
            state.push(recipient, event, format!("New message from {sender_id}."));
        }
        Ok(())
    }

    pub fn on_tournament_entry(&self, event: &DomainEvent) -> HandlerResult {
        let team_id: TeamId = event.payload_field("teamId")?;
        let tournament_id: String = event.payload_field("tournamentId")?;

        let mut state = self.lock();
        let members = state.rosters.get(&team_id).cloned().unwrap_or_default();
        if members.is_empty() {
            tracing::debug!(team_id = %team_id, "tournament entry for team with no known members");
        }
        for member in members {
            state.push(member, event, format!("Your team entered tournament {tournament_id}."));
        }
        Ok(())
    }
}
