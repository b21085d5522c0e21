use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use colosseum_core::{ChannelId, DomainError, DomainResult, MessageId, TeamId, UserId};
use colosseum_events::{DomainEvent, EventBus, HandlerResult};

pub const MESSAGE_SENT: &str = "chat.message.sent";

const MESSAGE_MAX_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub team_id: TeamId,
    /// Filled in from `team.team.created`; empty if a join was seen first.
    pub name: String,
    pub members: Vec<UserId>,
}

impl Channel {
    fn add_member(&mut self, user_id: UserId) -> bool {
        if self.members.contains(&user_id) {
            return false;
        }
        self.members.push(user_id);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub sender_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    channels: HashMap<ChannelId, Channel>,
    by_team: HashMap<TeamId, ChannelId>,
    messages: HashMap<ChannelId, Vec<Message>>,
}

impl State {
    fn channel_for_team(&mut self, team_id: TeamId) -> &mut Channel {
        let id = *self.by_team.entry(team_id).or_insert_with(ChannelId::new);
        self.channels.entry(id).or_insert_with(|| {
            tracing::debug!(team_id = %team_id, channel_id = %id, "channel opened");
            Channel {
                id,
                team_id,
                name: String::new(),
                members: Vec::new(),
            }
        })
    }
}

#[derive(Debug)]
pub struct ChatService {
    bus: Arc<EventBus>,
    state: Mutex<State>,
}

impl ChatService {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_team_created(&self, event: &DomainEvent) -> HandlerResult {
        let team_id: TeamId = event.payload_field("teamId")?;
        let name: String = event.payload_field("name")?;
        let owner_id: UserId = event.payload_field("ownerId")?;

        let mut state = self.lock();
        let channel = state.channel_for_team(team_id);
        channel.name = name;
        channel.add_member(owner_id);
        Ok(())
    }

    pub fn on_member_joined(&self, event: &DomainEvent) -> HandlerResult {
        let team_id: TeamId = event.payload_field("teamId")?;
        let user_id: UserId = event.payload_field("userId")?;

        let mut state = self.lock();
        if state.channel_for_team(team_id).add_member(user_id) {
            tracing::debug!(team_id = %team_id, user_id = %user_id, "channel member added");
        }
        Ok(())
    }

    pub fn channel_for_team(&self, team_id: TeamId) -> DomainResult<Channel> {
        let state = self.lock();
        state
            .by_team
            .get(&team_id)
            .and_then(|id| state.channels.get(id))
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("channel for team {team_id}")))
    }

    pub fn send_message(&self, channel_id: ChannelId, sender_id: UserId, body: &str) -> DomainResult<Message> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DomainError::validation("message body must not be empty"));
        }
        if body.chars().count() > MESSAGE_MAX_CHARS {
            return Err(DomainError::validation(format!(
                "message body exceeds {MESSAGE_MAX_CHARS} characters"
            )));
        }

        let (message, team_id, recipients) = {
            let mut state = self.lock();
            let channel = state
                .channels
                .get(&channel_id)
                .ok_or_else(|| DomainError::not_found(format!("channel {channel_id}")))?;
            if !channel.members.contains(&sender_id) {
                return Err(DomainError::forbidden(format!(
                    "user {sender_id} is not a member of channel {channel_id}"
                )));
            }
            let team_id = channel.team_id;
            let recipients: Vec<UserId> = channel
                .members
                .iter()
                .copied()
                .filter(|&m| m != sender_id)
                .collect();

            let message = Message {
                id: MessageId::new(),
                channel_id,
                sender_id,
                body: body.to_string(),
                sent_at: Utc::now(),
            };
            state.messages.entry(channel_id).or_default().push(message.clone());
            (message, team_id, recipients)
        };

        tracing::info!(
            channel_id = %channel_id,
            message_id = %message.id,
            recipients = recipients.len(),
            "message sent"
        );
        self.bus.publish(
            DomainEvent::builder(MESSAGE_SENT, "channel", channel_id.to_string())
                .field("channelId", channel_id.to_string())
                .field("messageId", message.id.to_string())
                .field("senderId", sender_id.to_string())
                .field("teamId", team_id.to_string())
                .field(
                    "recipientIds",
                    recipients.iter().map(ToString::to_string).collect::<Vec<_>>(),
                )
                .build(),
        );

        Ok(message)
    }

    /// Messages in send order; `limit` keeps the most recent ones.
    pub fn messages(&self, channel_id: ChannelId, limit: Option<usize>) -> DomainResult<Vec<Message>> {
        let state = self.lock();
        if !state.channels.contains_key(&channel_id) {
            return Err(DomainError::not_found(format!("channel {channel_id}")));
        }
        let all = state.messages.get(&channel_id).map(Vec::as_slice).unwrap_or_default();
        let skip = limit.map_or(0, |n| all.len().saturating_sub(n));
        Ok(all[skip..].to_vec())
    }
}
