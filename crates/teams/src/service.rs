use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use colosseum_core::{DomainError, DomainResult, TeamId, UserId};
use colosseum_events::{DomainEvent, EventBus, HandlerResult};

pub const TEAM_CREATED: &str = "team.team.created";
pub const MEMBER_JOINED: &str = "team.member.joined";

const TEAM_NAME_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: UserId,
    /// Known once `iam.user.registered` for this user has been seen.
    pub username: Option<String>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub owner_id: UserId,
    pub members: Vec<Member>,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn has_member(&self, user_id: UserId) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }
}

#[derive(Debug, Default)]
struct State {
    teams: HashMap<TeamId, Team>,
    usernames: HashMap<UserId, String>,
}

#[derive(Debug)]
pub struct TeamsService {
    bus: Arc<EventBus>,
    state: Mutex<State>,
}

impl TeamsService {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a username seen on the bus; fills in members that joined first.
    pub fn remember_user(&self, user_id: UserId, username: String) {
        let mut state = self.lock();
        for team in state.teams.values_mut() {
            for member in team.members.iter_mut().filter(|m| m.user_id == user_id) {
                member.username = Some(username.clone());
            }
        }
        state.usernames.insert(user_id, username);
    }

    pub fn on_user_registered(&self, event: &DomainEvent) -> HandlerResult {
        let user_id = event.payload_field("userId")?;
        let username = event.payload_field("username")?;
        self.remember_user(user_id, username);
        Ok(())
    }

    /// Create a team; the owner is its first member.
    pub fn create_team(&self, name: &str, owner_id: UserId) -> DomainResult<Team> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > TEAM_NAME_MAX_LEN {
            return Err(DomainError::validation(format!(
                "team name must be 1-{TEAM_NAME_MAX_LEN} characters"
            )));
        }

        let team = {
            let mut state = self.lock();
            if state.teams.values().any(|t| t.name.eq_ignore_ascii_case(name)) {
                return Err(DomainError::conflict(format!("team `{name}` already exists")));
            }
            let now = Utc::now();
            let team = Team {
                id: TeamId::new(),
                name: name.to_string(),
                owner_id,
                members: vec![Member {
                    user_id: owner_id,
                    username: state.usernames.get(&owner_id).cloned(),
                    joined_at: now,
                }],
                created_at: now,
            };
            state.teams.insert(team.id, team.clone());
            team
        };

        tracing::info!(team_id = %team.id, owner_id = %owner_id, "team created");
        self.bus.publish(
            DomainEvent::builder(TEAM_CREATED, "team", team.id.to_string())
                .field("teamId", team.id.to_string())
                .field("name", team.name.clone())
                .field("ownerId", owner_id.to_string())
                .build(),
        );

        Ok(team)
    }

    pub fn add_member(&self, team_id: TeamId, user_id: UserId) -> DomainResult<Team> {
        let team = {
            let mut state = self.lock();
            let username = state.usernames.get(&user_id).cloned();
            let team = state
                .teams
                .get_mut(&team_id)
                .ok_or_else(|| DomainError::not_found(format!("team {team_id}")))?;
            if team.has_member(user_id) {
                return Err(DomainError::conflict(format!(
                    "user {user_id} is already a member of team {team_id}"
                )));
            }
            team.members.push(Member {
                user_id,
                username,
                joined_at: Utc::now(),
            });
            team.clone()
        };

        tracing::info!(team_id = %team_id, user_id = %user_id, "member joined team");
        self.bus.publish(
            DomainEvent::builder(MEMBER_JOINED, "team", team_id.to_string())
                .field("teamId", team_id.to_string())
                .field("userId", user_id.to_string())
                .field("teamName", team.name.clone())
                .build(),
        );

        Ok(team)
    }

    pub fn get(&self, team_id: TeamId) -> DomainResult<Team> {
        self.lock()
            .teams
            .get(&team_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("team {team_id}")))
    }

    pub fn list(&self) -> Vec<Team> {
        let mut teams: Vec<Team> = self.lock().teams.values().cloned().collect();
        teams.sort_by_key(|t| t.created_at);
        teams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (Arc<EventBus>, TeamsService) {
        let bus = Arc::new(EventBus::new());
        (Arc::clone(&bus), TeamsService::new(bus))
    }

    #[tokio::test]
    async fn member_joined_carries_team_and_user() {
        let (bus, teams) = service();
        let seen: Arc<Mutex<Vec<Arc<DomainEvent>>>> = Arc::default();
        {
            let seen = Arc::clone(&seen);
            bus.subscribe_fn(MEMBER_JOINED, "test", move |event| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().unwrap().push(event);
                    Ok(())
                }
            });
        }

        let owner = UserId::new();
        let joiner = UserId::new();
        let team = teams.create_team("Night Owls", owner).unwrap();
        let updated = teams.add_member(team.id, joiner).unwrap();
        assert_eq!(updated.members.len(), 2);

        for _ in 0..100 {
            if !seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].payload_field::<TeamId>("teamId").unwrap(), team.id);
        assert_eq!(seen[0].payload_field::<UserId>("userId").unwrap(), joiner);
    }

    #[test]
    fn user_registered_event_is_remembered() {
        let (_, teams) = service();
        let user = UserId::new();
        let event = DomainEvent::builder("iam.user.registered", "user", user.to_string())
            .field("userId", user.to_string())
            .field("username", "owl")
            .build();
        teams.on_user_registered(&event).unwrap();

        let team = teams.create_team("Night Owls", user).unwrap();
        assert_eq!(team.members[0].username.as_deref(), Some("owl"));
    }

    #[test]
    fn malformed_user_registered_is_an_error() {
        let (_, teams) = service();
        let event = DomainEvent::builder("iam.user.registered", "user", "x")
            .field("userId", "not-a-uuid")
            .build();
        assert!(teams.on_user_registered(&event).is_err());
    }

    #[test]
    fn owner_is_first_member() {
        let (_, teams) = service();
        let owner = UserId::new();
        let team = teams.create_team("Night Owls", owner).unwrap();
        assert!(team.has_member(owner));
        assert_eq!(team.members.len(), 1);
    }

    #[test]
    fn add_member_rejects_unknown_team_and_duplicates() {
        let (_, teams) = service();
        let owner = UserId::new();
        assert!(matches!(
            teams.add_member(TeamId::new(), owner),
            Err(DomainError::NotFound(_))
        ));

        let team = teams.create_team("Night Owls", owner).unwrap();
        assert!(matches!(teams.add_member(team.id, owner), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn team_names_are_unique_and_bounded() {
        let (_, teams) = service();
        teams.create_team("Night Owls", UserId::new()).unwrap();
        assert!(matches!(
            teams.create_team("night owls", UserId::new()),
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            teams.create_team("   ", UserId::new()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn remembered_usernames_backfill_members() {
        let (_, teams) = service();
        let owner = UserId::new();
        let team = teams.create_team("Night Owls", owner).unwrap();
        assert_eq!(team.members[0].username, None);

        teams.remember_user(owner, "owl".into());
        let team = teams.get(team.id).unwrap();
        assert_eq!(team.members[0].username.as_deref(), Some("owl"));
    }
}
