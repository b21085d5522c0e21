use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use colosseum_core::{DomainError, DomainResult, TeamId, TournamentId};
use colosseum_events::{DomainEvent, EventBus, HandlerResult};

pub const TOURNAMENT_CREATED: &str = "tournament.tournament.created";
pub const TEAM_REGISTERED: &str = "tournament.team.registered";

const MIN_TEAMS: u32 = 2;
const MAX_TEAMS: u32 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub max_teams: u32,
    pub teams: Vec<TeamId>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn is_full(&self) -> bool {
        self.teams.len() >= self.max_teams as usize
    }
}

#[derive(Debug, Default)]
struct State {
    tournaments: HashMap<TournamentId, Tournament>,
    known_teams: HashMap<TeamId, String>,
}

#[derive(Debug)]
pub struct TournamentsService {
    bus: Arc<EventBus>,
    state: Mutex<State>,
}

impl TournamentsService {
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
        self.lock().known_teams.insert(team_id, name);
        Ok(())
    }

    pub fn knows_team(&self, team_id: TeamId) -> bool {
        self.lock().known_teams.contains_key(&team_id)
    }

    pub fn create(&self, name: &str, max_teams: u32) -> DomainResult<Tournament> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("tournament name must not be empty"));
        }
        if !(MIN_TEAMS..=MAX_TEAMS).contains(&max_teams) {
            return Err(DomainError::validation(format!(
                "maxTeams must be between {MIN_TEAMS} and {MAX_TEAMS}"
            )));
        }

        let tournament = Tournament {
            id: TournamentId::new(),
            name: name.to_string(),
            max_teams,
            teams: Vec::new(),
            created_at: Utc::now(),
        };
        self.lock().tournaments.insert(tournament.id, tournament.clone());

        tracing::info!(tournament_id = %tournament.id, max_teams, "tournament created");
        self.bus.publish(
            DomainEvent::builder(TOURNAMENT_CREATED, "tournament", tournament.id.to_string())
                .field("tournamentId", tournament.id.to_string())
                .field("name", tournament.name.clone())
                .field("maxTeams", max_teams)
                .build(),
        );

        Ok(tournament)
    }

    pub fn register_team(&self, tournament_id: TournamentId, team_id: TeamId) -> DomainResult<Tournament> {
        let tournament = {
            let mut state = self.lock();
            if !state.known_teams.contains_key(&team_id) {
                return Err(DomainError::not_found(format!("team {team_id}")));
            }
            let tournament = state
                .tournaments
                .get_mut(&tournament_id)
                .ok_or_else(|| DomainError::not_found(format!("tournament {tournament_id}")))?;
            if tournament.teams.contains(&team_id) {
                return Err(DomainError::conflict(format!(
                    "team {team_id} is already registered"
                )));
            }
            if tournament.is_full() {
                return Err(DomainError::conflict(format!(
                    "tournament {tournament_id} is full ({} teams)",
                    tournament.max_teams
                )));
            }
            tournament.teams.push(team_id);
            tournament.clone()
        };

        tracing::info!(tournament_id = %tournament_id, team_id = %team_id, "team registered");
        self.bus.publish(
            DomainEvent::builder(TEAM_REGISTERED, "tournament", tournament_id.to_string())
                .field("tournamentId", tournament_id.to_string())
                .field("teamId", team_id.to_string())
                .field("entries", tournament.teams.len())
                .build(),
        );

        Ok(tournament)
    }

    pub fn get(&self, tournament_id: TournamentId) -> DomainResult<Tournament> {
        self.lock()
            .tournaments
            .get(&tournament_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("tournament {tournament_id}")))
    }
}
