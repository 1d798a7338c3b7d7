//! Infiltrator: everyone knows a secret concept except the infiltrator, who
//! only knows the theme and a vague hint. Three discussion rounds, then a vote.
//!
//! `lobby -> round1 -> round2 -> round3 -> voting -> revealed`

use super::{announce_cancelled, ordered, refs, tally_entries, PhaseEngine, MIN_PLAYERS};
use crate::catalog::Catalog;
use crate::error::{RoomError, RoomResult};
use crate::outbox::Outbox;
use crate::protocol::ServerMessage;
use crate::select::{pick_distinct, pick_one, shuffle};
use crate::state::PlayerStore;
use crate::tally;
use crate::types::{GameType, InfiltratorPhase, Token};
use std::collections::{HashMap, HashSet};

pub const QUESTIONS_PER_GAME: usize = 3;

/// Secrets drawn at the start of a game
#[derive(Debug, Clone)]
struct Secret {
    theme: String,
    concept: String,
    hint: String,
    infiltrator: Token,
}

#[derive(Debug, Default)]
pub struct InfiltratorGame {
    phase: InfiltratorPhase,
    active: HashSet<Token>,
    secret: Option<Secret>,
    questions: Vec<String>,
    /// Speaking order of the current round
    order: Vec<Token>,
    votes: HashMap<Token, Token>,
    concept_revealed: bool,
}

impl InfiltratorGame {
    pub fn phase(&self) -> InfiltratorPhase {
        self.phase
    }

    pub fn infiltrator(&self) -> Option<&Token> {
        self.secret.as_ref().map(|s| &s.infiltrator)
    }

    pub fn start(
        &mut self,
        players: &PlayerStore,
        catalog: &Catalog,
        out: &mut Outbox,
    ) -> RoomResult<()> {
        let online = players.online_tokens();
        if online.len() < MIN_PLAYERS {
            return Err(RoomError::NotEnoughPlayers);
        }

        let themes: Vec<_> = catalog.themes.values().collect();
        let theme = pick_one(&themes).ok_or(RoomError::WrongPhase("No themes available."))?;
        let (Some(concept), Some(hint), Some(infiltrator)) = (
            pick_one(&theme.concepts),
            pick_one(&theme.hints),
            pick_one(&online),
        ) else {
            return Err(RoomError::WrongPhase("No themes available."));
        };

        *self = InfiltratorGame {
            phase: InfiltratorPhase::Round1,
            active: online.iter().cloned().collect(),
            secret: Some(Secret {
                theme: theme.name.clone(),
                concept: concept.clone(),
                hint: hint.clone(),
                infiltrator: infiltrator.clone(),
            }),
            questions: pick_distinct(&theme.questions, QUESTIONS_PER_GAME),
            order: shuffle(&online),
            ..Default::default()
        };
        tracing::info!(players = online.len(), theme = %theme.name, "Infiltrator game started");

        for token in &online {
            self.send_secret(token, out);
        }
        self.announce_round(players, out);
        self.publish_state(players, out);
        Ok(())
    }

    /// Advance to the next discussion round; after round three, open voting
    pub fn next_round(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        let Some(current) = self.phase.round() else {
            return Err(RoomError::WrongPhase("No discussion round in progress."));
        };

        let remaining: Vec<Token> = ordered(&self.active, players)
            .into_iter()
            .filter(|t| players.is_online(t))
            .collect();
        if remaining.len() < MIN_PLAYERS {
            *self = InfiltratorGame::default();
            announce_cancelled(GameType::Infiltrator, "Too few players online.", out);
            self.publish_state(players, out);
            return Err(RoomError::NotEnoughPlayers);
        }

        self.phase = match current {
            1 => InfiltratorPhase::Round2,
            2 => InfiltratorPhase::Round3,
            _ => InfiltratorPhase::Voting,
        };

        if self.phase == InfiltratorPhase::Voting {
            tracing::info!("Infiltrator voting opened");
        } else {
            self.order = shuffle(&remaining);
            self.announce_round(players, out);
        }
        self.publish_state(players, out);
        Ok(())
    }

    /// Votes are accepted during the discussion rounds and the voting phase
    pub fn vote(
        &mut self,
        voter: &str,
        target: &str,
        allow_self_vote: bool,
        players: &PlayerStore,
        out: &mut Outbox,
    ) -> RoomResult<()> {
        if self.phase.round().is_none() && self.phase != InfiltratorPhase::Voting {
            return Err(RoomError::WrongPhase("Voting is not open."));
        }
        if !self.active.contains(voter) {
            return Err(RoomError::NotActive);
        }
        if !self.active.contains(target) {
            return Err(RoomError::TargetNotActive);
        }
        if !allow_self_vote && voter == target {
            return Err(RoomError::SelfVote);
        }

        self.votes.insert(voter.to_string(), target.to_string());
        self.publish_state(players, out);
        Ok(())
    }

    pub fn reveal(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        if self.phase != InfiltratorPhase::Voting {
            return Err(RoomError::WrongPhase("Voting is not open."));
        }
        let result = tally::resolve(&self.votes, &self.active)?;
        let Some(secret) = &self.secret else {
            return Err(RoomError::WrongPhase("No game in progress."));
        };

        let caught = secret.infiltrator == result.top;
        out.room(ServerMessage::InfiltratorRevealed {
            infiltrator: players.player_ref(&secret.infiltrator),
            top: players.player_ref(&result.top),
            caught,
            tally: tally_entries(&result.tally, players),
        });
        tracing::info!(caught, "Infiltrator revealed");

        self.phase = InfiltratorPhase::Revealed;
        self.publish_state(players, out);
        Ok(())
    }

    /// Tell everybody what the concept was, only after the infiltrator is known
    pub fn reveal_concept(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        if self.phase != InfiltratorPhase::Revealed {
            return Err(RoomError::WrongPhase("Reveal the infiltrator first."));
        }
        let Some(secret) = &self.secret else {
            return Err(RoomError::WrongPhase("No game in progress."));
        };

        out.room(ServerMessage::InfiltratorConcept {
            theme: secret.theme.clone(),
            concept: secret.concept.clone(),
        });
        self.concept_revealed = true;
        self.publish_state(players, out);
        Ok(())
    }

    fn send_secret(&self, token: &str, out: &mut Outbox) {
        let Some(secret) = &self.secret else { return };
        let is_infiltrator = secret.infiltrator == token;
        out.player(
            token,
            ServerMessage::InfiltratorSecret {
                theme: secret.theme.clone(),
                is_infiltrator,
                concept: (!is_infiltrator).then(|| secret.concept.clone()),
                hint: is_infiltrator.then(|| secret.hint.clone()),
            },
        );
    }

    fn round_message(&self, players: &PlayerStore) -> Option<ServerMessage> {
        let round = self.phase.round()?;
        let question = self.questions.get(usize::from(round) - 1)?.clone();
        Some(ServerMessage::InfiltratorRound {
            round,
            question,
            order: refs(&self.order, players),
        })
    }

    fn announce_round(&self, players: &PlayerStore, out: &mut Outbox) {
        if let Some(msg) = self.round_message(players) {
            out.room(msg);
        }
    }
}

impl PhaseEngine for InfiltratorGame {
    fn game_type(&self) -> GameType {
        GameType::Infiltrator
    }

    fn in_lobby(&self) -> bool {
        self.phase == InfiltratorPhase::Lobby
    }

    fn active(&self) -> &HashSet<Token> {
        &self.active
    }

    fn remove_participant(&mut self, token: &str, _players: &PlayerStore, out: &mut Outbox) {
        self.active.remove(token);
        self.votes.remove(token);
        self.order.retain(|t| t != token);

        let running = self.phase.round().is_some() || self.phase == InfiltratorPhase::Voting;
        if running && self.active.len() < MIN_PLAYERS {
            *self = InfiltratorGame::default();
            announce_cancelled(GameType::Infiltrator, "Not enough players left.", out);
        }
    }

    fn publish_state(&self, players: &PlayerStore, out: &mut Outbox) {
        out.room(ServerMessage::InfiltratorState {
            phase: self.phase,
            theme: self.secret.as_ref().map(|s| s.theme.clone()),
            active: refs(&ordered(&self.active, players), players),
            votes_cast: self.votes.len(),
            concept_revealed: self.concept_revealed,
        });
    }

    fn catch_up(&self, token: &str, players: &PlayerStore, out: &mut Outbox) {
        if self.in_lobby() || !self.active.contains(token) {
            return;
        }
        self.send_secret(token, out);
        if let Some(msg) = self.round_message(players) {
            out.player(token, msg);
        }
    }
}
