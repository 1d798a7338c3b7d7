use super::players::PlayerStore;
use super::timers::PendingTimer;
use crate::games::{GameSession, PhaseEngine};
use crate::outbox::Outbox;
use crate::protocol::{PlayerInfo, ServerMessage};
use crate::types::*;
use std::collections::HashSet;

/// One room and everything scoped to it
#[derive(Debug)]
pub struct Room {
    pub code: RoomCode,
    pub password: String,
    pub game_type: GameType,
    pub master: Option<Token>,
    pub players: PlayerStore,
    /// Kicked tokens, refused until the room is deleted
    pub banned: HashSet<Token>,
    pub empty_timer: Option<PendingTimer>,
    game: Option<GameSession>,
    pub created_at: String,
}

impl Room {
    pub fn new(code: RoomCode, password: String, game_type: GameType) -> Self {
        Self {
            code,
            password,
            game_type,
            master: None,
            players: PlayerStore::default(),
            banned: HashSet::new(),
            empty_timer: None,
            game: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_master(&self, token: &str) -> bool {
        self.master.as_deref() == Some(token)
    }

    /// The game session, created on first use, alongside the roster it plays with
    pub fn game_parts(&mut self) -> (&mut GameSession, &PlayerStore) {
        let game_type = self.game_type;
        let game = self
            .game
            .get_or_insert_with(|| GameSession::new(game_type));
        (game, &self.players)
    }

    pub fn ensure_game(&mut self) -> &mut GameSession {
        let game_type = self.game_type;
        self.game
            .get_or_insert_with(|| GameSession::new(game_type))
    }

    pub fn game(&self) -> Option<&GameSession> {
        self.game.as_ref()
    }

    /// Hand the master role to `token` and tell them
    pub fn set_master(&mut self, token: Token, out: &mut Outbox) {
        tracing::info!(room = %self.code, "Master is now {}", token);
        out.player(
            token.clone(),
            ServerMessage::Master {
                code: self.code.clone(),
            },
        );
        self.master = Some(token);
    }

    /// Remove a player for good: roster, session key, every game map, master role
    pub fn remove_player(&mut self, token: &str, out: &mut Outbox) {
        let Some(player) = self.players.remove(token) else {
            return;
        };
        if let Some(timer) = player.removal {
            timer.cancel();
        }

        if let Some(game) = self.game.as_mut() {
            game.engine_mut()
                .remove_participant(token, &self.players, out);
        }

        if self.is_master(token) {
            match self.players.failover_candidate() {
                Some(next) => self.set_master(next, out),
                None => self.master = None,
            }
        }

        self.publish(out);
    }

    pub fn players_update(&self) -> ServerMessage {
        ServerMessage::PlayersUpdate {
            code: self.code.clone(),
            players: self
                .players
                .iter()
                .map(|p| PlayerInfo {
                    token: p.token.clone(),
                    name: p.name.clone(),
                    is_master: self.is_master(&p.token),
                    online: p.online,
                })
                .collect(),
            master: self.master.clone(),
            game_type: self.game_type,
        }
    }

    /// Roster plus the game's public state
    pub fn publish(&self, out: &mut Outbox) {
        out.room(self.players_update());
        if let Some(game) = &self.game {
            game.engine().publish_state(&self.players, out);
        }
    }

    /// Cancel every pending timer before the room is dropped
    pub fn cancel_timers(&mut self) {
        if let Some(timer) = self.empty_timer.take() {
            timer.cancel();
        }
        for player in self.players.iter_mut() {
            if let Some(timer) = player.removal.take() {
                timer.cancel();
            }
        }
    }
}
