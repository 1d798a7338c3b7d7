//! Phase engines for the five games
//!
//! Every room owns at most one [`GameSession`], created on first use for the
//! room's game type. Engines never see connections: they read the roster from
//! the [`PlayerStore`] and push their output into an [`Outbox`].

pub mod infiltrator;
pub mod ranking;
pub mod rating;
pub mod spy;
pub mod who_am_i;

use crate::error::{RoomError, RoomResult};
use crate::outbox::Outbox;
use crate::protocol::{PlayerRef, ServerMessage, TallyEntry};
use crate::state::PlayerStore;
use crate::types::{GameType, Token};
use std::collections::{BTreeMap, HashSet};

pub use infiltrator::InfiltratorGame;
pub use ranking::RankingGame;
pub use rating::RatingGame;
pub use spy::SpyGame;
pub use who_am_i::WhoAmIGame;

/// No round runs with fewer participants than this
pub const MIN_PLAYERS: usize = 2;

/// Hooks the room calls regardless of which game it hosts
pub trait PhaseEngine {
    fn game_type(&self) -> GameType;

    fn in_lobby(&self) -> bool;

    /// Tokens taking part in the current round
    fn active(&self) -> &HashSet<Token>;

    /// Purge a player that left the room for good
    fn remove_participant(&mut self, token: &str, players: &PlayerStore, out: &mut Outbox);

    /// Public snapshot for the whole room
    fn publish_state(&self, players: &PlayerStore, out: &mut Outbox);

    /// Private state a (re)joining player needs to continue the round
    fn catch_up(&self, token: &str, players: &PlayerStore, out: &mut Outbox);
}

#[derive(Debug)]
pub enum GameSession {
    Ranking(RankingGame),
    WhoAmI(WhoAmIGame),
    Spy(SpyGame),
    Infiltrator(InfiltratorGame),
    Rating(RatingGame),
}

impl GameSession {
    pub fn new(game_type: GameType) -> Self {
        match game_type {
            GameType::Ranking => GameSession::Ranking(RankingGame::default()),
            GameType::WhoAmI => GameSession::WhoAmI(WhoAmIGame::default()),
            GameType::Spy => GameSession::Spy(SpyGame::default()),
            GameType::Infiltrator => GameSession::Infiltrator(InfiltratorGame::default()),
            GameType::Rating => GameSession::Rating(RatingGame::default()),
        }
    }

    pub fn engine(&self) -> &dyn PhaseEngine {
        match self {
            GameSession::Ranking(g) => g,
            GameSession::WhoAmI(g) => g,
            GameSession::Spy(g) => g,
            GameSession::Infiltrator(g) => g,
            GameSession::Rating(g) => g,
        }
    }

    pub fn engine_mut(&mut self) -> &mut dyn PhaseEngine {
        match self {
            GameSession::Ranking(g) => g,
            GameSession::WhoAmI(g) => g,
            GameSession::Spy(g) => g,
            GameSession::Infiltrator(g) => g,
            GameSession::Rating(g) => g,
        }
    }

    pub fn ranking(&mut self) -> RoomResult<&mut RankingGame> {
        match self {
            GameSession::Ranking(g) => Ok(g),
            _ => Err(RoomError::WrongGame),
        }
    }

    pub fn who_am_i(&mut self) -> RoomResult<&mut WhoAmIGame> {
        match self {
            GameSession::WhoAmI(g) => Ok(g),
            _ => Err(RoomError::WrongGame),
        }
    }

    pub fn spy(&mut self) -> RoomResult<&mut SpyGame> {
        match self {
            GameSession::Spy(g) => Ok(g),
            _ => Err(RoomError::WrongGame),
        }
    }

    pub fn infiltrator(&mut self) -> RoomResult<&mut InfiltratorGame> {
        match self {
            GameSession::Infiltrator(g) => Ok(g),
            _ => Err(RoomError::WrongGame),
        }
    }

    pub fn rating(&mut self) -> RoomResult<&mut RatingGame> {
        match self {
            GameSession::Rating(g) => Ok(g),
            _ => Err(RoomError::WrongGame),
        }
    }
}

/// Trim and length-check free text. Length counts characters, not bytes.
pub fn validate_text(raw: &str, max_chars: usize) -> RoomResult<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(RoomError::EmptyText);
    }
    if text.chars().count() > max_chars {
        return Err(RoomError::TextTooLong(max_chars));
    }
    Ok(text.to_string())
}

/// Members of `set` in roster order
pub fn ordered(set: &HashSet<Token>, players: &PlayerStore) -> Vec<Token> {
    players
        .iter()
        .filter(|p| set.contains(&p.token))
        .map(|p| p.token.clone())
        .collect()
}

pub fn refs<'a>(
    tokens: impl IntoIterator<Item = &'a Token>,
    players: &PlayerStore,
) -> Vec<PlayerRef> {
    tokens.into_iter().map(|t| players.player_ref(t)).collect()
}

/// Tally with names, most voted first
pub fn tally_entries(tally: &BTreeMap<Token, usize>, players: &PlayerStore) -> Vec<TallyEntry> {
    let mut entries: Vec<TallyEntry> = tally
        .iter()
        .map(|(token, votes)| TallyEntry {
            token: token.clone(),
            name: players.name_of(token),
            votes: *votes,
        })
        .collect();
    entries.sort_by(|a, b| b.votes.cmp(&a.votes));
    entries
}

pub fn announce_cancelled(game: GameType, reason: &str, out: &mut Outbox) {
    tracing::info!(game = %game, "Round cancelled: {}", reason);
    out.room(ServerMessage::RoundCancelled {
        game,
        reason: reason.to_string(),
    });
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::state::{Player, PlayerStore};

    /// Roster of online players with tokens equal to their names
    pub fn roster(names: &[&str]) -> PlayerStore {
        let mut store = PlayerStore::default();
        for name in names {
            store.insert(Player::new(
                name.to_string(),
                name.to_string(),
                format!("conn-{}", name),
                format!("key-{}", name),
            ));
        }
        store
    }

    pub fn set_offline(store: &mut PlayerStore, token: &str) {
        if let Some(p) = store.get_mut(token) {
            p.online = false;
            p.conn = None;
        }
    }
}
