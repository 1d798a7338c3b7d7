//! Ranking: every online player gets a secret number, the table sorts itself
//! out loud, then the master reveals everything.

use super::{announce_cancelled, ordered, refs, PhaseEngine, MIN_PLAYERS};
use crate::error::{RoomError, RoomResult};
use crate::outbox::Outbox;
use crate::protocol::{RankingEntry, ServerMessage};
use crate::select::pick_distinct;
use crate::state::PlayerStore;
use crate::types::{GameType, RankingPhase, Token};
use std::collections::{HashMap, HashSet};

/// Numbers are drawn without repetition from 1..=NUMBER_POOL
const NUMBER_POOL: u32 = 100;

#[derive(Debug, Default)]
pub struct RankingGame {
    phase: RankingPhase,
    active: HashSet<Token>,
    values: HashMap<Token, u32>,
}

impl RankingGame {
    pub fn phase(&self) -> RankingPhase {
        self.phase
    }

    pub fn value_of(&self, token: &str) -> Option<u32> {
        self.values.get(token).copied()
    }

    /// Give every online player a distinct number
    pub fn distribute(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        let online = players.online_tokens();
        if online.len() < MIN_PLAYERS {
            return Err(RoomError::NotEnoughPlayers);
        }

        let pool: Vec<u32> = (1..=NUMBER_POOL).collect();
        let numbers = pick_distinct(&pool, online.len());

        self.values = online.iter().cloned().zip(numbers).collect();
        self.active = online.iter().cloned().collect();
        self.phase = RankingPhase::Distributed;
        tracing::info!(players = online.len(), "Ranking numbers distributed");

        out.room(ServerMessage::RankingNewRound);
        for token in &online {
            if let Some(value) = self.value_of(token) {
                out.player(token.clone(), ServerMessage::RankingNumber { value });
            }
        }
        self.publish_state(players, out);
        Ok(())
    }

    /// Publish everyone's number, highest first. Players without a number sort last.
    pub fn reveal(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        if self.phase == RankingPhase::Lobby {
            return Err(RoomError::WrongPhase("Distribute the numbers first."));
        }

        let mut entries: Vec<RankingEntry> = players
            .iter()
            .map(|p| RankingEntry {
                token: p.token.clone(),
                name: p.name.clone(),
                value: self.value_of(&p.token),
            })
            .collect();
        entries.sort_by(|a, b| b.value.cmp(&a.value));

        self.phase = RankingPhase::Revealed;
        out.room(ServerMessage::RankingAllNumbers { entries });
        self.publish_state(players, out);
        Ok(())
    }
}

impl PhaseEngine for RankingGame {
    fn game_type(&self) -> GameType {
        GameType::Ranking
    }

    fn in_lobby(&self) -> bool {
        self.phase == RankingPhase::Lobby
    }

    fn active(&self) -> &HashSet<Token> {
        &self.active
    }

    fn remove_participant(&mut self, token: &str, _players: &PlayerStore, out: &mut Outbox) {
        self.values.remove(token);
        self.active.remove(token);

        if self.phase == RankingPhase::Distributed && self.active.len() < MIN_PLAYERS {
            *self = RankingGame::default();
            announce_cancelled(GameType::Ranking, "Not enough players left.", out);
        }
    }

    fn publish_state(&self, players: &PlayerStore, out: &mut Outbox) {
        out.room(ServerMessage::RankingState {
            phase: self.phase,
            holders: refs(&ordered(&self.active, players), players),
        });
    }

    fn catch_up(&self, token: &str, _players: &PlayerStore, out: &mut Outbox) {
        if self.phase == RankingPhase::Distributed {
            if let Some(value) = self.value_of(token) {
                out.player(token, ServerMessage::RankingNumber { value });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::test_support::{roster, set_offline};

    #[test]
    fn test_distribute_gives_distinct_numbers_to_online_players() {
        let mut players = roster(&["ana", "bea", "cid", "dan"]);
        set_offline(&mut players, "dan");
        let mut game = RankingGame::default();
        let mut out = Outbox::default();

        game.distribute(&players, &mut out).unwrap();

        let values: HashSet<u32> = ["ana", "bea", "cid"]
            .iter()
            .map(|t| game.value_of(t).unwrap())
            .collect();
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| (1..=NUMBER_POOL).contains(v)));
        assert!(game.value_of("dan").is_none());

        assert_eq!(out.to_player("ana").len(), 1);
        assert!(out.to_player("dan").is_empty());
    }

    #[test]
    fn test_reveal_sorts_descending_with_missing_last() {
        let mut players = roster(&["ana", "bea"]);
        let mut game = RankingGame::default();
        game.distribute(&players, &mut Outbox::default()).unwrap();
        players.insert(crate::state::Player::new(
            "late".into(),
            "late".into(),
            "conn-late".into(),
            "key".into(),
        ));

        let mut out = Outbox::default();
        game.reveal(&players, &mut out).unwrap();

        let entries = out
            .to_room()
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::RankingAllNumbers { entries } => Some(entries.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].value > entries[1].value);
        assert_eq!(entries[2].token, "late");
        assert_eq!(entries[2].value, None);
        assert_eq!(game.phase(), RankingPhase::Revealed);
    }

    #[test]
    fn test_reveal_requires_distribution() {
        let players = roster(&["ana", "bea"]);
        let mut game = RankingGame::default();
        assert!(matches!(
            game.reveal(&players, &mut Outbox::default()),
            Err(RoomError::WrongPhase(_))
        ));
    }

    #[test]
    fn test_removal_below_minimum_cancels() {
        let players = roster(&["ana", "bea"]);
        let mut game = RankingGame::default();
        game.distribute(&players, &mut Outbox::default()).unwrap();

        let mut out = Outbox::default();
        game.remove_participant("bea", &players, &mut out);

        assert!(game.in_lobby());
        assert!(out
            .to_room()
            .iter()
            .any(|m| matches!(m, ServerMessage::RoundCancelled { .. })));
    }
}
