//! Who-Am-I: players secretly write a character for someone else, then try to
//! guess their own from the questions they ask.
//!
//! `lobby -> writing -> playing`. Writing targets and the final character
//! assignment are two independent derangements, so nobody ever ends up with
//! the text they wrote themselves.

use super::{announce_cancelled, ordered, validate_text, PhaseEngine, MIN_PLAYERS};
use crate::error::{RoomError, RoomResult};
use crate::outbox::Outbox;
use crate::protocol::{CharacterInfo, ServerMessage, WritingStatus};
use crate::select::derangement;
use crate::state::PlayerStore;
use crate::types::{GameType, Token, WhoAmIPhase};
use std::collections::{HashMap, HashSet};

pub const MAX_CHARACTER_CHARS: usize = 60;

const EXCLUDED_REASON: &str = "You are not part of this round. Wait for the next one.";

#[derive(Debug, Default)]
pub struct WhoAmIGame {
    phase: WhoAmIPhase,
    active: HashSet<Token>,
    /// writer -> whom they write for
    writing_for: HashMap<Token, Token>,
    /// writer -> submitted text
    texts: HashMap<Token, String>,
    /// player -> character they have to guess
    characters: HashMap<Token, String>,
    revealed: HashSet<Token>,
}

impl WhoAmIGame {
    pub fn phase(&self) -> WhoAmIPhase {
        self.phase
    }

    pub fn writing_target(&self, writer: &str) -> Option<&Token> {
        self.writing_for.get(writer)
    }

    pub fn character_of(&self, token: &str) -> Option<&String> {
        self.characters.get(token)
    }

    pub fn start(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        let online = players.online_tokens();
        let assignment = derangement(&online).ok_or(RoomError::NotEnoughPlayers)?;

        *self = WhoAmIGame {
            phase: WhoAmIPhase::Writing,
            active: online.iter().cloned().collect(),
            writing_for: assignment,
            ..Default::default()
        };
        tracing::info!(players = online.len(), "Who-Am-I writing started");

        out.room(ServerMessage::WhoAmINewRound);
        for writer in &online {
            self.send_writing_target(writer, players, out);
        }
        self.publish_state(players, out);
        Ok(())
    }

    /// Store (or replace) the caller's character text
    pub fn submit(
        &mut self,
        token: &str,
        raw: &str,
        players: &PlayerStore,
        out: &mut Outbox,
    ) -> RoomResult<()> {
        if self.phase != WhoAmIPhase::Writing {
            return Err(RoomError::WrongPhase("Writing is not open."));
        }
        if !self.active.contains(token) {
            return Err(RoomError::NotActive);
        }
        let text = validate_text(raw, MAX_CHARACTER_CHARS)?;

        self.texts.insert(token.to_string(), text);
        self.publish_state(players, out);
        Ok(())
    }

    /// End writing and hand out the characters among those who wrote one
    pub fn close_writing(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        if self.phase != WhoAmIPhase::Writing {
            return Err(RoomError::WrongPhase("Writing is not open."));
        }

        let writers: HashSet<Token> = self
            .active
            .iter()
            .filter(|t| self.texts.contains_key(*t))
            .cloned()
            .collect();
        let survivors = ordered(&writers, players);

        let Some(assignment) = derangement(&survivors) else {
            *self = WhoAmIGame::default();
            announce_cancelled(GameType::WhoAmI, "Not enough characters were written.", out);
            self.publish_state(players, out);
            return Err(RoomError::NotEnoughPlayers);
        };

        self.characters = assignment
            .iter()
            .filter_map(|(writer, target)| {
                self.texts
                    .get(writer)
                    .map(|text| (target.clone(), text.clone()))
            })
            .collect();
        self.active = writers;
        self.revealed.clear();
        self.phase = WhoAmIPhase::Playing;
        tracing::info!(players = survivors.len(), "Who-Am-I playing started");

        for player in players.iter() {
            if self.active.contains(&player.token) {
                self.send_others(&player.token, players, out);
            } else {
                out.player(
                    player.token.clone(),
                    ServerMessage::WhoAmIExcluded {
                        reason: EXCLUDED_REASON.to_string(),
                    },
                );
            }
        }
        self.publish_state(players, out);
        Ok(())
    }

    /// Show `target` their own character. Repeating it resends the same text.
    pub fn reveal_to(
        &mut self,
        target: &str,
        players: &PlayerStore,
        out: &mut Outbox,
    ) -> RoomResult<()> {
        if self.phase != WhoAmIPhase::Playing {
            return Err(RoomError::WrongPhase("Characters are not assigned yet."));
        }
        if !self.active.contains(target) {
            return Err(RoomError::TargetNotActive);
        }
        let character = self
            .characters
            .get(target)
            .cloned()
            .ok_or(RoomError::NoCharacter)?;

        self.revealed.insert(target.to_string());
        out.player(target, ServerMessage::WhoAmIYourCharacter { character });
        out.room(ServerMessage::WhoAmIRevealed {
            player: players.player_ref(target),
        });
        self.publish_state(players, out);
        Ok(())
    }

    fn send_writing_target(&self, writer: &str, players: &PlayerStore, out: &mut Outbox) {
        if let Some(target) = self.writing_for.get(writer) {
            out.player(
                writer,
                ServerMessage::WhoAmIYourTarget {
                    target: players.player_ref(target),
                },
            );
        }
    }

    fn send_others(&self, viewer: &str, players: &PlayerStore, out: &mut Outbox) {
        let characters = ordered(&self.active, players)
            .into_iter()
            .filter(|t| t != viewer)
            .filter_map(|t| {
                self.characters.get(&t).map(|character| CharacterInfo {
                    name: players.name_of(&t),
                    character: character.clone(),
                    token: t,
                })
            })
            .collect();
        out.player(viewer, ServerMessage::WhoAmIOthers { characters });
    }
}

impl PhaseEngine for WhoAmIGame {
    fn game_type(&self) -> GameType {
        GameType::WhoAmI
    }

    fn in_lobby(&self) -> bool {
        self.phase == WhoAmIPhase::Lobby
    }

    fn active(&self) -> &HashSet<Token> {
        &self.active
    }

    fn remove_participant(&mut self, token: &str, _players: &PlayerStore, out: &mut Outbox) {
        self.active.remove(token);
        self.writing_for.remove(token);
        self.texts.remove(token);
        self.characters.remove(token);
        self.revealed.remove(token);

        if !self.in_lobby() && self.active.len() < MIN_PLAYERS {
            *self = WhoAmIGame::default();
            announce_cancelled(GameType::WhoAmI, "Not enough players left.", out);
        }
    }

    fn publish_state(&self, players: &PlayerStore, out: &mut Outbox) {
        let status = players
            .iter()
            .map(|p| WritingStatus {
                token: p.token.clone(),
                name: p.name.clone(),
                online: p.online,
                active: self.active.contains(&p.token),
                submitted: self.texts.contains_key(&p.token),
                revealed: self.revealed.contains(&p.token),
            })
            .collect();
        out.room(ServerMessage::WhoAmIState {
            phase: self.phase,
            players: status,
        });
    }

    fn catch_up(&self, token: &str, players: &PlayerStore, out: &mut Outbox) {
        match self.phase {
            WhoAmIPhase::Writing if self.active.contains(token) => {
                self.send_writing_target(token, players, out);
            }
            WhoAmIPhase::Playing if self.active.contains(token) => {
                self.send_others(token, players, out);
                if self.revealed.contains(token) {
                    if let Some(character) = self.characters.get(token) {
                        out.player(
                            token,
                            ServerMessage::WhoAmIYourCharacter {
                                character: character.clone(),
                            },
                        );
                    }
                }
            }
            WhoAmIPhase::Playing => out.player(
                token,
                ServerMessage::WhoAmIExcluded {
                    reason: EXCLUDED_REASON.to_string(),
                },
            ),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::test_support::{roster, set_offline};

    fn writing_game(players: &PlayerStore) -> WhoAmIGame {
        let mut game = WhoAmIGame::default();
        game.start(players, &mut Outbox::default()).unwrap();
        game
    }

    #[test]
    fn test_start_assigns_writing_targets() {
        let players = roster(&["ana", "bea", "cid"]);
        let mut game = WhoAmIGame::default();
        let mut out = Outbox::default();
        game.start(&players, &mut out).unwrap();

        assert_eq!(game.phase(), WhoAmIPhase::Writing);
        for token in ["ana", "bea", "cid"] {
            let target = game.writing_target(token).unwrap();
            assert_ne!(target, token);
            assert!(out
                .to_player(token)
                .iter()
                .any(|m| matches!(m, ServerMessage::WhoAmIYourTarget { .. })));
        }
    }

    #[test]
    fn test_three_players_end_to_end() {
        let players = roster(&["ana", "bea", "cid"]);
        let mut game = writing_game(&players);

        for (token, text) in [("ana", "Napoleon"), ("bea", "Cleopatra"), ("cid", "Pele")] {
            game.submit(token, text, &players, &mut Outbox::default())
                .unwrap();
        }

        let mut out = Outbox::default();
        game.close_writing(&players, &mut out).unwrap();

        assert_eq!(game.phase(), WhoAmIPhase::Playing);
        assert_eq!(game.active().len(), 3);

        let written: HashMap<&str, &str> =
            [("ana", "Napoleon"), ("bea", "Cleopatra"), ("cid", "Pele")].into();
        let mut assigned: Vec<&str> = Vec::new();
        for token in ["ana", "bea", "cid"] {
            let character = game.character_of(token).unwrap();
            assert_ne!(character, written[token], "{} got their own text", token);
            assigned.push(character.as_str());

            match out.to_player(token).as_slice() {
                [ServerMessage::WhoAmIOthers { characters }] => {
                    assert_eq!(characters.len(), 2);
                    assert!(characters.iter().all(|c| c.token != token));
                }
                other => panic!("unexpected private messages {:?}", other),
            }
        }
        assigned.sort();
        assert_eq!(assigned, vec!["Cleopatra", "Napoleon", "Pele"]);
    }

    #[test]
    fn test_submit_validation() {
        let players = roster(&["ana", "bea"]);
        let mut game = writing_game(&players);
        let mut out = Outbox::default();

        assert_eq!(
            game.submit("ana", "   ", &players, &mut out),
            Err(RoomError::EmptyText)
        );
        assert_eq!(
            game.submit("ana", &"a".repeat(61), &players, &mut out),
            Err(RoomError::TextTooLong(60))
        );
        assert_eq!(
            game.submit("zed", "Zorro", &players, &mut out),
            Err(RoomError::NotActive)
        );
    }

    #[test]
    fn test_close_writing_with_one_writer_cancels() {
        let players = roster(&["ana", "bea", "cid"]);
        let mut game = writing_game(&players);
        game.submit("ana", "Zorro", &players, &mut Outbox::default())
            .unwrap();

        let mut out = Outbox::default();
        assert_eq!(
            game.close_writing(&players, &mut out),
            Err(RoomError::NotEnoughPlayers)
        );
        assert!(game.in_lobby());
        assert!(out
            .to_room()
            .iter()
            .any(|m| matches!(m, ServerMessage::RoundCancelled { .. })));
    }

    #[test]
    fn test_non_writers_are_excluded() {
        let players = roster(&["ana", "bea", "cid"]);
        let mut game = writing_game(&players);
        game.submit("ana", "Zorro", &players, &mut Outbox::default())
            .unwrap();
        game.submit("bea", "Batman", &players, &mut Outbox::default())
            .unwrap();

        let mut out = Outbox::default();
        game.close_writing(&players, &mut out).unwrap();

        assert_eq!(game.character_of("ana").unwrap(), "Batman");
        assert_eq!(game.character_of("bea").unwrap(), "Zorro");
        assert!(!game.active().contains("cid"));
        assert!(matches!(
            out.to_player("cid").as_slice(),
            [ServerMessage::WhoAmIExcluded { .. }]
        ));
    }

    #[test]
    fn test_reveal_is_idempotent() {
        let players = roster(&["ana", "bea"]);
        let mut game = writing_game(&players);
        game.submit("ana", "Zorro", &players, &mut Outbox::default())
            .unwrap();
        game.submit("bea", "Batman", &players, &mut Outbox::default())
            .unwrap();
        game.close_writing(&players, &mut Outbox::default()).unwrap();

        for _ in 0..2 {
            let mut out = Outbox::default();
            game.reveal_to("ana", &players, &mut out).unwrap();
            assert!(matches!(
                out.to_player("ana").as_slice(),
                [ServerMessage::WhoAmIYourCharacter { character }] if character == "Batman"
            ));
        }
        assert_eq!(
            game.reveal_to("zed", &players, &mut Outbox::default()),
            Err(RoomError::TargetNotActive)
        );
    }

    #[test]
    fn test_catch_up_resends_private_state() {
        let mut players = roster(&["ana", "bea"]);
        let mut game = writing_game(&players);

        let mut out = Outbox::default();
        game.catch_up("ana", &players, &mut out);
        assert!(matches!(
            out.to_player("ana").as_slice(),
            [ServerMessage::WhoAmIYourTarget { target }] if target.token == "bea"
        ));

        game.submit("ana", "Zorro", &players, &mut Outbox::default())
            .unwrap();
        game.submit("bea", "Batman", &players, &mut Outbox::default())
            .unwrap();
        game.close_writing(&players, &mut Outbox::default()).unwrap();
        game.reveal_to("bea", &players, &mut Outbox::default())
            .unwrap();

        set_offline(&mut players, "bea");
        let mut out = Outbox::default();
        game.catch_up("bea", &players, &mut out);
        let msgs = out.to_player("bea");
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[1], ServerMessage::WhoAmIYourCharacter { .. }));
    }

    #[test]
    fn test_removal_below_minimum_cancels_round() {
        let players = roster(&["ana", "bea"]);
        let mut game = writing_game(&players);

        let mut out = Outbox::default();
        game.remove_participant("bea", &players, &mut out);
        assert!(game.in_lobby());
        assert!(game.active().is_empty());
    }
}
