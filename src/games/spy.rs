//! Spy: everybody answers the same question except one player, who answers a
//! close but different one. Answers are shown, the table votes.
//!
//! `lobby -> answering -> voting -> revealed`

use super::{
    announce_cancelled, ordered, tally_entries, validate_text, PhaseEngine, MIN_PLAYERS,
};
use crate::catalog::{Catalog, QuestionPair};
use crate::error::{RoomError, RoomResult};
use crate::outbox::Outbox;
use crate::protocol::{AnswerInfo, AnswerStatus, ServerMessage};
use crate::select::pick_one;
use crate::state::PlayerStore;
use crate::tally;
use crate::types::{GameType, SpyPhase, Token};
use std::collections::{HashMap, HashSet};

pub const MAX_ANSWER_CHARS: usize = 80;

#[derive(Debug, Default)]
pub struct SpyGame {
    phase: SpyPhase,
    active: HashSet<Token>,
    spy: Option<Token>,
    pair: Option<QuestionPair>,
    answers: HashMap<Token, String>,
    votes: HashMap<Token, Token>,
}

impl SpyGame {
    pub fn phase(&self) -> SpyPhase {
        self.phase
    }

    pub fn spy(&self) -> Option<&Token> {
        self.spy.as_ref()
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
        let (Some(pair), Some(spy)) = (pick_one(&catalog.spy_pairs), pick_one(&online)) else {
            return Err(RoomError::NotEnoughPlayers);
        };

        *self = SpyGame {
            phase: SpyPhase::Answering,
            active: online.iter().cloned().collect(),
            spy: Some(spy.clone()),
            pair: Some(pair.clone()),
            ..Default::default()
        };
        tracing::info!(players = online.len(), "Spy round started");

        out.room(ServerMessage::SpyNewRound);
        for token in &online {
            self.send_question(token, out);
        }
        self.publish_state(players, out);
        Ok(())
    }

    pub fn submit_answer(
        &mut self,
        token: &str,
        raw: &str,
        players: &PlayerStore,
        out: &mut Outbox,
    ) -> RoomResult<()> {
        if self.phase != SpyPhase::Answering {
            return Err(RoomError::WrongPhase("Answers are closed."));
        }
        if !self.active.contains(token) {
            return Err(RoomError::NotActive);
        }
        let text = validate_text(raw, MAX_ANSWER_CHARS)?;

        self.answers.insert(token.to_string(), text);
        self.publish_state(players, out);
        Ok(())
    }

    /// Publish the answers and open voting among those who answered
    pub fn reveal_answers(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        if self.phase != SpyPhase::Answering {
            return Err(RoomError::WrongPhase("Answers are closed."));
        }

        let answered: HashSet<Token> = self
            .active
            .iter()
            .filter(|t| self.answers.contains_key(*t))
            .cloned()
            .collect();
        if answered.len() < MIN_PLAYERS {
            *self = SpyGame::default();
            announce_cancelled(GameType::Spy, "Not enough answers were sent.", out);
            self.publish_state(players, out);
            return Err(RoomError::NotEnoughPlayers);
        }

        self.active = answered;
        self.votes.clear();
        self.phase = SpyPhase::Voting;
        tracing::info!(players = self.active.len(), "Spy voting opened");

        self.publish_state(players, out);
        Ok(())
    }

    pub fn vote(
        &mut self,
        voter: &str,
        target: &str,
        allow_self_vote: bool,
        players: &PlayerStore,
        out: &mut Outbox,
    ) -> RoomResult<()> {
        if self.phase != SpyPhase::Voting {
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

    /// Needs a unique most voted player; ties keep voting open
    pub fn reveal_spy(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        if self.phase != SpyPhase::Voting {
            return Err(RoomError::WrongPhase("Voting is not open."));
        }
        let result = tally::resolve(&self.votes, &self.active)?;
        let (Some(spy), Some(pair)) = (&self.spy, &self.pair) else {
            return Err(RoomError::WrongPhase("No spy round in progress."));
        };

        out.room(ServerMessage::SpyRevealed {
            spy: players.player_ref(spy),
            principal: pair.principal.clone(),
            decoy: pair.decoy.clone(),
            top: players.player_ref(&result.top),
            tally: tally_entries(&result.tally, players),
        });
        tracing::info!(caught = (spy == &result.top), "Spy revealed");

        self.phase = SpyPhase::Revealed;
        self.publish_state(players, out);
        Ok(())
    }

    fn send_question(&self, token: &str, out: &mut Outbox) {
        let Some(pair) = &self.pair else { return };
        let question = if self.spy.as_deref() == Some(token) {
            pair.decoy.clone()
        } else {
            pair.principal.clone()
        };
        out.player(token, ServerMessage::SpyQuestion { question });
    }
}

impl PhaseEngine for SpyGame {
    fn game_type(&self) -> GameType {
        GameType::Spy
    }

    fn in_lobby(&self) -> bool {
        self.phase == SpyPhase::Lobby
    }

    fn active(&self) -> &HashSet<Token> {
        &self.active
    }

    fn remove_participant(&mut self, token: &str, _players: &PlayerStore, out: &mut Outbox) {
        self.active.remove(token);
        self.answers.remove(token);
        self.votes.remove(token);

        let running = matches!(self.phase, SpyPhase::Answering | SpyPhase::Voting);
        if running && self.active.len() < MIN_PLAYERS {
            *self = SpyGame::default();
            announce_cancelled(GameType::Spy, "Not enough players left.", out);
        }
    }

    fn publish_state(&self, players: &PlayerStore, out: &mut Outbox) {
        let status = players
            .iter()
            .map(|p| AnswerStatus {
                token: p.token.clone(),
                name: p.name.clone(),
                online: p.online,
                active: self.active.contains(&p.token),
                answered: self.answers.contains_key(&p.token),
            })
            .collect();

        let public = matches!(self.phase, SpyPhase::Voting | SpyPhase::Revealed);
        let question = self
            .pair
            .as_ref()
            .filter(|_| public)
            .map(|p| p.principal.clone());
        let answers = if public {
            ordered(&self.active, players)
                .into_iter()
                .filter_map(|t| {
                    self.answers.get(&t).map(|answer| AnswerInfo {
                        name: players.name_of(&t),
                        answer: answer.clone(),
                        token: t,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        out.room(ServerMessage::SpyState {
            phase: self.phase,
            players: status,
            question,
            answers,
            votes_cast: self.votes.len(),
        });
    }

    fn catch_up(&self, token: &str, _players: &PlayerStore, out: &mut Outbox) {
        if self.phase == SpyPhase::Answering && self.active.contains(token) {
            self.send_question(token, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::test_support::roster;

    fn catalog() -> Catalog {
        Catalog::embedded().unwrap()
    }

    fn voting_game(players: &PlayerStore) -> SpyGame {
        let mut game = SpyGame::default();
        game.start(players, &catalog(), &mut Outbox::default())
            .unwrap();
        for p in players.iter() {
            game.submit_answer(&p.token, "an answer", players, &mut Outbox::default())
                .unwrap();
        }
        game.reveal_answers(players, &mut Outbox::default())
            .unwrap();
        game
    }

    #[test]
    fn test_spy_gets_the_decoy_question() {
        let players = roster(&["ana", "bea", "cid"]);
        let mut game = SpyGame::default();
        let mut out = Outbox::default();
        game.start(&players, &catalog(), &mut out).unwrap();

        let spy = game.spy().unwrap().clone();
        let pair = game.pair.clone().unwrap();
        for p in players.iter() {
            let expected = if p.token == spy {
                &pair.decoy
            } else {
                &pair.principal
            };
            assert!(matches!(
                out.to_player(&p.token).as_slice(),
                [ServerMessage::SpyQuestion { question }] if question == expected
            ));
        }
    }

    #[test]
    fn test_question_hidden_until_voting() {
        let players = roster(&["ana", "bea"]);
        let mut game = SpyGame::default();
        let mut out = Outbox::default();
        game.start(&players, &catalog(), &mut out).unwrap();

        match out.to_room().last() {
            Some(ServerMessage::SpyState {
                question, answers, ..
            }) => {
                assert!(question.is_none());
                assert!(answers.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }

        let game = voting_game(&players);
        let mut out = Outbox::default();
        game.publish_state(&players, &mut out);
        match out.to_room().last() {
            Some(ServerMessage::SpyState {
                question, answers, ..
            }) => {
                assert!(question.is_some());
                assert_eq!(answers.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_answer_length_limit() {
        let players = roster(&["ana", "bea"]);
        let mut game = SpyGame::default();
        game.start(&players, &catalog(), &mut Outbox::default())
            .unwrap();

        assert_eq!(
            game.submit_answer("ana", &"a".repeat(81), &players, &mut Outbox::default()),
            Err(RoomError::TextTooLong(80))
        );
        assert!(game
            .submit_answer("ana", &"a".repeat(80), &players, &mut Outbox::default())
            .is_ok());
    }

    #[test]
    fn test_reveal_answers_needs_two_answers() {
        let players = roster(&["ana", "bea", "cid"]);
        let mut game = SpyGame::default();
        game.start(&players, &catalog(), &mut Outbox::default())
            .unwrap();
        game.submit_answer("ana", "cars", &players, &mut Outbox::default())
            .unwrap();

        assert_eq!(
            game.reveal_answers(&players, &mut Outbox::default()),
            Err(RoomError::NotEnoughPlayers)
        );
        assert!(game.in_lobby());
    }

    #[test]
    fn test_vote_gates() {
        let players = roster(&["ana", "bea", "cid"]);
        let mut game = voting_game(&players);
        let mut out = Outbox::default();

        assert_eq!(
            game.vote("zed", "ana", true, &players, &mut out),
            Err(RoomError::NotActive)
        );
        assert_eq!(
            game.vote("ana", "zed", true, &players, &mut out),
            Err(RoomError::TargetNotActive)
        );
        assert_eq!(
            game.vote("ana", "ana", false, &players, &mut out),
            Err(RoomError::SelfVote)
        );
        assert!(game.vote("ana", "ana", true, &players, &mut out).is_ok());
    }

    #[test]
    fn test_tie_keeps_voting_open() {
        let players = roster(&["ana", "bea"]);
        let mut game = voting_game(&players);
        game.vote("ana", "bea", true, &players, &mut Outbox::default())
            .unwrap();
        game.vote("bea", "ana", true, &players, &mut Outbox::default())
            .unwrap();

        assert_eq!(
            game.reveal_spy(&players, &mut Outbox::default()),
            Err(RoomError::VoteTie)
        );
        assert_eq!(game.phase(), SpyPhase::Voting);

        game.vote("bea", "bea", true, &players, &mut Outbox::default())
            .unwrap();
        let mut out = Outbox::default();
        game.reveal_spy(&players, &mut out).unwrap();

        assert_eq!(game.phase(), SpyPhase::Revealed);
        assert!(out.to_room().iter().any(|m| matches!(
            m,
            ServerMessage::SpyRevealed { top, .. } if top.token == "bea"
        )));
    }

    #[test]
    fn test_reveal_without_votes() {
        let players = roster(&["ana", "bea"]);
        let mut game = voting_game(&players);
        assert_eq!(
            game.reveal_spy(&players, &mut Outbox::default()),
            Err(RoomError::NoVotes)
        );
    }
}
