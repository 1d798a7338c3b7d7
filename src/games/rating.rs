//! Rating: one target per turn draws a secret 1-10 rating, everyone else
//! guesses it. Scores persist for the lifetime of the room.
//!
//! Targets come from a shuffled cycle over the online players. A new cycle is
//! drawn when the order runs out or fewer than two members remain.

use super::{announce_cancelled, ordered, refs, PhaseEngine, MIN_PLAYERS};
use crate::error::{RoomError, RoomResult};
use crate::outbox::Outbox;
use crate::protocol::{GuessResult, ScoreEntry, ServerMessage};
use crate::select::shuffle;
use crate::state::PlayerStore;
use crate::types::{GameType, RatingPhase, Token};
use rand::Rng;
use std::collections::{HashMap, HashSet};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

#[derive(Debug, Default)]
pub struct RatingGame {
    phase: RatingPhase,
    /// Members of the current cycle
    active: HashSet<Token>,
    order: Vec<Token>,
    /// Position of the current (or next) target in `order`
    index: usize,
    target: Option<Token>,
    rating: Option<u8>,
    guesses: HashMap<Token, u8>,
    scores: HashMap<Token, u32>,
    cycle: u32,
}

impl RatingGame {
    pub fn phase(&self) -> RatingPhase {
        self.phase
    }

    pub fn target(&self) -> Option<&Token> {
        self.target.as_ref()
    }

    pub fn score_of(&self, token: &str) -> u32 {
        self.scores.get(token).copied().unwrap_or(0)
    }

    pub fn start_turn(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        if self.phase == RatingPhase::Guessing {
            return Err(RoomError::WrongPhase("A turn is already running."));
        }

        if self.order.is_empty()
            || self.active.len() < MIN_PLAYERS
            || self.index >= self.order.len()
        {
            self.start_cycle(players, out)?;
        }

        let target = match self.next_target(players) {
            Some(t) => t,
            None => {
                self.start_cycle(players, out)?;
                match self.next_target(players) {
                    Some(t) => t,
                    None => {
                        self.reset_turn();
                        self.publish_state(players, out);
                        return Err(RoomError::NotEnoughPlayers);
                    }
                }
            }
        };

        let rating = rand::rng().random_range(MIN_RATING..=MAX_RATING);
        self.phase = RatingPhase::Guessing;
        self.target = Some(target.clone());
        self.rating = Some(rating);
        self.guesses.clear();
        self.scores.entry(target.clone()).or_insert(0);
        tracing::info!(cycle = self.cycle, turn = self.index + 1, "Rating turn started");

        let target_ref = players.player_ref(&target);
        out.player(target.clone(), ServerMessage::RatingSecret { rating });
        for token in &self.order {
            if token != &target && self.active.contains(token) {
                out.player(
                    token.clone(),
                    ServerMessage::RatingPromptGuess {
                        target: target_ref.clone(),
                    },
                );
            }
        }
        out.room(ServerMessage::RatingTurnStarted {
            target: target_ref,
            turn: self.index + 1,
            of: self.order.len(),
        });
        self.publish_state(players, out);
        Ok(())
    }

    /// Store the caller's guess, replacing an earlier one
    pub fn submit_guess(
        &mut self,
        token: &str,
        raw: &serde_json::Value,
        players: &PlayerStore,
        out: &mut Outbox,
    ) -> RoomResult<u8> {
        if self.phase != RatingPhase::Guessing {
            return Err(RoomError::WrongPhase("No turn in progress."));
        }
        if self.target.as_deref() == Some(token) {
            return Err(RoomError::TargetCannotGuess);
        }
        if !self.active.contains(token) {
            return Err(RoomError::NotActive);
        }
        let guess = parse_guess(raw)?;

        self.guesses.insert(token.to_string(), guess);
        self.publish_state(players, out);
        Ok(guess)
    }

    /// Score the turn: the target earns one point plus one per exact guess,
    /// each exact guesser earns one point.
    pub fn reveal(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        if self.phase != RatingPhase::Guessing {
            return Err(RoomError::WrongPhase("No turn in progress."));
        }
        let (Some(target), Some(rating)) = (self.target.clone(), self.rating) else {
            return Err(RoomError::WrongPhase("No turn in progress."));
        };

        let mut guesses: Vec<GuessResult> = self
            .guesses
            .iter()
            .filter(|(t, _)| self.active.contains(*t))
            .map(|(t, g)| GuessResult {
                token: t.clone(),
                name: players.name_of(t),
                guess: *g,
                hit: *g == rating,
            })
            .collect();
        guesses.sort_by(|a, b| a.name.cmp(&b.name));

        let hits = guesses.iter().filter(|g| g.hit).count();
        for g in guesses.iter().filter(|g| g.hit) {
            *self.scores.entry(g.token.clone()).or_insert(0) += 1;
        }
        *self.scores.entry(target.clone()).or_insert(0) += 1 + hits as u32;
        self.phase = RatingPhase::Revealed;
        tracing::info!(rating, hits, "Rating turn revealed");

        out.room(ServerMessage::RatingResults {
            target: players.player_ref(&target),
            rating,
            hits,
            guesses,
            scoreboard: self.scoreboard(players),
        });
        self.publish_state(players, out);
        Ok(())
    }

    /// Move the cycle pointer past the current target and start the next turn
    pub fn next_turn(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        // a removed target already left the pointer on its successor
        if self.order.get(self.index) == self.target.as_ref() {
            self.index += 1;
        }
        self.reset_turn();
        self.start_turn(players, out)
    }

    pub fn reset_scores(&mut self, players: &PlayerStore, out: &mut Outbox) {
        self.scores.clear();
        tracing::info!("Rating scores reset");
        self.publish_state(players, out);
    }

    fn start_cycle(&mut self, players: &PlayerStore, out: &mut Outbox) -> RoomResult<()> {
        let online = players.online_tokens();
        if online.len() < MIN_PLAYERS {
            self.reset_turn();
            return Err(RoomError::NotEnoughPlayers);
        }

        self.cycle += 1;
        self.active = online.iter().cloned().collect();
        self.order = shuffle(&online);
        self.index = 0;
        self.reset_turn();
        for token in &online {
            self.scores.entry(token.clone()).or_insert(0);
        }
        tracing::info!(cycle = self.cycle, players = online.len(), "Rating cycle started");

        out.room(ServerMessage::RatingCycleStarted {
            order: refs(&self.order, players),
        });
        Ok(())
    }

    /// Next online cycle member at or after the pointer. Does not wrap.
    fn next_target(&mut self, players: &PlayerStore) -> Option<Token> {
        while self.index < self.order.len() {
            let token = &self.order[self.index];
            if players.is_online(token) && self.active.contains(token) {
                return Some(token.clone());
            }
            self.index += 1;
        }
        None
    }

    fn reset_turn(&mut self) {
        self.phase = RatingPhase::Lobby;
        self.target = None;
        self.rating = None;
        self.guesses.clear();
    }

    /// Current players by points, highest first
    fn scoreboard(&self, players: &PlayerStore) -> Vec<ScoreEntry> {
        let mut board: Vec<ScoreEntry> = players
            .iter()
            .map(|p| ScoreEntry {
                token: p.token.clone(),
                name: p.name.clone(),
                points: self.score_of(&p.token),
            })
            .collect();
        board.sort_by(|a, b| b.points.cmp(&a.points));
        board
    }
}

impl PhaseEngine for RatingGame {
    fn game_type(&self) -> GameType {
        GameType::Rating
    }

    fn in_lobby(&self) -> bool {
        self.phase == RatingPhase::Lobby
    }

    fn active(&self) -> &HashSet<Token> {
        &self.active
    }

    fn remove_participant(&mut self, token: &str, players: &PlayerStore, out: &mut Outbox) {
        let was_target = self.phase == RatingPhase::Guessing && self.target.as_deref() == Some(token);

        self.active.remove(token);
        self.guesses.remove(token);
        self.scores.remove(token);
        if let Some(pos) = self.order.iter().position(|t| t == token) {
            self.order.remove(pos);
            // keep the pointer on the same upcoming target
            if pos < self.index {
                self.index -= 1;
            }
        }

        if self.active.len() < MIN_PLAYERS || self.order.len() < MIN_PLAYERS {
            if !self.in_lobby() {
                self.reset_turn();
                announce_cancelled(GameType::Rating, "Too few players left.", out);
            }
            return;
        }

        if was_target {
            out.room(ServerMessage::Notice {
                code: "TARGET_LEFT".to_string(),
                msg: "The target left. Moving on to the next player.".to_string(),
            });
            self.reset_turn();
            if let Err(e) = self.start_turn(players, out) {
                tracing::debug!("Could not start the next rating turn: {}", e);
            }
        }
    }

    fn publish_state(&self, players: &PlayerStore, out: &mut Outbox) {
        let guessed: HashSet<Token> = self.guesses.keys().cloned().collect();
        out.room(ServerMessage::RatingState {
            phase: self.phase,
            target: self.target.as_ref().map(|t| players.player_ref(t)),
            order: refs(&self.order, players),
            guessed: ordered(&guessed, players),
            scoreboard: self.scoreboard(players),
        });
    }

    fn catch_up(&self, token: &str, players: &PlayerStore, out: &mut Outbox) {
        if self.phase != RatingPhase::Guessing {
            return;
        }
        let (Some(target), Some(rating)) = (&self.target, self.rating) else {
            return;
        };
        if target == token {
            out.player(token, ServerMessage::RatingSecret { rating });
        } else if self.active.contains(token) {
            out.player(
                token,
                ServerMessage::RatingPromptGuess {
                    target: players.player_ref(target),
                },
            );
        }
    }
}

/// Accept a whole number from 1 to 10, sent either as a number or a string
fn parse_guess(raw: &serde_json::Value) -> RoomResult<u8> {
    let value = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or(RoomError::InvalidGuess)?;

    if value.fract() != 0.0 || value < f64::from(MIN_RATING) || value > f64::from(MAX_RATING) {
        return Err(RoomError::InvalidGuess);
    }
    Ok(value as u8)
}
