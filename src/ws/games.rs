//! Game action handlers
//!
//! Every action runs through [`AppState::room_action`]: the caller is resolved
//! from the connection, the master gate is applied where needed, and the room's
//! session is narrowed to the engine the action belongs to.

use super::handlers::respond;
use crate::protocol::ServerMessage;
use crate::state::{AppState, Gate};
use serde_json::Value;
use std::sync::Arc;

/// Run `$body` against the room's engine of the given kind
macro_rules! game_action {
    ($state:expr, $code:expr, $conn:expr, $gate:expr, $engine:ident,
     |$game:ident, $caller:pat_param, $players:ident, $out:ident| $body:expr) => {
        $state
            .room_action(&$code, $conn, $gate, |room, caller, $out| {
                let $caller = caller;
                let (session, $players) = room.game_parts();
                let $game = session.$engine()?;
                $body
            })
            .await
    };
}

// Ranking

pub async fn handle_ranking_distribute(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("distribute numbers"), ranking,
        |game, _, players, out| game.distribute(players, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_ranking_reveal(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("reveal the ranking"), ranking,
        |game, _, players, out| game.reveal(players, out)
    );
    respond(result.map(|_| None))
}

// Who-Am-I

pub async fn handle_who_am_i_start(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("start a round"), who_am_i,
        |game, _, players, out| game.start(players, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_who_am_i_submit(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
    text: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Member, who_am_i,
        |game, caller, players, out| game.submit(caller, &text, players, out)
    );
    respond(result.map(|_| Some(ServerMessage::WhoAmISubmitted)))
}

pub async fn handle_who_am_i_close_writing(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("close the writing phase"), who_am_i,
        |game, _, players, out| game.close_writing(players, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_who_am_i_reveal_to(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
    target_token: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("reveal characters"), who_am_i,
        |game, _, players, out| game.reveal_to(&target_token, players, out)
    );
    respond(result.map(|_| None))
}

// Spy

pub async fn handle_spy_start(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let catalog = state.catalog.clone();
    let result = game_action!(
        state, code, conn, Gate::Master("start a round"), spy,
        |game, _, players, out| game.start(players, &catalog, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_spy_submit_answer(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
    text: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Member, spy,
        |game, caller, players, out| game.submit_answer(caller, &text, players, out)
    );
    respond(result.map(|_| Some(ServerMessage::SpyAnswerAccepted)))
}

pub async fn handle_spy_reveal_answers(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("reveal the answers"), spy,
        |game, _, players, out| game.reveal_answers(players, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_spy_vote(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
    target_token: String,
) -> Option<ServerMessage> {
    let allow_self_vote = state.config.allow_self_vote;
    let result = game_action!(
        state, code, conn, Gate::Member, spy,
        |game, caller, players, out| {
            game.vote(caller, &target_token, allow_self_vote, players, out)
        }
    );
    respond(result.map(|_| {
        Some(ServerMessage::VoteAccepted {
            target: target_token,
        })
    }))
}

pub async fn handle_spy_reveal_spy(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("reveal the spy"), spy,
        |game, _, players, out| game.reveal_spy(players, out)
    );
    respond(result.map(|_| None))
}

// Infiltrator

pub async fn handle_infiltrator_start(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let catalog = state.catalog.clone();
    let result = game_action!(
        state, code, conn, Gate::Master("start a round"), infiltrator,
        |game, _, players, out| game.start(players, &catalog, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_infiltrator_next_round(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("advance the round"), infiltrator,
        |game, _, players, out| game.next_round(players, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_infiltrator_vote(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
    target_token: String,
) -> Option<ServerMessage> {
    let allow_self_vote = state.config.allow_self_vote;
    let result = game_action!(
        state, code, conn, Gate::Member, infiltrator,
        |game, caller, players, out| {
            game.vote(caller, &target_token, allow_self_vote, players, out)
        }
    );
    respond(result.map(|_| {
        Some(ServerMessage::VoteAccepted {
            target: target_token,
        })
    }))
}

pub async fn handle_infiltrator_reveal(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("reveal the infiltrator"), infiltrator,
        |game, _, players, out| game.reveal(players, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_infiltrator_reveal_concept(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("reveal the concept"), infiltrator,
        |game, _, players, out| game.reveal_concept(players, out)
    );
    respond(result.map(|_| None))
}

// Rating

pub async fn handle_rating_start_turn(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("start a turn"), rating,
        |game, _, players, out| game.start_turn(players, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_rating_submit_guess(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
    guess: Value,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Member, rating,
        |game, caller, players, out| game.submit_guess(caller, &guess, players, out)
    );
    respond(result.map(|guess| Some(ServerMessage::RatingGuessAccepted { guess })))
}

pub async fn handle_rating_reveal(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("reveal the rating"), rating,
        |game, _, players, out| game.reveal(players, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_rating_next_turn(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("advance the turn"), rating,
        |game, _, players, out| game.next_turn(players, out)
    );
    respond(result.map(|_| None))
}

pub async fn handle_rating_reset_scores(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    let result = game_action!(
        state, code, conn, Gate::Master("reset the scores"), rating,
        |game, _, players, out| {
            game.reset_scores(players, out);
            Ok(())
        }
    );
    respond(result.map(|_| None))
}
