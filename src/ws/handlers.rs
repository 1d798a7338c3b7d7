//! WebSocket message dispatch
//!
//! Entry point for every inbound [`ClientMessage`]. Lifecycle actions go to
//! [`lobby`], game actions to [`games`]; both report failures through
//! [`respond`].

use crate::error::{ErrorKind, RoomResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

use super::{games, lobby};

/// Turn an action result into the direct reply for the caller.
///
/// Round failures were already announced to the whole room, and actions from
/// connections that map to no player are dropped.
pub(crate) fn respond(result: RoomResult<Option<ServerMessage>>) -> Option<ServerMessage> {
    match result {
        Ok(reply) => reply,
        Err(e) if e.is_silent() => {
            tracing::debug!("Ignoring action: {}", e);
            None
        }
        Err(e) if e.kind() == ErrorKind::RoundFailure => None,
        Err(e) => {
            tracing::warn!("Rejected action: {} ({})", e, e.code());
            Some(ServerMessage::from(&e))
        }
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &str,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateRoom {
            code,
            password,
            master_name,
            game_type,
            player_token,
        } => {
            lobby::handle_create_room(
                state,
                conn,
                code,
                password,
                master_name,
                game_type,
                player_token,
            )
            .await
        }

        ClientMessage::JoinRoom {
            code,
            password,
            player_name,
            player_token,
            session_key,
        } => {
            lobby::handle_join_room(
                state,
                conn,
                code,
                password,
                player_name,
                player_token,
                session_key,
            )
            .await
        }

        ClientMessage::KickPlayer { code, target_token } => {
            lobby::handle_kick_player(state, conn, code, target_token).await
        }
        ClientMessage::LeaveRoom { code } => lobby::handle_leave_room(state, conn, code).await,
        ClientMessage::CloseRoom { code } => lobby::handle_close_room(state, conn, code).await,

        // Ranking
        ClientMessage::RankingDistribute { code } => {
            games::handle_ranking_distribute(state, conn, code).await
        }
        ClientMessage::RankingReveal { code } => {
            games::handle_ranking_reveal(state, conn, code).await
        }

        // Who-Am-I
        ClientMessage::WhoAmIStart { code } => {
            games::handle_who_am_i_start(state, conn, code).await
        }
        ClientMessage::WhoAmISubmit { code, text } => {
            games::handle_who_am_i_submit(state, conn, code, text).await
        }
        ClientMessage::WhoAmICloseWriting { code } => {
            games::handle_who_am_i_close_writing(state, conn, code).await
        }
        ClientMessage::WhoAmIRevealTo { code, target_token } => {
            games::handle_who_am_i_reveal_to(state, conn, code, target_token).await
        }

        // Spy
        ClientMessage::SpyStart { code } => games::handle_spy_start(state, conn, code).await,
        ClientMessage::SpySubmitAnswer { code, text } => {
            games::handle_spy_submit_answer(state, conn, code, text).await
        }
        ClientMessage::SpyRevealAnswers { code } => {
            games::handle_spy_reveal_answers(state, conn, code).await
        }
        ClientMessage::SpyVote { code, target_token } => {
            games::handle_spy_vote(state, conn, code, target_token).await
        }
        ClientMessage::SpyRevealSpy { code } => {
            games::handle_spy_reveal_spy(state, conn, code).await
        }

        // Infiltrator
        ClientMessage::InfiltratorStart { code } => {
            games::handle_infiltrator_start(state, conn, code).await
        }
        ClientMessage::InfiltratorNextRound { code } => {
            games::handle_infiltrator_next_round(state, conn, code).await
        }
        ClientMessage::InfiltratorVote { code, target_token } => {
            games::handle_infiltrator_vote(state, conn, code, target_token).await
        }
        ClientMessage::InfiltratorReveal { code } => {
            games::handle_infiltrator_reveal(state, conn, code).await
        }
        ClientMessage::InfiltratorRevealConcept { code } => {
            games::handle_infiltrator_reveal_concept(state, conn, code).await
        }

        // Rating
        ClientMessage::RatingStartTurn { code } => {
            games::handle_rating_start_turn(state, conn, code).await
        }
        ClientMessage::RatingSubmitGuess { code, guess } => {
            games::handle_rating_submit_guess(state, conn, code, guess).await
        }
        ClientMessage::RatingReveal { code } => {
            games::handle_rating_reveal(state, conn, code).await
        }
        ClientMessage::RatingNextTurn { code } => {
            games::handle_rating_next_turn(state, conn, code).await
        }
        ClientMessage::RatingResetScores { code } => {
            games::handle_rating_reset_scores(state, conn, code).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::ServerConfig;
    use crate::error::RoomError;
    use crate::types::GameType;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(
            ServerConfig::default(),
            Catalog::embedded().unwrap(),
        ))
    }

    async fn create(state: &Arc<AppState>, conn: &str, game_type: GameType) -> String {
        let reply = handle_message(
            ClientMessage::CreateRoom {
                code: None,
                password: "pw".to_string(),
                master_name: "Ana".to_string(),
                game_type,
                player_token: "tok-ana".to_string(),
            },
            conn,
            state,
        )
        .await;
        match reply {
            Some(ServerMessage::RoomCreated { code, .. }) => code,
            other => panic!("expected room_created, got {:?}", other),
        }
    }

    #[test]
    fn test_respond_routes_errors() {
        assert!(respond(Err(RoomError::UnknownCaller)).is_none());
        assert!(respond(Err(RoomError::VoteTie)).is_none());
        match respond(Err(RoomError::WrongPassword)) {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "WRONG_PASSWORD"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_master_command() {
        let state = state();
        let (master, _rx) = state.hub.register().await;
        let (guest, _rx2) = state.hub.register().await;
        let code = create(&state, &master, GameType::Ranking).await;

        let joined = handle_message(
            ClientMessage::JoinRoom {
                code: code.clone(),
                password: "pw".to_string(),
                player_name: "Bea".to_string(),
                player_token: "tok-bea".to_string(),
                session_key: None,
            },
            &guest,
            &state,
        )
        .await;
        assert!(matches!(joined, Some(ServerMessage::Joined { .. })));

        let result =
            handle_message(ClientMessage::RankingDistribute { code }, &guest, &state).await;
        match result {
            Some(ServerMessage::Error { code, msg }) => {
                assert_eq!(code, "NOT_MASTER");
                assert_eq!(msg, "Only the master can distribute numbers");
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_connection_is_ignored() {
        let state = state();
        let (master, _rx) = state.hub.register().await;
        let code = create(&state, &master, GameType::Spy).await;

        let result = handle_message(
            ClientMessage::SpySubmitAnswer {
                code,
                text: "hello".to_string(),
            },
            "not-a-connection",
            &state,
        )
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_wrong_game_is_rejected() {
        let state = state();
        let (master, _rx) = state.hub.register().await;
        let code = create(&state, &master, GameType::Rating).await;

        let result = handle_message(ClientMessage::SpyStart { code }, &master, &state).await;
        match result {
            Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "WRONG_GAME"),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_round_failure_has_no_direct_reply() {
        let state = state();
        let (master, mut rx) = state.hub.register().await;
        let code = create(&state, &master, GameType::WhoAmI).await;
        while rx.try_recv().is_ok() {}

        let result = handle_message(ClientMessage::WhoAmIStart { code }, &master, &state).await;
        assert!(result.is_none());

        let mut saw_notice = false;
        while let Ok(msg) = rx.try_recv() {
            if let ServerMessage::Notice { code, .. } = msg {
                assert_eq!(code, "NOT_ENOUGH_PLAYERS");
                saw_notice = true;
            }
        }
        assert!(saw_notice);
    }
}
