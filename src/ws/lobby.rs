//! Room lifecycle handlers: create, join, kick, leave, close

use super::handlers::respond;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{GameType, SessionKey};
use std::sync::Arc;

pub async fn handle_create_room(
    state: &Arc<AppState>,
    conn: &str,
    code: Option<String>,
    password: String,
    master_name: String,
    game_type: GameType,
    player_token: String,
) -> Option<ServerMessage> {
    tracing::info!("Create room request ({})", game_type);
    let result = state
        .create_room(
            conn,
            code.as_deref(),
            &password,
            &master_name,
            game_type,
            &player_token,
        )
        .await
        .map(|info| {
            Some(ServerMessage::RoomCreated {
                code: info.code,
                game_type: info.game_type,
                session_key: info.session_key,
            })
        });
    respond(result)
}

pub async fn handle_join_room(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
    password: String,
    player_name: String,
    player_token: String,
    session_key: Option<SessionKey>,
) -> Option<ServerMessage> {
    tracing::info!("Join request for room {}", code);
    let result = state
        .join_room(
            conn,
            &code,
            &password,
            &player_name,
            &player_token,
            session_key.as_deref(),
        )
        .await
        .map(|info| {
            Some(ServerMessage::Joined {
                code: info.code,
                game_type: info.game_type,
                session_key: info.session_key,
            })
        });
    respond(result)
}

pub async fn handle_kick_player(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
    target_token: String,
) -> Option<ServerMessage> {
    respond(
        state
            .kick_player(conn, &code, &target_token)
            .await
            .map(|_| None),
    )
}

pub async fn handle_leave_room(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    respond(state.leave_room(conn, &code).await.map(|_| None))
}

pub async fn handle_close_room(
    state: &Arc<AppState>,
    conn: &str,
    code: String,
) -> Option<ServerMessage> {
    respond(state.close_room(conn, &code).await.map(|_| None))
}
