mod players;
mod room;
mod rooms;
mod timers;

pub use players::{Player, PlayerStore};
pub use room::Room;
pub use rooms::{generate_room_code, is_valid_room_code, normalize_code, JoinInfo};
pub use timers::PendingTimer;

use crate::catalog::Catalog;
use crate::config::ServerConfig;
use crate::error::{ErrorKind, RoomError, RoomResult};
use crate::hub::Hub;
use crate::outbox::{Audience, Outbox, Outgoing};
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomCode, Room>>>,
    pub hub: Hub,
    pub config: Arc<ServerConfig>,
    pub catalog: Arc<Catalog>,
    timer_seq: Arc<AtomicU64>,
}

/// Who may perform a room action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Any player of the room
    Member,
    /// Only the master; the text completes "Only the master can ..."
    Master(&'static str),
}

impl AppState {
    pub fn new(config: ServerConfig, catalog: Catalog) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            hub: Hub::new(),
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            timer_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Run `action` against a room on behalf of the player behind `conn`.
    ///
    /// The registry stays locked for the whole action, so actions on a room
    /// are applied strictly one after another. Round failures are announced to
    /// the room as a notice and still returned to the caller.
    pub async fn room_action<R, F>(
        &self,
        code: &str,
        conn: &str,
        gate: Gate,
        action: F,
    ) -> RoomResult<R>
    where
        F: FnOnce(&mut Room, &Token, &mut Outbox) -> RoomResult<R>,
    {
        let code = normalize_code(code);
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(RoomError::UnknownCaller)?;
        let caller = room
            .players
            .token_for_conn(conn)
            .ok_or(RoomError::UnknownCaller)?;
        if let Gate::Master(what) = gate {
            if !room.is_master(&caller) {
                return Err(RoomError::NotMaster(what));
            }
        }

        let mut out = Outbox::default();
        let result = action(room, &caller, &mut out);
        if let Err(e) = &result {
            if e.kind() == ErrorKind::RoundFailure {
                tracing::info!(room = %code, "Round failure: {}", e);
                out.room(ServerMessage::Notice {
                    code: e.code().to_string(),
                    msg: e.to_string(),
                });
            }
        }
        self.deliver(Some(&*room), out).await;
        result
    }

    /// Send queued messages, resolving room and player audiences against `room`
    pub(crate) async fn deliver(&self, room: Option<&Room>, out: Outbox) {
        let (items, disconnects) = out.into_parts();
        for Outgoing { to, msg } in items {
            match to {
                Audience::Room => {
                    let Some(room) = room else { continue };
                    for conn in room.players.connections() {
                        self.hub.send(&conn, msg.clone()).await;
                    }
                }
                Audience::Player(token) => {
                    let conn = room
                        .and_then(|r| r.players.get(&token))
                        .and_then(|p| p.conn.clone());
                    if let Some(conn) = conn {
                        self.hub.send(&conn, msg).await;
                    }
                }
                Audience::Conn(conn) => {
                    self.hub.send(&conn, msg).await;
                }
            }
        }
        for conn in disconnects {
            self.hub.close(&conn).await;
        }
    }

    pub async fn room_exists(&self, code: &str) -> bool {
        self.rooms.read().await.contains_key(&normalize_code(code))
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn has_player(&self, code: &str, token: &str) -> bool {
        self.rooms
            .read()
            .await
            .get(&normalize_code(code))
            .is_some_and(|r| r.players.contains(token))
    }

    pub async fn master_of(&self, code: &str) -> Option<Token> {
        self.rooms
            .read()
            .await
            .get(&normalize_code(code))
            .and_then(|r| r.master.clone())
    }

    pub async fn session_key_of(&self, code: &str, token: &str) -> Option<SessionKey> {
        self.rooms
            .read()
            .await
            .get(&normalize_code(code))
            .and_then(|r| r.players.get(token))
            .map(|p| p.session_key.clone())
    }

    pub async fn is_online(&self, code: &str, token: &str) -> bool {
        self.rooms
            .read()
            .await
            .get(&normalize_code(code))
            .is_some_and(|r| r.players.is_online(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(ServerConfig::default(), Catalog::embedded().unwrap())
    }

    #[tokio::test]
    async fn test_room_action_requires_known_caller() {
        let state = state();
        let (conn, _rx) = state.hub.register().await;
        let created = state
            .create_room(&conn, None, "pw", "Ana", GameType::Ranking, "tok-ana")
            .await
            .unwrap();

        let (stranger, _rx2) = state.hub.register().await;
        let result = state
            .room_action(&created.code, &stranger, Gate::Member, |_, _, _| Ok(()))
            .await;
        assert_eq!(result, Err(RoomError::UnknownCaller));

        let result = state
            .room_action("nope", &conn, Gate::Member, |_, _, _| Ok(()))
            .await;
        assert_eq!(result, Err(RoomError::UnknownCaller));
    }

    #[tokio::test]
    async fn test_master_gate() {
        let state = state();
        let (master, _rx) = state.hub.register().await;
        let (guest, _rx2) = state.hub.register().await;
        let created = state
            .create_room(&master, None, "pw", "Ana", GameType::Ranking, "tok-ana")
            .await
            .unwrap();
        state
            .join_room(&guest, &created.code, "pw", "Bea", "tok-bea", None)
            .await
            .unwrap();

        let result = state
            .room_action(
                &created.code,
                &guest,
                Gate::Master("reveal"),
                |_, _, _| Ok(()),
            )
            .await;
        assert_eq!(result, Err(RoomError::NotMaster("reveal")));

        let caller = state
            .room_action(
                &created.code.to_lowercase(),
                &master,
                Gate::Master("reveal"),
                |_, caller, _| Ok(caller.clone()),
            )
            .await;
        assert_eq!(caller, Ok("tok-ana".to_string()));
    }

    #[tokio::test]
    async fn test_round_failure_is_broadcast() {
        let state = state();
        let (master, mut rx) = state.hub.register().await;
        let created = state
            .create_room(&master, None, "pw", "Ana", GameType::Ranking, "tok-ana")
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}

        let result: RoomResult<()> = state
            .room_action(&created.code, &master, Gate::Member, |_, _, _| {
                Err(RoomError::VoteTie)
            })
            .await;
        assert_eq!(result, Err(RoomError::VoteTie));

        match rx.try_recv() {
            Ok(ServerMessage::Notice { code, .. }) => assert_eq!(code, "VOTE_TIE"),
            other => panic!("expected notice, got {:?}", other),
        }
    }
}
