//! Room lifecycle: create, join/resume, kick, leave, close, disconnect

use super::{AppState, Gate, Player, Room};
use crate::error::{RoomError, RoomResult};
use crate::outbox::Outbox;
use crate::protocol::ServerMessage;
use crate::types::*;
use rand::Rng;
use std::collections::HashMap;

const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

/// What a creator or joiner needs to resume later
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinInfo {
    pub code: RoomCode,
    pub game_type: GameType,
    pub session_key: SessionKey,
}

pub fn normalize_code(raw: &str) -> RoomCode {
    raw.trim().to_uppercase()
}

pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_CHARS.contains(&b))
}

/// Generate a random room code (6 characters, no 0/O/1/I)
pub fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Draw codes from `next` until one is not `taken`
fn first_unused(mut next: impl FnMut() -> RoomCode, taken: impl Fn(&str) -> bool) -> RoomCode {
    loop {
        let code = next();
        if !taken(&code) {
            return code;
        }
    }
}

fn unused_room_code(rooms: &HashMap<RoomCode, Room>) -> RoomCode {
    first_unused(generate_room_code, |code| rooms.contains_key(code))
}

fn new_session_key() -> SessionKey {
    hex::encode(rand::random::<[u8; 16]>())
}

impl AppState {
    /// Create a room and seat the creator as its master
    pub async fn create_room(
        &self,
        conn: &str,
        code: Option<&str>,
        password: &str,
        master_name: &str,
        game_type: GameType,
        token: &str,
    ) -> RoomResult<JoinInfo> {
        let name = master_name.trim();
        if name.is_empty() {
            return Err(RoomError::MissingField("name"));
        }
        if password.is_empty() {
            return Err(RoomError::MissingField("password"));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(RoomError::InvalidToken);
        }

        let mut rooms = self.rooms.write().await;
        let requested = code.map(normalize_code).filter(|c| !c.is_empty());
        let code = match requested {
            Some(code) => {
                if !is_valid_room_code(&code) {
                    return Err(RoomError::InvalidCode);
                }
                if rooms.contains_key(&code) {
                    return Err(RoomError::CodeTaken);
                }
                code
            }
            None => unused_room_code(&rooms),
        };

        let session_key = new_session_key();
        let mut room = Room::new(code.clone(), password.to_string(), game_type);
        room.players.insert(Player::new(
            token.to_string(),
            name.to_string(),
            conn.to_string(),
            session_key.clone(),
        ));
        room.ensure_game();

        let mut out = Outbox::default();
        room.set_master(token.to_string(), &mut out);
        room.publish(&mut out);

        tracing::info!(room = %code, game = %game_type, "Room created by {}", token);
        let room = rooms.entry(code.clone()).or_insert(room);
        self.deliver(Some(&*room), out).await;

        Ok(JoinInfo {
            code,
            game_type,
            session_key,
        })
    }

    /// Join a room, or resume a seat with a matching session key
    pub async fn join_room(
        &self,
        conn: &str,
        code: &str,
        password: &str,
        player_name: &str,
        token: &str,
        session_key: Option<&str>,
    ) -> RoomResult<JoinInfo> {
        let code = normalize_code(code);
        let token = token.trim();

        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(RoomError::RoomNotFound)?;
        if token.is_empty() {
            return Err(RoomError::InvalidToken);
        }
        if room.banned.contains(token) {
            return Err(RoomError::Banned);
        }

        let existing_key = room.players.get(token).map(|p| p.session_key.clone());
        let session_key = match (existing_key, session_key) {
            (Some(stored), Some(given)) if stored == given => stored,
            (existing, _) => {
                if room.password != password {
                    return Err(RoomError::WrongPassword);
                }
                if existing.is_none() && room.players.len() >= self.config.max_players {
                    return Err(RoomError::RoomFull);
                }
                new_session_key()
            }
        };

        let mut out = Outbox::default();

        // a connection speaks for one player per room
        let displaced: Vec<Token> = room
            .players
            .iter()
            .filter(|p| p.token != token && p.conn.as_deref() == Some(conn))
            .map(|p| p.token.clone())
            .collect();
        for other in displaced {
            if let Some(p) = room.players.get_mut(&other) {
                p.online = false;
                p.conn = None;
            }
            self.schedule_removal(room, &other);
        }

        let name = player_name.trim();
        match room.players.get_mut(token) {
            Some(player) => {
                if !name.is_empty() {
                    player.name = name.to_string();
                }
                player.conn = Some(conn.to_string());
                player.online = true;
                player.session_key = session_key.clone();
            }
            None => {
                let name = if name.is_empty() {
                    DEFAULT_PLAYER_NAME
                } else {
                    name
                };
                room.players.insert(Player::new(
                    token.to_string(),
                    name.to_string(),
                    conn.to_string(),
                    session_key.clone(),
                ));
            }
        }
        Self::cancel_removal(room, token);
        Self::cancel_empty_room(room);

        if room.master.is_none() {
            room.set_master(token.to_string(), &mut out);
        } else if room.is_master(token) {
            out.player(token, ServerMessage::Master { code: code.clone() });
        }

        room.ensure_game();
        room.publish(&mut out);
        if let Some(game) = room.game() {
            game.engine().catch_up(token, &room.players, &mut out);
        }

        tracing::info!(room = %code, "{} joined ({} players)", token, room.players.len());
        let game_type = room.game_type;
        self.deliver(Some(&*room), out).await;

        Ok(JoinInfo {
            code,
            game_type,
            session_key,
        })
    }

    /// Ban and remove a player. Kicking the master is a no-op.
    pub async fn kick_player(&self, conn: &str, code: &str, target: &str) -> RoomResult<()> {
        let target = target.trim().to_string();
        self.room_action(code, conn, Gate::Master("kick players"), |room, _, out| {
            if target.is_empty() || room.is_master(&target) {
                return Ok(());
            }
            room.banned.insert(target.clone());

            if let Some(target_conn) = room.players.get(&target).and_then(|p| p.conn.clone()) {
                out.conn(
                    target_conn.clone(),
                    ServerMessage::Kicked {
                        code: room.code.clone(),
                        reason: "You were kicked by the master.".to_string(),
                    },
                );
                out.disconnect(target_conn);
            }
            room.remove_player(&target, out);
            tracing::info!(room = %room.code, "Kicked {}", target);
            Ok(())
        })
        .await
    }

    /// Leave for good. The master leaving closes the room.
    pub async fn leave_room(&self, conn: &str, code: &str) -> RoomResult<()> {
        let code = normalize_code(code);
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&code).ok_or(RoomError::UnknownCaller)?;
        let caller = room
            .players
            .token_for_conn(conn)
            .ok_or(RoomError::UnknownCaller)?;

        if room.is_master(&caller) {
            self.close_locked(&mut rooms, &code, "The master left the room.")
                .await;
            return Ok(());
        }

        let mut out = Outbox::default();
        out.conn(conn, ServerMessage::Left { code: code.clone() });
        room.remove_player(&caller, &mut out);
        if room.players.is_empty() {
            self.schedule_empty_room(room);
        }
        tracing::info!(room = %code, "{} left", caller);
        self.deliver(Some(&*room), out).await;
        Ok(())
    }

    pub async fn close_room(&self, conn: &str, code: &str) -> RoomResult<()> {
        let code = normalize_code(code);
        let mut rooms = self.rooms.write().await;
        let room = rooms.get(&code).ok_or(RoomError::UnknownCaller)?;
        let caller = room
            .players
            .token_for_conn(conn)
            .ok_or(RoomError::UnknownCaller)?;
        if !room.is_master(&caller) {
            return Err(RoomError::NotMaster("close the room"));
        }

        self.close_locked(&mut rooms, &code, "The master closed the room.")
            .await;
        Ok(())
    }

    async fn close_locked(&self, rooms: &mut HashMap<RoomCode, Room>, code: &str, reason: &str) {
        let Some(mut room) = rooms.remove(code) else {
            return;
        };
        room.cancel_timers();

        let mut out = Outbox::default();
        for conn in room.players.connections() {
            out.conn(
                conn,
                ServerMessage::RoomClosed {
                    code: room.code.clone(),
                    reason: reason.to_string(),
                },
            );
        }
        tracing::info!(room = %code, created_at = %room.created_at, "Room closed: {}", reason);
        self.deliver(None, out).await;
    }

    /// Mark every player behind `conn` offline and start their grace period
    pub async fn handle_disconnect(&self, conn: &str) {
        let mut rooms = self.rooms.write().await;
        for room in rooms.values_mut() {
            let Some(token) = room.players.token_for_conn(conn) else {
                continue;
            };
            if let Some(player) = room.players.get_mut(&token) {
                player.online = false;
                player.conn = None;
            }
            self.schedule_removal(room, &token);

            let mut out = Outbox::default();
            room.publish(&mut out);
            tracing::info!(room = %room.code, "{} disconnected", token);
            self.deliver(Some(&*room), out).await;
        }
    }
}
