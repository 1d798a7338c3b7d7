//! Messages produced by one action, delivered after the action completes
//!
//! Rooms and game engines never talk to connections directly. They push
//! [`Outgoing`] entries here and the state layer resolves audiences against the
//! room roster once the mutation is done.

use crate::protocol::ServerMessage;
use crate::types::{ConnId, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every connected player of the room
    Room,
    /// The current connection of one player, resolved at delivery time
    Player(Token),
    /// A specific connection, for players that are no longer in the roster
    Conn(ConnId),
}

#[derive(Debug, Clone)]
pub struct Outgoing {
    pub to: Audience,
    pub msg: ServerMessage,
}

#[derive(Debug, Default)]
pub struct Outbox {
    items: Vec<Outgoing>,
    disconnects: Vec<ConnId>,
}

impl Outbox {
    pub fn room(&mut self, msg: ServerMessage) {
        self.items.push(Outgoing {
            to: Audience::Room,
            msg,
        });
    }

    pub fn player(&mut self, token: impl Into<Token>, msg: ServerMessage) {
        self.items.push(Outgoing {
            to: Audience::Player(token.into()),
            msg,
        });
    }

    pub fn conn(&mut self, conn: impl Into<ConnId>, msg: ServerMessage) {
        self.items.push(Outgoing {
            to: Audience::Conn(conn.into()),
            msg,
        });
    }

    /// Close a connection after all queued messages went out
    pub fn disconnect(&mut self, conn: impl Into<ConnId>) {
        self.disconnects.push(conn.into());
    }

    pub fn into_parts(self) -> (Vec<Outgoing>, Vec<ConnId>) {
        (self.items, self.disconnects)
    }
}

#[cfg(test)]
impl Outbox {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.disconnects.is_empty()
    }

    /// Messages addressed to exactly this audience
    pub fn to(&self, audience: &Audience) -> Vec<&ServerMessage> {
        self.items
            .iter()
            .filter(|o| &o.to == audience)
            .map(|o| &o.msg)
            .collect()
    }

    /// Messages addressed privately to `token`
    pub fn to_player(&self, token: &str) -> Vec<&ServerMessage> {
        self.to(&Audience::Player(token.to_string()))
    }

    pub fn to_room(&self) -> Vec<&ServerMessage> {
        self.to(&Audience::Room)
    }
}
