//! Connection hub: one outbound channel per live socket

use crate::protocol::ServerMessage;
use crate::types::ConnId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

#[derive(Clone, Default)]
pub struct Hub {
    connections: Arc<RwLock<HashMap<ConnId, mpsc::UnboundedSender<ServerMessage>>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and hand back its id and inbound queue
    pub async fn register(&self) -> (ConnId, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = ulid::Ulid::new().to_string();
        self.connections.write().await.insert(conn.clone(), tx);
        (conn, rx)
    }

    pub async fn unregister(&self, conn: &ConnId) {
        self.connections.write().await.remove(conn);
    }

    /// Queue a message for one connection. Returns false if it is gone.
    pub async fn send(&self, conn: &ConnId, msg: ServerMessage) -> bool {
        match self.connections.read().await.get(conn) {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Drop the sender so the socket loop sees its queue end and hangs up
    pub async fn close(&self, conn: &ConnId) {
        if self.connections.write().await.remove(conn).is_some() {
            tracing::debug!("Closing connection {}", conn);
        }
    }

    pub async fn is_connected(&self, conn: &ConnId) -> bool {
        self.connections.read().await.contains_key(conn)
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_registered_connection() {
        let hub = Hub::new();
        let (conn, mut rx) = hub.register().await;

        assert!(hub.send(&conn, ServerMessage::RankingNewRound).await);
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::RankingNewRound)));
    }

    #[tokio::test]
    async fn test_close_ends_receiver() {
        let hub = Hub::new();
        let (conn, mut rx) = hub.register().await;
        hub.close(&conn).await;

        assert!(!hub.is_connected(&conn).await);
        assert!(rx.recv().await.is_none());
        assert!(!hub.send(&conn, ServerMessage::RankingNewRound).await);
    }

    #[tokio::test]
    async fn test_register_assigns_unique_ids() {
        let hub = Hub::new();
        let (a, _rx_a) = hub.register().await;
        let (b, _rx_b) = hub.register().await;

        assert_ne!(a, b);
        assert_eq!(hub.len().await, 2);
        hub.unregister(&a).await;
        assert_eq!(hub.len().await, 1);
    }
}
