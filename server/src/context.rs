//! Server context shared by every task
//!
//! Built once by the entry point and cloned into the listener, the matchmaking
//! task, each session and each engine. All registry access goes through the
//! lock held here and the lock is never kept across network or engine awaits.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::queue::{GameKind, QueueKey};
use crate::registry::{Lineup, Membership, Registry};
use crate::session::{Outbound, Session, GAME_MENU};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::SHUTDOWN_SENTINEL;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};

#[derive(Clone)]
pub struct ServerContext {
    registry: Arc<RwLock<Registry>>,
    config: Arc<ServerConfig>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            config: Arc::new(config),
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs `f` against a read-locked registry.
    pub async fn read<T>(&self, f: impl FnOnce(&Registry) -> T) -> T {
        let registry = self.registry.read().await;
        f(&registry)
    }

    pub async fn register(&self, outbound: mpsc::UnboundedSender<Outbound>) -> Arc<Session> {
        self.registry.write().await.register(outbound)
    }

    pub async fn membership(&self, id: u64) -> Option<Membership> {
        self.registry.read().await.membership(id)
    }

    pub async fn is_idle(&self, id: u64) -> bool {
        self.membership(id).await == Some(Membership::Idle)
    }

    pub async fn enqueue(&self, id: u64, key: QueueKey) -> Result<()> {
        self.registry.write().await.enqueue(id, key)
    }

    pub async fn leave_queue(&self, id: u64) -> Option<QueueKey> {
        self.registry.write().await.leave_queue(id)
    }

    pub async fn game_input(&self, id: u64) -> Option<mpsc::UnboundedSender<String>> {
        self.registry.read().await.game_input(id)
    }

    pub async fn queue_len(&self, key: &QueueKey) -> usize {
        self.registry.read().await.queue_len(key)
    }

    /// Unregisters and closes a session. Safe to call more than once.
    pub async fn disconnect(&self, session: &Session) {
        let removed = self.registry.write().await.remove(session.id());
        session.close();
        if removed.is_some() {
            debug!("Client {} removed from registry", session.id());
        }
    }

    /// Hands a seated session back to the lobby and shows it the game menu.
    /// Returns false when the seat was already released.
    pub async fn release(&self, session: &Session, kind: GameKind, instance: u32) -> bool {
        let released = self
            .registry
            .write()
            .await
            .release(session.id(), kind, instance);
        if released {
            session.send(GAME_MENU);
        }
        released
    }

    pub async fn game_finished(&self, kind: GameKind, instance: u32) {
        self.registry.write().await.game_finished(kind, instance);
    }

    pub async fn sweep_disconnected(&self) -> Vec<Arc<Session>> {
        self.registry.write().await.sweep_disconnected()
    }

    pub async fn queued(&self) -> Vec<(QueueKey, Arc<Session>)> {
        self.registry.read().await.queued()
    }

    /// Pulls every full table out of the queues.
    pub async fn form_matches(&self) -> Vec<Lineup> {
        let mut rng = StdRng::from_entropy();
        self.registry.write().await.form_matches(&mut rng)
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Tells every client the server is closing, then closes every socket.
    pub async fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        info!("Server shutting down");

        let sessions = self.registry.read().await.sessions();
        for session in sessions {
            session.send(SHUTDOWN_SENTINEL);
            session.close();
        }
    }
}

/// Resolves once the watched flag equals `value`. Pends forever if the
/// sender is gone before that happens.
pub async fn wait_until(rx: &mut watch::Receiver<bool>, value: bool) {
    loop {
        if *rx.borrow_and_update() == value {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_shutdown_broadcasts_sentinel() {
        let ctx = ServerContext::new(ServerConfig::default());
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = ctx.register(tx_a).await;
        let b = ctx.register(tx_b).await;

        ctx.shutdown().await;
        ctx.shutdown().await;

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.try_recv().unwrap(), Outbound::Line(SHUTDOWN_SENTINEL.into()));
            assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
            assert!(rx.try_recv().is_err());
        }
        assert!(!a.is_connected());
        assert!(!b.is_connected());
        assert!(ctx.is_shutting_down());
    }

    #[tokio::test]
    async fn test_release_sends_menu_once() {
        let ctx = ServerContext::new(ServerConfig::default());
        let (mut lineup, mut clients) = testing::seat(&ctx, GameKind::TicTacToe, 2).await;
        let seat = lineup.seats.remove(0);

        assert!(ctx.release(seat.session(), GameKind::TicTacToe, lineup.instance).await);
        assert!(!ctx.release(seat.session(), GameKind::TicTacToe, lineup.instance).await);

        let menus = clients[0]
            .received()
            .iter()
            .filter(|l| l.as_str() == GAME_MENU)
            .count();
        assert_eq!(menus, 1);
        assert!(ctx.is_idle(seat.session().id()).await);
    }

    #[tokio::test]
    async fn test_wait_until() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move { wait_until(&mut rx, true).await });

        tx.send_replace(true);
        assert!(timeout(Duration::from_secs(1), waiter).await.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let ctx = ServerContext::new(ServerConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = ctx.register(tx).await;

        ctx.disconnect(&session).await;
        ctx.disconnect(&session).await;

        assert_eq!(ctx.membership(session.id()).await, None);
        assert!(!session.is_connected());
    }
}
