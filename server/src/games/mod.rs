//! Turn-based game engines
//!
//! The server plays a closed set of variants. Each running engine owns its
//! [`Table`]: the seated sessions, their input channels and the bookkeeping
//! that hands every participant back to the lobby exactly once, whichever
//! way the game ends.

pub mod blackjack;
pub mod card;
pub mod deck;
pub mod tictactoe;

use crate::context::{wait_until, ServerContext};
use crate::error::{Result, ServerError};
use crate::queue::GameKind;
use crate::registry::Lineup;
use crate::session::Session;
use blackjack::Blackjack;
use log::{info, warn};
use shared::Keyword;
use std::sync::Arc;
use tictactoe::TicTacToe;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// How an engine's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEnd {
    /// Someone won, or the players chose to stop
    Normal,
    /// Board filled without a winner
    Draw,
    /// A participant left or the server is shutting down
    Error,
}

impl GameEnd {
    pub fn reason(self) -> &'static str {
        match self {
            GameEnd::Normal => "normal end",
            GameEnd::Draw => "draw",
            GameEnd::Error => "communication error",
        }
    }
}

/// One participant as seen by an engine: the session handle and the lines
/// its session task forwards while it is seated.
pub struct Seat {
    session: Arc<Session>,
    input: mpsc::UnboundedReceiver<String>,
}

impl Seat {
    pub fn new(session: Arc<Session>, input: mpsc::UnboundedReceiver<String>) -> Self {
        Self { session, input }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    #[cfg(test)]
    pub(crate) fn try_next_line(&mut self) -> std::result::Result<String, mpsc::error::TryRecvError> {
        self.input.try_recv()
    }

    /// Drops whatever the client typed while it was not its turn.
    fn discard_pending(&mut self) {
        while self.input.try_recv().is_ok() {}
    }
}

/// Participants of one engine and the I/O helpers engines play through.
pub struct Table {
    ctx: ServerContext,
    kind: GameKind,
    instance: u32,
    seats: Vec<Seat>,
    shutdown: watch::Receiver<bool>,
    released: bool,
}

impl Table {
    /// Fails if the lineup does not fit the variant's seat range.
    pub fn new(ctx: ServerContext, lineup: Lineup) -> Result<Self> {
        let kind = lineup.key.kind();
        let range = kind.player_counts();
        if !range.contains(&lineup.seats.len()) {
            return Err(ServerError::InvalidPlayerCount {
                kind,
                requested: lineup.seats.len(),
                min: *range.start(),
                max: *range.end(),
            });
        }

        let shutdown = ctx.shutdown_signal();
        Ok(Self {
            ctx,
            kind,
            instance: lineup.instance,
            seats: lineup.seats,
            shutdown,
            released: false,
        })
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    /// Engine name used in logs and by the admin console, e.g. `Blackjack4`.
    pub fn label(&self) -> String {
        format!("{}{}", self.kind, self.instance)
    }

    pub(crate) fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn session(&self, seat: usize) -> &Arc<Session> {
        &self.seats[seat].session
    }

    pub fn ctx(&self) -> &ServerContext {
        &self.ctx
    }

    pub fn send(&self, seat: usize, msg: &str) {
        self.seats[seat].session.send(msg);
    }

    /// Sends to every participant still connected; a failed recipient does
    /// not hold up the others.
    pub fn broadcast(&self, msg: &str) {
        for seat in &self.seats {
            seat.session.send(msg);
        }
    }

    pub fn begin_turn(&mut self, seat: usize) {
        self.seats[seat].discard_pending();
        self.seats[seat].session.set_turn(true);
    }

    pub fn end_turn(&self, seat: usize) {
        self.seats[seat].session.set_turn(false);
    }

    /// Waits for the participant's next line. `None` means the participant is
    /// gone: disconnected, typed `exit`, or the server is shutting down.
    pub async fn read_line(&mut self, seat: usize) -> Option<String> {
        let input = &mut self.seats[seat].input;
        let line = tokio::select! {
            line = input.recv() => line,
            _ = wait_until(&mut self.shutdown, true) => None,
        }?;

        if Keyword::parse(&line) == Some(Keyword::Exit) {
            return None;
        }
        Some(line)
    }

    /// Disconnect path: drops the leaver's connection, warns the others and
    /// sends everyone back to the lobby.
    pub async fn emergency_shutdown(&mut self, leaver: usize, notices: &[&str]) {
        warn!(
            "{}: {} left mid-game, closing the table",
            self.label(),
            self.seats[leaver].session
        );
        self.ctx.disconnect(&self.seats[leaver].session).await;

        for (i, seat) in self.seats.iter().enumerate() {
            if i != leaver {
                for notice in notices {
                    seat.session.send(*notice);
                }
            }
        }
        self.release_all().await;
    }

    /// Returns every participant to idle. Later calls do nothing.
    pub async fn release_all(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for seat in &self.seats {
            self.ctx
                .release(&seat.session, self.kind, self.instance)
                .await;
        }
    }
}

/// A running game, one variant per tag.
pub enum GameEngine {
    TicTacToe(TicTacToe),
    Blackjack(Blackjack),
}

impl GameEngine {
    /// Builds the engine matching the lineup's queue.
    pub fn new(ctx: &ServerContext, lineup: Lineup) -> Result<Self> {
        let table = Table::new(ctx.clone(), lineup)?;
        Ok(match table.kind() {
            GameKind::TicTacToe => GameEngine::TicTacToe(TicTacToe::new(table)),
            GameKind::Blackjack => {
                let decks = ctx.config().shoe_decks;
                GameEngine::Blackjack(Blackjack::new(table, decks))
            }
        })
    }

    fn table(&self) -> &Table {
        match self {
            GameEngine::TicTacToe(game) => game.table(),
            GameEngine::Blackjack(game) => game.table(),
        }
    }

    pub fn kind(&self) -> GameKind {
        self.table().kind()
    }

    pub fn instance_number(&self) -> u32 {
        self.table().instance()
    }

    /// Plays the game to its end on the current task.
    pub async fn run(self) -> GameEnd {
        let ctx = self.table().ctx().clone();
        let (kind, instance) = (self.kind(), self.instance_number());
        let label = self.table().label();

        let end = match self {
            GameEngine::TicTacToe(game) => game.run().await,
            GameEngine::Blackjack(game) => game.run().await,
        };

        info!("{} finished: {}", label, end.reason());
        ctx.game_finished(kind, instance).await;
        end
    }

    /// Runs the engine on its own task.
    pub fn spawn(self) -> JoinHandle<GameEnd> {
        tokio::spawn(self.run())
    }
}
