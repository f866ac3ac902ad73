//! Per-connection session actor
//!
//! Each accepted connection gets two tasks:
//! - the writer task drains the session's outbound queue into the socket,
//! - the session task owns the read half, runs the name/menu dialogue and,
//!   once the session is seated at a table, forwards every line to the engine.
//!
//! Other tasks only ever talk to a session through its [`Session`] handle.

use crate::context::{wait_until, ServerContext};
use crate::queue::{GameKind, QueueKey};
use log::{debug, info, warn};
use shared::{truncate_name, welcome, Keyword, NAME_PROMPT};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};

pub const GAME_MENU: &str = "A quel jeu voulez-vous jouer ? \n\
                             \t (1) Morpion \n\
                             \t (2) Black-Jack \n\
                             \t (exit) Pour quitter";
pub const ROOM_PROMPT: &str = "Avec combien de joueurs voulez-vous jouer ? (2-7)";
pub const UNKNOWN_GAME: &str = "Votre entrée correspond à aucun jeu disponible";
pub const NOT_A_NUMBER: &str = "Erreur, vous n'avez pas entré un nombre correct";
pub const LEFT_QUEUE: &str = "Vous avez quitté la queue.";
pub const NOT_IN_QUEUE: &str = "Vous n'êtes pas actuellement dans une queue";

/// Longest line accepted from a client, newline included.
pub const MAX_LINE_LEN: u64 = 1024;

/// Money every session starts with.
pub const STARTING_MONEY: f64 = 1000.0;

pub fn out_of_range(min: u32, max: u32) -> String {
    format!(
        "Erreur, veuillez entrer un nombre entre {} et {} (compris)",
        min, max
    )
}

pub fn queue_reminder(key: &QueueKey) -> String {
    format!(
        "Tu es dans la queue pour un {} - tape \"leave\" pour sortir de la queue.",
        key
    )
}

/// Result of checking a line against a numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberInput {
    Valid(u32),
    OutOfRange,
    NotANumber,
}

/// Accepts only plain ASCII digits, like the rest of the line protocol.
pub fn parse_in_range(line: &str, min: u32, max: u32) -> NumberInput {
    let line = line.trim();
    if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
        return NumberInput::NotANumber;
    }
    match line.parse::<u32>() {
        Ok(n) if (min..=max).contains(&n) => NumberInput::Valid(n),
        // Digits only, so a parse failure is an overflow
        _ => NumberInput::OutOfRange,
    }
}

/// Frames queued for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Line(String),
    Close,
}

/// Shared handle to one connected client.
pub struct Session {
    id: u64,
    name: OnceLock<String>,
    outbound: mpsc::UnboundedSender<Outbound>,
    connected: watch::Sender<bool>,
    money: Mutex<f64>,
    has_turn: AtomicBool,
}

impl Session {
    pub fn new(id: u64, outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        let (connected, _) = watch::channel(true);
        Self {
            id,
            name: OnceLock::new(),
            outbound,
            connected,
            money: Mutex::new(STARTING_MONEY),
            has_turn: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name given at the prompt, `None` until then.
    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    pub fn set_name(&self, name: String) {
        if self.name.set(name).is_err() {
            warn!("Client {} tried to rename itself", self.id);
        }
    }

    /// Queues a line for the client. A dead writer marks the session
    /// disconnected instead of failing the caller.
    pub fn send(&self, line: impl Into<String>) {
        if !self.is_connected() {
            return;
        }
        if self.outbound.send(Outbound::Line(line.into())).is_err() {
            debug!("Client {} writer is gone", self.id);
            self.mark_disconnected();
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Flags the transport as dead and wakes the session task.
    pub fn mark_disconnected(&self) {
        self.connected.send_replace(false);
    }

    /// Ends the connection: pending lines are flushed, then the socket is shut.
    pub fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
        self.mark_disconnected();
    }

    pub fn subscribe_connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub fn balance(&self) -> f64 {
        *self.money.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `amount` to the balance; negative amounts are losses.
    pub fn credit(&self, amount: f64) {
        *self.money.lock().unwrap_or_else(PoisonError::into_inner) += amount;
    }

    pub fn has_turn(&self) -> bool {
        self.has_turn.load(Ordering::Relaxed)
    }

    pub fn set_turn(&self, turn: bool) {
        self.has_turn.store(turn, Ordering::Relaxed);
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Client {} \"{}\"", self.id, self.name().unwrap_or(""))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Registers a new session for the given stream halves and spawns its
/// writer and session tasks.
pub async fn spawn_session<R, W>(ctx: ServerContext, reader: R, writer: W) -> Arc<Session>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let session = ctx.register(tx).await;

    tokio::spawn(run_writer(writer, rx, Arc::clone(&session)));
    tokio::spawn(run_session(ctx, Arc::clone(&session), BufReader::new(reader)));

    session
}

/// Writes queued frames until the session closes or the socket fails.
pub async fn run_writer<W>(mut writer: W, mut outbound: mpsc::UnboundedReceiver<Outbound>, session: Arc<Session>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        match frame {
            Outbound::Line(mut line) => {
                line.push('\n');
                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    debug!("Write to client {} failed: {}", session.id(), e);
                    session.mark_disconnected();
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = writer.shutdown().await;
}

/// Read side of a connection. Every read also watches the session's
/// connected flag so a kicked or shut down session stops waiting.
struct Connection<R> {
    reader: R,
    connected: watch::Receiver<bool>,
}

impl<R: AsyncBufRead + Unpin> Connection<R> {
    /// Next line from the peer, `None` on EOF, I/O failure or close.
    async fn next_line(&mut self) -> Option<String> {
        if !*self.connected.borrow() {
            return None;
        }
        tokio::select! {
            line = read_line_lossy(&mut self.reader) => match line {
                Ok(line) => line,
                Err(e) => {
                    debug!("Read failed: {}", e);
                    None
                }
            },
            _ = wait_until(&mut self.connected, false) => None,
        }
    }
}

/// Reads one line of at most [`MAX_LINE_LEN`] bytes. Invalid UTF-8 is
/// replaced rather than rejected. A longer line is skipped up to its newline
/// and comes back empty, so callers re-prompt as for any bad answer.
async fn read_line_lossy<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN)
        .read_until(b'\n', &mut buf)
        .await?;
    if read == 0 {
        return Ok(None);
    }

    if buf.last() != Some(&b'\n') && read as u64 == MAX_LINE_LEN {
        warn!("Dropping a line longer than {} bytes", MAX_LINE_LEN);
        skip_line(reader).await?;
        return Ok(Some(String::new()));
    }

    let line = String::from_utf8_lossy(&buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// Discards input up to and including the next newline.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        let (used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(at) => (at + 1, true),
            None => (available.len(), false),
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}

/// Drives one client from the name prompt to disconnection.
pub async fn run_session<R>(ctx: ServerContext, session: Arc<Session>, reader: R)
where
    R: AsyncBufRead + Unpin,
{
    let mut conn = Connection {
        reader,
        connected: session.subscribe_connected(),
    };

    info!("Client {} connected", session.id());

    if ask_name(&session, &mut conn).await {
        session.send(GAME_MENU);
        lobby(&ctx, &session, &mut conn).await;
    }

    ctx.disconnect(&session).await;
    info!("Client {} disconnected", session.id());
}

async fn ask_name<R: AsyncBufRead + Unpin>(session: &Session, conn: &mut Connection<R>) -> bool {
    session.send(NAME_PROMPT);
    let Some(raw) = conn.next_line().await else {
        return false;
    };
    if Keyword::parse(&raw) == Some(Keyword::Exit) {
        return false;
    }

    let name = truncate_name(&raw);
    info!("Client {} : {}", session.id(), name);
    session.send(welcome(&name));
    session.set_name(name);
    true
}

/// Menu loop. Returns when the client leaves or the connection drops.
async fn lobby<R: AsyncBufRead + Unpin>(ctx: &ServerContext, session: &Arc<Session>, conn: &mut Connection<R>) {
    while let Some(line) = conn.next_line().await {
        if let Some(input) = ctx.game_input(session.id()).await {
            // The engine may have finished in between; the line is then dropped
            let _ = input.send(line);
            continue;
        }

        match Keyword::parse(&line) {
            Some(Keyword::Exit) => return,
            Some(Keyword::Leave) => {
                if ctx.leave_queue(session.id()).await.is_some() {
                    session.send(LEFT_QUEUE);
                    session.send(GAME_MENU);
                } else {
                    session.send(NOT_IN_QUEUE);
                }
                continue;
            }
            None => {}
        }

        if !ctx.is_idle(session.id()).await {
            // Queued sessions ignore menu input
            continue;
        }

        match GameKind::from_menu_choice(&line) {
            Some(GameKind::TicTacToe) => join(ctx, session, GameKind::TicTacToe, 2).await,
            Some(GameKind::Blackjack) => {
                session.send(ROOM_PROMPT);
                match ask_number(session, conn, 2, 7).await {
                    Some(players) => join(ctx, session, GameKind::Blackjack, players as usize).await,
                    None => return,
                }
            }
            None => {
                session.send(UNKNOWN_GAME);
                session.send(GAME_MENU);
            }
        }
    }
}

/// Re-prompts until a number within `[min, max]` arrives. `None` when the
/// client exits or drops.
async fn ask_number<R: AsyncBufRead + Unpin>(
    session: &Session,
    conn: &mut Connection<R>,
    min: u32,
    max: u32,
) -> Option<u32> {
    loop {
        let line = conn.next_line().await?;
        if Keyword::parse(&line) == Some(Keyword::Exit) {
            return None;
        }
        match parse_in_range(&line, min, max) {
            NumberInput::Valid(n) => return Some(n),
            NumberInput::OutOfRange => session.send(out_of_range(min, max)),
            NumberInput::NotANumber => session.send(NOT_A_NUMBER),
        }
    }
}

async fn join(ctx: &ServerContext, session: &Session, kind: GameKind, players: usize) {
    let key = match QueueKey::new(kind, players) {
        Ok(key) => key,
        Err(e) => {
            warn!("Client {} asked for a table that does not exist: {}", session.id(), e);
            session.send(UNKNOWN_GAME);
            return;
        }
    };

    match ctx.enqueue(session.id(), key).await {
        Ok(()) => session.send(queue_reminder(&key)),
        Err(e) => debug!("Client {} not queued: {}", session.id(), e),
    }
}
