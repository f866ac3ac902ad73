//! Error types for the game server

use crate::queue::GameKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{kind} is played with {min} to {max} players, not {requested}")]
    InvalidPlayerCount {
        kind: GameKind,
        requested: usize,
        min: usize,
        max: usize,
    },

    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    #[error("Unknown session {0}")]
    UnknownSession(u64),

    #[error("Session {0} is already waiting in a queue")]
    AlreadyQueued(u64),

    #[error("Session {0} is already in a game")]
    AlreadyPlaying(u64),

    #[error("Session {0} is no longer connected")]
    NotConnected(u64),
}
