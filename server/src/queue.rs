//! Game variants and the keys of their waiting queues.

use crate::error::{Result, ServerError};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GameKind {
    TicTacToe,
    Blackjack,
}

impl GameKind {
    pub const ALL: [GameKind; 2] = [GameKind::TicTacToe, GameKind::Blackjack];

    /// Number of players a table of this variant seats.
    pub fn player_counts(self) -> RangeInclusive<usize> {
        match self {
            GameKind::TicTacToe => 2..=2,
            GameKind::Blackjack => 2..=7,
        }
    }

    /// Prefix of the queue names, as shown to players.
    pub fn queue_prefix(self) -> &'static str {
        match self {
            GameKind::TicTacToe => "Morpion",
            GameKind::Blackjack => "Black-Jack",
        }
    }

    /// Maps the game menu entry to a variant.
    pub fn from_menu_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(GameKind::TicTacToe),
            "2" => Some(GameKind::Blackjack),
            _ => None,
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::TicTacToe => write!(f, "TicTacToe"),
            GameKind::Blackjack => write!(f, "Blackjack"),
        }
    }
}

/// Identifies one waiting queue: a variant and the exact table size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueKey {
    kind: GameKind,
    players: usize,
}

impl QueueKey {
    /// Fails when `players` is outside the variant's seat range.
    pub fn new(kind: GameKind, players: usize) -> Result<Self> {
        let range = kind.player_counts();
        if !range.contains(&players) {
            return Err(ServerError::InvalidPlayerCount {
                kind,
                requested: players,
                min: *range.start(),
                max: *range.end(),
            });
        }
        Ok(Self { kind, players })
    }

    /// Every queue the server offers, one per variant and table size.
    pub fn all() -> Vec<QueueKey> {
        GameKind::ALL
            .iter()
            .flat_map(|&kind| {
                kind.player_counts()
                    .map(move |players| QueueKey { kind, players })
            })
            .collect()
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn players(&self) -> usize {
        self.players
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}p", self.kind.queue_prefix(), self.players)
    }
}

impl FromStr for QueueKey {
    type Err = ServerError;

    /// Parses names such as `Morpion2p` or `Black-Jack5p`.
    fn from_str(s: &str) -> Result<Self> {
        let unknown = || ServerError::UnknownQueue(s.to_string());

        let digits_at = s.find(|c: char| c.is_ascii_digit()).ok_or_else(unknown)?;
        let (prefix, rest) = s.split_at(digits_at);
        let count = rest.strip_suffix('p').ok_or_else(unknown)?;
        let players: usize = count.parse().map_err(|_| unknown())?;

        let kind = GameKind::ALL
            .into_iter()
            .find(|kind| kind.queue_prefix() == prefix)
            .ok_or_else(unknown)?;

        QueueKey::new(kind, players)
    }
}
