//! Line protocol literals shared by the game server and the terminal client.
//!
//! Every frame is a single UTF-8 text line. The server drives the dialogue with
//! prompts; the client only ever answers with one line at a time.

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 6000;

/// Display names are cut to this many characters.
pub const MAX_NAME_LEN: usize = 32;

pub const NAME_PROMPT: &str = "Votre nom ?";
pub const EXIT_KEYWORD: &str = "exit";
pub const LEAVE_KEYWORD: &str = "leave";

/// Last line every client receives before the server closes its socket.
pub const SHUTDOWN_SENTINEL: &str = "Le serveur va close";

/// Keywords honoured at the top-level prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Exit,
    Leave,
}

impl Keyword {
    /// Matches a raw client line against the keywords, ignoring surrounding
    /// whitespace and ASCII case.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.eq_ignore_ascii_case(EXIT_KEYWORD) {
            Some(Keyword::Exit)
        } else if line.eq_ignore_ascii_case(LEAVE_KEYWORD) {
            Some(Keyword::Leave)
        } else {
            None
        }
    }
}

/// Truncates a player name to [`MAX_NAME_LEN`] characters.
pub fn truncate_name(raw: &str) -> String {
    raw.trim_end_matches(['\r', '\n'])
        .chars()
        .take(MAX_NAME_LEN)
        .collect()
}

pub fn welcome(name: &str) -> String {
    format!("Bienvenue {} !", name)
}

/// True when the line is the server's shutdown broadcast.
pub fn is_shutdown_sentinel(line: &str) -> bool {
    line.trim_end() == SHUTDOWN_SENTINEL
}
