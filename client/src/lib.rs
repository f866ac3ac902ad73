//! # Game Parlor Client Library
//!
//! Terminal client for the game parlor server. The server drives the whole
//! dialogue (name prompt, game menu, turns), so the client is a thin pump:
//! every line from the server is printed, every line typed by the user is
//! sent as is.
//!
//! The client stops when:
//! - the server broadcasts its shutdown line,
//! - the connection drops,
//! - the user types `exit`,
//! - standard input is closed (an `exit` is sent first).
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use tokio::io::{stdin, stdout, BufReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("127.0.0.1:6000").await?;
//!     let exit = client.run(BufReader::new(stdin()), stdout()).await?;
//!     println!("Session ended: {:?}", exit);
//!     Ok(())
//! }
//! ```

pub mod network;
