//! # Game Parlor Server Library
//!
//! This library provides a multi-session game server speaking a line-based
//! text protocol over TCP. Clients connect, pick a name, choose a game from
//! a menu and wait in a queue until enough players are available; the
//! server then seats them at a table and runs the game to its end.
//!
//! ## Core Responsibilities
//!
//! ### Session Handling
//! Every connection is owned by its own session task which drives the name
//! prompt, the game menu and the queue commands (`leave`, `exit`). While the
//! client is seated, the session forwards each line it reads to the engine.
//!
//! ### Matchmaking
//! A periodic scheduler evicts dead sessions, turns every full queue into a
//! running engine (players picked at random from the queue) and reminds the
//! remaining clients which queue they are waiting in.
//!
//! ### Game Engines
//! Two turn-based games are offered:
//! - TicTacToe for two players on a 3×3 grid
//! - Blackjack against the house for two to seven players
//!
//! Each engine runs on its own task and owns its game state. Whatever way a
//! game ends, every participant is returned to the lobby exactly once.
//!
//! ## Architecture Design
//!
//! ### Explicit Context
//! [`context::ServerContext`] is built once by the entry point and cloned
//! into every task. It holds the lock-guarded [`registry::Registry`], the
//! configuration and the shutdown signal.
//!
//! ### Message Passing
//! Engines never touch sockets. They write through each session's outbound
//! queue and read from a per-seat channel the session task feeds. Dropping
//! that channel is how an engine learns that a participant left.
//!
//! ## Module Organization
//!
//! - `admin`: operator console (`threads`, `clients`, `queue`, `exit`)
//! - `config`: runtime settings
//! - `context`: shared handle passed to every task
//! - `error`: error type of the library
//! - `games`: engines, cards and the table they play on
//! - `matchmaking`: periodic queue processing
//! - `network`: TCP listener
//! - `queue`: game kinds and queue names
//! - `registry`: sessions, queues and running engines
//! - `session`: per-connection protocol
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::context::ServerContext;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = ServerContext::new(ServerConfig::default());
//!     let server = Server::bind(ctx.clone()).await?;
//!
//!     tokio::spawn(server::matchmaking::run(ctx.clone()));
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod config;
pub mod context;
pub mod error;
pub mod games;
pub mod matchmaking;
pub mod network;
pub mod queue;
pub mod registry;
pub mod session;
