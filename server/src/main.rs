use clap::Parser;
use log::{error, info};
use server::config::{ServerConfig, DEFAULT_MATCHMAKING_SECS, DEFAULT_SHOE_DECKS};
use server::context::ServerContext;
use server::network::Server;
use server::{admin, matchmaking};
use shared::DEFAULT_PORT;
use std::time::Duration;
use tokio::io::BufReader;

/// Main-method of the server.
/// Parses command-line arguments, then starts the listener, the matchmaking
/// task and the operator console.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// IP address to bind to
        #[clap(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[clap(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Seconds between two matchmaking passes
        #[clap(short, long, default_value_t = DEFAULT_MATCHMAKING_SECS)]
        matchmaking_secs: u64,
        /// Decks in a blackjack shoe
        #[clap(short, long, default_value_t = DEFAULT_SHOE_DECKS)]
        decks: usize,
    }

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let args = Args::parse();
    let config = ServerConfig {
        address: format!("{}:{}", args.host, args.port),
        matchmaking_period: Duration::from_secs(args.matchmaking_secs.max(1)),
        shoe_decks: args.decks.max(1),
    };

    let ctx = ServerContext::new(config);
    let server = Server::bind(ctx.clone()).await?;

    let listener_handle = tokio::spawn(server.run());
    let matchmaking_handle = tokio::spawn(matchmaking::run(ctx.clone()));
    let console_handle = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            admin::run(ctx, BufReader::new(tokio::io::stdin())).await;
        })
    };

    let mut shutdown = ctx.shutdown_signal();
    tokio::select! {
        result = listener_handle => match result {
            Ok(Err(e)) => error!("Listener failed: {}", e),
            Err(e) => error!("Listener task panicked: {}", e),
            Ok(Ok(())) => {}
        },
        result = matchmaking_handle => {
            if let Err(e) = result {
                error!("Matchmaking task panicked: {}", e);
            }
        }
        _ = server::context::wait_until(&mut shutdown, true) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    ctx.shutdown().await;
    console_handle.abort();
    // Give writer tasks a moment to flush the closing line
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The blocking stdin reader would otherwise hold the runtime open
    std::process::exit(0)
}
