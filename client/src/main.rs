use clap::Parser;
use client::network::{Client, Exit};
use log::info;
use tokio::io::{stdin, stdout, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:6000")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    let mut client = match Client::connect(&args.server).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Pas de réponse du serveur ({})", e);
            std::process::exit(1);
        }
    };

    let finished = tokio::select! {
        result = client.run(BufReader::new(stdin()), stdout()) => Some(result?),
        _ = tokio::signal::ctrl_c() => None,
    };

    let exit = match finished {
        Some(exit) => exit,
        None => {
            // Best effort, the server also notices the socket closing
            let _ = client.leave().await;
            Exit::InputClosed
        }
    };
    info!("Client stopped: {:?}", exit);

    // The blocking stdin reader would otherwise hold the runtime open
    std::process::exit(0)
}
