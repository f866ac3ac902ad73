//! Periodic matchmaking pass
//!
//! Every period the scheduler evicts sessions whose socket went away, turns
//! full queues into running engines and reminds everyone still waiting which
//! queue they are in.

use crate::context::{wait_until, ServerContext};
use crate::games::GameEngine;
use crate::session::queue_reminder;
use log::{debug, error, info};
use tokio::time::{interval, MissedTickBehavior};

/// One scheduler pass. Returns the number of engines started.
pub async fn tick(ctx: &ServerContext) -> usize {
    for session in ctx.sweep_disconnected().await {
        info!("{} evicted, connection lost", session);
    }

    let mut started = 0;
    for lineup in ctx.form_matches().await {
        match GameEngine::new(ctx, lineup) {
            Ok(engine) => {
                engine.spawn();
                started += 1;
            }
            Err(e) => error!("Failed to start game: {}", e),
        }
    }

    for (key, session) in ctx.queued().await {
        session.send(queue_reminder(&key));
    }

    started
}

/// Runs [`tick`] on the configured period until the server shuts down.
pub async fn run(ctx: ServerContext) {
    let mut timer = interval(ctx.config().matchmaking_period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut shutdown = ctx.shutdown_signal();

    // The first tick fires immediately
    timer.tick().await;

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let started = tick(&ctx).await;
                if started > 0 {
                    debug!("Matchmaking started {} game(s)", started);
                }
            }
            _ = wait_until(&mut shutdown, true) => break,
        }
    }
    info!("Matchmaking stopped");
}
