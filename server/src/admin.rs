//! Operator console read from the server's standard input

use crate::context::ServerContext;
use crate::registry::Membership;
use log::{info, warn};
use std::fmt::Write;
use sysinfo::{Pid, ProcessExt, System, SystemExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const BANNER: &str = "Administration du serveur - tapez \"help\" pour l'aide.";

pub const HELP: &str = "threads - Affiche les tâches actives.\n\
                        clients - Affiche les clients connectés.\n\
                        queue - Affiche l'état de la queue.\n\
                        cpu - Affiche l'utilisation du CPU.\n\
                        exit - Ferme le serveur.\n\
                        help - Affiche ce message.";

const CPU_UNAVAILABLE: &str = "CPU Usage : indisponible";

/// Tasks that run for the whole life of the server.
const FIXED_TASKS: [&str; 3] = ["listener", "matchmaking", "console"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Threads,
    Clients,
    Queue,
    Cpu,
    Help,
    Close,
    Unknown(String),
}

impl Command {
    /// `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let command = match line {
            "" => return None,
            "threads" => Command::Threads,
            "clients" => Command::Clients,
            "queue" => Command::Queue,
            "cpu" => Command::Cpu,
            "help" => Command::Help,
            "exit" | "q" | "close" => Command::Close,
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

/// Text printed for `command`. `Close` also shuts the server down.
pub async fn execute(ctx: &ServerContext, command: &Command) -> String {
    match command {
        Command::Threads => threads(ctx).await,
        Command::Clients => clients(ctx).await,
        Command::Queue => queues(ctx).await,
        Command::Cpu => match tokio::task::spawn_blocking(cpu_usage).await {
            Ok(report) => report,
            Err(e) => {
                warn!("CPU probe failed: {}", e);
                CPU_UNAVAILABLE.to_string()
            }
        },
        Command::Help => HELP.to_string(),
        Command::Close => {
            info!("Shutdown requested from the console");
            ctx.shutdown().await;
            "Fermeture du serveur".to_string()
        }
        Command::Unknown(entry) => {
            format!("{} n'est pas une commande. Tapez help pour l'aide.", entry)
        }
    }
}

async fn threads(ctx: &ServerContext) -> String {
    let (sessions, running) = ctx
        .read(|registry| (registry.sessions(), registry.running()))
        .await;

    let mut names: Vec<String> = FIXED_TASKS.iter().map(|t| t.to_string()).collect();
    names.extend(sessions.iter().map(|s| format!("session-{}", s.id())));
    names.extend(
        running
            .iter()
            .map(|(kind, instance, _)| format!("{}{}", kind, instance)),
    );

    let mut out = format!("Liste des tâches actives : {}", names.len());
    for name in names {
        let _ = write!(out, "\n{}", name);
    }
    out
}

async fn clients(ctx: &ServerContext) -> String {
    let clients = ctx
        .read(|registry| {
            registry
                .sessions()
                .into_iter()
                .map(|s| {
                    let membership = registry.membership(s.id());
                    (s, membership)
                })
                .collect::<Vec<_>>()
        })
        .await;
    if clients.is_empty() {
        return "Aucun client connecté".to_string();
    }

    let mut out = String::new();
    for (session, membership) in clients {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "{}", session);
        match membership {
            Some(Membership::Queued(_)) => out.push_str(" en attente d'une partie"),
            Some(Membership::Playing { kind, instance }) => {
                let _ = write!(out, " joue : {} {}", kind, instance);
            }
            Some(Membership::Idle) | None => {}
        }
    }
    out
}

/// Share of the machine's CPU used by this process, measured over sysinfo's
/// minimum sampling interval. Blocks the calling thread.
fn cpu_usage() -> String {
    let pid = Pid::from(std::process::id() as usize);
    let mut system = System::new();
    system.refresh_cpu();
    system.refresh_process(pid);
    std::thread::sleep(System::MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_process(pid);

    let cores = system.cpus().len().max(1) as f32;
    match system.process(pid) {
        Some(process) => format!("CPU Usage : {:.1} %", process.cpu_usage() / cores),
        None => CPU_UNAVAILABLE.to_string(),
    }
}

async fn queues(ctx: &ServerContext) -> String {
    let queues = ctx.read(|registry| registry.queues()).await;
    let mut out = String::new();
    for (key, members) in queues {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&key.to_string());
        if members.is_empty() {
            out.push_str("\n\tvide");
        }
        for member in members {
            let _ = write!(out, "\n\t{}", member);
        }
    }
    out
}

/// Reads commands until `exit`, end of input or server shutdown.
pub async fn run<R>(ctx: ServerContext, input: R)
where
    R: AsyncBufRead + Unpin,
{
    println!("{}", BANNER);
    let mut lines = input.lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        println!("{}", execute(&ctx, &command).await);
        if command == Command::Close || ctx.is_shutting_down() {
            break;
        }
    }
}
