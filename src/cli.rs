use std::io::{self, BufRead};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::db::filter::JobQuery;
use crate::db::models::JobRecord;
use crate::triage::{JobPersistence, SyncBridge, TriageKey, TriageStateMachine};

/// Personal job-application tracker
#[derive(Debug, Parser)]
#[command(name = "job-tracker", version, about)]
pub struct Cli {
    /// Keep jobs in process memory instead of Postgres
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Review jobs from the terminal, one key per token on stdin
    ///
    /// Keys: s/down next, w/up previous, a/left reject, d/right accept,
    /// f apply, q quit
    Triage {
        /// Status filter, a single value or a comma-separated list
        #[arg(long)]
        status: Option<String>,
        /// Only jobs created within the last N days
        #[arg(long)]
        days: Option<String>,
        /// A single job id
        #[arg(long)]
        id: Option<String>,
        /// Root URL of a running server, e.g. http://127.0.0.1:8080.
        /// Without it triage works on the local database directly.
        #[arg(long)]
        server: Option<String>,
    },
}

impl Command {
    pub fn is_triage(&self) -> bool {
        matches!(self, Command::Triage { .. })
    }
}

fn describe(job: &JobRecord) -> String {
    format!(
        "[{}] {} - {} ({}) status={}",
        job.id,
        job.title,
        job.company,
        job.location.as_deref().unwrap_or("unknown location"),
        i16::from(job.status)
    )
}

/// Forward stdin tokens to the triage loop until `q` or end of input
fn spawn_key_reader(tx: mpsc::Sender<TriageKey>) {
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { return };
            for token in line.split_whitespace() {
                if token == "q" {
                    return;
                }
                match TriageKey::from_key(token) {
                    Some(key) => {
                        if tx.blocking_send(key).is_err() {
                            return;
                        }
                    }
                    None => warn!("Unknown triage key {:?}", token),
                }
            }
        }
    });
}

/// Run an interactive triage session against `persistence`
pub async fn run_triage(
    persistence: Arc<dyn JobPersistence>,
    clock: Arc<dyn Clock>,
    query: JobQuery,
) -> io::Result<()> {
    let mut machine = TriageStateMachine::new(SyncBridge::new(persistence), clock);

    machine
        .refresh(&query)
        .await
        .map_err(|e| io::Error::other(e.to_string()))?;
    info!("Triage started with {} jobs", machine.store().len());

    match machine.active_job() {
        Some(job) => println!("{}", describe(job)),
        None => {
            println!("No jobs match this filter");
            return Ok(());
        }
    }

    let (tx, rx) = mpsc::channel(32);
    spawn_key_reader(tx);

    machine
        .drive(rx, |machine, transition| {
            if let Some(link) = &transition.open_link {
                println!("open {}", link);
            }
            if let Some(job) = machine.store().get(transition.active) {
                println!("{}", describe(job));
            }
        })
        .await;

    machine.settle().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["job-tracker"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.memory);
    }

    #[test]
    fn triage_takes_filter_flags() {
        let cli =
            Cli::try_parse_from(["job-tracker", "--memory", "triage", "--status", "0,2"]).unwrap();
        assert!(cli.memory);
        match cli.command {
            Some(Command::Triage { status, days, id, server }) => {
                assert_eq!(status.as_deref(), Some("0,2"));
                assert_eq!(days, None);
                assert_eq!(id, None);
                assert_eq!(server, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn triage_can_target_a_server() {
        let cli = Cli::try_parse_from([
            "job-tracker",
            "triage",
            "--server",
            "http://127.0.0.1:8080",
            "--days",
            "7",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Triage { server, days, .. }) => {
                assert_eq!(server.as_deref(), Some("http://127.0.0.1:8080"));
                assert_eq!(days.as_deref(), Some("7"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
