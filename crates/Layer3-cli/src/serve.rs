//! Serve mode - reconcile, then drive the supervisor from stdin

use crate::console::{ConsoleCommand, HELP};
use anyhow::Result;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use unicloud_foundation::{Error, HostingConfig};
use unicloud_hosting::{HostingInfo, Reconciler, Supervisor};

/// Reply printed for a domain error
fn reply_for(error: &Error) -> String {
    match error {
        Error::AlreadyHosting(identity) => format!("{} already hosts an application", identity),
        Error::NotRunning(identity) => format!("{} has no running application", identity),
        Error::NotHosted(identity) => format!("{} has no hosted application", identity),
        Error::StillRunning(identity) => {
            format!("{} is still running; stop it before removing", identity)
        }
        other => other.to_string(),
    }
}

pub async fn run(data_dir: &Path, config: HostingConfig) -> Result<()> {
    let supervisor = Supervisor::from_config(data_dir, &config);
    supervisor.workspaces().ensure_root()?;

    let report = Reconciler::new(&config.reconcile).run(&supervisor).await?;
    println!(
        "Restarted {} of {} application(s).",
        report.restarted.len(),
        report.total()
    );
    for failure in &report.failed {
        println!("  {}: {}", failure.identity, failure.error);
    }
    println!("Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                None
            }
        };
        let Some(line) = line else { break };

        let command = match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }

        if let Err(e) = execute(&supervisor, &config, command).await {
            match e.downcast_ref::<Error>() {
                Some(domain) if domain.is_user_facing() => println!("{}", reply_for(domain)),
                _ => {
                    error!(error = %e, "Command failed");
                    println!("Error: {}", e);
                }
            }
        }
    }

    info!(live = supervisor.live_count().await, "Shutting down");
    supervisor.shutdown().await;
    Ok(())
}

async fn execute(supervisor: &Supervisor, config: &HostingConfig, command: ConsoleCommand) -> Result<()> {
    match command {
        ConsoleCommand::Up {
            identity,
            archive,
            command,
        } => {
            let bytes = tokio::fs::read(&archive).await?;
            let record = supervisor.onboard(&identity, &identity, bytes, &command).await?;
            println!(
                "Hosting {} in {} with `{}`",
                identity, record.workspace_name, record.launch_command
            );
        }
        ConsoleCommand::Stop { identity } => {
            supervisor.stop(&identity).await?;
            println!("Stopped {}", identity);
        }
        ConsoleCommand::Remove { identity } => {
            supervisor.remove(&identity).await?;
            println!("Removed {}", identity);
        }
        ConsoleCommand::Console { identity, lines } => {
            let entries = supervisor
                .tail(&identity, lines.unwrap_or(config.tail_lines))
                .await?;
            if entries.is_empty() {
                println!("({} has not written any output)", identity);
            }
            for entry in entries {
                println!("{}", entry);
            }
        }
        ConsoleCommand::Resume { identity } => {
            supervisor.resume(&identity).await?;
            println!("Resumed {}", identity);
        }
        ConsoleCommand::Status { identity: Some(identity) } => {
            let info = supervisor.status(&identity).await?;
            let live = info.live;
            print_table(&[info]);
            if live {
                let (path, command, started_at) = supervisor.describe(&identity).await?;
                println!(
                    "Running `{}` in {} since {}",
                    command,
                    path.display(),
                    started_at.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
        }
        ConsoleCommand::Status { identity: None } => {
            let infos = supervisor.list().await?;
            if infos.is_empty() {
                println!("No hosted applications.");
            } else {
                print_table(&infos);
            }
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

pub fn print_table(infos: &[HostingInfo]) {
    println!(
        "{:<20} {:<20} {:<8} {:<8} {}",
        "Identity", "Workspace", "Status", "PID", "Command"
    );
    println!("{}", "-".repeat(80));
    for info in infos {
        let pid = info
            .pid
            .map(|pid| pid.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<20} {:<8} {:<8} {}",
            info.identity,
            info.record.workspace_name,
            info.record.status.as_str(),
            pid,
            info.record.launch_command
        );
    }
}
