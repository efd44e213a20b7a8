// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command handlers. Each returns the text to print on success.

use std::future::Future;
use std::time::Duration;

use station_core::{ActionOutcome, DispatchEngine, Health};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::cli::Command;
use crate::display::{
    format_health, format_outcome, format_passes, format_queue, format_routes, format_summaries,
};
use crate::error::{Error, Result};
use crate::sync::{Transport, WsGateway};

/// How long `watch` waits for a broadcast before checking for interrupts again.
const WATCH_POLL: Duration = Duration::from_secs(1);

type Engine<T> = DispatchEngine<WsGateway<T>>;

pub async fn execute<T: Transport + 'static>(
    engine: &Engine<T>,
    gateway: &WsGateway<T>,
    command: Command,
) -> Result<String> {
    if command.needs_snapshot() {
        engine.refresh().await?;
    }

    match command {
        Command::Status { destination: None } => Ok(format_summaries(&engine.summaries())),
        Command::Status { destination: Some(destination) } => {
            engine.scheduler().refresh_destination(&destination).await?;
            Ok(format_queue(&destination, &engine.snapshot(&destination)))
        }
        Command::Watch { destination } => watch(engine, gateway, destination.as_deref()).await,
        Command::Enter { plate, destination, name } => {
            outcome(engine.enter_queue(&plate, &destination, name.as_deref()).await)
        }
        Command::Exit { plate } => outcome(engine.exit_queue(&plate).await),
        Command::Transfer { plate } => outcome(engine.transfer_seats_and_remove(&plate).await),
        Command::Emergency { plate } => outcome(engine.emergency_remove(&plate).await),
        Command::EndTrip { entry } => {
            require_entry(engine, &entry)?;
            outcome(engine.end_trip(&entry).await)
        }
        Command::Book { entry, seats } => {
            require_entry(engine, &entry)?;
            outcome(engine.book_seats(&entry, seats).await)
        }
        Command::Reorder { destination, entries } => {
            outcome(engine.reorder(&destination, &entries).await)
        }
        Command::Front { destination, entry } => {
            outcome(engine.move_to_front(&entry, &destination).await)
        }
        Command::Drag { destination, from, to } => {
            outcome(engine.drag(&destination, &from, &to).await)
        }
        Command::Pass { plates } => {
            let passes = engine.day_passes().has_valid_pass_batch(&plates).await?;
            Ok(format_passes(&passes))
        }
        Command::Routes { plate } => {
            let routes = engine.authorized_destinations(&plate).await?;
            Ok(format_routes(&plate, &routes))
        }
        Command::Health => match engine.scheduler().check_health().await {
            Health::Healthy => Ok(format_health(&Health::Healthy)),
            degraded => Err(Error::ActionFailed(format_health(&degraded))),
        },
        // Handled before a connection is opened.
        Command::Config => Ok(String::new()),
    }
}

fn outcome(outcome: ActionOutcome) -> Result<String> {
    if outcome.success {
        Ok(format_outcome(&outcome))
    } else {
        Err(Error::ActionFailed(format_outcome(&outcome)))
    }
}

fn require_entry<T: Transport>(engine: &Engine<T>, entry_id: &str) -> Result<()> {
    if engine.store().lock().entry(entry_id).is_none() {
        return Err(Error::EntryNotFound(entry_id.to_string()));
    }
    Ok(())
}

/// Prints queue changes as they are announced until Ctrl-C.
async fn watch<T: Transport + 'static>(
    engine: &Engine<T>,
    gateway: &WsGateway<T>,
    destination: Option<&str>,
) -> Result<String> {
    // Subscribe before the first call so notices read mid-call are kept.
    let changes = gateway.subscribe();
    follow_changes(engine, gateway, destination, changes, tokio::signal::ctrl_c()).await
}

/// Refreshes and reprints on every announced change until `stop` resolves.
///
/// Notices reach `changes` whichever read sees them: a reply wait inside a
/// call, or the idle poll run here.
async fn follow_changes<T, F>(
    engine: &Engine<T>,
    gateway: &WsGateway<T>,
    destination: Option<&str>,
    mut changes: broadcast::Receiver<String>,
    stop: F,
) -> Result<String>
where
    T: Transport + 'static,
    F: Future,
{
    engine.start();
    print_view(engine, destination);

    tokio::pin!(stop);
    let mut handled = 0;
    loop {
        tokio::select! {
            _ = &mut stop => break,
            notice = changes.recv() => match notice {
                Ok(changed) => {
                    handled += 1;
                    debug!(destination = %changed, "refreshing after broadcast");
                    if let Err(e) = engine.scheduler().refresh_destination(&changed).await {
                        warn!(error = %e, "refresh after broadcast failed");
                    }
                    if destination.is_none_or(|d| d == changed) {
                        print_view(engine, destination);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "missed change notices, reloading the view");
                    let reloaded = match destination {
                        Some(d) => engine.scheduler().refresh_destination(d).await.map(|_| ()),
                        None => engine.refresh().await,
                    };
                    if let Err(e) = reloaded {
                        warn!(error = %e, "reload after missed notices failed");
                    }
                    print_view(engine, destination);
                }
                Err(RecvError::Closed) => break,
            },
            polled = gateway.next_change(WATCH_POLL) => {
                if let Err(e) = polled {
                    warn!(error = %e, "lost remote connection");
                    tokio::time::sleep(WATCH_POLL).await;
                }
            }
        }
    }

    engine.stop();
    Ok(format!("stopped after {handled} queue change(s)"))
}

fn print_view<T: Transport>(engine: &Engine<T>, destination: Option<&str>) {
    let text = match destination {
        Some(d) => format_queue(d, &engine.snapshot(d)),
        None => format_summaries(&engine.summaries()),
    };
    println!("{text}\n");
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
