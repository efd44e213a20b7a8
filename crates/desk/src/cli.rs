// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

const COMMANDS_HELP: &str = "\
Queue:
  status      Show destinations, or one destination's queue
  watch       Follow queues live until interrupted
  enter       Admit a vehicle (buys a day pass when needed)
  exit        Remove a vehicle with no booked seats
  transfer    Move booked passengers to the next vehicle, then remove
  emergency   Cancel and refund every booking, then remove
  end-trip    Settle a trip and remove its entry
  book        Sell seats on an entry

Ordering:
  reorder     Set the full order of a destination
  front       Move an entry to position 1
  drag        Move an entry onto another entry's position

Vehicles:
  pass        Check day passes
  routes      List destinations a vehicle may serve
  health      Check the remote queue service
  config      Print the effective configuration";

#[derive(Parser)]
#[command(name = "station-desk")]
#[command(version, about = "Dispatch desk client for station vehicle queues")]
#[command(before_help = COMMANDS_HELP)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Remote queue service URL, overriding the config file
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Staff id recorded on admissions and settlements
    #[arg(long, global = true, value_name = "ID")]
    pub staff: Option<String>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show destinations, or one destination's queue
    Status {
        /// Destination id
        destination: Option<String>,
    },

    /// Follow queues live until interrupted
    Watch {
        /// Destination to print on every change (default: all summaries)
        destination: Option<String>,
    },

    /// Admit a vehicle to a destination queue
    Enter {
        plate: String,
        destination: String,
        /// Destination display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove a vehicle with no booked seats
    Exit { plate: String },

    /// Move booked passengers to the next vehicle, then remove
    Transfer { plate: String },

    /// Cancel and refund every booking, then remove
    Emergency { plate: String },

    /// Settle a trip and remove its entry
    EndTrip { entry: String },

    /// Sell seats on an entry
    Book { entry: String, seats: u32 },

    /// Set the full order of a destination
    Reorder {
        destination: String,
        /// Every entry id of the destination, in the new order
        #[arg(required = true, num_args = 1..)]
        entries: Vec<String>,
    },

    /// Move an entry to position 1
    Front { destination: String, entry: String },

    /// Move an entry onto another entry's position
    Drag { destination: String, from: String, to: String },

    /// Check day passes for one or more plates
    Pass {
        #[arg(required = true, num_args = 1..)]
        plates: Vec<String>,
    },

    /// List destinations a vehicle may serve
    Routes { plate: String },

    /// Check the remote queue service
    Health,

    /// Print the effective configuration
    Config,
}

impl Command {
    /// True when the command works on a loaded queue snapshot.
    pub fn needs_snapshot(&self) -> bool {
        !matches!(
            self,
            Command::Pass { .. } | Command::Routes { .. } | Command::Health | Command::Config
        )
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
