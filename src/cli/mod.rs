//! CLI module - Command-line interface for Warden
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

use crate::domain::Role;

/// Warden - account registration with admin approval
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Write a default config.toml if none exists
    #[command(alias = "--init")]
    Init,

    /// List registered users and their roles
    #[command(alias = "ls")]
    Users {
        /// Only show users with this role (User, Admin or Pending)
        #[arg(long)]
        role: Option<Role>,
    },
}

pub use commands::*;
