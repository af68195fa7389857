//! Command-line interface for taskdesk
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::auth::SessionStore;
use crate::backend::{Backend, RestBackend};
use crate::config::{self, Config};
use crate::error::Result;
use crate::output::OutputOptions;

mod account;
mod console;
mod gate;
mod tasks;

/// taskdesk - admin console for deployment task records
///
/// Sign in, then list, filter, add, edit and delete task records held in
/// the hosted backend.
#[derive(Parser, Debug)]
#[command(name = "taskdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding taskdesk.toml and the session file
    #[arg(long, global = true, env = "TASKDESK_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Backend base URL (overrides backend.url)
    #[arg(long, global = true, env = "TASKDESK_URL", hide_env_values = true)]
    pub url: Option<String>,

    /// Backend anon key (overrides backend.anon_key)
    #[arg(long, global = true, env = "TASKDESK_ANON_KEY", hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        /// Password (prompted without echo when omitted)
        #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and remove the stored session
    Logout,

    /// Send a password recovery email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },

    /// Set a new password from a recovery link
    ResetPassword {
        /// The full link from the recovery email
        #[arg(long)]
        link: String,

        #[arg(long, env = "TASKDESK_NEW_PASSWORD", hide_env_values = true)]
        password: String,

        /// Repeat of the new password
        #[arg(long)]
        confirm: String,
    },

    /// List task records
    List {
        /// Window: 30days (the recent window, which spans dashboard.recent_days) or all
        #[arg(long, default_value = "30days")]
        view: String,

        /// Sort for the all-records view: newest or oldest
        #[arg(long)]
        sort: Option<String>,
    },

    /// Add a task record
    Add {
        /// Field assignment, e.g. --set project=Atlas (repeatable)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Edit a task record
    Edit {
        id: String,

        /// Field assignment, e.g. --set pay="1200 USD" (repeatable)
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Delete a task record (asks for confirmation)
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Show how the route gate treats a path
    Gate {
        /// Route path, e.g. /dashboard?view=all
        path: String,
    },

    /// Open the full-screen console
    Console {
        /// Initial route
        #[arg(long, default_value = "/dashboard")]
        route: String,

        /// Open the reset-password screen with this recovery link
        #[arg(long)]
        recovery_link: Option<String>,
    },
}

/// Resolved configuration shared by every command.
pub(crate) struct Context {
    pub(crate) config: Config,
    pub(crate) store: SessionStore,
    pub(crate) output: OutputOptions,
}

impl Context {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let dir = config::resolve_config_dir(cli.config_dir.as_deref())?;
        let config = Config::load_from_dir(&dir)?.with_overrides(cli.url.clone(), cli.anon_key.clone())?;
        Ok(Self {
            config,
            store: SessionStore::new(dir),
            output: OutputOptions {
                json: cli.json,
                quiet: cli.quiet,
            },
        })
    }

    pub(crate) fn backend(&self) -> Result<Box<dyn Backend>> {
        Ok(Box::new(RestBackend::new(&self.config.backend)?))
    }
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let ctx = Context::from_cli(&self)?;
        match self.command {
            Commands::Login { email, password } => account::run_login(&ctx, &email, password),
            Commands::Logout => account::run_logout(&ctx),
            Commands::ForgotPassword { email } => account::run_forgot(&ctx, &email),
            Commands::ResetPassword {
                link,
                password,
                confirm,
            } => account::run_reset(&ctx, &link, &password, &confirm),
            Commands::List { view, sort } => tasks::run_list(&ctx, &view, sort.as_deref()),
            Commands::Add { set } => tasks::run_add(&ctx, &set),
            Commands::Edit { id, set } => tasks::run_edit(&ctx, &id, &set),
            Commands::Delete { id, yes } => tasks::run_delete(&ctx, &id, yes),
            Commands::Gate { path } => gate::run(&ctx, &path),
            Commands::Console {
                route,
                recovery_link,
            } => console::run(&ctx, &route, recovery_link.as_deref()),
        }
    }
}
