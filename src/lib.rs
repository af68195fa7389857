//! taskdesk - admin console library
//!
//! Session-gated create, read, update and delete over the `task` table of
//! a hosted PostgREST/GoTrue backend.
//!
//! # Core Concepts
//!
//! - **Session**: the signed-in identity, persisted between runs
//! - **Route gate**: decides whether a route is admitted or redirected
//! - **Task record**: one row of the task table, eleven editable fields
//! - **Dashboard view**: a recent window or all records, newest or oldest first
//! - **Form session**: add/edit values with a baseline for dirty tracking
//!
//! # Module Organization
//!
//! - `auth`: sessions, sign-in, recovery and the on-disk session store
//! - `backend`: the task gateway and identity provider, REST and in-memory
//! - `cli`: command-line interface using clap
//! - `config`: configuration loading from `taskdesk.toml`
//! - `error`: error types and result aliases
//! - `flight`: single-flight state for submits and deletes
//! - `form`: add/edit form sessions and their layout
//! - `format`: date and cell formatting
//! - `gate`: route parsing and gating
//! - `listing`: view selection, display order and columns
//! - `menu`: per-row actions and delete confirmation
//! - `output`: human and JSON output
//! - `persist`: list/create/update/delete flows over the gateway
//! - `record`: task ids, records, field values and payloads
//! - `schema`: fields, columns and form groups
//! - `ui`: the full-screen console

pub mod auth;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod flight;
pub mod form;
pub mod format;
pub mod gate;
pub mod listing;
pub mod menu;
pub mod output;
pub mod persist;
pub mod record;
pub mod schema;
pub mod ui;

pub use error::{Error, Result};
