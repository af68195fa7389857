pub mod app;
mod auth_form;
mod editor;
mod view;
pub(crate) mod worker;

pub use app::{run, ConsoleOptions};
