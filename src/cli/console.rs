//! `taskdesk console`: the full-screen dashboard.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::Backend;
use crate::error::Result;
use crate::gate::Route;
use crate::ui::console::{self, ConsoleOptions};

use super::Context;

pub fn run(ctx: &Context, route: &str, recovery_link: Option<&str>) -> Result<()> {
    let route = match recovery_link {
        Some(_) => Route::ResetPassword,
        None => Route::parse(route)?,
    };
    let backend: Arc<dyn Backend> = Arc::from(ctx.backend()?);
    let options = ConsoleOptions {
        route,
        recovery_link: recovery_link.map(str::to_string),
        recent_days: ctx.config.dashboard.recent_days,
        flash: Duration::from_millis(ctx.config.dashboard.flash_ms),
        policy: ctx.config.gate_policy(),
    };
    tracing::debug!(route = %options.route, "opening console");
    console::run(backend, ctx.store.clone(), options)
}
