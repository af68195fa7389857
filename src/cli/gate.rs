//! `taskdesk gate`: show how a navigation would be decided.

use crate::error::Result;
use crate::gate::{evaluate, CurrentSession, GateDecision, Presence, Route};
use crate::output::{emit_success, HumanOutput};

use super::Context;

#[derive(serde::Serialize)]
struct GateReport {
    route: String,
    decision: &'static str,
    location: Option<String>,
}

pub fn run(ctx: &Context, path: &str) -> Result<()> {
    let route = Route::parse(path)?;
    let policy = ctx.config.gate_policy();

    // The reset route admits everyone, so it never needs a lookup.
    let presence = if route == Route::ResetPassword {
        Presence::Absent
    } else {
        match ctx.backend() {
            Ok(backend) => CurrentSession::new(&ctx.store, backend.identity())
                .resolve()
                .into(),
            Err(err) => Presence::Unknown(err),
        }
    };

    let decision = evaluate(&route, &presence, policy);
    let (label, location) = match &decision {
        GateDecision::Admit => ("admit", None),
        GateDecision::Redirect(to) => ("redirect", Some(to.to_string())),
    };

    let header = match &location {
        None => format!("admit {route}"),
        Some(to) => format!("redirect {route} -> {to}"),
    };
    let mut human = HumanOutput::new(header);
    if let Presence::Unknown(err) = &presence {
        human.push_warning(format!("session lookup failed: {err}"));
    }

    emit_success(
        ctx.output,
        "gate",
        &GateReport {
            route: route.to_string(),
            decision: label,
            location,
        },
        Some(&human),
    )
}
