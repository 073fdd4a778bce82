//! User-facing rendering of verdicts, statuses and breaker events.
//!
//! Coloring goes through `console`, which honours `NO_COLOR` and disables
//! itself when stdout is not a terminal.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::{style, StyledObject};

use crate::domain::models::{
    AdmissionVerdict, BreakerEvent, BreakerState, BreakerTransition, FlowClassification,
    GovernorStatus, LoadCategory, RecommendedAction, RecoveryAction,
};

pub fn colorize_category(category: LoadCategory) -> StyledObject<&'static str> {
    let text = category.as_str();
    match category {
        LoadCategory::Simple => style(text).green(),
        LoadCategory::Moderate => style(text).cyan(),
        LoadCategory::Complex => style(text).yellow(),
        LoadCategory::Overload => style(text).red().bold(),
    }
}

pub fn colorize_action(action: RecommendedAction) -> StyledObject<&'static str> {
    let text = action.as_str();
    match action {
        RecommendedAction::Proceed => style(text).green(),
        RecommendedAction::Simplify => style(text).yellow(),
        RecommendedAction::Pause => style(text).yellow().bold(),
        RecommendedAction::Reroute => style(text).magenta(),
        RecommendedAction::Reject => style(text).red().bold(),
    }
}

pub fn colorize_breaker(state: BreakerState) -> StyledObject<&'static str> {
    let text = state.as_str();
    match state {
        BreakerState::Closed => style(text).green(),
        BreakerState::HalfOpen => style(text).yellow(),
        BreakerState::Open => style(text).red().bold(),
    }
}

fn colorize_flow(flow: FlowClassification) -> StyledObject<&'static str> {
    let text = flow.as_str();
    match flow {
        FlowClassification::Optimal => style(text).green().bold(),
        FlowClassification::Focused => style(text).green(),
        FlowClassification::Challenged => style(text).yellow(),
        FlowClassification::Overloaded => style(text).red(),
    }
}

/// One status line per verdict, e.g.
/// `Cognitive Load: complex | action: simplify | breaker: open | load 2.8`.
pub fn verdict_line(verdict: &AdmissionVerdict) -> String {
    let mut line = format!(
        "Cognitive Load: {} | action: {} | breaker: {} | load {:.1}",
        colorize_category(verdict.category),
        colorize_action(verdict.recommended_action),
        colorize_breaker(verdict.breaker_state),
        verdict.accumulated,
    );
    if verdict.degraded {
        line.push_str(&format!(" {}", style("(default profile)").dim()));
    }
    line
}

/// Presentation of a breaker transition.
pub fn event_message(event: &BreakerEvent) -> String {
    match event.transition {
        BreakerTransition::Tripped | BreakerTransition::Reopened => match &event.recovery_action {
            Some(RecoveryAction::Pause { cooldown_secs }) => format!(
                "Cognitive break recommended (circuit breaker cooldown: {cooldown_secs}s)"
            ),
            Some(RecoveryAction::Reroute { reason }) => {
                format!("Routing to a simpler handler: {reason}")
            }
            Some(RecoveryAction::Reject { reason }) => format!("Stop submitting work: {reason}"),
            None => format!(
                "Circuit breaker open (cooldown: {}s)",
                event.cooldown_secs
            ),
        },
        BreakerTransition::Probing => "Cooldown elapsed, probing with the next unit".to_string(),
        BreakerTransition::Recovered => "Circuit breaker closed, normal admission resumed".to_string(),
    }
}

pub fn status_table(status: &GovernorStatus) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut row = |label: &str, value: String| {
        table.add_row(vec![
            Cell::new(label).set_alignment(CellAlignment::Right),
            Cell::new(value),
        ]);
    };
    row("PHASE", status.phase_id.clone());
    row(
        "LOAD",
        format!("{:.1} / {}", status.accumulated, status.capacity),
    );
    row("BREAKER", colorize_breaker(status.breaker_state).to_string());
    row("TRIPS", status.trip_count.to_string());
    if let Some(flow) = status.flow_classification {
        row("FLOW", colorize_flow(flow).to_string());
    }
    if let Some(retry_after) = status.retry_after {
        row("RETRY AFTER", retry_after.to_rfc3339());
    }
    table
}
