//! `loadgate evaluate`: run a stream of work units through the governor.
//!
//! Input is JSON lines. Each line is either a work unit
//! (`{"features": {...}, "domain": "...", "flow": {...}}`) or a phase
//! boundary (`{"begin_phase": "id"}`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use console::style;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::cli::display::{event_message, status_table, verdict_line};
use crate::cli::output::{output, output_line, CommandOutput};
use crate::domain::models::{
    AdmissionVerdict, BreakerEvent, Config, GovernorStatus, PhaseSummary, RecommendedAction,
    WorkUnit, DEFAULT_PROFILE_NAME,
};
use crate::domain::ports::SystemClock;
use crate::services::AdmissionGateway;

const EVENT_BUFFER: usize = 64;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Domain for units that do not name one
    #[arg(short, long, default_value = DEFAULT_PROFILE_NAME)]
    pub domain: String,

    /// Id of the first phase
    #[arg(short, long, default_value = "main")]
    pub phase: String,

    /// JSON-lines input file (reads stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Wait out breaker cooldowns before the next unit (Ctrl-C stops waiting)
    #[arg(short, long)]
    pub wait: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputLine {
    Phase { begin_phase: String },
    Unit(WorkUnit),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "record")]
enum StreamRecord<'a> {
    Verdict(&'a AdmissionVerdict),
    Event(&'a BreakerEvent),
}

#[derive(Debug, Serialize)]
pub struct EvaluateOutput {
    pub units: usize,
    pub interrupted: bool,
    pub status: GovernorStatus,
    pub phases: Vec<PhaseSummary>,
}

impl CommandOutput for EvaluateOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            String::new(),
            format!("{} unit(s) evaluated", style(self.units).bold()),
            status_table(&self.status).to_string(),
        ];
        for phase in &self.phases {
            lines.push(format!(
                "Phase '{}': {} admitted, {} rejected, peak {:.1}/{}, {} trip(s)",
                phase.phase_id,
                phase.admitted_units,
                phase.rejected_units,
                phase.peak_accumulated,
                phase.capacity,
                phase.trip_count,
            ));
        }
        if self.interrupted {
            lines.push(style("Stopped while waiting for a cooldown").yellow().to_string());
        }
        lines.join("\n")
    }
}

pub async fn execute(args: EvaluateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<BreakerEvent>(EVENT_BUFFER);
    let gateway = AdmissionGateway::from_config(config, Arc::new(SystemClock), Arc::new(tx))
        .context("Invalid weight profiles in configuration")?;

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();

    let mut session = gateway.begin_phase_for(args.phase.clone(), args.domain.clone())?;
    let mut phases = Vec::new();
    let mut units = 0;
    let mut interrupted = false;
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line, &args.domain).with_context(|| format!("Invalid input on line {line_no}"))? {
            InputLine::Phase { begin_phase } => {
                phases.push(gateway.scheduler().end_phase(&session.session_id)?);
                session = gateway.begin_phase_for(begin_phase, args.domain.clone())?;
                if !json_mode {
                    println!("{} {}", style("Phase").bold(), session.phase_id);
                }
            }
            InputLine::Unit(unit) => {
                units += 1;
                let verdict = gateway.evaluate(&session.session_id, &unit)?;
                report_verdict(&verdict, json_mode);
                drain_events(&mut rx, json_mode);

                if args.wait && should_wait(&verdict) {
                    if let Some(retry_after) = verdict.retry_after {
                        if !wait_until(retry_after, json_mode).await {
                            interrupted = true;
                            break;
                        }
                    }
                }
            }
        }
    }

    let status = gateway.status(&session.session_id)?;
    phases.push(gateway.scheduler().end_phase(&session.session_id)?);
    drain_events(&mut rx, json_mode);

    let out = EvaluateOutput {
        units,
        interrupted,
        status,
        phases,
    };
    if json_mode {
        output_line(&serde_json::json!({ "record": "report", "report": out.to_json() }));
    } else {
        output(&out, false);
    }
    Ok(())
}

/// Parse one input line, applying `default_domain` to units that name none.
fn parse_line(line: &str, default_domain: &str) -> Result<InputLine> {
    let mut value: serde_json::Value = serde_json::from_str(line)?;
    if let Some(object) = value.as_object_mut() {
        let names_domain = ["begin_phase", "domain", "domain_id"]
            .iter()
            .any(|key| object.contains_key(*key));
        if !names_domain {
            object.insert("domain".to_string(), default_domain.into());
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Waiting helps only while the breaker is cooling down.
fn should_wait(verdict: &AdmissionVerdict) -> bool {
    matches!(
        verdict.recommended_action,
        RecommendedAction::Simplify | RecommendedAction::Pause
    )
}

/// Sleep until `deadline`. Returns false if interrupted with Ctrl-C.
async fn wait_until(deadline: DateTime<Utc>, json_mode: bool) -> bool {
    let remaining = (deadline - Utc::now()).to_std().unwrap_or_default();
    if remaining.is_zero() {
        return true;
    }
    if !json_mode {
        println!(
            "{}",
            style(format!("Pausing {}s (Ctrl-C to stop)...", remaining.as_secs())).dim()
        );
    }
    tokio::select! {
        () = tokio::time::sleep(remaining) => true,
        _ = tokio::signal::ctrl_c() => false,
    }
}

fn report_verdict(verdict: &AdmissionVerdict, json_mode: bool) {
    if json_mode {
        output_line(&StreamRecord::Verdict(verdict));
    } else {
        println!("{}", verdict_line(verdict));
    }
}

fn drain_events(rx: &mut mpsc::Receiver<BreakerEvent>, json_mode: bool) {
    while let Ok(event) = rx.try_recv() {
        if json_mode {
            output_line(&StreamRecord::Event(&event));
        } else {
            println!("{} {}", style("!").yellow().bold(), event_message(&event));
        }
    }
}
