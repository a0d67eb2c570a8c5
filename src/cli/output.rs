//! CLI output formatting

use crate::core::{JobStatus, RunReport, StepOutcome, StepRecord};
use crate::execution::ExecutionEvent;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format a run status for display
pub fn format_status(status: JobStatus) -> String {
    match status {
        JobStatus::Pending => style("PENDING").dim().to_string(),
        JobStatus::Provisioning => style("PROVISIONING").yellow().to_string(),
        JobStatus::Running => style("RUNNING").yellow().to_string(),
        JobStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        JobStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a step outcome for display
pub fn format_outcome(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Success => format!("{}{}", CHECK, style("ok").green()),
        StepOutcome::Warning { message } => {
            format!("{}{} ({})", WARN, style("warning").yellow(), message)
        }
        StepOutcome::Failed { error, exit_code } => format!(
            "{}{} (exit {}): {}",
            CROSS,
            style("failed").red(),
            exit_code,
            error
        ),
    }
}

/// Format one log record as a single line
pub fn format_step_record(record: &StepRecord) -> String {
    format!(
        "  {} {} [{}] {}",
        style(format!("#{}", record.index + 1)).dim(),
        style(&record.name).bold(),
        style(format_duration_ms(record.duration_ms)).dim(),
        format_outcome(&record.outcome)
    )
}

/// Format an execution event for live display
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    match event {
        ExecutionEvent::JobStarted {
            job_name,
            total_steps,
            ..
        } => Some(format!(
            "{} Running job {} ({} steps)",
            ROCKET,
            style(job_name).bold(),
            total_steps
        )),
        ExecutionEvent::StepFinished { record } => Some(format_step_record(record)),
        // step starts are visible from their finish line; keep the stream terse
        ExecutionEvent::StepStarted { .. } => None,
        ExecutionEvent::JobFinished { .. } => None,
    }
}

/// Format a duration in milliseconds for display
pub fn format_duration_ms(ms: u64) -> String {
    let secs = ms / 1000;
    if secs < 1 {
        format!("{}ms", ms)
    } else if secs < 60 {
        format!("{}.{}s", secs, (ms % 1000) / 100)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Render the final report as JSON
pub fn report_json(report: &RunReport) -> serde_json::Value {
    serde_json::json!({
        "run_id": report.run_id,
        "job": report.job_name,
        "status": report.status,
        "started_at": report.started_at,
        "completed_at": report.completed_at,
        "failed_step": report.failed_step,
        "error": report.error.as_ref().map(|e| e.to_string()),
        "exit_code": report.exit_code(),
        "steps": report.records,
    })
}
