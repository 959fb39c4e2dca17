//! campusdeck - headless driver for the admin console's data layer
//!
//! Loads one section (or one resource) for a tenant through the cache,
//! network and fallback pipeline and prints what happened.

use clap::Parser;
use serde::Serialize;
use std::process;
use std::sync::Arc;

use campusdeck::app::{App, Refreshed};
use campusdeck::cli::{Cli, LoadTarget, StartupConfig};
use campusdeck::config::Config;
use campusdeck::data::DataSource;
use campusdeck::logging;
use campusdeck::notify::{Notice, RecordingNotifier, Severity};
use campusdeck::orchestrator::{OutcomeStatus, ResourceReport, SectionOutcome};
use campusdeck::section::SECTION_PLANS;
use campusdeck::stats::DashboardStats;

/// Everything printed after a run
#[derive(Debug, Serialize)]
struct Report<'a> {
    tenant: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    section: Option<SectionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<ResourceReport>,
    notices: Vec<Notice>,
    stats: DashboardStats,
}

fn source_label(source: DataSource) -> &'static str {
    match source {
        DataSource::Cache => "cache",
        DataSource::Network => "network",
        DataSource::Demo => "demo",
        DataSource::LastKnown => "last-known",
        DataSource::Empty => "empty",
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Success => "success",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

fn print_sections() {
    for plan in &SECTION_PLANS {
        let resources: Vec<&str> = plan.resources.iter().map(|r| r.as_str()).collect();
        println!(
            "{:<15} {:>6} ms  {}",
            plan.section.as_str(),
            plan.budget_ms,
            resources.join(", ")
        );
    }
}

fn print_resource_line(report: &ResourceReport) {
    let mut line = format!(
        "  {:<20} {:<11} {:>5} records",
        report.resource.as_str(),
        source_label(report.source),
        report.records
    );
    if let Some(error) = &report.error {
        line.push_str(&format!("  ({})", error));
    }
    if !report.committed {
        line.push_str("  [not shown]");
    }
    println!("{}", line);
}

fn print_text(report: &Report<'_>) {
    println!("Tenant: {}", report.tenant);

    if let Some(outcome) = &report.section {
        let status = match outcome.status {
            OutcomeStatus::Complete => "complete",
            OutcomeStatus::Partial => "partial",
            OutcomeStatus::TimedOut => "timed out",
        };
        println!(
            "Section: {} ({}, {} ms)",
            outcome.section, status, outcome.elapsed_ms
        );
        for resource in &outcome.resources {
            print_resource_line(resource);
        }
        for pending in &outcome.pending {
            println!("  {:<20} still loading", pending.as_str());
        }
    }
    if let Some(resource) = &report.resource {
        println!("Refreshed:");
        print_resource_line(resource);
    }

    if !report.notices.is_empty() {
        println!("Notices:");
        for notice in &report.notices {
            println!("  [{}] {}", severity_label(notice.severity), notice.message);
        }
    }

    let stats = &report.stats;
    println!("Stats:");
    println!("  Users:         {} total, {} active", stats.total_users, stats.active_users);
    println!("  Teachers:      {} total, {} active", stats.total_teachers, stats.active_teachers);
    println!("  Courses:       {}", stats.total_courses);
    println!(
        "  Batches:       {} total, {} active, {} completed",
        stats.total_batches, stats.active_batches, stats.completed_batches
    );
    if let Some(ratio) = stats.batch_completion_ratio {
        println!("  Completion:    {:.0}%", ratio * 100.0);
    }
    println!("  Live sessions: {} upcoming", stats.upcoming_live_sessions);
    println!("  Open jobs:     {}", stats.open_jobs);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let startup = match StartupConfig::from_cli(&cli) {
        Ok(startup) => startup,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if startup.list_sections {
        print_sections();
        return Ok(());
    }

    let _log_guard = logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config = Config::load(startup.config_path.as_deref(), &startup.overrides)?;
    let notifier = Arc::new(RecordingNotifier::new());
    let app = App::from_config(&config, notifier.clone())?;

    if let Some(clear) = startup.clear_cache {
        app.clear_cache(clear.key())?;
    }

    let (section, resource) = match startup.target {
        LoadTarget::Section(section) => (Some(app.navigate(section).await), None),
        LoadTarget::Resource(resource) => match app.refresh_data(Some(resource)).await {
            Refreshed::Resource(loaded) => (None, Some(ResourceReport::from_loaded(&loaded, true))),
            Refreshed::Section(outcome) => (Some(outcome), None),
        },
    };

    let report = Report {
        tenant: app.tenant(),
        section,
        resource,
        notices: notifier.drain(),
        stats: app.stats(),
    };

    if startup.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }

    Ok(())
}
