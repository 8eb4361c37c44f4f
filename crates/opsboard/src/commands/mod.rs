use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use opsboard_app::filter::parse_day;
use opsboard_app::{
    AnalyticsWindow, DashboardService, DragOutcome, LeadAnalytics, LeadQueryBuilder, RecordStore,
    TaskQueryBuilder, ViewMode,
};
use opsboard_core::{Category, Lead, LeadId, LeadStatus, Session, Task, TaskId};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::{Command, OutputFormat, StatsWindow, ViewArg};

/// Number of id characters shown in tables.
const SHORT_ID: usize = 8;

#[allow(clippy::too_many_lines)]
pub fn run<S: RecordStore>(
    command: Command,
    service: &mut DashboardService<S>,
    session: &Session,
) -> Result<()> {
    match command {
        Command::Add { text, category } => {
            let category = category
                .as_deref()
                .map(Category::from_str)
                .transpose()
                .context("invalid --category")?;
            let task = service.add_task(&text, category, session)?;
            println!("created task: {} ({})", task.id, task.title);
            println!("  {}", task_line(&task));
        }
        Command::Tasks {
            scope,
            hide_done,
            priority,
            categories,
            text,
            format,
        } => {
            let query = TaskQueryBuilder::new()
                .with_scope(&scope)?
                .with_completed(!hide_done)
                .with_priority(priority.as_deref())?
                .with_categories(&categories)?
                .with_text(text.as_deref())
                .build();
            let tasks = service.tasks(&query, session);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
                OutputFormat::Table => {
                    for task in tasks {
                        println!("{}", task_line(task));
                    }
                }
            }
        }
        Command::Move { task, over } => {
            let active = resolve_task(service, &task)?;
            let over = resolve_task(service, &over)?;
            report(service.reorder(active, over)?);
        }
        Command::Recategorize { task, category } => {
            let active = resolve_task(service, &task)?;
            let outcome = service.recategorize(active, &category)?;
            if outcome == DragOutcome::NoOp
                && let Err(err) = Category::from_str(&category)
            {
                bail!("task not moved: {err}");
            }
            report(outcome);
        }
        Command::Schedule { task, date } => {
            let active = resolve_task(service, &task)?;
            let date = parse_day("date", &date)?;
            report(service.schedule(active, date, session)?);
        }
        Command::Done { task } => {
            let id = resolve_task(service, &task)?;
            let task = service
                .toggle_done(id, session)?
                .ok_or_else(|| anyhow!("task not found: {id}"))?;
            println!("{}", task_line(&task));
        }
        Command::Purge => {
            let removed = service.purge_completed()?;
            println!("purged {} completed task(s)", removed.len());
        }
        Command::View { mode } => {
            let view = match mode {
                ViewArg::List => ViewMode::List,
                ViewArg::Grouped => ViewMode::Grouped,
            };
            service.set_view(view)?;
            println!("view: {mode:?}, sort: {:?}", service.board().effective_sort());
        }
        Command::ResetOrder => {
            service.reset_order()?;
            println!("manual order cleared");
        }
        Command::LeadAdd {
            name,
            phone,
            message,
            source,
        } => {
            let mut lead = Lead::new(name.trim(), phone.trim(), session.now);
            lead.message = message.unwrap_or_default();
            lead.source = source.filter(|source| !source.trim().is_empty());
            let lead = service.add_lead(lead)?;
            println!("created lead: {} ({})", lead.id, lead.full_name);
        }
        Command::Leads {
            window,
            from,
            to,
            text,
            sort,
            format,
        } => {
            let mut builder = LeadQueryBuilder::new().with_window(&window)?;
            if let (Some(from), Some(to)) = (from.as_deref(), to.as_deref()) {
                builder = builder.with_range(from, to)?;
            }
            let query = builder.with_text(text.as_deref()).with_sort(&sort)?.build();
            let leads = service.leads(&query, session);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&leads)?),
                OutputFormat::Table => {
                    for lead in leads {
                        println!("{}", lead_line(lead));
                    }
                }
            }
        }
        Command::LeadStatus {
            lead,
            status,
            appointment,
        } => {
            let id = resolve_lead(service, &lead)?;
            let status = known_status(&status)?;
            let change = service
                .set_lead_status(id, status, appointment.as_deref(), session)?
                .ok_or_else(|| anyhow!("lead not found: {id}"))?;
            println!("{}", lead_line(&change.lead));
            if let Some(task) = change.follow_up {
                println!("created task: {} ({})", task.id, task.title);
            }
        }
        Command::Appointment { lead, at } => {
            let id = resolve_lead(service, &lead)?;
            let lead = service
                .edit_appointment(id, &at)?
                .ok_or_else(|| anyhow!("lead {id} has no booked appointment"))?;
            if lead.appointment().is_none() {
                eprintln!("warning: '{at}' is not an RFC 3339 timestamp; appointment cleared");
            }
            println!("{}", lead_line(&lead));
        }
        Command::Note { lead, text } => {
            let id = resolve_lead(service, &lead)?;
            let lead = service
                .add_note(id, &text, session.now)?
                .ok_or_else(|| anyhow!("note not recorded for lead {id}"))?;
            println!("{} note(s) on {}", lead.conversation_summary.len(), lead.full_name);
        }
        Command::Stats { window, from, to } => {
            let report = match window {
                StatsWindow::Week => service.analytics(AnalyticsWindow::Last7Days, session.now),
                StatsWindow::Month => service.analytics(AnalyticsWindow::MonthToDate, session.now),
                StatsWindow::PrevMonth => {
                    service.analytics(AnalyticsWindow::PreviousMonth, session.now)
                }
                StatsWindow::Custom => {
                    let from =
                        from.ok_or_else(|| anyhow!("--from is required for a custom window"))?;
                    service
                        .custom_analytics(&from, to.as_deref(), session.now)
                        .ok_or_else(|| anyhow!("invalid date range; use YYYY-MM-DD"))?
                }
            };
            print_stats(&report);
        }
    }
    Ok(())
}

fn report(outcome: DragOutcome) {
    match outcome {
        DragOutcome::NoOp => println!("nothing changed"),
        DragOutcome::Reordered => println!("reordered"),
        DragOutcome::Recategorized { from, to } => println!("moved from {from} to {to}"),
        DragOutcome::Rescheduled { due } => println!("due {}", display_time(due)),
    }
}

/// Accept a full id or a unique prefix of one.
fn resolve_task<S: RecordStore>(service: &DashboardService<S>, token: &str) -> Result<TaskId> {
    if let Ok(id) = TaskId::from_str(token) {
        return Ok(id);
    }
    unique_prefix(
        service.board().tasks().iter().map(|task| task.id),
        token,
        "task",
    )
}

fn resolve_lead<S: RecordStore>(service: &DashboardService<S>, token: &str) -> Result<LeadId> {
    if let Ok(id) = LeadId::from_str(token) {
        return Ok(id);
    }
    unique_prefix(
        service.lead_book().leads().iter().map(|lead| lead.id),
        token,
        "lead",
    )
}

fn unique_prefix<T: ToString>(ids: impl Iterator<Item = T>, token: &str, kind: &str) -> Result<T> {
    let prefix = token.trim().to_ascii_lowercase();
    if prefix.is_empty() {
        bail!("empty {kind} id");
    }
    let mut matches = ids.filter(|id| id.to_string().starts_with(&prefix));
    let first = matches.next().ok_or_else(|| anyhow!("{kind} not found: {token}"))?;
    if matches.next().is_some() {
        bail!("{kind} id prefix '{token}' is ambiguous");
    }
    Ok(first)
}

fn known_status(token: &str) -> Result<LeadStatus> {
    match LeadStatus::from(token.to_owned()) {
        LeadStatus::Unknown(raw) => {
            let statuses = LeadStatus::KNOWN;
            let known: Vec<&str> = statuses.iter().map(LeadStatus::as_str).collect();
            bail!("unknown lead status '{raw}' (expected one of: {})", known.join(", "))
        }
        status => Ok(status),
    }
}

fn display_time(ts: OffsetDateTime) -> String {
    ts.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| ts.to_string())
}

fn short(id: &impl ToString) -> String {
    id.to_string().chars().take(SHORT_ID).collect()
}

fn task_line(task: &Task) -> String {
    let due = match (task.due(), task.due_date.as_deref()) {
        (Some(due), _) => display_time(due),
        (None, Some(raw)) if !raw.trim().is_empty() => format!("invalid({raw})"),
        (None, _) => "-".to_owned(),
    };
    format!(
        "{}  [{}]  {due:<16}  {:<14}  {:<6}  {:<12}  {}",
        short(&task.id),
        if task.done { "x" } else { " " },
        task.category.as_str(),
        task.priority.as_str(),
        task.assign_to,
        task.title,
    )
}

fn lead_line(lead: &Lead) -> String {
    let appointment = lead
        .appointment()
        .map(|at| format!("  @ {}", display_time(at)))
        .unwrap_or_default();
    format!(
        "{}  {}  {:<18}  {:<20}  {:<14}  {}{appointment}",
        short(&lead.id),
        display_time(lead.created_at),
        lead.status.as_str(),
        lead.full_name,
        lead.phone_number,
        lead.source_label(),
    )
}

fn print_stats(report: &LeadAnalytics) {
    println!(
        "window: {} .. {} ({} days)",
        report.window_start, report.window_end, report.day_count
    );
    println!("total leads: {}", report.total_leads);
    println!("leads per day: {:.2}", report.leads_per_day);
    println!("conversion rate: {:.1}%", report.conversion_rate);
    println!(
        "first response: {} ({} lead(s) with a logged reply)",
        report.response_latency, report.response_latency.sample_size
    );
    println!("by status:");
    for (status, count) in &report.by_status {
        println!("  {status:<20} {count}");
    }
    println!("by source:");
    for (source, count) in &report.by_source {
        println!("  {source:<20} {count}");
    }
    println!("daily:");
    for day in &report.daily {
        println!("  {}  {}", day.date, day.count);
    }
}
