//! End-to-end flow through `DashboardService` against an in-memory store.
//!
//! Covers intake from a configured directory, drag reconciliation, the
//! filter pipeline, the lead lifecycle and analytics on one shared board.

#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]

use std::cell::RefCell;
use std::convert::Infallible;
use std::fs;

use opsboard_app::config::CONFIG_DIR;
use opsboard_app::{
    AnalyticsWindow, BoardLayout, DashboardService, DragOutcome, DropTarget, KeywordIntakeParser,
    LeadQueryBuilder, ProjectConfig, RecordStore, SortMode, TaskQueryBuilder, ViewMode,
};
use opsboard_core::{Category, Identity, Lead, LeadStatus, Session, Task, TaskId};
use tempfile::TempDir;
use time::macros::{date, datetime};

#[derive(Default)]
struct MemoryStore {
    tasks: RefCell<Vec<Task>>,
    leads: RefCell<Vec<Lead>>,
    layout: RefCell<BoardLayout>,
}

impl RecordStore for MemoryStore {
    type Error = Infallible;

    fn load_tasks(&self) -> Result<Vec<Task>, Infallible> {
        Ok(self.tasks.borrow().clone())
    }

    fn load_leads(&self) -> Result<Vec<Lead>, Infallible> {
        Ok(self.leads.borrow().clone())
    }

    fn upsert_task(&self, task: &Task) -> Result<(), Infallible> {
        let mut tasks = self.tasks.borrow_mut();
        tasks.retain(|existing| existing.id != task.id);
        tasks.push(task.clone());
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> Result<(), Infallible> {
        self.tasks.borrow_mut().retain(|task| task.id != id);
        Ok(())
    }

    fn upsert_lead(&self, lead: &Lead) -> Result<(), Infallible> {
        let mut leads = self.leads.borrow_mut();
        leads.retain(|existing| existing.id != lead.id);
        leads.push(lead.clone());
        Ok(())
    }

    fn load_layout(&self) -> Result<BoardLayout, Infallible> {
        Ok(self.layout.borrow().clone())
    }

    fn save_layout(&self, layout: &BoardLayout) -> Result<(), Infallible> {
        *self.layout.borrow_mut() = layout.clone();
        Ok(())
    }
}

fn workdir_with_config() -> TempDir {
    let dir = TempDir::with_prefix("opsboard-flow-").expect("create temp dir");
    let cfg_dir = dir.path().join(CONFIG_DIR);
    fs::create_dir_all(&cfg_dir).expect("create config dir");
    fs::write(
        cfg_dir.join("config.toml"),
        r#"
[session]
id = "u-dana"
email = "dana@example.com"
alias = "dana"

[[directory]]
id = "u-yossi"
email = "yossi@example.com"
alias = "Yossi"
"#,
    )
    .expect("write config");
    dir
}

fn open() -> (DashboardService<MemoryStore>, Session) {
    let dir = workdir_with_config();
    let config = ProjectConfig::from_workdir(dir.path()).expect("load config");
    let session = Session::new(datetime!(2025-10-17 10:00 +3), config.session.clone());
    let service = DashboardService::open(
        MemoryStore::default(),
        config.directory.clone(),
        KeywordIntakeParser::new(config.intake),
    )
    .expect("open service");
    (service, session)
}

#[test]
fn intake_to_board_to_filter() {
    let (mut service, session) = open();

    let payment = service.add_task("תשלומים מחר ב-14:30", None, &session).unwrap();
    assert_eq!(payment.category, Category::Payments);
    assert_eq!(payment.due(), Some(datetime!(2025-10-18 14:30 +3)));
    assert_eq!(payment.assign_to, "dana");

    let delegated = service
        .add_task("call client {yossi} on 20/10 at 11:00", None, &session)
        .unwrap();
    assert_eq!(delegated.assign_to, "Yossi");
    assert_eq!(delegated.category, Category::Clients);
    assert_eq!(delegated.due(), Some(datetime!(2025-10-20 11:00 +3)));

    let mine = TaskQueryBuilder::new().with_scope("mine").unwrap().build();
    let visible: Vec<TaskId> = service.tasks(&mine, &session).iter().map(|task| task.id).collect();
    assert_eq!(visible, vec![payment.id]);

    let others = TaskQueryBuilder::new().with_scope("others").unwrap().build();
    let visible: Vec<TaskId> = service
        .tasks(&others, &session)
        .iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(visible, vec![delegated.id]);
}

#[test]
fn manual_order_survives_sync_until_grouped_view() {
    let (mut service, session) = open();
    let early = service.add_task("supplier order tomorrow", None, &session).unwrap();
    let late = service.add_task("campaign review on 30/10", None, &session).unwrap();

    let everything = TaskQueryBuilder::new().build();
    let order = |service: &DashboardService<MemoryStore>| -> Vec<TaskId> {
        service.tasks(&everything, &session).iter().map(|task| task.id).collect()
    };
    assert_eq!(order(&service), vec![early.id, late.id]);

    assert_eq!(service.reorder(late.id, early.id).unwrap(), DragOutcome::Reordered);
    assert_eq!(service.board().sort_mode(), SortMode::Manual);
    assert_eq!(order(&service), vec![late.id, early.id]);

    service.sync().unwrap();
    assert_eq!(order(&service), vec![late.id, early.id]);

    service.set_view(ViewMode::Grouped).unwrap();
    assert_eq!(order(&service), vec![early.id, late.id]);
    assert_eq!(service.store().layout.borrow().sort_mode, SortMode::Auto);
}

#[test]
fn drag_between_columns_and_onto_calendar() {
    let (mut service, session) = open();
    let task = service.add_task("supplier order tomorrow evening", None, &session).unwrap();
    assert_eq!(task.due(), Some(datetime!(2025-10-18 18:00 +3)));

    service.set_view(ViewMode::Grouped).unwrap();
    assert!(service.begin_drag(task.id));
    let outcome = service
        .end_drag(Some(DropTarget::Column("NotAValidCategory".into())), &session)
        .unwrap();
    assert_eq!(outcome, DragOutcome::NoOp);

    assert!(service.begin_drag(task.id));
    let outcome = service
        .end_drag(Some(DropTarget::CalendarDay(date!(2025-10-25))), &session)
        .unwrap();
    assert_eq!(
        outcome,
        DragOutcome::Rescheduled {
            due: datetime!(2025-10-25 18:00 +3)
        }
    );

    service.sync().unwrap();
    let stored = service.board().get(task.id).unwrap();
    assert_eq!(stored.category, Category::Purchasing);
    assert_eq!(stored.due(), Some(datetime!(2025-10-25 18:00 +3)));
}

#[test]
fn lead_lifecycle_feeds_board_and_analytics() {
    let (mut service, session) = open();
    let mut lead = Lead::new("Noa Levi", "052-1234567", datetime!(2025-10-14 9:00 +3));
    lead.source = Some("Instagram".into());
    let lead = service.add_lead(lead).unwrap();
    service
        .add_lead(Lead::new("Avi", "050-0000000", datetime!(2025-10-16 9:00 +3)))
        .unwrap();

    service
        .add_note(lead.id, "called, wants a quote", datetime!(2025-10-14 15:00 +3))
        .unwrap();
    let change = service
        .set_lead_status(
            lead.id,
            LeadStatus::AppointmentBooked,
            Some("2025-10-21T10:00:00+03:00"),
            &session,
        )
        .unwrap()
        .unwrap();
    let reminder = change.follow_up.unwrap();
    assert_eq!(reminder.category, Category::Clients);

    let query = LeadQueryBuilder::new().with_window("7d").unwrap().build();
    let names: Vec<&str> = service
        .leads(&query, &session)
        .iter()
        .map(|lead| lead.full_name.as_str())
        .collect();
    assert_eq!(names, vec!["Avi", "Noa Levi"]);

    let report = service.analytics(AnalyticsWindow::Last7Days, session.now);
    assert_eq!(report.total_leads, 2);
    assert!((report.conversion_rate - 50.0).abs() < 1e-9);
    assert_eq!(report.response_latency.to_string(), "6.0h");
    assert_eq!(report.by_source.get("Instagram"), Some(&1));
    assert_eq!(report.daily.len(), 7);

    let calendar_due = service.board().get(reminder.id).and_then(Task::due);
    assert_eq!(calendar_due, Some(datetime!(2025-10-21 10:00 +3)));
}

#[test]
fn purge_and_identity_fallback() {
    let (mut service, _) = open();
    let anonymous = Session::new(datetime!(2025-10-17 10:00 +3), Identity::default());
    let task = service.add_task("???", None, &anonymous).unwrap();
    assert_eq!(task.assign_to, "self");
    assert_eq!(task.due(), Some(datetime!(2025-10-17 13:00 +3)));

    service.toggle_done(task.id, &anonymous).unwrap();
    assert_eq!(service.purge_completed().unwrap(), vec![task.id]);
    assert!(service.store().tasks.borrow().is_empty());
}
