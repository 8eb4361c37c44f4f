//! Free-text task intake.
//!
//! Turns a sentence such as `"תשלומים מחר ב-14:30"` or
//! `"call {yossi} about the invoice tomorrow morning"` into a draft [`Task`].
//! Recognised tokens (dates, times, day parts, category keywords and the
//! `{assignee}` token) are stripped from the title; whatever is left becomes
//! the title, falling back to the raw sentence when nothing is left.
//!
//! The keyword sets are English and Hebrew. Everything language-specific
//! lives behind [`IntakeParser`], so another implementation can be swapped in
//! without touching ordering or filtering.

use std::sync::OnceLock;

use opsboard_core::calendar::at_local;
use opsboard_core::{Category, Directory, Session, Task};
use regex::{Captures, Regex};
use serde::Deserialize;
use time::macros::time;
use time::{Date, Duration, Month, Time};

/// Input for a single intake parse.
#[derive(Debug, Clone, Copy)]
pub struct IntakeRequest<'a> {
    /// Raw sentence typed by the user.
    pub text: &'a str,
    /// Category chosen explicitly in the form, if any.
    pub category: Option<Category>,
    /// Identities an `{alias}` token may resolve to.
    pub directory: &'a Directory,
    /// Current time and user.
    pub session: &'a Session,
}

/// Turns free text into a draft task. Implementations never fail.
pub trait IntakeParser {
    /// Build a draft task (`done = false`, default priority, non-empty title when the input is).
    fn parse(&self, request: &IntakeRequest<'_>) -> Task;
}

/// Hours and thresholds used while resolving dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IntakeSettings {
    /// Hour used when the sentence names no time at all.
    pub default_hour: u8,
    /// Hour for "morning" / "בבוקר".
    pub morning_hour: u8,
    /// Hour for "afternoon" / "בצהריים".
    pub afternoon_hour: u8,
    /// Hour for "evening" / "בערב".
    pub evening_hour: u8,
    /// A year-less date further than this many days in the past moves to next year.
    pub year_rollover_days: i64,
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            default_hour: 13,
            morning_hour: 9,
            afternoon_hour: 14,
            evening_hour: 18,
            year_rollover_days: 30,
        }
    }
}

impl IntakeSettings {
    const fn hour_for(&self, part: DayPart) -> u8 {
        match part {
            DayPart::Morning => self.morning_hour,
            DayPart::Afternoon => self.afternoon_hour,
            DayPart::Evening => self.evening_hour,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "morning" | "בבוקר" => Some(Self::Morning),
            "afternoon" | "בצהריים" | "אחה\"צ" => Some(Self::Afternoon),
            "evening" | "בערב" => Some(Self::Evening),
            _ => None,
        }
    }
}

/// Keyword and pattern based parser for English and Hebrew sentences.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntakeParser {
    settings: IntakeSettings,
}

impl KeywordIntakeParser {
    /// Create a parser with explicit settings.
    #[must_use]
    pub const fn new(settings: IntakeSettings) -> Self {
        Self { settings }
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &IntakeSettings {
        &self.settings
    }

    fn explicit_date(&self, caps: &Captures<'_>, today: Date) -> Option<Date> {
        let day: u8 = caps.get(1)?.as_str().parse().ok()?;
        let month: u8 = caps.get(2)?.as_str().parse().ok()?;
        let month = Month::try_from(month).ok()?;

        if let Some(year) = caps.get(3) {
            let digits = year.as_str();
            let mut year: i32 = digits.parse().ok()?;
            if digits.len() == 2 {
                year += 2000;
            }
            return Date::from_calendar_date(year, month, day).ok();
        }

        let date = Date::from_calendar_date(today.year(), month, day).ok()?;
        if (today - date).whole_days() > self.settings.year_rollover_days {
            return Some(date.replace_year(date.year() + 1).unwrap_or(date));
        }
        Some(date)
    }

    fn hour(&self, hour: u8) -> Option<Time> {
        Time::from_hms(hour, 0, 0)
            .inspect_err(|err| tracing::warn!(hour, %err, "ignoring configured intake hour"))
            .ok()
    }
}

impl IntakeParser for KeywordIntakeParser {
    fn parse(&self, request: &IntakeRequest<'_>) -> Task {
        let IntakeRequest {
            text,
            category,
            directory,
            session,
        } = *request;
        let today = session.now.date();
        let mut rest = text.to_owned();

        let assign_to = take_assignee(&mut rest, directory)
            .unwrap_or_else(|| session.user.assignee_key().to_owned());
        // Names inside `{...}` never count as category keywords.
        let detected = detect_category(&rest);

        let explicit = take_first(&mut rest, re_numeric_date(), |caps| {
            self.explicit_date(caps, today)
        });
        let clock = take_first(&mut rest, re_clock(), |caps| {
            let hour: u8 = caps.get(1)?.as_str().parse().ok()?;
            let minute: u8 = caps.get(2)?.as_str().parse().ok()?;
            Time::from_hms(hour, minute, 0).ok()
        });
        let bare_hour = take_first(&mut rest, re_bare_hour(), |caps| {
            let hour: u8 = caps.get(1)?.as_str().parse().ok()?;
            Time::from_hms(hour, 0, 0).ok()
        });
        let relative = take_first(&mut rest, re_relative_day(), |caps| {
            let word = caps.get(1)?.as_str().to_lowercase();
            let days = if matches!(word.as_str(), "tomorrow" | "מחר") { 1 } else { 2 };
            Some((days, caps.get(2).and_then(|part| DayPart::from_word(part.as_str()))))
        });
        let day_part = take_first(&mut rest, re_day_part(), |caps| {
            DayPart::from_word(caps.get(1)?.as_str())
        });

        let date = explicit
            .or_else(|| relative.and_then(|(days, _)| today.checked_add(Duration::days(days))))
            .unwrap_or(today);
        let time = clock
            .or(bare_hour)
            .or_else(|| {
                relative
                    .and_then(|(_, part)| part)
                    .or(day_part)
                    .and_then(|part| self.hour(self.settings.hour_for(part)))
            })
            .or_else(|| self.hour(self.settings.default_hour))
            .unwrap_or(time!(13:00));

        let category = category.or(detected).unwrap_or_default();
        rest = strip_keywords(&rest, category);

        let title = tidy_title(&rest);
        let mut task = Task::new(
            if title.is_empty() { text.to_owned() } else { title },
            assign_to,
            session.now,
        );
        task.category = category;
        task.creator_id.clone_from(&session.user.id);
        if let Err(err) = task.set_due(at_local(date, time, session.offset())) {
            tracing::warn!(%err, "intake produced an unformattable due date; leaving it empty");
        }
        tracing::debug!(
            title = %task.title,
            category = %task.category,
            due = ?task.due_date,
            "parsed intake text"
        );
        task
    }
}

/// First category (declaration order) whose keyword occurs in `text`.
#[must_use]
pub fn detect_category(text: &str) -> Option<Category> {
    let lowered = text.to_lowercase();
    Category::ALL
        .into_iter()
        .find(|category| category.keywords().iter().any(|keyword| lowered.contains(keyword)))
}

fn take_assignee(rest: &mut String, directory: &Directory) -> Option<String> {
    let re = re_assignee()?;
    let resolved = re
        .captures(rest.as_str())
        .and_then(|caps| caps.get(1))
        .and_then(|name| directory.lookup(name.as_str()))
        .map(|identity| identity.assignee_key().to_owned());
    *rest = re.replace_all(rest.as_str(), " ").into_owned();
    resolved
}

/// Remove the first match accepted by `accept` and return its value.
fn take_first<T>(
    rest: &mut String,
    re: Option<&Regex>,
    mut accept: impl FnMut(&Captures<'_>) -> Option<T>,
) -> Option<T> {
    let (value, range) = re?.captures_iter(rest.as_str()).find_map(|caps| {
        let range = caps.get(0)?.range();
        accept(&caps).map(|value| (value, range))
    })?;
    rest.replace_range(range, " ");
    Some(value)
}

fn strip_keywords(rest: &str, category: Category) -> String {
    let keywords = category.keywords();
    rest.split_whitespace()
        .filter(|word| {
            let lowered = word.to_lowercase();
            !keywords.iter().any(|keyword| lowered.contains(keyword))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn tidy_title(rest: &str) -> String {
    let collapsed = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ',' | ':' | ';'))
        .to_owned()
}

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .inspect_err(|err| tracing::error!(%err, pattern, "intake pattern failed to compile"))
            .ok()
    })
    .as_ref()
}

fn re_assignee() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"\{([^{}]*)\}")
}

fn re_numeric_date() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?:(?i:\bon\s+)|ב-?|\b)(\d{1,2})[/.](\d{1,2})(?:[/.](\d{4}|\d{2}))?\b")
}

fn re_clock() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?:(?i:\bat\s+)|בשעה\s+|ב-?|\b)(\d{1,2}):(\d{2})\b")
}

fn re_bare_hour() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?:(?i:\bat\s+)|בשעה\s+|ב-)(\d{1,2})\b")
}

fn re_relative_day() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(
        &RE,
        r"(?i)\b(day after tomorrow|מחרתיים|tomorrow|מחר)\b(?:\s+(morning|evening|בבוקר|בערב)\b)?",
    )
}

fn re_day_part() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r#"(?i)\b(morning|afternoon|evening|בבוקר|בצהריים|אחה"צ|בערב)(?:\b|$)"#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsboard_core::Identity;
    use time::macros::{date, datetime};
    use time::OffsetDateTime;

    fn session() -> Session {
        Session::new(
            datetime!(2025-10-17 10:00 +3),
            Identity {
                id: "u-dana".into(),
                email: "dana@example.com".into(),
                alias: "dana".into(),
            },
        )
    }

    fn directory() -> Directory {
        Directory(vec![Identity {
            id: "u-yossi".into(),
            email: "yossi@example.com".into(),
            alias: "Yossi".into(),
        }])
    }

    fn parse_with(text: &str, category: Option<Category>) -> Task {
        let directory = directory();
        let session = session();
        KeywordIntakeParser::default().parse(&IntakeRequest {
            text,
            category,
            directory: &directory,
            session: &session,
        })
    }

    fn parse(text: &str) -> Task {
        parse_with(text, None)
    }

    fn due(task: &Task) -> OffsetDateTime {
        task.due().unwrap_or_else(|| panic!("draft must carry a due date: {:?}", task.due_date))
    }

    #[test]
    fn hebrew_category_tomorrow_and_clock() {
        let task = parse("תשלומים מחר ב-14:30");
        assert_eq!(task.category, Category::Payments);
        assert_eq!(due(&task), datetime!(2025-10-18 14:30 +3));
        assert_eq!(task.title, "תשלומים מחר ב-14:30");
        assert!(!task.done);
        assert_eq!(task.priority, opsboard_core::Priority::Normal);
    }

    #[test]
    fn english_sentence_keeps_remaining_words_as_title() {
        let task = parse("send invoice to Acme tomorrow at 9:15");
        assert_eq!(task.category, Category::Payments);
        assert_eq!(due(&task), datetime!(2025-10-18 9:15 +3));
        assert_eq!(task.title, "send to Acme");
    }

    #[test]
    fn past_day_month_without_year_rolls_forward() {
        let task = parse("renew insurance 5/3");
        assert_eq!(due(&task).date(), date!(2026-03-05));
        assert_eq!(due(&task).time(), time!(13:00));
        assert_eq!(task.title, "renew insurance");
    }

    #[test]
    fn recent_past_date_stays_in_current_year() {
        assert_eq!(due(&parse("file report 12/10")).date(), date!(2025-10-12));
        assert_eq!(due(&parse("file report 20.10")).date(), date!(2025-10-20));
    }

    #[test]
    fn explicit_date_overrides_relative_keyword() {
        let task = parse("tomorrow ship order 25/12/2026 at 10");
        assert_eq!(due(&task), datetime!(2026-12-25 10:00 +3));
        assert_eq!(task.title, "ship order");
    }

    #[test]
    fn two_digit_year_is_this_century() {
        assert_eq!(due(&parse("audit 1/2/27")).date(), date!(2027-02-01));
    }

    #[test]
    fn relative_variants_fix_time_of_day() {
        assert_eq!(due(&parse("call back tomorrow morning")), datetime!(2025-10-18 9:00 +3));
        assert_eq!(
            due(&parse("call back day after tomorrow evening")),
            datetime!(2025-10-19 18:00 +3)
        );
        assert_eq!(due(&parse("להתקשר מחרתיים בבוקר")), datetime!(2025-10-19 9:00 +3));
        assert_eq!(due(&parse("להתקשר מחר בערב")), datetime!(2025-10-18 18:00 +3));
    }

    #[test]
    fn explicit_clock_beats_day_part() {
        assert_eq!(
            due(&parse("tomorrow morning at 10:45 standup")),
            datetime!(2025-10-18 10:45 +3)
        );
    }

    #[test]
    fn standalone_day_part_sets_hour() {
        let task = parse("review quotes this afternoon");
        assert_eq!(due(&task), datetime!(2025-10-17 14:00 +3));
        assert_eq!(task.title, "review quotes this");
    }

    #[test]
    fn assignee_token_resolves_against_directory() {
        let task = parse("{yossi} call the plumber");
        assert_eq!(task.assign_to, "Yossi");
        assert_eq!(task.title, "call the plumber");

        let by_email = parse("{YOSSI@example.com} call the plumber");
        assert_eq!(by_email.assign_to, "Yossi");
    }

    #[test]
    fn assignee_token_does_not_pick_the_category() {
        let task = parse("{office-manager} water the plants");
        assert_eq!(task.category, Category::Other);
        assert_eq!(task.title, "water the plants");

        let task = parse("{office-manager} pay the invoice");
        assert_eq!(task.category, Category::Payments);
    }

    #[test]
    fn unknown_assignee_falls_back_to_session_user() {
        let task = parse("{moshe} water the plants");
        assert_eq!(task.assign_to, "dana");
        assert_eq!(task.title, "water the plants");
        assert_eq!(task.creator_id, "u-dana");
        assert_eq!(task.created_at, session().now);
    }

    #[test]
    fn anonymous_session_assigns_self_marker() {
        let directory = Directory::default();
        let session = Session::new(datetime!(2025-10-17 10:00 +3), Identity::default());
        let task = KeywordIntakeParser::default().parse(&IntakeRequest {
            text: "tidy desk",
            category: None,
            directory: &directory,
            session: &session,
        });
        assert_eq!(task.assign_to, opsboard_core::SELF_MARKER);
    }

    #[test]
    fn unparseable_input_yields_usable_defaults() {
        let task = parse("???");
        assert_eq!(task.category, Category::Other);
        assert_eq!(task.title, "???");
        assert_eq!(due(&task), datetime!(2025-10-17 13:00 +3));
    }

    #[test]
    fn invalid_calendar_date_is_ignored() {
        let task = parse("payment for rent 31/02");
        assert_eq!(due(&task).date(), date!(2025-10-17));
        assert_eq!(task.category, Category::Payments);
    }

    #[test]
    fn first_declared_category_wins() {
        assert_eq!(parse("marketing invoice").category, Category::Payments);
        assert_eq!(parse("supplier campaign").category, Category::Purchasing);
    }

    #[test]
    fn category_override_wins_and_strips_only_its_keywords() {
        let task = parse_with("client meeting about invoice", Some(Category::Clients));
        assert_eq!(task.category, Category::Clients);
        assert_eq!(task.title, "meeting about invoice");
    }

    #[test]
    fn custom_settings_change_default_hour() {
        let directory = directory();
        let session = session();
        let parser = KeywordIntakeParser::new(IntakeSettings {
            default_hour: 8,
            ..IntakeSettings::default()
        });
        let task = parser.parse(&IntakeRequest {
            text: "sweep floor",
            category: None,
            directory: &directory,
            session: &session,
        });
        assert_eq!(due(&task).time(), time!(8:00));
    }
}
