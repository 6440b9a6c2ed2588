//! Presentation: turns controller replies into chat text and keyboards.
//!
//! Output is plain text; the transport decides how to deliver it.

use std::fmt::Write as _;

use crate::controller::{DaySummary, Reply};
use crate::scoring::{Category, SessionDraft, Tier};
use crate::store::{DailyRecord, UserStats};

/// Callback data of the finalize button.
pub const FINISH_DAY: &str = "finish_day";

/// Reply-keyboard labels of the persistent main menu.
pub const MENU_TODAY: &str = "📅 Today";
pub const MENU_STATS: &str = "📊 Stats";
pub const MENU_HISTORY: &str = "📜 History";

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Buttons under the message, one row per inner vec.
    Inline(Vec<Vec<InlineButton>>),
    /// Persistent main-menu keyboard in place of the text input.
    MainMenu,
}

/// A rendered reply ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    pub text: String,
    pub markup: Option<Markup>,
    /// Short toast for the callback answer, if the reply answers a button press.
    pub notice: Option<String>,
    /// Update the message the button belongs to instead of sending a new one.
    pub edit_in_place: bool,
}

impl OutgoingReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
            notice: None,
            edit_in_place: false,
        }
    }

    fn with_markup(mut self, markup: Markup) -> Self {
        self.markup = Some(markup);
        self
    }
}

/// Render a controller reply. `None` means nothing should be sent.
pub fn render(reply: &Reply) -> Option<OutgoingReply> {
    let out = match reply {
        Reply::Menu { draft } => {
            let draft = draft.unwrap_or_default();
            OutgoingReply::text(day_card(&draft)).with_markup(day_keyboard(&draft))
        }
        Reply::Ack { selection, draft } => {
            let mut out =
                OutgoingReply::text(day_card(draft)).with_markup(day_keyboard(draft));
            out.notice = Some(format!(
                "{}: {} (+{})",
                selection.category().title(),
                selection.label(),
                selection.score()
            ));
            out.edit_in_place = true;
            out
        }
        Reply::Ignored => return None,
        Reply::Summary(summary) => {
            let mut out = OutgoingReply::text(summary_text(summary));
            out.notice = Some(format!("Saved: {}%", summary.total()));
            out.edit_in_place = true;
            out
        }
        Reply::SaveFailed { draft } => {
            let mut out = OutgoingReply::text(format!(
                "❌ Could not save your day. Your picks are kept, press Finish to try again.\n\n{}",
                day_card(draft)
            ))
            .with_markup(day_keyboard(draft));
            out.notice = Some("Save failed".to_string());
            out
        }
        Reply::Stats(stats) => OutgoingReply::text(stats_text(stats)),
        Reply::NoData => OutgoingReply::text(
            "📭 No data yet. Press \"📅 Today\" and finish your first day.",
        )
        .with_markup(Markup::MainMenu),
        Reply::StatsUnavailable => {
            OutgoingReply::text("⚠️ Statistics are unavailable right now. Try again later.")
        }
        Reply::History(days) => OutgoingReply::text(history_text(days)),
        Reply::Help => OutgoingReply::text(help_text()).with_markup(Markup::MainMenu),
    };
    Some(out)
}

/// The day card: running total and what has been picked so far.
pub fn day_card(draft: &SessionDraft) -> String {
    let mut text = String::from("📅 Today\n\n");
    for category in Category::ALL {
        let picked = draft
            .selected(category)
            .map(|s| s.label())
            .unwrap_or("not set");
        let _ = writeln!(text, "{}: {picked}", category.title());
    }
    let _ = write!(text, "\nCurrent score: {}%", draft.total());
    text
}

/// Inline keyboard with every option; picked options are marked.
pub fn day_keyboard(draft: &SessionDraft) -> Markup {
    let mut rows: Vec<Vec<InlineButton>> = Category::ALL
        .iter()
        .map(|category| {
            let picked = draft.selected(*category);
            category
                .options()
                .into_iter()
                .map(|option| {
                    let mark = if picked == Some(option) { "✅ " } else { "" };
                    InlineButton {
                        text: format!("{mark}{}", option.label()),
                        callback_data: option.code().to_string(),
                    }
                })
                .collect()
        })
        .collect();

    rows.push(vec![InlineButton {
        text: "🏁 Finish day".to_string(),
        callback_data: FINISH_DAY.to_string(),
    }]);
    Markup::Inline(rows)
}

fn tier_line(tier: Tier) -> &'static str {
    match tier {
        Tier::Perfect => "🏆 Perfect day!",
        Tier::Great => "🔥 Great day!",
        Tier::Good => "👍 Good day.",
        Tier::TryAgain => "💪 Try again tomorrow.",
    }
}

fn summary_text(summary: &DaySummary) -> String {
    let record = &summary.record;
    let mut text = format!("📊 Day saved: {}\n\n", record.date.format("%Y-%m-%d"));
    let scores = [
        (Category::Sleep, record.sleep_score),
        (Category::Workout, record.workout_score),
        (Category::Wakeup, record.wakeup_score),
        (Category::Python, record.python_score),
    ];
    for (category, score) in scores {
        let _ = writeln!(text, "{}: {score}/{}", category.title(), category.max_score());
    }
    let _ = write!(
        text,
        "\nTotal: {}%\n{}",
        summary.total(),
        tier_line(summary.tier)
    );
    text
}

fn stats_text(stats: &UserStats) -> String {
    format!(
        "📊 Your statistics\n\n\
         📅 Days tracked: {}\n\
         ✅ Average score: {:.1}%\n\
         🏆 Perfect days: {}\n\
         👍 Days at 70%+: {}",
        stats.days_count, stats.avg_score, stats.perfect_days, stats.good_days
    )
}

fn history_text(days: &[DailyRecord]) -> String {
    let mut text = String::from("📜 Recent days\n");
    for day in days {
        let _ = write!(
            text,
            "\n{}  {:>3}%  {}",
            day.date.format("%Y-%m-%d"),
            day.total_score,
            day.tier()
        );
    }
    text
}

fn help_text() -> String {
    let mut text = String::from(
        "🤖 Productivity tracker\n\n\
         Press \"📅 Today\" (or /today), pick one option per category, then press Finish.\n\
         Finishing again on the same day overwrites that day.\n\n\
         Rubric:\n",
    );
    for category in Category::ALL {
        let options: Vec<&str> = category.options().iter().map(|o| o.label()).collect();
        let _ = writeln!(text, "{}: {}", category.title(), options.join(", "));
    }
    text.push_str("\nCommands: /today /stats /history /help");
    text
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::scoring::Selection;

    fn draft(codes: &[&str]) -> SessionDraft {
        codes
            .iter()
            .filter_map(|c| Selection::parse(c))
            .fold(SessionDraft::default(), SessionDraft::apply_selection)
    }

    fn inline_rows(markup: Option<Markup>) -> Vec<Vec<InlineButton>> {
        match markup {
            Some(Markup::Inline(rows)) => rows,
            other => panic!("expected inline keyboard, got {other:?}"),
        }
    }

    #[test]
    fn keyboard_has_every_option_and_finish() {
        let rows = inline_rows(Some(day_keyboard(&SessionDraft::default())));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[3].len(), 4);
        assert_eq!(rows[4][0].callback_data, FINISH_DAY);
        for row in &rows[..4] {
            for button in row {
                assert!(Selection::parse(&button.callback_data).is_some());
                assert!(!button.text.starts_with('✅'));
            }
        }
    }

    #[test]
    fn keyboard_marks_picked_option_only() {
        let rows = inline_rows(Some(day_keyboard(&draft(&["workout_short"]))));
        let marked: Vec<&str> = rows
            .iter()
            .flatten()
            .filter(|b| b.text.starts_with('✅'))
            .map(|b| b.callback_data.as_str())
            .collect();
        assert_eq!(marked, vec!["workout_short"]);
    }

    #[test]
    fn ack_edits_card_and_carries_notice() {
        let d = draft(&["sleep_7plus"]);
        let out = render(&Reply::Ack {
            selection: Selection::parse("sleep_7plus").unwrap(),
            draft: d,
        })
        .unwrap();
        assert!(out.edit_in_place);
        assert!(out.text.contains("Current score: 30%"));
        assert_eq!(out.notice.as_deref(), Some("🛌 Sleep: 7h+ (30%) (+30)"));
    }

    #[test]
    fn ignored_renders_nothing() {
        assert!(render(&Reply::Ignored).is_none());
    }

    #[test]
    fn summary_shows_scores_and_tier() {
        let d = draft(&["sleep_7plus", "workout_short", "wakeup_medium", "python_none"]);
        let record =
            DailyRecord::from_draft(1, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &d);
        let out = render(&Reply::Summary(DaySummary {
            tier: record.tier(),
            record,
        }))
        .unwrap();
        assert!(out.text.contains("2024-01-01"));
        assert!(out.text.contains("🏃 Workout: 12/25"));
        assert!(out.text.contains("Total: 52%"));
        assert!(out.text.contains("Good day"));
        assert!(out.markup.is_none());
    }

    #[test]
    fn stats_use_one_decimal() {
        let out = render(&Reply::Stats(UserStats {
            days_count: 3,
            avg_score: 56.7,
            perfect_days: 1,
            good_days: 1,
        }))
        .unwrap();
        assert!(out.text.contains("Average score: 56.7%"));
        assert!(out.text.contains("Days tracked: 3"));
    }

    #[test]
    fn no_data_and_help_show_main_menu() {
        assert_eq!(render(&Reply::NoData).unwrap().markup, Some(Markup::MainMenu));
        let help = render(&Reply::Help).unwrap();
        assert_eq!(help.markup, Some(Markup::MainMenu));
        assert!(help.text.contains("Before 10:00 (20%)"));
    }

    #[test]
    fn save_failure_keeps_keyboard() {
        let out = render(&Reply::SaveFailed {
            draft: draft(&["python_1h"]),
        })
        .unwrap();
        assert!(!out.edit_in_place);
        assert!(out.text.contains("Current score: 25%"));
        assert!(matches!(out.markup, Some(Markup::Inline(_))));
    }
}
