//! Interaction controller: turns user actions into draft updates,
//! persistence, and structured replies.
//!
//! Per user: `Idle` (nothing picked) → `Selecting` (draft has picks) → finalize → `Idle`.
//! Finalizing from `Idle` stores an all-zero day, unless the day is already
//! stored, in which case the stored row is kept as is.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::scoring::{Selection, SessionDraft, Tier};
use crate::session::SessionStore;
use crate::store::{DailyRecord, DayStore, UserStats};

/// How many days `/history` shows.
pub const HISTORY_LIMIT: usize = 7;

/// A discrete user action delivered by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    StartSession { user_id: i64 },
    SelectCategory { user_id: i64, option_code: String },
    Finalize { user_id: i64 },
    QueryStats { user_id: i64 },
    ShowHistory { user_id: i64 },
    Help { user_id: i64 },
}

impl Action {
    pub fn user_id(&self) -> i64 {
        match self {
            Self::StartSession { user_id }
            | Self::SelectCategory { user_id, .. }
            | Self::Finalize { user_id }
            | Self::QueryStats { user_id }
            | Self::ShowHistory { user_id }
            | Self::Help { user_id } => *user_id,
        }
    }
}

/// The finalized day shown back to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub record: DailyRecord,
    pub tier: Tier,
}

impl DaySummary {
    pub fn total(&self) -> i64 {
        self.record.total_score
    }
}

/// Structured result of handling an action, rendered by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Day card with the rubric buttons; `draft` marks current picks.
    Menu { draft: Option<SessionDraft> },
    /// A category was set.
    Ack {
        selection: Selection,
        draft: SessionDraft,
    },
    /// Unrecognized option code; nothing changed.
    Ignored,
    Summary(DaySummary),
    /// Persisting failed; the draft is kept so finalize can be retried.
    SaveFailed { draft: SessionDraft },
    Stats(UserStats),
    /// The user has no stored days yet.
    NoData,
    StatsUnavailable,
    History(Vec<DailyRecord>),
    Help,
}

type DateSource = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Drives the session store and the day store for every user.
pub struct Controller {
    sessions: Arc<SessionStore>,
    store: Arc<dyn DayStore>,
    today: DateSource,
}

impl Controller {
    /// Create a controller dating finalized days by the local calendar.
    pub fn new(sessions: Arc<SessionStore>, store: Arc<dyn DayStore>) -> Self {
        Self {
            sessions,
            store,
            today: Arc::new(|| chrono::Local::now().date_naive()),
        }
    }

    /// Replace the date source used at finalize.
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one action. Never fails: storage problems become replies.
    pub async fn handle(&self, action: Action) -> Reply {
        match action {
            Action::StartSession { user_id } => Reply::Menu {
                draft: self.sessions.peek(user_id).await,
            },
            Action::SelectCategory {
                user_id,
                option_code,
            } => self.select(user_id, &option_code).await,
            Action::Finalize { user_id } => self.finalize(user_id).await,
            Action::QueryStats { user_id } => self.stats(user_id).await,
            Action::ShowHistory { user_id } => self.history(user_id).await,
            Action::Help { .. } => Reply::Help,
        }
    }

    async fn select(&self, user_id: i64, option_code: &str) -> Reply {
        let Some(selection) = Selection::parse(option_code) else {
            debug!(user_id, option_code, "Ignoring unknown option code");
            return Reply::Ignored;
        };

        let draft = self.sessions.set_category(user_id, selection).await;
        debug!(
            user_id,
            category = %selection.category(),
            score = selection.score(),
            total = draft.total(),
            "Category selected"
        );
        Reply::Ack { selection, draft }
    }

    async fn finalize(&self, user_id: i64) -> Reply {
        let date = (self.today)();
        let draft = match self.sessions.peek(user_id).await {
            Some(draft) if draft.chosen_count() > 0 => draft,
            _ => match self.store.get_day(user_id, date).await {
                // Already finalized today with no new picks: persist the same row again.
                Ok(Some(existing)) => {
                    return self.save(user_id, existing, SessionDraft::default()).await;
                }
                Ok(None) => SessionDraft::default(),
                Err(e) => {
                    warn!(user_id, %date, error = %e, "Failed to look up finalized day");
                    return Reply::SaveFailed {
                        draft: SessionDraft::default(),
                    };
                }
            },
        };

        let record = DailyRecord::from_draft(user_id, date, &draft);
        self.save(user_id, record, draft).await
    }

    /// Upsert `record`, retiring the user's draft only once it is stored.
    async fn save(&self, user_id: i64, record: DailyRecord, draft: SessionDraft) -> Reply {
        let date = record.date;
        if let Err(e) = self.store.upsert_day(&record).await {
            warn!(user_id, %date, error = %e, "Failed to save day");
            return Reply::SaveFailed { draft };
        }

        self.sessions.pop(user_id).await;
        info!(user_id, %date, total = record.total_score, "Day finalized");
        Reply::Summary(DaySummary {
            tier: record.tier(),
            record,
        })
    }

    async fn stats(&self, user_id: i64) -> Reply {
        match self.store.query_aggregate(user_id).await {
            Ok(Some(stats)) => Reply::Stats(stats),
            Ok(None) => Reply::NoData,
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load stats");
                Reply::StatsUnavailable
            }
        }
    }

    async fn history(&self, user_id: i64) -> Reply {
        match self.store.recent_days(user_id, HISTORY_LIMIT).await {
            Ok(days) if days.is_empty() => Reply::NoData,
            Ok(days) => Reply::History(days),
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load history");
                Reply::StatsUnavailable
            }
        }
    }
}
