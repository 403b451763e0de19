//! Year timeline board: header construction, plan selection and bar layout.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{Datelike, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calendar::{self, YearView};
use crate::source::PlanSource;
use crate::tooltip::{Anchor, RequestToken, TooltipBody, TooltipController};
use crate::types::Plan;

/// Years outside this range fall back to the current year
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// Upper bound on search results
pub const SEARCH_LIMIT: usize = 50;

/// Current calendar year in UTC
pub fn current_year() -> i32 {
    calendar::normalize_utc(&Utc::now()).year()
}

/// Parse a `year` query value, defaulting to `current` when absent or invalid
pub fn resolve_year(raw: Option<&str>, current: i32) -> i32 {
    parse_year(raw).unwrap_or(current)
}

/// A `year` query value within [`MIN_YEAR`]..=[`MAX_YEAR`]
pub fn parse_year(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|r| r.trim().parse::<i32>().ok())
        .filter(|y| (MIN_YEAR..=MAX_YEAR).contains(y))
}

/// Admin change page for a plan
pub fn admin_url(admin_base: &str, plan_id: i64) -> String {
    format!(
        "{}/admin/trainings/trainingplan/{}/change/",
        admin_base.trim_end_matches('/'),
        plan_id
    )
}

/// One month label in the header row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCell {
    pub month0: usize,
    pub label: &'static str,
    pub start_week: u32,
    pub span: u32,
}

/// Month cells for the header; months without weeks in this ISO year are skipped
pub fn build_header(view: &YearView) -> Vec<HeaderCell> {
    view.month_spans
        .iter()
        .filter_map(|span| {
            span.first_week().map(|start_week| HeaderCell {
                month0: span.month0,
                label: span.label(),
                start_week,
                span: span.count(),
            })
        })
        .collect()
}

/// Horizontal placement of a plan bar, in week columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BarLayout {
    pub start_week: u32,
    pub span: u32,
}

impl BarLayout {
    pub fn end_week(&self) -> u32 {
        self.start_week + self.span - 1
    }
}

/// Place `plan` on the week grid of `view`.
///
/// Plans starting in an earlier ISO year begin at week 1, plans ending in a
/// later one run to the last week. The bar always covers at least one week.
pub fn layout_row(plan: &Plan, view: &YearView) -> BarLayout {
    let last = view.weeks_in_year;
    let end = plan.end_date();

    let start_week = if plan.start_iso_year() < view.year {
        1
    } else {
        calendar::iso_week(plan.start)
    };
    let end_week = if plan.end_iso_year() > view.year {
        last
    } else {
        calendar::iso_week(end)
    };

    let start_week = start_week.clamp(1, last);
    let end_week = end_week.clamp(1, last);
    let span = (end_week as i64 - start_week as i64 + 1).max(1) as u32;

    BarLayout { start_week, span }
}

/// Plans overlapping the ISO year `year`, ordered by start date.
///
/// The sort is stable, so plans sharing a start keep the source order.
pub fn select_plans(plans: Vec<Plan>, year: i32) -> Vec<Plan> {
    let mut selected: Vec<Plan> = plans
        .into_iter()
        .filter(|p| p.overlaps_iso_year(year))
        .collect();
    selected.sort_by_key(|p| p.start);
    selected
}

/// A rendered board row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRow {
    pub plan: Plan,
    pub bar: BarLayout,
    pub admin_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum BoardStatus {
    Loaded,
    /// No plan overlaps the year
    Empty,
    /// The plan list could not be fetched
    Unavailable(String),
}

/// Everything needed to render one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub year_view: YearView,
    pub header: Vec<HeaderCell>,
    pub rows: Vec<PlanRow>,
    pub status: BoardStatus,
}

impl BoardView {
    pub fn weeks(&self) -> impl Iterator<Item = u32> {
        self.year_view.weeks()
    }
}

/// Plans overlapping a year, grouped by the month they start in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    /// Keys 1..=12, every month present
    pub months: BTreeMap<u32, Vec<Plan>>,
    pub total: usize,
}

impl YearSummary {
    /// Twelve empty months, answered when no year was asked for
    pub fn empty(year: i32) -> Self {
        Self {
            year,
            months: (1..=12).map(|m| (m, Vec::new())).collect(),
            total: 0,
        }
    }
}

/// Group the plans overlapping ISO year `year` by calendar start month.
///
/// A plan starting in an earlier calendar year is counted under January. One
/// starting in a later calendar year, possible for the first days of January
/// in ISO week 53, is counted under December.
pub fn year_summary(plans: Vec<Plan>, year: i32) -> YearSummary {
    let mut summary = YearSummary::empty(year);
    let selected = select_plans(plans, year);
    summary.total = selected.len();

    for plan in selected {
        let month = match plan.start.year().cmp(&year) {
            Ordering::Less => 1,
            Ordering::Greater => 12,
            Ordering::Equal => plan.start.month(),
        };
        summary.months.entry(month).or_default().push(plan);
    }

    summary
}

/// Case-insensitive match on title or code, ordered by (start, end, id)
pub fn search_plans(plans: Vec<Plan>, query: &str) -> Vec<Plan> {
    let needle = query.trim().to_lowercase();
    let mut found: Vec<Plan> = plans
        .into_iter()
        .filter(|p| {
            needle.is_empty()
                || p.title.to_lowercase().contains(&needle)
                || p.code.to_lowercase().contains(&needle)
        })
        .collect();
    found.sort_by_key(|p| (p.start, p.end_date(), p.id));
    found.truncate(SEARCH_LIMIT);
    found
}

/// The board for one displayed year.
///
/// Rows and tooltip are rebuilt from the source on every load; nothing is
/// carried over between years.
pub struct TimelineBoard {
    source: PlanSource,
    admin_base: String,
    year: i32,
    rows: Vec<PlanRow>,
    tooltip: TooltipController,
}

impl TimelineBoard {
    pub fn new(source: PlanSource, admin_base: impl Into<String>, year: i32) -> Self {
        Self {
            source,
            admin_base: admin_base.into(),
            year,
            rows: Vec::new(),
            tooltip: TooltipController::default(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn rows(&self) -> &[PlanRow] {
        &self.rows
    }

    pub fn tooltip(&self) -> &TooltipController {
        &self.tooltip
    }

    /// Switch to another year, discarding the current rows and tooltip
    pub fn set_year(&mut self, raw: Option<&str>, current: i32) -> i32 {
        self.year = resolve_year(raw, current);
        self.rows.clear();
        self.tooltip = TooltipController::default();
        self.year
    }

    /// Fetch plans and lay out one row per plan overlapping the year.
    ///
    /// A failed fetch yields an `Unavailable` view rather than an error.
    pub async fn load(&mut self) -> BoardView {
        let year_view = YearView::new(self.year);
        let header = build_header(&year_view);

        let status = match self.source.list_plans().await {
            Ok(plans) => {
                let fetched = plans.len();
                self.rows = select_plans(plans, self.year)
                    .into_iter()
                    .map(|plan| PlanRow {
                        bar: layout_row(&plan, &year_view),
                        admin_url: admin_url(&self.admin_base, plan.id),
                        plan,
                    })
                    .collect();
                info!(
                    year = self.year,
                    fetched = fetched,
                    shown = self.rows.len(),
                    "Board loaded"
                );
                if self.rows.is_empty() {
                    BoardStatus::Empty
                } else {
                    BoardStatus::Loaded
                }
            }
            Err(e) => {
                warn!(year = self.year, error = %e, "Failed to load plans");
                self.rows.clear();
                BoardStatus::Unavailable(e.to_string())
            }
        };

        BoardView {
            year_view,
            header,
            rows: self.rows.clone(),
            status,
        }
    }

    /// Tooltip bodies for every loaded row, keyed by plan id.
    ///
    /// Used for pages written to disk, which cannot fetch details on hover.
    pub async fn detail_bodies(&self) -> BTreeMap<i64, TooltipBody> {
        let mut bodies = BTreeMap::new();
        for row in &self.rows {
            let outcome = self.source.plan_detail(row.plan.id).await;
            if let Err(e) = &outcome {
                warn!(plan_id = row.plan.id, error = %e, "Plan detail unavailable");
            }
            bodies.insert(row.plan.id, TooltipBody::from_outcome(&outcome));
        }
        bodies
    }

    /// Pointer entered the bar of `plan_id`; shows the tooltip in its loading state
    pub fn hover_start(&mut self, plan_id: i64, anchor: Option<Anchor>) -> Option<RequestToken> {
        let row = self.rows.iter().find(|r| r.plan.id == plan_id)?;
        let token = self.tooltip.show(&row.plan, anchor, row.admin_url.clone());
        debug!(plan_id = plan_id, ?token, "Hover started");
        Some(token)
    }

    /// Fetch the detail for the hover identified by `token` and fill the tooltip.
    ///
    /// Returns false when the hover is no longer current.
    pub async fn fetch_detail(&mut self, token: RequestToken) -> bool {
        let Some(plan_id) = self.tooltip.pending_plan(token) else {
            return false;
        };
        let outcome = self.source.plan_detail(plan_id).await;
        self.tooltip.resolve(token, outcome)
    }

    pub fn hover_end(&mut self, now: Instant) {
        self.tooltip.schedule_hide(now);
    }

    pub fn enter_tooltip(&mut self) {
        self.tooltip.cancel_hide();
    }

    pub fn leave_tooltip(&mut self, now: Instant) {
        self.tooltip.schedule_hide(now);
    }

    pub fn tick(&mut self, now: Instant) {
        self.tooltip.tick(now);
    }
}
