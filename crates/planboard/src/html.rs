use anyhow::Result;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::board::{BoardStatus, BoardView, PlanRow};
use crate::tooltip::TooltipBody;

/// How year navigation links are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `/plans/?year=Y`, served by the board server
    Server,
    /// `plans-Y.html`, for pages written to disk
    Static,
}

#[derive(Debug, Clone, Copy)]
pub struct PageContext {
    pub current_year: i32,
    pub links: LinkStyle,
}

impl PageContext {
    pub fn year_href(&self, year: i32) -> String {
        match self.links {
            LinkStyle::Server => format!("/plans/?year={}", year),
            LinkStyle::Static => static_file_name(year),
        }
    }
}

pub fn static_file_name(year: i32) -> String {
    format!("plans-{}.html", year)
}

/// Write the board page for `view` into `dir`, returning the file path.
///
/// A file page has no server to ask for plan details, so `bodies` are
/// written into it and the tooltip reads them instead.
pub fn generate_html(
    view: &BoardView,
    ctx: PageContext,
    bodies: &BTreeMap<i64, TooltipBody>,
    dir: &Path,
) -> Result<std::path::PathBuf> {
    let path = dir.join(static_file_name(view.year_view.year));
    fs::write(&path, render_document(view, ctx, bodies).into_string())?;
    Ok(path)
}

fn grid_columns(weeks: u32) -> String {
    format!("grid-template-columns: repeat({}, var(--weekW))", weeks)
}

pub fn render_page(view: &BoardView, ctx: PageContext) -> Markup {
    render_document(view, ctx, &BTreeMap::new())
}

fn render_document(
    view: &BoardView,
    ctx: PageContext,
    bodies: &BTreeMap<i64, TooltipBody>,
) -> Markup {
    let year = view.year_view.year;
    let columns = grid_columns(view.year_view.weeks_in_year);

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Training plans " (year) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.toolbar {
                    a.nav #btnPrev href=(ctx.year_href(year - 1)) { "‹ " (year - 1) }
                    strong #lblYear { (year) }
                    a.nav #btnNext href=(ctx.year_href(year + 1)) { (year + 1) " ›" }
                    a.nav #btnThis href=(ctx.year_href(ctx.current_year)) { "This year" }
                }
                div.board {
                    div.head-row {
                        div.left.sticky { "Plan" }
                        div.months #months style=(columns) {
                            @for cell in &view.header {
                                div.month style=(format!("grid-column: {} / span {}; grid-row: 1", cell.start_week, cell.span)) {
                                    (cell.label)
                                }
                            }
                        }
                    }
                    div.head-row {
                        div.left.sticky { "Week" }
                        div.weeks #weeks style=(columns) {
                            @for week in view.weeks() {
                                div.week { (week) }
                            }
                        }
                    }
                    div #rows {
                        @match &view.status {
                            BoardStatus::Unavailable(_) => {
                                div.notice.error { "Plans could not be loaded. Reload the page to try again." }
                            }
                            BoardStatus::Empty => {
                                div.notice { "No plans in this year." }
                            }
                            BoardStatus::Loaded => {
                                @for row in &view.rows {
                                    (render_row(row, &columns))
                                }
                            }
                        }
                    }
                }
                div.tip #tip hidden {
                    div.t-title {}
                    div.t-sub {}
                    div.t-body {}
                    a #tAdmin target="_blank" rel="noopener" { "Open in admin" }
                }
                @for (id, body) in bodies {
                    template id=(format!("tip-body-{}", id)) { (render_tooltip_body(body)) }
                }
                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    }
}

fn render_row(row: &PlanRow, columns: &str) -> Markup {
    let plan = &row.plan;
    html! {
        div.row {
            div.left.sticky {
                div.training-title { (plan.title) }
                div.training-sub { "Code: " (plan.code) " • " (plan.start) " – " (plan.end_date()) }
            }
            div.grid style=(columns) {
                a.block
                    href=(row.admin_url)
                    target="_blank"
                    rel="noopener"
                    style=(format!("grid-column: {} / span {}", row.bar.start_week, row.bar.span))
                    data-plan-id=(plan.id)
                    data-title=(plan.title)
                    data-sub=(plan.summary_line()) {
                    span.code { (plan.code) }
                }
            }
        }
    }
}

/// The part of the tooltip filled in once plan details arrive
pub fn render_tooltip_body(body: &TooltipBody) -> Markup {
    html! {
        @match body {
            TooltipBody::Loading => { "Loading…" }
            TooltipBody::Attendees(names) => {
                ul.attendees {
                    @for name in names {
                        li { (name) }
                    }
                }
            }
            TooltipBody::NoAttendees => { p.muted { "No attendees." } }
            TooltipBody::Unavailable => { p.muted { "Details unavailable." } }
        }
    }
}

const CSS: &str = r#"
:root {
    --weekW: 28px;
    --leftW: 260px;
    --line: #e5e7eb;
    --accent: #2563eb;
}

* {
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    margin: 0;
    color: #111827;
    background: #fff;
}

.toolbar {
    display: flex;
    align-items: center;
    gap: 12px;
    padding: 12px 16px;
    border-bottom: 1px solid var(--line);
}

.toolbar .nav {
    padding: 4px 10px;
    border: 1px solid var(--line);
    border-radius: 6px;
    color: inherit;
    text-decoration: none;
}

.board {
    overflow-x: auto;
}

.head-row, .row {
    display: flex;
    border-bottom: 1px solid var(--line);
    width: max-content;
}

.left {
    width: var(--leftW);
    min-width: var(--leftW);
    padding: 6px 10px;
    background: #fff;
    border-right: 1px solid var(--line);
}

.sticky {
    position: sticky;
    left: 0;
    z-index: 2;
}

.months, .weeks, .grid {
    display: grid;
}

.month {
    font-weight: 600;
    font-size: 0.8em;
    padding: 6px 4px;
    border-left: 1px solid var(--line);
    white-space: nowrap;
    overflow: hidden;
}

.week {
    font-size: 0.7em;
    color: #6b7280;
    text-align: center;
    padding: 4px 0;
    border-left: 1px solid var(--line);
}

.training-title {
    font-weight: 600;
    font-size: 0.9em;
}

.training-sub {
    font-size: 0.75em;
    color: #6b7280;
}

.grid {
    align-items: center;
}

.block {
    grid-row: 1;
    height: 22px;
    margin: 0 1px;
    border-radius: 4px;
    background: var(--accent);
    color: #fff;
    font-size: 0.7em;
    padding: 3px 6px;
    overflow: hidden;
    white-space: nowrap;
    text-decoration: none;
}

.notice {
    padding: 18px;
    color: #6b7280;
}

.notice.error {
    color: #b91c1c;
}

.tip {
    position: fixed;
    width: 360px;
    z-index: 10;
    background: #fff;
    border: 1px solid var(--line);
    border-radius: 8px;
    box-shadow: 0 8px 24px rgba(0,0,0,0.12);
    padding: 12px;
}

.t-title {
    font-weight: 700;
}

.t-sub {
    font-size: 0.8em;
    color: #6b7280;
    margin: 4px 0 8px;
}

.attendees {
    margin: 0;
    padding-left: 18px;
}

.muted {
    margin: 0;
    color: #6b7280;
}
"#;

const JAVASCRIPT: &str = r#"
(function () {
    const HIDE_DELAY = 400;
    const TIP_WIDTH = 360;
    const tip = document.getElementById('tip');
    if (!tip) return;
    const tTitle = tip.querySelector('.t-title');
    const tSub = tip.querySelector('.t-sub');
    const tBody = tip.querySelector('.t-body');
    const tAdmin = document.getElementById('tAdmin');

    let hideTimer = null;
    // Bumped on every hover and hide; responses for older hovers are dropped
    let seq = 0;

    function cancelHide() {
        if (hideTimer !== null) {
            clearTimeout(hideTimer);
            hideTimer = null;
        }
    }

    function scheduleHide() {
        cancelHide();
        hideTimer = setTimeout(() => {
            hideTimer = null;
            seq++;
            tip.hidden = true;
        }, HIDE_DELAY);
    }

    async function show(bar) {
        cancelHide();
        const token = ++seq;

        tTitle.textContent = bar.dataset.title;
        tSub.textContent = bar.dataset.sub;
        tBody.textContent = 'Loading…';
        tAdmin.href = bar.href;
        tip.hidden = false;

        const r = bar.getBoundingClientRect();
        tip.style.left = `${Math.min(window.innerWidth - TIP_WIDTH, r.left + 10)}px`;
        tip.style.top = `${r.bottom + 8}px`;

        const written = document.getElementById(`tip-body-${bar.dataset.planId}`);
        if (written) {
            tBody.innerHTML = written.innerHTML;
            return;
        }

        try {
            const res = await fetch(`/plans/${bar.dataset.planId}/attendees`);
            if (!res.ok) throw new Error(`status ${res.status}`);
            const fragment = await res.text();
            if (token !== seq) return;
            tBody.innerHTML = fragment;
        } catch (e) {
            if (token !== seq) return;
            tBody.textContent = 'Details unavailable.';
        }
    }

    document.querySelectorAll('.block').forEach(bar => {
        bar.addEventListener('mouseenter', () => show(bar));
        bar.addEventListener('mouseleave', scheduleHide);
    });
    tip.addEventListener('mouseenter', cancelHide);
    tip.addEventListener('mouseleave', scheduleHide);
})();
"#;
