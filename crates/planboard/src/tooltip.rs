//! Hover tooltip state for the board.
//!
//! One tooltip is shared by every bar. Showing it bumps a request token;
//! detail responses carrying an older token are dropped, so a slow fetch for
//! a bar the pointer already left never overwrites the current content.
//! Hiding is deferred by [`HIDE_DELAY`] so the pointer can travel from a bar
//! into the tooltip without it vanishing.

use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::error::SourceError;
use crate::types::{Plan, PlanDetail};

pub const HIDE_DELAY: Duration = Duration::from_millis(400);

/// Tooltip width assumed when keeping it inside the viewport
pub const TOOLTIP_WIDTH: f64 = 360.0;

/// Identifies one hover; increases monotonically per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RequestToken(u64);

/// Bounding box of the hovered bar, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub left: f64,
    pub bottom: f64,
    pub viewport_width: f64,
}

/// Parses `left,bottom,viewport_width`
impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid anchor '{}': {}", s, e))?;

        match parts[..] {
            [left, bottom, viewport_width] => Ok(Anchor {
                left,
                bottom,
                viewport_width,
            }),
            _ => Err(format!(
                "invalid anchor '{}': expected LEFT,BOTTOM,VIEWPORT_WIDTH",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub left: f64,
    pub top: f64,
}

impl Position {
    /// Just below the bar, nudged right, clamped to the viewport's right edge.
    pub fn below(anchor: Anchor) -> Self {
        Self {
            left: (anchor.viewport_width - TOOLTIP_WIDTH).min(anchor.left + 10.0),
            top: anchor.bottom + 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "names", rename_all = "snake_case")]
pub enum TooltipBody {
    Loading,
    Attendees(Vec<String>),
    NoAttendees,
    Unavailable,
}

impl TooltipBody {
    /// Body for a finished detail fetch. Failures degrade, they never propagate.
    pub fn from_outcome(outcome: &Result<PlanDetail, SourceError>) -> Self {
        match outcome {
            Ok(detail) => {
                let names = detail.attendee_names();
                if names.is_empty() {
                    TooltipBody::NoAttendees
                } else {
                    TooltipBody::Attendees(names)
                }
            }
            Err(_) => TooltipBody::Unavailable,
        }
    }
}

/// What the tooltip currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveTooltip {
    pub token: RequestToken,
    pub plan_id: i64,
    pub title: String,
    pub subtitle: String,
    pub admin_url: String,
    pub position: Option<Position>,
    pub body: TooltipBody,
}

#[derive(Debug)]
pub struct TooltipController {
    active: Option<ActiveTooltip>,
    next_token: u64,
    hide_at: Option<Instant>,
    delay: Duration,
}

impl Default for TooltipController {
    fn default() -> Self {
        Self::new(HIDE_DELAY)
    }
}

impl TooltipController {
    pub fn new(delay: Duration) -> Self {
        Self {
            active: None,
            next_token: 0,
            hide_at: None,
            delay,
        }
    }

    /// Show the tooltip for `plan` with a loading body.
    ///
    /// Cancels any pending hide. The returned token must accompany the
    /// detail result passed to [`TooltipController::resolve`].
    pub fn show(
        &mut self,
        plan: &Plan,
        anchor: Option<Anchor>,
        admin_url: String,
    ) -> RequestToken {
        self.cancel_hide();
        self.next_token += 1;
        let token = RequestToken(self.next_token);

        self.active = Some(ActiveTooltip {
            token,
            plan_id: plan.id,
            title: plan.title.clone(),
            subtitle: plan.summary_line(),
            admin_url,
            position: anchor.map(Position::below),
            body: TooltipBody::Loading,
        });
        token
    }

    /// Apply a detail fetch result. Returns false if the result is stale.
    pub fn resolve(
        &mut self,
        token: RequestToken,
        outcome: Result<PlanDetail, SourceError>,
    ) -> bool {
        if let Err(e) = &outcome {
            debug!(error = %e, "Plan detail unavailable");
        }

        match self.active.as_mut() {
            Some(active) if active.token == token => {
                active.body = TooltipBody::from_outcome(&outcome);
                true
            }
            _ => {
                debug!(?token, "Discarding stale plan detail");
                false
            }
        }
    }

    /// Pointer left a bar or the tooltip; hide after the delay unless cancelled.
    pub fn schedule_hide(&mut self, now: Instant) {
        if self.active.is_some() {
            self.hide_at = Some(now + self.delay);
        }
    }

    /// Pointer entered the tooltip or another bar.
    pub fn cancel_hide(&mut self) {
        self.hide_at = None;
    }

    pub fn hide_pending(&self) -> bool {
        self.hide_at.is_some()
    }

    /// Advance time; hides the tooltip once a scheduled hide is due.
    pub fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.hide_at {
            if now >= deadline {
                self.hide_at = None;
                self.active = None;
            }
        }
    }

    pub fn active(&self) -> Option<&ActiveTooltip> {
        self.active.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.active.is_some()
    }

    /// Plan behind `token`, if that hover is still the current one
    pub fn pending_plan(&self, token: RequestToken) -> Option<i64> {
        self.active
            .as_ref()
            .filter(|a| a.token == token && a.body == TooltipBody::Loading)
            .map(|a| a.plan_id)
    }
}
