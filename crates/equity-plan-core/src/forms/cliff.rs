//! Two-way binding between cliff months and vesting start date.
//!
//! Both fields hang off a fixed issue date. Editing one derives the other,
//! and a derived value is only written when it differs from what is already
//! there, so echoing a derived write back through [`reconcile`] is a no-op.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::{add_months_clamped, format_iso_date, whole_months_between};
use crate::forms::fields::{DateInput, Digits};
use crate::types::CalendarDate;

/// Cliff/start state for one grant-creation form session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliffState {
    /// Fixed for the session; never reconciled backward.
    pub issue_date: CalendarDate,
    pub cliff_months: u32,
    pub start_date: CalendarDate,
}

/// A user edit to one side of the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum CliffEvent {
    CliffMonths(u32),
    StartDate(CalendarDate),
}

/// Which dependent field a reconcile step wrote, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedField {
    CliffMonths,
    StartDate,
}

/// Result of one reconcile step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciled {
    pub state: CliffState,
    pub derived: Option<DerivedField>,
}

impl CliffState {
    /// Fresh state: no cliff, vesting starts on the issue date.
    pub fn new(issue_date: CalendarDate) -> Self {
        CliffState {
            issue_date,
            cliff_months: 0,
            start_date: issue_date,
        }
    }

    pub fn start_date_text(&self) -> String {
        format_iso_date(self.start_date)
    }

    pub fn issue_date_text(&self) -> String {
        format_iso_date(self.issue_date)
    }

    /// Apply one edit; see [`reconcile`].
    pub fn apply(&self, event: CliffEvent) -> Reconciled {
        reconcile(self, event)
    }
}

impl CliffEvent {
    /// Cliff edit from a raw digit field; counts past `u32::MAX` saturate.
    pub fn from_cliff_input(input: &Digits) -> CliffEvent {
        let months = u32::try_from(input.value()).unwrap_or(u32::MAX);
        CliffEvent::CliffMonths(months)
    }

    /// Start-date edit from a raw date field. `None` while the text is not a
    /// valid date, in which case nothing should be derived.
    pub fn from_start_input(input: &DateInput) -> Option<CliffEvent> {
        input.date().map(CliffEvent::StartDate)
    }
}

/// Pure reducer over [`CliffState`].
///
/// - `StartDate(d)`: stores `d`, derives `cliff_months = whole_months_between(issue, d)`.
/// - `CliffMonths(n)`: stores `n`, derives `start_date = issue + n` (clamped).
///
/// The derived side is written only if it changes. A start date past the
/// representable range leaves the old start date in place.
pub fn reconcile(state: &CliffState, event: CliffEvent) -> Reconciled {
    let mut next = *state;
    let mut derived = None;

    match event {
        CliffEvent::StartDate(start) => {
            next.start_date = start;
            let months = whole_months_between(state.issue_date, start);
            if months != state.cliff_months {
                next.cliff_months = months;
                derived = Some(DerivedField::CliffMonths);
            } else {
                debug!(months, "cliff months unchanged, skipping write");
            }
        }
        CliffEvent::CliffMonths(months) => {
            next.cliff_months = months;
            match add_months_clamped(state.issue_date, months) {
                Some(start) if start != state.start_date => {
                    next.start_date = start;
                    derived = Some(DerivedField::StartDate);
                }
                Some(_) => debug!(months, "start date unchanged, skipping write"),
                None => debug!(months, "cliff outside date range, start date left as is"),
            }
        }
    }

    Reconciled {
        state: next,
        derived,
    }
}

/// Upper bound on reconcile steps [`settle`] can take: user start edit,
/// derived cliff, derived anniversary start, no-op.
pub const MAX_SETTLE_STEPS: usize = 3;

/// Apply `event`, then feed each derived write back in as an edit until
/// nothing more is derived.
///
/// This is what a pair of field-change hooks observing each other does. A
/// start date typed inside the current cliff month derives no new count, so
/// the start is still snapped to that month's anniversary before returning.
/// The result always has `start_date == issue_date + cliff_months` (clamped)
/// whenever that date is representable, within [`MAX_SETTLE_STEPS`] steps.
/// Returns the settled state and the steps taken.
pub fn settle(state: &CliffState, event: CliffEvent) -> (CliffState, usize) {
    let mut current = *state;
    let mut pending = Some(event);
    let mut steps = 0;
    while let Some(ev) = pending.take() {
        if steps == MAX_SETTLE_STEPS {
            break;
        }
        steps += 1;
        let out = reconcile(&current, ev);
        current = out.state;
        pending = match out.derived {
            Some(DerivedField::CliffMonths) => Some(CliffEvent::CliffMonths(current.cliff_months)),
            Some(DerivedField::StartDate) => Some(CliffEvent::StartDate(current.start_date)),
            None => None,
        };
    }
    if steps < MAX_SETTLE_STEPS {
        let snap = reconcile(&current, CliffEvent::CliffMonths(current.cliff_months));
        if snap.derived.is_some() {
            steps += 1;
            current = snap.state;
        }
    }
    (current, steps)
}
