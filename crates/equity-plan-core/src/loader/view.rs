//! State behind the grant-detail vesting chart.
//!
//! The view issues a [`RequestTicket`] per fetch and only lets the response
//! to the newest ticket through. A failed fetch, an empty schedule and a
//! grant that vests on issue all land in [`ViewState::Empty`]; none of them
//! are errors.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::charts::schedule::{GrantScheduleResponse, GrantSummary, SchedulePayload};
use crate::charts::series::{build_cumulative_series, SeriesInput, VestingSeries};
use crate::loader::sequence::{GrantKey, RequestSequencer, RequestTicket};
use crate::types::VestingFrequency;
use crate::EquityPlanResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmptyReason {
    /// The schedule came back with nothing chartable in it.
    NoEvents,
    /// Preferred stock vests on issue and has no schedule.
    ImmediateVesting,
    FetchFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartedSchedule {
    pub grant: Option<GrantSummary>,
    pub series: VestingSeries,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    Idle,
    Loading { grant: GrantKey },
    Ready { grant: GrantKey, chart: ChartedSchedule },
    Empty { grant: GrantKey, reason: EmptyReason },
}

#[derive(Debug, Clone, Default)]
pub struct GrantScheduleView {
    sequencer: RequestSequencer,
    state: ViewState,
    frequency: Option<VestingFrequency>,
}

impl GrantScheduleView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chart at `frequency` instead of the grant's own.
    pub fn with_frequency(frequency: VestingFrequency) -> Self {
        GrantScheduleView {
            frequency: Some(frequency),
            ..Self::default()
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Start loading `grant`. Any response still in flight becomes stale.
    pub fn load(&mut self, grant: GrantKey) -> RequestTicket {
        let ticket = self.sequencer.issue(grant.clone());
        debug!(seq = ticket.seq, grant_id = grant.grant_id, "loading grant schedule");
        self.state = ViewState::Loading { grant };
        ticket
    }

    /// Apply a fetch outcome. A stale ticket leaves the state untouched and
    /// returns [`crate::EquityPlanError::StaleResponse`].
    pub fn resolve(
        &mut self,
        ticket: &RequestTicket,
        outcome: Result<SchedulePayload, String>,
    ) -> EquityPlanResult<&ViewState> {
        if let Err(e) = self.sequencer.accept(ticket) {
            debug!(seq = ticket.seq, latest = self.sequencer.latest(), "dropping stale schedule response");
            return Err(e);
        }
        let grant = ticket.grant.clone();
        self.state = match outcome {
            Ok(payload) => self.chart(grant, payload.into_response()),
            Err(message) => {
                warn!(grant_id = grant.grant_id, %message, "schedule fetch failed");
                ViewState::Empty {
                    grant,
                    reason: EmptyReason::FetchFailed { message },
                }
            }
        };
        Ok(&self.state)
    }

    /// [`resolve`](Self::resolve) from a raw response body; a body that does
    /// not parse counts as a failed fetch.
    pub fn resolve_json(
        &mut self,
        ticket: &RequestTicket,
        outcome: Result<&str, String>,
    ) -> EquityPlanResult<&ViewState> {
        let parsed = outcome.and_then(|body| {
            serde_json::from_str::<SchedulePayload>(body).map_err(|e| format!("unreadable schedule: {e}"))
        });
        self.resolve(ticket, parsed)
    }

    /// Back to idle, e.g. when the detail view closes.
    pub fn reset(&mut self) {
        // Bump the sequence so in-flight responses for the closed view are stale.
        let _ = self.sequencer.issue(GrantKey::new("", 0));
        self.state = ViewState::Idle;
    }

    fn chart(&self, grant: GrantKey, response: GrantScheduleResponse) -> ViewState {
        if response.schedule.is_empty() {
            let reason = match &response.grant {
                Some(summary) if summary.vests_immediately() => EmptyReason::ImmediateVesting,
                _ => EmptyReason::NoEvents,
            };
            return ViewState::Empty { grant, reason };
        }
        let series = build_cumulative_series(&SeriesInput::from_response(&response, self.frequency));
        if series.is_empty() {
            return ViewState::Empty {
                grant,
                reason: EmptyReason::NoEvents,
            };
        }
        ViewState::Ready {
            grant,
            chart: ChartedSchedule {
                grant: response.grant,
                series,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EquityPlanError;
    use pretty_assertions::assert_eq;

    const BODY: &str = r#"{
        "grant": {"id": 1, "vesting_frequency": "MONTHLY", "vesting_start": "2024-01-01", "vesting_end": "2024-12-31"},
        "schedule": [{"date": "2024-02-01", "total_vested": 10}, {"date": "2024-03-01", "total_vested": 10}]
    }"#;

    #[test]
    fn test_load_then_resolve_ready() {
        let mut view = GrantScheduleView::new();
        let ticket = view.load(GrantKey::new("E1", 1));
        assert!(matches!(view.state(), ViewState::Loading { .. }));
        let state = view.resolve_json(&ticket, Ok(BODY)).unwrap();
        match state {
            ViewState::Ready { chart, .. } => assert_eq!(chart.series.final_cumulative(), 20),
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut view = GrantScheduleView::new();
        let first = view.load(GrantKey::new("E1", 1));
        let second = view.load(GrantKey::new("E2", 2));
        let err = view.resolve_json(&first, Ok(BODY)).unwrap_err();
        assert!(matches!(err, EquityPlanError::StaleResponse { .. }));
        assert_eq!(
            view.state(),
            &ViewState::Loading {
                grant: GrantKey::new("E2", 2)
            }
        );
        view.resolve_json(&second, Ok("[]")).unwrap();
        assert!(matches!(view.state(), ViewState::Empty { reason: EmptyReason::NoEvents, .. }));
    }

    #[test]
    fn test_failed_fetch_is_empty_not_error() {
        let mut view = GrantScheduleView::new();
        let ticket = view.load(GrantKey::new("E1", 1));
        let state = view.resolve(&ticket, Err("HTTP 500".into())).unwrap();
        assert_eq!(
            state,
            &ViewState::Empty {
                grant: GrantKey::new("E1", 1),
                reason: EmptyReason::FetchFailed {
                    message: "HTTP 500".into()
                },
            }
        );
    }

    #[test]
    fn test_unparseable_body_is_failed_fetch() {
        let mut view = GrantScheduleView::new();
        let ticket = view.load(GrantKey::new("E1", 1));
        let state = view.resolve_json(&ticket, Ok("<html>")).unwrap();
        assert!(matches!(
            state,
            ViewState::Empty {
                reason: EmptyReason::FetchFailed { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_preferred_grant_is_immediate() {
        let mut view = GrantScheduleView::new();
        let ticket = view.load(GrantKey::new("E1", 1));
        let body = r#"{"grant": {"preferred_shares": 1000}, "schedule": []}"#;
        let state = view.resolve_json(&ticket, Ok(body)).unwrap();
        assert!(matches!(
            state,
            ViewState::Empty {
                reason: EmptyReason::ImmediateVesting,
                ..
            }
        ));
    }

    #[test]
    fn test_reset_invalidates_in_flight() {
        let mut view = GrantScheduleView::new();
        let ticket = view.load(GrantKey::new("E1", 1));
        view.reset();
        assert!(view.resolve_json(&ticket, Ok(BODY)).is_err());
        assert_eq!(view.state(), &ViewState::Idle);
    }

    #[test]
    fn test_frequency_override() {
        let mut view = GrantScheduleView::with_frequency(VestingFrequency::Yearly);
        let ticket = view.load(GrantKey::new("E1", 1));
        match view.resolve_json(&ticket, Ok(BODY)).unwrap() {
            ViewState::Ready { chart, .. } => {
                assert_eq!(chart.series.frequency, VestingFrequency::Yearly);
                assert_eq!(chart.series.points.len(), 1);
                assert_eq!(chart.series.points[0].key, "2024");
            }
            other => panic!("expected ready, got {other:?}"),
        }
    }
}
