#![cfg(feature = "loader")]

use equity_plan_core::loader::config::ClientConfig;
use equity_plan_core::loader::sequence::GrantKey;
use equity_plan_core::loader::view::{EmptyReason, GrantScheduleView, ViewState};
use equity_plan_core::EquityPlanError;
use pretty_assertions::assert_eq;

const ADA_BODY: &str = r#"{
    "grant": {"id": 1, "vesting_frequency": "YEARLY", "vesting_start": "2024-01-01", "vesting_end": "2026-12-31"},
    "schedule": [{"date": "2024-12-31", "total_vested": 500}]
}"#;

#[test]
fn test_fast_navigation_keeps_last_grant() {
    let mut view = GrantScheduleView::new();
    let ada = view.load(GrantKey::new("EMP-1", 1));
    let lin = view.load(GrantKey::new("EMP-2", 2));

    // Lin's response arrives first, then Ada's stale one.
    view.resolve_json(&lin, Ok("[]")).unwrap();
    let stale = view.resolve_json(&ada, Ok(ADA_BODY)).unwrap_err();
    assert!(matches!(stale, EquityPlanError::StaleResponse { received: 1, latest: 2 }));

    assert_eq!(
        view.state(),
        &ViewState::Empty {
            grant: GrantKey::new("EMP-2", 2),
            reason: EmptyReason::NoEvents,
        }
    );
}

#[test]
fn test_yearly_view_fills_to_vesting_end() {
    let mut view = GrantScheduleView::new();
    let ticket = view.load(GrantKey::new("EMP-1", 1));
    match view.resolve_json(&ticket, Ok(ADA_BODY)).unwrap() {
        ViewState::Ready { chart, .. } => {
            let keys: Vec<&str> = chart.series.points.iter().map(|p| p.key.as_str()).collect();
            assert_eq!(keys, vec!["2024", "2025", "2026"]);
            assert_eq!(chart.series.final_cumulative(), 500);
            assert_eq!(chart.grant.as_ref().and_then(|g| g.id), Some(1));
        }
        other => panic!("expected ready, got {other:?}"),
    }
}

#[test]
fn test_config_drives_view_urls() {
    let cfg: ClientConfig = serde_json::from_str(
        r#"{"base_url": "https://equity.example.com", "auth_token": "t0k"}"#,
    )
    .unwrap();
    cfg.validate().unwrap();
    let grant = GrantKey::new("EMP-1", 1);
    assert_eq!(
        cfg.grant_schedule_url(&grant.unique_id, grant.grant_id).unwrap().as_str(),
        "https://equity.example.com/api/equity/employees/EMP-1/grants/1/schedule/"
    );
    assert_eq!(cfg.authorization_header().as_deref(), Some("Bearer t0k"));
}
