use serde::{Deserialize, Serialize};

use crate::error::EquityPlanError;
use crate::EquityPlanResult;

/// Identifies one grant's detail view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantKey {
    pub unique_id: String,
    pub grant_id: u64,
}

impl GrantKey {
    pub fn new(unique_id: impl Into<String>, grant_id: u64) -> Self {
        GrantKey {
            unique_id: unique_id.into(),
            grant_id,
        }
    }
}

/// Handed out with each outgoing request and presented back with its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTicket {
    pub seq: u64,
    pub grant: GrantKey,
}

/// Last-request-wins guard.
///
/// Every request takes the next sequence number; only the response carrying
/// the most recent one is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSequencer {
    latest: u64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, grant: GrantKey) -> RequestTicket {
        self.latest = self.latest.saturating_add(1);
        RequestTicket {
            seq: self.latest,
            grant,
        }
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        ticket.seq == self.latest
    }

    pub fn accept(&self, ticket: &RequestTicket) -> EquityPlanResult<()> {
        if self.is_current(ticket) {
            Ok(())
        } else {
            Err(EquityPlanError::StaleResponse {
                received: ticket.seq,
                latest: self.latest,
            })
        }
    }
}
