use async_trait::async_trait;
use seatline_shared::Masked;
use serde::{Deserialize, Serialize};

use crate::models::{InstanceKey, PassengerFact, ReservationId};
use crate::CoreResult;

/// Screening status the reservation process starts from; the process itself
/// updates these as its own checks complete.
pub const UNVERIFIED: &str = "UNVERIFIED";

/// Variable bag handed to the reservation process on start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVariables {
    pub reservation_id: ReservationId,
    pub status_payment: bool,
    pub blacklist_user: bool,
    pub identity_status: String,
    pub vaccination_status: String,
    pub national_id: Masked<String>,
}

impl ProcessVariables {
    pub fn for_booking(reservation_id: ReservationId, passenger: &PassengerFact) -> Self {
        Self {
            reservation_id,
            status_payment: false,
            blacklist_user: false,
            identity_status: UNVERIFIED.to_string(),
            vaccination_status: UNVERIFIED.to_string(),
            national_id: passenger.national_id.clone(),
        }
    }
}

/// External business-process engine.
///
/// `WorkflowUnreachable` means the call may be repeated;
/// `WorkflowDefinitionMissing` means the configured process id is wrong and
/// retrying is pointless; `WorkflowRejected` covers every other refusal.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn start_instance(
        &self,
        process_id: &str,
        variables: &ProcessVariables,
    ) -> CoreResult<InstanceKey>;
}
