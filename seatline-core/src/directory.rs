use async_trait::async_trait;

use crate::models::{FlightFact, PassengerFact, PassengerId};
use crate::CoreResult;

/// Read-only lookups against the external passenger/flight directory.
///
/// Failures: `DirectoryUnavailable` for network errors and non-2xx answers,
/// `DirectoryRecordNotFound` when the directory answers 404,
/// `DirectoryDecodeError` for bodies that do not parse. No retries happen here.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn passenger(&self, passenger_id: PassengerId) -> CoreResult<PassengerFact>;

    async fn flight(&self, flight_number: &str) -> CoreResult<FlightFact>;
}
