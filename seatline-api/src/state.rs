use seatline_saga::SagaServices;

#[derive(Clone)]
pub struct AppState {
    pub saga: SagaServices,
    /// "postgres" or "memory", reported by the health endpoint.
    pub store_backend: &'static str,
}

impl AppState {
    pub fn new(saga: SagaServices, store_backend: &'static str) -> Self {
        Self { saga, store_backend }
    }
}
