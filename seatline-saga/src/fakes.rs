//! Scripted collaborators for saga tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use seatline_core::codes::{CodeGenerator, RandomCodeGenerator};
use seatline_core::directory::DirectoryClient;
use seatline_core::models::{FlightFact, InstanceKey, PassengerFact, PassengerId};
use seatline_core::notifier::{Notification, Notifier};
use seatline_core::workflow::{ProcessVariables, WorkflowEngine};
use seatline_core::{CoreError, CoreResult};
use seatline_shared::Masked;

use crate::{Collaborators, InMemoryReservationStore, SagaTimeouts};

pub fn passenger(id: PassengerId) -> PassengerFact {
    PassengerFact {
        passenger_id: id,
        first_name: "Ayu".into(),
        last_name: "Lestari".into(),
        email: "ayu@example.com".into(),
        national_id: Masked("3174012309880001".into()),
        phone_number: Masked("08123456789".into()),
        username: "ayul".into(),
    }
}

pub fn flight(number: &str) -> FlightFact {
    FlightFact {
        flight_number: number.into(),
        departure_airport_code: "CGK".into(),
        arrival_airport_code: "DPS".into(),
        departure_date_time: Utc.with_ymd_and_hms(2026, 11, 2, 7, 30, 0).unwrap(),
        arrival_date_time: Utc.with_ymd_and_hms(2026, 11, 2, 10, 20, 0).unwrap(),
    }
}

#[derive(Default)]
pub struct StaticDirectory {
    passengers: Mutex<HashMap<PassengerId, PassengerFact>>,
    flights: Mutex<HashMap<String, FlightFact>>,
    failure: Mutex<Option<CoreError>>,
    delay: Option<Duration>,
}

impl StaticDirectory {
    pub fn with_facts(passengers: Vec<PassengerFact>, flights: Vec<FlightFact>) -> Self {
        Self {
            passengers: Mutex::new(passengers.into_iter().map(|p| (p.passenger_id, p)).collect()),
            flights: Mutex::new(flights.into_iter().map(|f| (f.flight_number.clone(), f)).collect()),
            ..Self::default()
        }
    }

    pub fn standard() -> Self {
        Self::with_facts(vec![passenger(42)], vec![flight("GA123")])
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_with(&self, error: Option<CoreError>) {
        *self.failure.lock().unwrap() = error;
    }

    async fn pause(&self) -> CoreResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryClient for StaticDirectory {
    async fn passenger(&self, id: PassengerId) -> CoreResult<PassengerFact> {
        self.pause().await?;
        self.passengers
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::DirectoryRecordNotFound(format!("passenger {}", id)))
    }

    async fn flight(&self, flight_number: &str) -> CoreResult<FlightFact> {
        self.pause().await?;
        self.flights
            .lock()
            .unwrap()
            .get(flight_number)
            .cloned()
            .ok_or_else(|| CoreError::DirectoryRecordNotFound(format!("flight {}", flight_number)))
    }
}

/// Pops scripted results in order; once the script runs out it hands out
/// increasing instance keys.
#[derive(Default)]
pub struct ScriptedWorkflow {
    script: Mutex<VecDeque<CoreResult<InstanceKey>>>,
    started: Mutex<Vec<(String, ProcessVariables)>>,
    next_key: AtomicI64,
    delay: Option<Duration>,
}

impl ScriptedWorkflow {
    pub fn new() -> Self {
        Self {
            next_key: AtomicI64::new(2251799813685249),
            ..Self::default()
        }
    }

    pub fn then(self, result: CoreResult<InstanceKey>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn started(&self) -> Vec<(String, ProcessVariables)> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkflowEngine for ScriptedWorkflow {
    async fn start_instance(&self, process_id: &str, variables: &ProcessVariables) -> CoreResult<InstanceKey> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        let result = scripted.unwrap_or_else(|| Ok(self.next_key.fetch_add(1, Ordering::SeqCst)));
        if result.is_ok() {
            self.started
                .lock()
                .unwrap()
                .push((process_id.to_string(), variables.clone()));
        }
        result
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<Notification>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, notification: &Notification) -> CoreResult<()> {
        if self.failing {
            return Err(CoreError::NotificationError("smtp relay refused connection".into()));
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Hands out scripted codes first, then falls back to random ones.
#[derive(Default)]
pub struct SequenceCodes {
    payment: Mutex<VecDeque<String>>,
    booking: Mutex<VecDeque<String>>,
}

impl SequenceCodes {
    pub fn payments(self, codes: &[&str]) -> Self {
        self.payment.lock().unwrap().extend(codes.iter().map(|c| c.to_string()));
        self
    }

    pub fn bookings(self, codes: &[&str]) -> Self {
        self.booking.lock().unwrap().extend(codes.iter().map(|c| c.to_string()));
        self
    }
}

impl CodeGenerator for SequenceCodes {
    fn payment_code(&self) -> String {
        self.payment
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomCodeGenerator.payment_code())
    }

    fn booking_code(&self) -> String {
        self.booking
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomCodeGenerator.booking_code())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryReservationStore>,
    pub directory: Arc<StaticDirectory>,
    pub workflow: Arc<ScriptedWorkflow>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(StaticDirectory::standard(), ScriptedWorkflow::new(), RecordingNotifier::default())
    }

    pub fn with(directory: StaticDirectory, workflow: ScriptedWorkflow, notifier: RecordingNotifier) -> Self {
        Self {
            store: Arc::new(InMemoryReservationStore::new()),
            directory: Arc::new(directory),
            workflow: Arc::new(workflow),
            notifier: Arc::new(notifier),
        }
    }

    pub fn deps(&self) -> Collaborators {
        self.deps_with_codes(SequenceCodes::default())
    }

    pub fn deps_with_codes(&self, codes: SequenceCodes) -> Collaborators {
        Collaborators {
            store: self.store.clone(),
            directory: self.directory.clone(),
            workflow: self.workflow.clone(),
            notifier: self.notifier.clone(),
            codes: Arc::new(codes),
            process_id: "seat-reservation".into(),
            timeouts: SagaTimeouts {
                store: Duration::from_millis(500),
                directory: Duration::from_millis(100),
                workflow: Duration::from_millis(100),
                notifier: Duration::from_millis(100),
            },
        }
    }
}
