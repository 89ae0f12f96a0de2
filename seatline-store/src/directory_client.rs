use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use seatline_core::directory::DirectoryClient;
use seatline_core::models::{FlightFact, PassengerFact, PassengerId};
use seatline_core::{CoreError, CoreResult};

/// Directory lookups over HTTP: `GET {base}/passengers/{id}` and
/// `GET {base}/flights/{number}`.
#[derive(Clone)]
pub struct HttpDirectoryClient {
    client: Client,
    base_url: Url,
}

impl HttpDirectoryClient {
    pub fn new(base_url: &str) -> CoreResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CoreError::ValidationError(format!("directory base url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CoreError::ValidationError(format!("directory base url '{}' cannot carry a path", base_url)));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    fn url(&self, collection: &str, key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(collection).push(key);
        }
        url
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url, record: String) -> CoreResult<T> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CoreError::DirectoryUnavailable(format!("{}: {}", record, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CoreError::DirectoryRecordNotFound(record));
        }
        if !status.is_success() {
            return Err(CoreError::DirectoryUnavailable(format!("{}: directory answered {}", record, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CoreError::DirectoryUnavailable(format!("{}: {}", record, e)))?;
        serde_json::from_str(&body).map_err(|e| CoreError::DirectoryDecodeError(format!("{}: {}", record, e)))
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn passenger(&self, passenger_id: PassengerId) -> CoreResult<PassengerFact> {
        let url = self.url("passengers", &passenger_id.to_string());
        self.fetch(url, format!("passenger {}", passenger_id)).await
    }

    async fn flight(&self, flight_number: &str) -> CoreResult<FlightFact> {
        let url = self.url("flights", flight_number);
        self.fetch(url, format!("flight {}", flight_number)).await
    }
}
