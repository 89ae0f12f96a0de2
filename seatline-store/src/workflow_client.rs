use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use seatline_core::models::InstanceKey;
use seatline_core::workflow::{ProcessVariables, WorkflowEngine};
use seatline_core::{CoreError, CoreResult};

/// Starts process instances through the engine gateway's REST API
/// (`POST {gateway}/v2/process-instances`), always on the latest deployed
/// version of the definition.
#[derive(Clone)]
pub struct HttpWorkflowEngine {
    client: Client,
    gateway_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstanceRequest<'a> {
    process_definition_id: &'a str,
    variables: &'a ProcessVariables,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstanceResponse {
    process_instance_key: Value,
}

impl HttpWorkflowEngine {
    pub fn new(gateway_address: &str) -> Self {
        Self {
            client: Client::new(),
            gateway_address: gateway_address.trim_end_matches('/').to_string(),
        }
    }
}

/// The gateway serialises 64-bit keys as strings; older gateways send numbers.
fn parse_instance_key(raw: &Value) -> Option<InstanceKey> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl WorkflowEngine for HttpWorkflowEngine {
    async fn start_instance(&self, process_id: &str, variables: &ProcessVariables) -> CoreResult<InstanceKey> {
        let body = CreateInstanceRequest {
            process_definition_id: process_id,
            variables,
        };

        let response = self
            .client
            .post(format!("{}/v2/process-instances", self.gateway_address))
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::WorkflowUnreachable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let created: CreateInstanceResponse = response
                    .json()
                    .await
                    .map_err(|e| CoreError::WorkflowRejected(format!("unreadable start response: {}", e)))?;
                let key = parse_instance_key(&created.process_instance_key).ok_or_else(|| {
                    CoreError::WorkflowRejected(format!(
                        "process instance key {} is not a 64-bit integer",
                        created.process_instance_key
                    ))
                })?;
                debug!(process_id, instance_key = key, "Gateway created process instance");
                Ok(key)
            }
            StatusCode::NOT_FOUND => Err(CoreError::WorkflowDefinitionMissing(process_id.to_string())),
            status if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
                Err(CoreError::WorkflowUnreachable(format!("gateway answered {}", status)))
            }
            status => {
                let detail = response.text().await.unwrap_or_default();
                Err(CoreError::WorkflowRejected(format!("gateway answered {}: {}", status, detail)))
            }
        }
    }
}
