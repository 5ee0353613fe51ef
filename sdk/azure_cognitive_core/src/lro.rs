//! Long-running operation handling for ARM writes.
//!
//! ARM signals asynchronous completion in one of three ways:
//!
//! - an `Azure-AsyncOperation` header pointing at an operation resource whose
//!   `status` eventually becomes `Succeeded`, `Failed` or `Canceled`;
//! - a `202 Accepted` with a `Location` header that keeps answering `202`
//!   until the work is done;
//! - a plain `200`/`201` whose body carries `properties.provisioningState`,
//!   which [`wait_for_provisioning_state`] follows with GETs on the resource.
//!
//! None of these loops has an attempt limit. Callers bound them with the
//! per-operation timeouts applied by the adapter layer.

use std::time::Duration;

use serde::Deserialize;

use crate::client::ArmClient;
use crate::error::{ProviderError, ProviderResult};

const ASYNC_OPERATION_HEADER: &str = "Azure-AsyncOperation";
const LOCATION_HEADER: &str = "Location";
const RETRY_AFTER_HEADER: &str = "Retry-After";

/// Body of an `Azure-AsyncOperation` status resource.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    /// `InProgress`, `Succeeded`, `Failed`, `Canceled`, or a service-specific value.
    pub status: String,

    /// Error details when the operation failed.
    #[serde(default)]
    pub error: Option<OperationError>,
}

/// Error payload attached to a failed operation.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Whether an operation or provisioning state is final.
pub fn is_terminal_state(state: &str) -> bool {
    ["Succeeded", "Failed", "Canceled", "Cancelled"]
        .iter()
        .any(|s| s.eq_ignore_ascii_case(state))
}

fn is_success_state(state: &str) -> bool {
    state.eq_ignore_ascii_case("Succeeded")
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    header_value(response, RETRY_AFTER_HEADER)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn failure(status: &str, error: Option<&OperationError>) -> ProviderError {
    let message = error
        .map(|e| {
            format!(
                "{}: {}",
                e.code.as_deref().unwrap_or("unknown"),
                e.message.as_deref().unwrap_or("no details provided")
            )
        })
        .unwrap_or_else(|| "no details provided".to_string());

    ProviderError::OperationFailed {
        status: status.to_string(),
        message,
    }
}

/// Wait for the operation started by `response` to finish.
///
/// Returns the JSON body of the final response when there is one: the initial
/// body for `Azure-AsyncOperation` polling, the last `Location` body
/// otherwise.
#[tracing::instrument(
    name = "cognitive::lro::wait_for_completion",
    skip(client, response),
    fields(status = response.status().as_u16())
)]
pub async fn wait_for_completion(
    client: &ArmClient,
    response: reqwest::Response,
) -> ProviderResult<Option<serde_json::Value>> {
    let status = response.status().as_u16();
    let async_operation = header_value(&response, ASYNC_OPERATION_HEADER);
    let location = header_value(&response, LOCATION_HEADER);
    let initial_delay = retry_after(&response);
    let body = read_json_body(response).await?;

    if let Some(operation_url) = async_operation {
        poll_async_operation(client, &operation_url, initial_delay).await?;
        return Ok(body);
    }

    if status == 202 {
        if let Some(location_url) = location {
            return poll_location(client, &location_url, initial_delay).await;
        }
    }

    Ok(body)
}

async fn read_json_body(response: reqwest::Response) -> ProviderResult<Option<serde_json::Value>> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&text)?))
}

async fn poll_async_operation(
    client: &ArmClient,
    operation_url: &str,
    mut delay: Option<Duration>,
) -> ProviderResult<()> {
    tracing::debug!(operation_url, "polling Azure-AsyncOperation");

    loop {
        tokio::time::sleep(delay.unwrap_or(client.poll_interval())).await;

        let response = client.get_url(operation_url).await?;
        delay = retry_after(&response);
        let operation = response.json::<OperationStatus>().await?;

        if is_terminal_state(&operation.status) {
            if is_success_state(&operation.status) {
                tracing::debug!("operation succeeded");
                return Ok(());
            }
            return Err(failure(&operation.status, operation.error.as_ref()));
        }

        tracing::trace!(status = %operation.status, "operation still in progress");
    }
}

async fn poll_location(
    client: &ArmClient,
    location_url: &str,
    mut delay: Option<Duration>,
) -> ProviderResult<Option<serde_json::Value>> {
    tracing::debug!(location_url, "polling Location");

    loop {
        tokio::time::sleep(delay.unwrap_or(client.poll_interval())).await;

        let response = client.get_url(location_url).await?;
        if response.status().as_u16() != 202 {
            return read_json_body(response).await;
        }

        delay = retry_after(&response);
        tracing::trace!("location still reports 202 Accepted");
    }
}

/// Extract `properties.provisioningState` from a resource body.
pub fn provisioning_state(body: &serde_json::Value) -> Option<&str> {
    body.get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(|s| s.as_str())
}

/// Poll `path` until the resource reports a terminal provisioning state.
///
/// A body without a provisioning state counts as done.
#[tracing::instrument(name = "cognitive::lro::wait_for_provisioning_state", skip(client))]
pub async fn wait_for_provisioning_state(
    client: &ArmClient,
    path: &str,
) -> ProviderResult<serde_json::Value> {
    loop {
        let body = client.get(path).await?.json::<serde_json::Value>().await?;

        match provisioning_state(&body) {
            None => return Ok(body),
            Some(state) if is_success_state(state) => {
                tracing::debug!("resource provisioned");
                return Ok(body);
            }
            Some(state) if is_terminal_state(state) => {
                return Err(ProviderError::OperationFailed {
                    status: state.to_string(),
                    message: format!("resource at {path} did not provision successfully"),
                });
            }
            Some(state) => {
                tracing::trace!(state, "waiting for provisioning state");
                tokio::time::sleep(client.poll_interval()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_mock_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn terminal_states_are_case_insensitive() {
        assert!(is_terminal_state("Succeeded"));
        assert!(is_terminal_state("failed"));
        assert!(is_terminal_state("Canceled"));
        assert!(!is_terminal_state("InProgress"));
        assert!(!is_terminal_state("Accepted"));
    }

    #[test]
    fn provisioning_state_reads_nested_property() {
        let body = serde_json::json!({"properties": {"provisioningState": "Creating"}});
        assert_eq!(provisioning_state(&body), Some("Creating"));
        assert_eq!(provisioning_state(&serde_json::json!({})), None);
    }

    #[tokio::test]
    async fn synchronous_response_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/res"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "a"})))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client.put("/res", &serde_json::json!({})).await.unwrap();
        let body = wait_for_completion(&client, response).await.unwrap();
        assert_eq!(body.unwrap()["name"], "a");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn async_operation_is_polled_until_success() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let server = MockServer::start().await;
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        Mock::given(method("PUT"))
            .and(path("/res"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header(
                        "Azure-AsyncOperation",
                        format!("{}/operations/op1?api-version=2025-06-01", server.uri()).as_str(),
                    )
                    .set_body_json(serde_json::json!({"name": "a"})),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operations/op1"))
            .respond_with(move |_req: &wiremock::Request| {
                let status = if counter.fetch_add(1, Ordering::SeqCst) < 1 {
                    "InProgress"
                } else {
                    "Succeeded"
                };
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": status}))
            })
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client.put("/res", &serde_json::json!({})).await.unwrap();
        let body = wait_for_completion(&client, response).await.unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 2);
        assert_eq!(body.unwrap()["name"], "a");
        assert!(logs_contain("cognitive::lro::wait_for_completion"));
        assert!(logs_contain("operation succeeded"));
    }

    #[tokio::test]
    async fn failed_async_operation_surfaces_error_details() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/res"))
            .respond_with(ResponseTemplate::new(202).insert_header(
                "Azure-AsyncOperation",
                format!("{}/operations/op2", server.uri()).as_str(),
            ))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operations/op2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Failed",
                "error": {"code": "InUse", "message": "account still has deployments"}
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client.delete("/res").await.unwrap();
        match wait_for_completion(&client, response).await.unwrap_err() {
            ProviderError::OperationFailed { status, message } => {
                assert_eq!(status, "Failed");
                assert!(message.contains("InUse"));
                assert!(message.contains("still has deployments"));
            }
            other => panic!("Expected OperationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn location_is_polled_until_not_accepted() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let server = MockServer::start().await;
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        Mock::given(method("DELETE"))
            .and(path("/res"))
            .respond_with(ResponseTemplate::new(202).insert_header(
                "Location",
                format!("{}/locations/res-result", server.uri()).as_str(),
            ))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/locations/res-result"))
            .respond_with(move |_req: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    ResponseTemplate::new(202)
                } else {
                    ResponseTemplate::new(204)
                }
            })
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client.delete("/res").await.unwrap();
        let body = wait_for_completion(&client, response).await.unwrap();

        assert!(body.is_none());
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn provisioning_state_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "properties": {"provisioningState": "Failed"}
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let err = wait_for_provisioning_state(&client, "/res").await.unwrap_err();
        assert!(matches!(err, ProviderError::OperationFailed { .. }));
    }

    #[tokio::test]
    async fn provisioning_state_waits_through_creating() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let server = MockServer::start().await;
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        Mock::given(method("GET"))
            .and(path("/res"))
            .respond_with(move |_req: &wiremock::Request| {
                let state = if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    "Creating"
                } else {
                    "Succeeded"
                };
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "properties": {"provisioningState": state}
                }))
            })
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let body = wait_for_provisioning_state(&client, "/res").await.unwrap();
        assert_eq!(provisioning_state(&body), Some("Succeeded"));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }
}
