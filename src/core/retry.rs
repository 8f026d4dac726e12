//! Request retry loop shared by both clients
//!
//! A request is reissued unchanged while the provider answers with one of
//! the retryable statuses, and optionally while the connection cannot be
//! established. How long to wait and whether to ever give up is decided by
//! a [`RetryPolicy`]; the default policies never give up.

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::config::RetryPolicy;
use crate::core::errors::{ClientError, Result};
use crate::core::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Which conditions are retried and how
#[derive(Debug, Clone)]
pub struct RetryRules {
    /// Statuses that cause the same request to be reissued
    pub statuses: &'static [u16],
    /// Policy applied to retryable statuses
    pub status_policy: RetryPolicy,
    /// Policy applied to connection failures; `None` fails immediately
    pub connect_policy: Option<RetryPolicy>,
}

/// Human-readable reason for a retryable status
pub fn describe_status(status: u16) -> &'static str {
    match status {
        403 => "Translation quota reached",
        429 => "Request limit reached",
        503 => "Service currently unavailable",
        _ => "Retryable status",
    }
}

/// Send `request` until it yields a response that is not retryable
pub async fn send_with_retry(
    transport: &dyn HttpTransport,
    request: &HttpRequest,
    rules: &RetryRules,
) -> Result<HttpResponse> {
    let mut status_retries: u32 = 0;
    let mut connect_retries: u32 = 0;

    loop {
        let attempts = status_retries + connect_retries + 1;

        let response = match transport.send(request).await {
            Ok(response) => response,
            Err(TransportError::Connect(message)) => {
                let Some(policy) = rules.connect_policy else {
                    return Err(TransportError::Connect(message).into());
                };
                if !policy.allows(connect_retries) {
                    warn!("Giving up after {} connection errors", connect_retries + 1);
                    return Err(ClientError::RetriesExhausted {
                        attempts,
                        last_condition: message,
                    });
                }
                debug!("Connection error encountered. Trying again.");
                connect_retries += 1;
                sleep(policy.delay()).await;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        if !rules.statuses.contains(&response.status) {
            if attempts > 1 {
                info!("Request succeeded after {} attempts", attempts);
            }
            return Ok(response);
        }

        let reason = describe_status(response.status);
        if !rules.status_policy.allows(status_retries) {
            warn!("{}; giving up after {} attempts", reason, attempts);
            return Err(ClientError::RetriesExhausted {
                attempts,
                last_condition: format!("[{}] {}", response.status, reason),
            });
        }

        debug!("{}. Waiting...", reason);
        status_retries += 1;
        sleep(rules.status_policy.delay()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::mock::ScriptedTransport;
    use std::time::Duration;

    fn rules(connect: Option<RetryPolicy>) -> RetryRules {
        RetryRules {
            statuses: &[429, 503],
            status_policy: RetryPolicy::unbounded(Duration::ZERO),
            connect_policy: connect,
        }
    }

    fn request() -> HttpRequest {
        HttpRequest::get("http://localhost/tweets/1")
    }

    #[tokio::test]
    async fn test_retries_until_non_retryable_status() {
        let transport = ScriptedTransport::script(vec![
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(429, "")),
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::new(200, "{}")),
        ]);

        let response = send_with_retry(&transport, &request(), &rules(None))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.request_count(), 4);
        assert!(transport.requests().iter().all(|r| *r == request()));
    }

    #[tokio::test]
    async fn test_non_retryable_status_returned_as_is() {
        let transport = ScriptedTransport::script(vec![Ok(HttpResponse::new(400, "bad"))]);

        let response = send_with_retry(&transport, &request(), &rules(None))
            .await
            .unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_bounded_status_policy_gives_up() {
        let transport = ScriptedTransport::script(vec![Ok(HttpResponse::new(503, ""))]);
        let mut rules = rules(None);
        rules.status_policy = rules.status_policy.with_max_retries(2);

        let result = send_with_retry(&transport, &request(), &rules).await;

        match result {
            Err(ClientError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_connect_errors_retried_when_policy_present() {
        let transport = ScriptedTransport::script(vec![
            Err(TransportError::Connect("refused".to_string())),
            Err(TransportError::Connect("refused".to_string())),
            Ok(HttpResponse::new(200, "{}")),
        ]);

        let response = send_with_retry(
            &transport,
            &request(),
            &rules(Some(RetryPolicy::unbounded(Duration::ZERO))),
        )
        .await
        .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_connect_error_fails_without_policy() {
        let transport =
            ScriptedTransport::script(vec![Err(TransportError::Connect("refused".to_string()))]);

        let result = send_with_retry(&transport, &request(), &rules(None)).await;

        tokio_test::assert_err!(&result);
        assert!(matches!(result, Err(ClientError::NetworkError { .. })));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_request_errors_are_not_retried() {
        let transport =
            ScriptedTransport::script(vec![Err(TransportError::Request("timeout".to_string()))]);

        let result = send_with_retry(
            &transport,
            &request(),
            &rules(Some(RetryPolicy::unbounded(Duration::ZERO))),
        )
        .await;

        assert!(matches!(result, Err(ClientError::NetworkError { .. })));
        assert_eq!(transport.request_count(), 1);
    }
}
