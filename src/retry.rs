//! Bounded retry around outbound HTTP.
//!
//! Every remote call in the pipeline goes through the same mechanism: a
//! classified attempt loop with a staged wait for rate limits and a short
//! fixed wait for everything else. Call sites differ only in their attempt
//! budget. Exhaustion always surfaces as `CallError::RetriesExhausted`.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::warn;

use crate::error::CallError;

/// How a single attempt ended, as seen by the retry driver.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// The remote side asked us to slow down (HTTP 429).
    RateLimited(String),
    /// Network error or a non-429 failure status.
    Failed(String),
}

/// Waits applied after rate-limited attempts 1, 2, 3, ...; the last entry
/// repeats for any further attempts.
static RATE_LIMIT_SCHEDULE: [Duration; 5] = [
    Duration::from_secs(5),
    Duration::from_secs(15),
    Duration::from_secs(30),
    Duration::from_secs(60),
    Duration::from_secs(120),
];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub rate_limit_schedule: &'static [Duration],
}

impl RetryPolicy {
    /// Budget for the model call. Generation is the one stage worth waiting
    /// out a long rate-limit window for.
    pub fn generation() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(2),
            rate_limit_schedule: &RATE_LIMIT_SCHEDULE,
        }
    }

    /// Budget for spot-price lookups. Prices degrade to placeholders, so the
    /// budget stays small.
    pub fn prices() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            rate_limit_schedule: &RATE_LIMIT_SCHEDULE,
        }
    }

    /// Budget for campaign API calls.
    pub fn delivery() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            rate_limit_schedule: &RATE_LIMIT_SCHEDULE,
        }
    }

    fn rate_limit_wait(&self, attempt: u32) -> Duration {
        let idx = (attempt as usize)
            .saturating_sub(1)
            .min(self.rate_limit_schedule.len() - 1);
        self.rate_limit_schedule[idx]
    }
}

/// Drives `attempt_fn` until it succeeds or the budget is spent. The last
/// failure detail is carried into the terminal error; nothing is swallowed.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &'static str,
    mut attempt_fn: F,
) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    let mut last = String::new();
    for attempt in 1..=policy.max_attempts {
        match attempt_fn().await {
            AttemptOutcome::Success(value) => return Ok(value),
            AttemptOutcome::RateLimited(detail) => {
                last = detail;
                if attempt < policy.max_attempts {
                    let wait = policy.rate_limit_wait(attempt);
                    warn!(
                        label,
                        attempt,
                        wait_secs = wait.as_secs(),
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
            AttemptOutcome::Failed(detail) => {
                last = detail;
                if attempt < policy.max_attempts {
                    warn!(label, attempt, detail = %last, "attempt failed, retrying");
                    tokio::time::sleep(policy.retry_delay).await;
                }
            }
        }
    }
    Err(CallError::RetriesExhausted {
        label,
        attempts: policy.max_attempts,
        last,
    })
}

/// `reqwest` wrapper that rebuilds the request from a clone for every attempt.
#[derive(Clone)]
pub struct HttpCaller {
    client: Client,
    policy: RetryPolicy,
}

impl HttpCaller {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Borrow the underlying client to build requests against it.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Executes the request under the caller's policy. The builder must carry
    /// a clonable body; all call sites send JSON or nothing.
    pub async fn execute(
        &self,
        builder: RequestBuilder,
        label: &'static str,
    ) -> Result<Response, CallError> {
        let request = builder.build().map_err(|e| CallError::InvalidRequest {
            label,
            reason: e.to_string(),
        })?;

        run_with_retry(&self.policy, label, || {
            let attempt_request = request.try_clone();
            async move {
                let Some(attempt_request) = attempt_request else {
                    return AttemptOutcome::Failed("request body is not clonable".to_string());
                };
                match self.client.execute(attempt_request).await {
                    Ok(resp) => classify(resp).await,
                    Err(e) => AttemptOutcome::Failed(e.to_string()),
                }
            }
        })
        .await
    }
}

async fn classify(resp: Response) -> AttemptOutcome<Response> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return AttemptOutcome::RateLimited(format!("HTTP {}", status.as_u16()));
    }
    if status.is_success() {
        return AttemptOutcome::Success(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    AttemptOutcome::Failed(format!("HTTP {}: {}", status.as_u16(), snippet(&body)))
}

/// First 200 chars of a response body, for error messages.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= 200 {
        trimmed.to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
