use std::future::Future;
use std::time::Duration;
use reqwest::Client;
use tracing::warn;

use crate::error::{Result, ServiceError};

/// Delay added per attempt between retries
const RETRY_STEP: Duration = Duration::from_millis(500);

/// Build the HTTP client shared by the HTTP gateways
pub fn http_client(timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("tsuyaku/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Run `op` until it succeeds or `max_retries` extra attempts are used up.
/// The delay grows linearly with the attempt number.
pub async fn with_retries<T, F, Fut>(
    service: &str,
    max_retries: u32,
    mut op: F,
) -> std::result::Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, ServiceError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                warn!("{} request failed (attempt {}/{}): {}", service, attempt, max_retries + 1, e.message);
                tokio::time::sleep(RETRY_STEP * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Map a reqwest failure into the opaque gateway error
pub fn http_error(service: &str, context: &str, err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::new(service, format!("{}: request timed out", context))
    } else {
        ServiceError::new(service, format!("{}: {}", context, err))
    }
}
