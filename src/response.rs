//! Push service response classification.

use crate::error::PushError;
use crate::subscription::PushSubscription;

/// Map a push service status code to success or a classified failure.
///
/// Only 201 Created and 202 Accepted count as delivered; every other status,
/// including other 2xx codes, is reported as unexpected.
pub fn classify(status: u16, subscription: &PushSubscription) -> Result<(), PushError> {
    let message = match status {
        201 | 202 => return Ok(()),
        400 => "Bad Request".to_string(),
        413 => "Payload too large".to_string(),
        429 => "Too many request.".to_string(),
        404 | 410 => "Subscription no longer valid".to_string(),
        other => format!("Received unexpected response code: {other}"),
    };

    Err(PushError {
        status,
        message,
        subscription: subscription.clone(),
    })
}
