//! Reference services: `add_two_ints` and `empty_srv`.

use tracing::info;

use super::{HandlerFault, HandlerRegistry, Payload, Request, Response, ServiceName};
use super::registry::DuplicateServiceError;

pub const ADD_TWO_INTS: &str = "add_two_ints";
pub const EMPTY_SRV: &str = "empty_srv";

/// `add_two_ints` declines to answer when both operands equal this value.
pub const DECLINE_SENTINEL: i64 = 100;

/// Add `a` and `b`.
///
/// Declines when both operands equal [`DECLINE_SENTINEL`]. Addition is
/// checked; overflow is reported as [`HandlerFault::Overflow`].
pub fn add_two_ints(request: Request) -> Result<Response, HandlerFault> {
    let Request::TwoInts { a, b } = request else {
        return Err(HandlerFault::BadRequest(format!(
            "{ADD_TWO_INTS} expects two integers, got {request:?}"
        )));
    };

    let sum = a.checked_add(b);
    match sum {
        Some(sum) => info!("Returning [{a} + {b} = {sum}]"),
        None => info!("Returning [{a} + {b} = overflow]"),
    }

    if a == DECLINE_SENTINEL && b == DECLINE_SENTINEL {
        return Ok(Response::Rejected);
    }

    let sum = sum.ok_or(HandlerFault::Overflow { a, b })?;
    Ok(Response::Value(Payload::Sum { sum }))
}

/// Accept any request and answer with an empty response.
pub fn empty_handler(_request: Request) -> Result<Response, HandlerFault> {
    info!("Got empty request");
    Ok(Response::Empty)
}

/// Register both reference services into `registry`.
pub fn register_reference_services(
    registry: &mut HandlerRegistry,
) -> Result<(), DuplicateServiceError> {
    registry.register(service_name(ADD_TWO_INTS), add_two_ints)?;
    registry.register(service_name(EMPTY_SRV), empty_handler)?;
    Ok(())
}

/// Name for one of the reference services.
pub fn service_name(name: &'static str) -> ServiceName {
    ServiceName::from_static(name)
}
