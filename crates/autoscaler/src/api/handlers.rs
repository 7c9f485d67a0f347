use poem::handler;
use poem::http::StatusCode;
use poem::web::Data;
use poem::web::Json;

use crate::domain::pool::status::read_status;
use crate::domain::pool::status::ReconcilerState;
use crate::domain::pool::ScalerStatus;
use crate::domain::pool::SharedStatus;

/// Liveness probe, fails once the control loop has stopped.
#[handler]
pub async fn healthz(shared: Data<&SharedStatus>) -> (StatusCode, &'static str) {
    match read_status(shared.0).state {
        ReconcilerState::Stopped => (StatusCode::SERVICE_UNAVAILABLE, "stopped"),
        _ => (StatusCode::OK, "OK"),
    }
}

/// Last snapshot, decision and counters of the control loop.
#[handler]
pub async fn get_status(shared: Data<&SharedStatus>) -> Json<ScalerStatus> {
    Json(read_status(shared.0))
}
