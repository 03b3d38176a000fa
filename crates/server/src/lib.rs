use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{app, run, run_with_listener, spawn_with_listener};

mod accounts;
mod campaigns;
mod disputes;
mod orders;
mod server;

pub mod types {
    pub mod account {
        pub use api_types::account::{AccountNew, AccountView, FundsMove, PartyKind};
    }

    pub mod transaction {
        pub use api_types::transaction::{
            TransactionKind, TransactionListResponse, TransactionView,
        };
    }

    pub mod campaign {
        pub use api_types::campaign::{
            CampaignNew, CampaignSettle, CampaignStatus, CampaignTransition, CampaignView,
        };
    }

    pub mod bid {
        pub use api_types::bid::{BidAccept, BidListResponse, BidNew, BidStatus, BidView};
    }

    pub mod dispute {
        pub use api_types::dispute::{
            DisputeClose, DisputeNew, DisputeResolve, DisputeStatus, DisputeView,
        };
    }

    pub mod order {
        pub use api_types::order::{OrderFulfill, OrderView, Rate, RateKind};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Forbidden(String),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::UnknownAccount(_) | EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ConcurrentModification(_) => StatusCode::CONFLICT,
        EngineError::Database(_) | EngineError::InvariantViolation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::InsufficientFunds(_)
        | EngineError::InvalidTransition(_)
        | EngineError::InvalidHoldState(_)
        | EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::InvariantViolation(msg) => {
            tracing::error!("invariant violation: {msg}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Forbidden(err) => (StatusCode::FORBIDDEN, err),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_unknown_account_maps_to_404() {
        let res = ServerError::from(EngineError::UnknownAccount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res =
            ServerError::from(EngineError::ConcurrentModification("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_business_errors_map_to_422() {
        for err in [
            EngineError::InsufficientFunds("x".to_string()),
            EngineError::InvalidTransition("x".to_string()),
            EngineError::InvalidHoldState("x".to_string()),
            EngineError::Validation("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn engine_invariant_violation_hides_details() {
        let res =
            ServerError::from(EngineError::InvariantViolation("drift".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn forbidden_maps_to_403() {
        let res = ServerError::Forbidden("not yours".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
