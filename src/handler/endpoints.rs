//! Endpoint execution
//!
//! Runs a validated command against the point service.

use hyper::StatusCode;

use crate::error::AppError;
use crate::http::Response;
use crate::point::PointService;
use crate::validation::Command;

/// Execute one command and render its success value as JSON
pub async fn execute(command: Command, points: &PointService) -> Result<Response, AppError> {
    let response = match command {
        Command::Health => Response::json(StatusCode::OK, &serde_json::json!({ "status": "ok" })),
        Command::GetPoint { user_id } => {
            Response::json(StatusCode::OK, &points.point(user_id).await?)
        }
        Command::GetHistories { user_id } => {
            Response::json(StatusCode::OK, &points.histories(user_id).await?)
        }
        Command::Charge { user_id, amount } => {
            Response::json(StatusCode::OK, &points.charge(user_id, amount).await?)
        }
        Command::Use { user_id, amount } => {
            Response::json(StatusCode::OK, &points.use_point(user_id, amount).await?)
        }
    };
    Ok(response)
}
