//! Request pipeline
//!
//! Router -> Validator -> Handler -> Response Writer. Each stage either
//! passes a typed value on or short-circuits with an [`AppError`]; the
//! writer is always the last step, so every request yields one response.

use hyper::Method;

use super::endpoints;
use crate::config::AppState;
use crate::error::AppError;
use crate::http::{Request, Response, ResponseWriter};
use crate::logger;
use crate::routing::Resolution;
use crate::validation;

/// Run a received request through the pipeline
pub async fn process(request: &Request, state: &AppState) -> Response {
    let writer = ResponseWriter::new(&state.config.http);

    let (endpoint, params) = match state.routes.resolve(request.method(), request.path()) {
        Resolution::Matched { endpoint, params } => (endpoint, params),
        Resolution::MethodNotAllowed { allowed } if request.method() == Method::OPTIONS => {
            return writer.preflight(&allowed);
        }
        Resolution::MethodNotAllowed { allowed } => {
            return writer.write(Err(AppError::MethodNotAllowed {
                method: request.method().clone(),
                path: request.path().to_string(),
                allowed,
            }));
        }
        Resolution::NotFound => {
            return writer.write(Err(AppError::NotFound {
                method: request.method().clone(),
                path: request.path().to_string(),
            }));
        }
    };

    let checked = validation::validate(request, endpoint, &params, &state.rules);
    if !checked.is_success() {
        logger::log_validation_rejected(request.path(), checked.errors());
    }

    let result = match checked.into_command() {
        Ok(command) => endpoints::execute(command, &state.points).await,
        Err(errors) => Err(AppError::Validation(errors)),
    };

    writer.write(result)
}
