//! Request validation
//!
//! Checks a routed request before any handler runs. Validation is pure and
//! fails closed: every malformed field adds an error, and a typed
//! [`Command`] is produced only when no error was collected.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::PointsConfig;
use crate::http::Request;
use crate::point::MAX_LEDGER_VALUE;
use crate::routing::{Endpoint, PathParams};

/// Field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Limits applied to request payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub max_amount: u64,
    pub deny_unknown_fields: bool,
}

impl From<&PointsConfig> for ValidationRules {
    fn from(points: &PointsConfig) -> Self {
        Self {
            max_amount: points.max_amount,
            deny_unknown_fields: points.deny_unknown_fields,
        }
    }
}

/// A request that passed validation, in typed form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetPoint { user_id: u64 },
    GetHistories { user_id: u64 },
    Charge { user_id: u64, amount: u64 },
    Use { user_id: u64, amount: u64 },
    Health,
}

/// Outcome of validating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<FieldError>,
    command: Option<Command>,
}

impl ValidationResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.command.is_some()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_command(self) -> Result<Command, Vec<FieldError>> {
        match self.command {
            Some(command) if self.errors.is_empty() => Ok(command),
            _ => Err(self.errors),
        }
    }
}

/// Collects errors while reading a request
#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn user_id(&mut self, params: &PathParams) -> Option<u64> {
        let Some(raw) = params.get("id") else {
            self.fail("id", "is required");
            return None;
        };
        match raw.parse::<u64>() {
            Ok(0) => {
                self.fail("id", "must be greater than 0");
                None
            }
            Ok(id) if id > MAX_LEDGER_VALUE => {
                self.fail("id", format!("must not exceed {MAX_LEDGER_VALUE}"));
                None
            }
            Ok(id) => Some(id),
            Err(_) => {
                self.fail("id", format!("must be a positive integer, got '{raw}'"));
                None
            }
        }
    }

    fn json_object(&mut self, request: &Request) -> Option<Map<String, Value>> {
        let content_type = request
            .header("content-type")
            .and_then(|v| v.split(';').next())
            .map(str::trim);
        match content_type {
            Some(ct) if ct.eq_ignore_ascii_case("application/json") => {}
            Some(ct) => self.fail("content-type", format!("must be application/json, got '{ct}'")),
            None => self.fail("content-type", "must be application/json"),
        }

        if request.body().is_empty() {
            self.fail("body", "is required");
            return None;
        }
        match serde_json::from_slice::<Value>(request.body()) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                self.fail("body", "must be a JSON object");
                None
            }
            Err(e) => {
                self.fail("body", format!("is not valid JSON: {e}"));
                None
            }
        }
    }

    fn amount(&mut self, body: &Map<String, Value>, rules: &ValidationRules) -> Option<u64> {
        if rules.deny_unknown_fields {
            for key in body.keys().filter(|k| k.as_str() != "amount") {
                self.fail(key, "is not a recognized field");
            }
        }

        let Some(value) = body.get("amount") else {
            self.fail("amount", "is required");
            return None;
        };
        let Value::Number(number) = value else {
            self.fail("amount", "must be an integer");
            return None;
        };

        match number.as_u64() {
            Some(0) => self.fail("amount", "must be greater than 0"),
            Some(amount) if amount > rules.max_amount => {
                self.fail("amount", format!("must not exceed {}", rules.max_amount));
            }
            Some(amount) => return Some(amount),
            None if number.as_i64().is_some() => self.fail("amount", "must be greater than 0"),
            None => self.fail("amount", "must be an integer"),
        }
        None
    }
}

/// Validate a routed request
pub fn validate(
    request: &Request,
    endpoint: Endpoint,
    params: &PathParams,
    rules: &ValidationRules,
) -> ValidationResult {
    let mut checker = Checker::default();

    let command = match endpoint {
        Endpoint::Health => Some(Command::Health),
        Endpoint::GetPoint => checker
            .user_id(params)
            .map(|user_id| Command::GetPoint { user_id }),
        Endpoint::GetHistories => checker
            .user_id(params)
            .map(|user_id| Command::GetHistories { user_id }),
        Endpoint::Charge | Endpoint::Use => {
            let user_id = checker.user_id(params);
            let amount = checker
                .json_object(request)
                .and_then(|body| checker.amount(&body, rules));
            match (user_id, amount) {
                (Some(user_id), Some(amount)) if endpoint == Endpoint::Charge => {
                    Some(Command::Charge { user_id, amount })
                }
                (Some(user_id), Some(amount)) => Some(Command::Use { user_id, amount }),
                _ => None,
            }
        }
    };

    if !endpoint.expects_body() && !request.body().is_empty() {
        checker.fail("body", "must be empty");
    }
    if command.is_none() && checker.errors.is_empty() {
        checker.fail("request", "could not be interpreted");
    }

    ValidationResult {
        command: command.filter(|_| checker.errors.is_empty()),
        errors: checker.errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HealthConfig;
    use crate::routing::{Resolution, RouteTable};
    use hyper::body::Bytes;
    use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use hyper::Method;

    const RULES: ValidationRules = ValidationRules {
        max_amount: 1000,
        deny_unknown_fields: false,
    };

    fn request(
        method: Method,
        path: &str,
        content_type: Option<&'static str>,
        body: &str,
    ) -> Request {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        Request::new(method, path, headers, Bytes::from(body.to_string()))
    }

    fn json_patch(path: &str, body: &str) -> Request {
        request(Method::PATCH, path, Some("application/json"), body)
    }

    fn run(req: &Request, rules: &ValidationRules) -> ValidationResult {
        let Resolution::Matched { endpoint, params } =
            RouteTable::new(&HealthConfig::default()).resolve(req.method(), req.path())
        else {
            panic!("test request must route");
        };
        validate(req, endpoint, &params, rules)
    }

    fn fields(result: &ValidationResult) -> Vec<&str> {
        result.errors().iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_valid_charge() {
        let result = run(&json_patch("/point/5/charge", r#"{"amount":300}"#), &RULES);
        assert!(result.is_success());
        assert_eq!(
            result.into_command(),
            Ok(Command::Charge {
                user_id: 5,
                amount: 300
            })
        );
    }

    #[test]
    fn test_valid_use_with_charset() {
        let req = request(
            Method::PATCH,
            "/point/5/use",
            Some("application/json; charset=utf-8"),
            r#"{"amount":1000}"#,
        );
        assert_eq!(
            run(&req, &RULES).into_command(),
            Ok(Command::Use {
                user_id: 5,
                amount: 1000
            })
        );
    }

    #[test]
    fn test_valid_get_point() {
        let req = request(Method::GET, "/point/12", None, "");
        assert_eq!(
            run(&req, &RULES).into_command(),
            Ok(Command::GetPoint { user_id: 12 })
        );
    }

    #[test]
    fn test_invalid_ids() {
        let paths = [
            "/point/0",
            "/point/-1",
            "/point/abc",
            "/point/1.5",
            "/point/99999999999999999999999",
        ];
        for path in paths {
            let result = run(&request(Method::GET, path, None, ""), &RULES);
            assert!(!result.is_success(), "{path} should fail");
            assert_eq!(fields(&result), vec!["id"], "{path}");
        }
    }

    #[test]
    fn test_id_must_fit_ledger_range() {
        let too_big = format!("/point/{}/charge", MAX_LEDGER_VALUE + 1);
        let result = run(&json_patch(&too_big, r#"{"amount":100}"#), &RULES);
        assert_eq!(fields(&result), vec!["id"]);

        let largest = format!("/point/{MAX_LEDGER_VALUE}/charge");
        let result = run(&json_patch(&largest, r#"{"amount":100}"#), &RULES);
        assert!(result.is_success());

        let max = run(&request(Method::GET, "/point/18446744073709551615", None, ""), &RULES);
        assert_eq!(fields(&max), vec!["id"]);
    }

    #[test]
    fn test_invalid_amounts() {
        let bodies = [
            r#"{"amount":0}"#,
            r#"{"amount":-500}"#,
            r#"{"amount":1.5}"#,
            r#"{"amount":"100"}"#,
            r#"{"amount":null}"#,
            r#"{"amount":1001}"#,
            r#"{"value":10}"#,
        ];
        for body in bodies {
            let result = run(&json_patch("/point/1/charge", body), &RULES);
            assert!(!result.is_success(), "{body} should fail");
            assert_eq!(fields(&result), vec!["amount"], "{body}");
        }
    }

    #[test]
    fn test_malformed_bodies() {
        for body in ["", "not json", "[1,2]", "42", r#"{"amount":"#] {
            let result = run(&json_patch("/point/1/use", body), &RULES);
            assert!(!result.is_success(), "{body:?} should fail");
            assert_eq!(fields(&result), vec!["body"], "{body:?}");
        }
    }

    #[test]
    fn test_collects_every_error() {
        let req = request(
            Method::PATCH,
            "/point/abc/charge",
            Some("text/plain"),
            r#"{"amount":-1}"#,
        );
        let result = run(&req, &RULES);
        assert_eq!(fields(&result), vec!["id", "content-type", "amount"]);
        assert!(result.into_command().is_err());
    }

    #[test]
    fn test_missing_content_type() {
        let req = request(Method::PATCH, "/point/1/charge", None, r#"{"amount":1}"#);
        assert_eq!(fields(&run(&req, &RULES)), vec!["content-type"]);
    }

    #[test]
    fn test_unknown_fields_denied_when_configured() {
        let rules = ValidationRules {
            deny_unknown_fields: true,
            ..RULES
        };
        let req = json_patch("/point/1/charge", r#"{"amount":10,"note":"gift"}"#);
        assert!(run(&req, &RULES).is_success());
        assert_eq!(fields(&run(&req, &rules)), vec!["note"]);
    }

    #[test]
    fn test_body_on_get_rejected() {
        let req = request(Method::GET, "/point/1", Some("application/json"), "{}");
        assert_eq!(fields(&run(&req, &RULES)), vec!["body"]);
    }

    #[test]
    fn test_missing_param_fails_closed() {
        let req = request(Method::GET, "/point", None, "");
        let result = validate(&req, Endpoint::GetPoint, &PathParams::default(), &RULES);
        assert!(!result.is_success());
        assert_eq!(fields(&result), vec!["id"]);
    }

    #[test]
    fn test_health_needs_nothing() {
        let req = request(Method::GET, "/healthz", None, "");
        assert_eq!(run(&req, &RULES).into_command(), Ok(Command::Health));
    }
}
