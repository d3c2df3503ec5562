//! Route table module
//!
//! A fixed list of `(method, pattern, endpoint)` entries checked in order.

use hyper::Method;

use super::matcher::{PathParams, PathPattern};
use crate::config::HealthConfig;

/// What a matched route dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    GetPoint,
    GetHistories,
    Charge,
    Use,
    Health,
}

impl Endpoint {
    /// Endpoints that take a JSON body
    pub const fn expects_body(self) -> bool {
        matches!(self, Self::Charge | Self::Use)
    }
}

/// One routing rule
#[derive(Debug, Clone)]
struct Route {
    method: Method,
    pattern: PathPattern,
    endpoint: Endpoint,
}

/// Outcome of resolving a request against the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched {
        endpoint: Endpoint,
        params: PathParams,
    },
    /// The path exists but not for this method
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// Ordered route table
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(health: &HealthConfig) -> Self {
        let mut table = Self { routes: Vec::new() };
        table.add(Method::GET, "/point/{id}", Endpoint::GetPoint);
        table.add(Method::GET, "/point/{id}/histories", Endpoint::GetHistories);
        table.add(Method::PATCH, "/point/{id}/charge", Endpoint::Charge);
        table.add(Method::PATCH, "/point/{id}/use", Endpoint::Use);

        if health.enabled {
            table.add(Method::GET, &health.liveness_path, Endpoint::Health);
            table.add(Method::GET, &health.readiness_path, Endpoint::Health);
        }
        table
    }

    fn add(&mut self, method: Method, pattern: &str, endpoint: Endpoint) {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            endpoint,
        });
    }

    /// Find the route for `method` + `path`
    ///
    /// `HEAD` is served by `GET` routes; hyper drops the body on the way out.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        let mut allowed = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            let serves = route.method == *method
                || (route.method == Method::GET && method == Method::HEAD);
            if serves {
                return Resolution::Matched {
                    endpoint: route.endpoint,
                    params,
                };
            }
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
                if route.method == Method::GET {
                    allowed.push(Method::HEAD);
                }
            }
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(&HealthConfig::default())
    }

    fn endpoint_of(res: Resolution) -> Option<Endpoint> {
        match res {
            Resolution::Matched { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }

    #[test]
    fn test_resolve_endpoints() {
        let t = table();
        assert_eq!(endpoint_of(t.resolve(&Method::GET, "/point/1")), Some(Endpoint::GetPoint));
        assert_eq!(
            endpoint_of(t.resolve(&Method::GET, "/point/1/histories")),
            Some(Endpoint::GetHistories)
        );
        assert_eq!(
            endpoint_of(t.resolve(&Method::PATCH, "/point/1/charge")),
            Some(Endpoint::Charge)
        );
        assert_eq!(endpoint_of(t.resolve(&Method::PATCH, "/point/1/use")), Some(Endpoint::Use));
        assert_eq!(endpoint_of(t.resolve(&Method::GET, "/healthz")), Some(Endpoint::Health));
        assert_eq!(endpoint_of(t.resolve(&Method::GET, "/readyz")), Some(Endpoint::Health));
    }

    #[test]
    fn test_resolve_captures_id() {
        let Resolution::Matched { params, .. } = table().resolve(&Method::PATCH, "/point/77/use")
        else {
            panic!("expected a match");
        };
        assert_eq!(params.get("id"), Some("77"));
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        assert_eq!(table().resolve(&Method::GET, "/unknown"), Resolution::NotFound);
        assert_eq!(table().resolve(&Method::GET, "/point/1/charge/x"), Resolution::NotFound);
    }

    #[test]
    fn test_wrong_method_lists_allowed() {
        assert_eq!(
            table().resolve(&Method::POST, "/point/1/charge"),
            Resolution::MethodNotAllowed {
                allowed: vec![Method::PATCH]
            }
        );
        assert_eq!(
            table().resolve(&Method::DELETE, "/point/1"),
            Resolution::MethodNotAllowed {
                allowed: vec![Method::GET, Method::HEAD]
            }
        );
    }

    #[test]
    fn test_head_follows_get_routes() {
        let t = table();
        assert_eq!(endpoint_of(t.resolve(&Method::HEAD, "/point/3")), Some(Endpoint::GetPoint));
        assert_eq!(endpoint_of(t.resolve(&Method::HEAD, "/healthz")), Some(Endpoint::Health));
        assert_eq!(
            t.resolve(&Method::HEAD, "/point/3/use"),
            Resolution::MethodNotAllowed {
                allowed: vec![Method::PATCH]
            }
        );
    }

    #[test]
    fn test_health_routes_can_be_disabled() {
        let health = HealthConfig {
            enabled: false,
            ..HealthConfig::default()
        };
        let t = RouteTable::new(&health);
        assert_eq!(t.resolve(&Method::GET, "/healthz"), Resolution::NotFound);
        assert_eq!(t.resolve(&Method::GET, "/readyz"), Resolution::NotFound);
        assert_eq!(t.routes.len(), 4);
    }
}
