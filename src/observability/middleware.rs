use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::record_http_request;

/// Records count and latency of every HTTP request.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());

    response
}

/// Collapses numeric, date and UUID path segments so that label cardinality
/// stays bounded.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if (seg.len() == 36 && seg.contains('-')) || seg.parse::<i64>().is_ok() {
                ":id"
            } else if chrono::NaiveDate::parse_from_str(seg, "%Y-%m-%d").is_ok() {
                ":date"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_voucher_paths() {
        assert_eq!(
            normalize_path("/api/v1/reports/disbursement-voucher/5/2024/3/15"),
            "/api/v1/reports/disbursement-voucher/:id/:id/:id/:id"
        );
        assert_eq!(
            normalize_path("/api/v1/reports/disbursement-voucher/5/2024/3"),
            "/api/v1/reports/disbursement-voucher/:id/:id/:id"
        );
    }

    #[test]
    fn test_normalize_keeps_static_segments() {
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/items/2024-03-15"), "/items/:date");
        assert_eq!(
            normalize_path("/users/550e8400-e29b-41d4-a716-446655440000"),
            "/users/:id"
        );
    }
}
