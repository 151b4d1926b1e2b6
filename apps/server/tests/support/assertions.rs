use anyhow::Context as _;
use axum::http::StatusCode;
use serde_json::Value;

/// Ids of the data points in a search response, in response order.
pub fn data_point_ids(body: &Value) -> anyhow::Result<Vec<String>> {
    body.as_array()
        .context("response is a JSON array")?
        .iter()
        .map(|dp| {
            dp.pointer("/header/id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .context("data point has header.id")
        })
        .collect()
}

/// Assert an error response carries the given status and error code.
pub fn assert_error(status: StatusCode, body: &Value, expected: StatusCode, code: &str) {
    assert_eq!(status, expected, "unexpected status, body: {body}");
    assert_eq!(
        body.pointer("/error/code").and_then(Value::as_str),
        Some(code),
        "unexpected error code, body: {body}"
    );
}
