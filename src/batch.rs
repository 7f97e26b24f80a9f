//! Batch executor: heterogeneous sub-operations in one call.
//!
//! Sub-operations run sequentially in submitted order through the same
//! pipelines as the direct endpoints. There is no atomicity across the
//! batch: a failed slot reports inline and the rest keep running. The
//! whole batch is audited once.

use crate::error::{ApiError, Result};
use crate::policy::Identity;
use crate::routes::posts::{apply_delete, apply_update, fetch_post, UpdateBody};
use crate::state::AppState;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Hard cap; exceeding it fails the batch before any sub-operation runs
pub const MAX_BATCH_OPS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub operations: Vec<BatchOperation>,
}

#[derive(Debug, Deserialize)]
pub struct BatchOperation {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub body: Value,
}

#[derive(Debug, Serialize)]
pub struct BatchSlot {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchSlot>,
    pub summary: BatchSummary,
}

/// "/post/{id}" for the supported sub-operation shapes
fn parse_post_path(path: &str) -> Option<u64> {
    path.trim_end_matches('/')
        .strip_prefix("/post/")?
        .parse()
        .ok()
}

async fn run_operation(
    state: &AppState,
    identity: &Identity,
    op: &BatchOperation,
) -> Result<Value> {
    let id = parse_post_path(&op.path)
        .ok_or_else(|| ApiError::bad_request(format!("Unsupported path: {}", op.path)))?;
    match op.method.to_ascii_uppercase().as_str() {
        "GET" => {
            let post = fetch_post(state, identity, id).await?;
            state.engine.full_post(&post).await
        }
        "POST" | "PUT" | "PATCH" => {
            let body: UpdateBody = if op.body.is_null() {
                UpdateBody::default()
            } else {
                serde_json::from_value(op.body.clone())?
            };
            let (full, _) = apply_update(state, identity, id, body).await?;
            Ok(full)
        }
        "DELETE" => {
            let hard = op
                .body
                .get("force")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            apply_delete(state, identity, id, hard).await
        }
        other => Err(ApiError::bad_request(format!(
            "Unsupported method: {other}"
        ))),
    }
}

/// Run a batch. Pre-checks reject empty and oversized batches wholesale;
/// after that, each slot succeeds or fails on its own.
pub async fn execute(
    state: &AppState,
    identity: &Identity,
    request: &BatchRequest,
) -> Result<BatchResponse> {
    if request.operations.is_empty() {
        return Err(ApiError::NoOperations);
    }
    if request.operations.len() > MAX_BATCH_OPS {
        return Err(ApiError::TooManyOperations(MAX_BATCH_OPS));
    }

    let mut results = Vec::with_capacity(request.operations.len());
    let mut success = 0usize;
    for op in &request.operations {
        match run_operation(state, identity, op).await {
            Ok(data) => {
                success += 1;
                results.push(BatchSlot {
                    success: true,
                    data: Some(data),
                    error: None,
                });
            }
            Err(e) => {
                results.push(BatchSlot {
                    success: false,
                    data: None,
                    error: Some(json!({ "code": e.code(), "message": e.to_string() })),
                });
            }
        }
    }

    let total = request.operations.len();
    Ok(BatchResponse {
        results,
        summary: BatchSummary {
            total,
            success,
            errors: total - success,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_path() {
        assert_eq!(parse_post_path("/post/42"), Some(42));
        assert_eq!(parse_post_path("/post/42/"), Some(42));
        assert_eq!(parse_post_path("/posts/article"), None);
        assert_eq!(parse_post_path("/post/abc"), None);
    }
}
