//! Test fixtures for creating test data.
//!
//! Entries are created through the HTTP API so every fixture exercises the
//! same path a client would.

use queue_core::domains::catalog::models::sample_items;
use serde_json::{json, Value};

use super::TestHarness;

/// `item_ref` of the n-th sample catalog item.
pub fn sample_ref(n: usize) -> String {
    sample_items()[n].id.to_string()
}

/// Append the n-th sample item and return the created entry.
pub async fn add_sample(ctx: &TestHarness, n: usize) -> Value {
    add_entry(ctx, json!({ "item_ref": sample_ref(n) })).await
}

/// Create an entry from a raw request body, asserting success.
pub async fn add_entry(ctx: &TestHarness, body: Value) -> Value {
    let response = ctx.post("/api/queue", body).await;
    assert_eq!(
        response.status,
        201,
        "unexpected create response: {}",
        response.body
    );
    response.body
}

/// Entry ids in listing order.
pub fn ids(entries: &Value) -> Vec<String> {
    entries
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|e| e["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn id_of(entry: &Value) -> String {
    entry["id"].as_str().unwrap_or_default().to_string()
}
