mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

/// Issues a GET through `client` and decodes the body as a JSON array.
///
/// A non-2xx status is an error carrying the status and the response body.
pub async fn fetch_json_list<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<Value>> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid url '{url}'"))?,
    );

    let resp = client
        .execute(req)
        .await
        .map_err(|e| anyhow!("Failed to send request to {}: {}", url, e))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("{} returned status {}: {}", url, status, body));
    }

    let json: Value = resp
        .json()
        .await
        .map_err(|e| anyhow!("Failed to parse response from {}: {}", url, e))?;

    match json {
        Value::Array(items) => Ok(items),
        other => Err(anyhow!(
            "{} returned {} instead of a JSON array",
            url,
            kind(&other)
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
