use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Error, Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::{Value, json};

use super::KvStore;

/// Redis over HTTP, as served by Vercel KV and Upstash. Each command
/// is POSTed as a JSON array and answered with `{"result": ...}` or
/// `{"error": "..."}`.
pub struct RestKvStore {
    url: String,
    token: String,
    client: reqwest::Client,
}

impl RestKvStore {
    pub fn new(url: &str, token: &str) -> Self {
        Self {
            url: url.trim_end_matches("/").to_string(),
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn command(&self, args: Vec<Value>) -> Result<Value, Error> {
        let name = args
            .first()
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string();
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .timeout(Duration::from_secs(10))
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        let mut body: Value = response.json().await?;

        if let Some(err) = body["error"].as_str() {
            bail!("KV command {} failed: {}", name, err);
        }
        if !status.is_success() {
            bail!("KV command {} failed with status {}", name, status);
        }

        Ok(body["result"].take())
    }
}

fn as_strings(result: Value) -> Result<Vec<String>, Error> {
    let Value::Array(items) = result else {
        if result.is_null() {
            return Ok(Vec::new());
        }
        bail!("Expected an array result, got {}", result);
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            other => Err(anyhow!("Expected a string item, got {}", other)),
        })
        .collect()
}

#[async_trait]
impl KvStore for RestKvStore {
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<(), Error> {
        let mut args = vec![json!("HSET"), json!(key)];
        for (field, value) in fields {
            args.push(json!(field));
            args.push(json!(value));
        }
        self.command(args).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, Error> {
        let flat = as_strings(self.command(vec![json!("HGETALL"), json!(key)]).await?)?;
        let mut fields = HashMap::new();
        let mut iter = flat.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            fields.insert(field, value);
        }
        Ok(fields)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), Error> {
        self.command(vec![json!("ZADD"), json!(key), json!(score), json!(member)])
            .await?;
        Ok(())
    }

    async fn zrevrange(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, Error> {
        as_strings(
            self.command(vec![
                json!("ZREVRANGE"),
                json!(key),
                json!(start),
                json!(stop),
            ])
            .await?,
        )
    }
}
