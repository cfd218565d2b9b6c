use std::time::Duration;

use anyhow::{Error, Result, bail};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use crate::core::CompletionSettings;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

/// One turn of a conversation. Order in a transcript is significant.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
            id: None,
        }
    }

    pub fn with_id(role: Role, content: &str, id: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
            id: Some(id.to_string()),
        }
    }
}

// The completion API only accepts role and content so client side
// ids are stripped before sending
#[derive(Serialize)]
struct UpstreamMessage<'a> {
    role: &'a Role,
    content: &'a str,
}

impl<'a> From<&'a Message> for UpstreamMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        Self {
            role: &msg.role,
            content: &msg.content,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("stream consumer went away before the completion finished")]
    Cancelled,
    #[error("completion stream ended without a finish marker")]
    Incomplete,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunkChoice {
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    // Usage chunks arrive with an empty list
    #[serde(default)]
    choices: Vec<CompletionChunkChoice>,
}

/// Sends a streaming chat completion request and returns the response
/// once headers are available. Non-success statuses (bad credential,
/// rate limiting) are returned as errors before any body is read.
pub async fn open_completion_stream(
    messages: &[Message],
    settings: &CompletionSettings,
) -> Result<reqwest::Response, Error> {
    let upstream_messages: Vec<UpstreamMessage> = messages.iter().map(Into::into).collect();
    let payload = json!({
        "model": settings.model,
        "messages": upstream_messages,
        "temperature": settings.temperature,
        "stream": true,
    });
    let url = format!(
        "{}/v1/chat/completions",
        settings.api_hostname.trim_end_matches("/")
    );
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(&settings.api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 5))
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Completion request failed with status {}: {}", status, body);
    }

    Ok(response)
}

/// Forwards each content delta of a streaming completion to `tx` in
/// the order received and returns the full text once the stream
/// signals it is done.
pub async fn relay_completion(
    response: reqwest::Response,
    tx: mpsc::Sender<String>,
) -> Result<String, Error> {
    let mut stream = response.bytes_stream();

    let mut content_buf = String::new();
    // Raw bytes are buffered because both SSE events and UTF-8
    // sequences can be split across network chunks
    let mut buffer: Vec<u8> = Vec::new();
    let mut finished = false;

    'outer: while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);

        while let Some((event_end, separator_len)) = find_event_end(&buffer) {
            let event: Vec<u8> = buffer.drain(..event_end + separator_len).collect();
            let event_data = std::str::from_utf8(&event[..event_end])?.trim();

            let Some(data) = event_data.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }

            if data == "[DONE]" {
                finished = true;
                break 'outer;
            }

            let chunk = serde_json::from_str::<CompletionChunk>(data).inspect_err(|e| {
                tracing::error!("Parsing completion chunk failed for {}\nError:{}", data, e)
            })?;
            let Some(choice) = chunk.choices.first() else {
                continue;
            };

            if let Some(content) = &choice.delta.content
                && !content.is_empty()
            {
                content_buf.push_str(content);
                if tx.send(content.clone()).await.is_err() {
                    return Err(StreamError::Cancelled.into());
                }
            }

            if choice.finish_reason.is_some() {
                finished = true;
                break 'outer;
            }
        }
    }

    if !finished {
        return Err(StreamError::Incomplete.into());
    }

    Ok(content_buf)
}

/// Position and length of the first blank line ending an event. Both
/// LF and CRLF line endings are valid SSE.
fn find_event_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n");
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(lf), Some(crlf)) if crlf < lf => Some((crlf, 4)),
        (Some(lf), _) => Some((lf, 2)),
        (None, Some(crlf)) => Some((crlf, 4)),
        (None, None) => None,
    }
}

/// Runs a streaming completion, forwarding deltas to `tx` and
/// returning the accumulated text.
pub async fn completion_stream(
    tx: mpsc::Sender<String>,
    messages: &[Message],
    settings: &CompletionSettings,
) -> Result<String, Error> {
    let response = open_completion_stream(messages, settings).await?;
    relay_completion(response, tx).await
}
