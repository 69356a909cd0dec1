//! Natural-language questions about the current job status.
//!
//! Only the compact digest is sent, never the raw Prow document.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::core::{JobSummary, build_digest};
use crate::error::AskError;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "\
You are a CI monitoring assistant for OpenShift vSphere periodic Prow jobs.
You will receive a compact status report and answer questions about it.
Be concise. Use data from the report. If asked about trends, use the RECENT \
column (most recent run first, S=success, F=failure, P=pending, A=aborted).
Failure rates are computed across all runs in the current dataset window.";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// The user message: digest wrapped in `<report>` tags, then the question.
pub fn build_prompt(digest: &str, question: &str) -> String {
    format!("<report>\n{digest}\n</report>\n\nQuestion: {question}")
}

/// Ask a question about `summaries`. Needs `ANTHROPIC_API_KEY`.
pub async fn ask(
    config: &AppConfig,
    summaries: &[JobSummary],
    question: &str,
    now: DateTime<Utc>,
) -> Result<String, AskError> {
    let api_key = std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(AskError::MissingApiKey)?;

    let digest = build_digest(summaries, now);
    debug!(digest_bytes = digest.len(), model = %config.llm_model, "Asking model");

    let request = MessagesRequest {
        model: &config.llm_model,
        max_tokens: config.llm_max_tokens,
        system: SYSTEM_PROMPT,
        messages: vec![Message {
            role: "user",
            content: build_prompt(&digest, question),
        }],
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;
    let response = client
        .post(API_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AskError::Status {
            status: status.as_u16(),
            body,
        });
    }

    answer_text(response.json().await?)
}

/// Concatenate the text blocks of a reply. Non-text blocks are skipped.
fn answer_text(response: MessagesResponse) -> Result<String, AskError> {
    let answer: String = response.content.into_iter().filter_map(|b| b.text).collect();
    if answer.is_empty() {
        return Err(AskError::EmptyResponse);
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wraps_digest() {
        let prompt = build_prompt("REPORT", "What is failing?");
        assert_eq!(prompt, "<report>\nREPORT\n</report>\n\nQuestion: What is failing?");
    }

    fn reply(json: &str) -> MessagesResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn response_text_blocks_are_concatenated() {
        let parsed = reply(
            r#"{"content":[{"type":"text","text":"a"},{"type":"tool_use"},{"type":"text","text":"b"}]}"#,
        );
        assert_eq!(answer_text(parsed).unwrap(), "ab");
    }

    #[test]
    fn reply_without_text_is_empty_response() {
        for json in [r#"{"content":[]}"#, r#"{}"#, r#"{"content":[{"type":"tool_use"}]}"#] {
            assert!(matches!(
                answer_text(reply(json)),
                Err(AskError::EmptyResponse)
            ));
        }
    }
}
