//! Remote plausibility check of the header row.
//!
//! The model is asked for a `{"valid": bool, "reason": string}` object. Any
//! rejection marker in the reply fails the header, whether or not such an
//! object is present. Failures of the remote call never escape
//! [`HeaderChecker::check`]; they become a failed verdict.

use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::HeaderCheckConfig;
use crate::error::ConvertError;
use crate::models::{
    ChatMessage, ChatRequest, ChatResponse, HeaderVerdict, StructuredVerdict,
};

const ERROR_BODY_PREVIEW: usize = 200;

/// Text in, text out access to a chat-completion model.
pub trait ChatCompletion {
    /// # Errors
    /// Returns [`ConvertError::RemoteCall`] on transport failure, a
    /// non-success status, or a reply without message content.
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ConvertError>;
}

/// OpenAI-compatible chat-completions client.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
}

impl HttpChatClient {
    /// # Errors
    /// Returns [`ConvertError::InvalidConfig`] for a missing or malformed
    /// endpoint and [`ConvertError::RemoteCall`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &HeaderCheckConfig) -> Result<Self, ConvertError> {
        let endpoint = config.endpoint_url()?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

fn preview(body: &str) -> String {
    let mut preview = body.chars().take(ERROR_BODY_PREVIEW).collect::<String>();
    if body.chars().count() > ERROR_BODY_PREVIEW {
        preview.push_str("...");
    }
    preview
}

impl ChatCompletion for HttpChatClient {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ConvertError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
        };

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(ConvertError::RemoteCall(format!(
                "chat endpoint returned status {status}: {}",
                preview(&body)
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|error| {
            ConvertError::RemoteCall(format!("malformed chat response: {error}"))
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ConvertError::RemoteCall("chat response has no message content".to_string())
            })
    }
}

pub fn build_prompt(names: &[String]) -> String {
    format!(
        "The following column names were extracted by OCR from a table image: {names:?}. \
         Do these column names make sense? If they do not, point out the problem and \
         suggest corrections."
    )
}

fn parse_structured(reply: &str) -> Option<StructuredVerdict> {
    let fenced_re =
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("hardcoded fenced JSON regex is valid");
    if let Some(capture) = fenced_re.captures(reply).and_then(|capture| capture.get(1)) {
        if let Ok(verdict) = serde_json::from_str(capture.as_str()) {
            return Some(verdict);
        }
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

fn contains_marker(reply: &str, invalid_markers: &[String]) -> bool {
    let lowered = reply.to_lowercase();
    invalid_markers
        .iter()
        .filter(|marker| !marker.is_empty())
        .any(|marker| lowered.contains(&marker.to_lowercase()))
}

/// Classifies a model reply. A reply is valid only when its structured
/// verdict (if any) says so and no rejection marker appears anywhere in it.
pub fn classify_reply(reply: &str, invalid_markers: &[String]) -> HeaderVerdict {
    let flagged = contains_marker(reply, invalid_markers);
    match parse_structured(reply) {
        Some(verdict) => {
            let message = if verdict.reason.trim().is_empty() {
                reply.trim().to_string()
            } else {
                verdict.reason
            };
            HeaderVerdict {
                valid: verdict.valid && !flagged,
                message,
            }
        }
        None => HeaderVerdict {
            valid: !flagged,
            message: reply.trim().to_string(),
        },
    }
}

pub struct HeaderChecker<C> {
    client: C,
    system_prompt: String,
    invalid_markers: Vec<String>,
}

impl<C: ChatCompletion> HeaderChecker<C> {
    pub fn new(client: C, config: &HeaderCheckConfig) -> Self {
        Self {
            client,
            system_prompt: config.system_prompt.clone(),
            invalid_markers: config.invalid_markers.clone(),
        }
    }

    /// Asks the model whether `header` reads like sensible column names.
    /// The row is sent as-is, padding cells included.
    pub fn check(&self, header: &[String]) -> HeaderVerdict {
        if header.is_empty() {
            return HeaderVerdict::pass("no column names detected");
        }

        let prompt = build_prompt(header);
        debug!(columns = header.len(), "requesting header plausibility check");
        match self.client.complete(&self.system_prompt, &prompt) {
            Ok(reply) => classify_reply(&reply, &self.invalid_markers),
            Err(error) => {
                warn!(%error, "header plausibility check failed");
                HeaderVerdict::fail(format!("header check failed: {}", error.message()))
            }
        }
    }
}
