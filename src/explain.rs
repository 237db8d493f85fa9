//! Free-text answers about an analyzed molecule.
//!
//! [`ExplanationService`] is the capability; [`GeminiService`] calls the
//! hosted Gemini `generateContent` endpoint and [`DisabledService`] stands
//! in when no backend is configured. Failures here are reported in the
//! analysis report and never abort the pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ExplanationConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum ExplanationError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
    #[error("explanation service unavailable: {0}")]
    Disabled(String),
}

/// Request URLs never reach error text.
impl From<reqwest::Error> for ExplanationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }
}

pub trait ExplanationService: Send + Sync {
    /// Answer `question` given the analysis `context`.
    fn generate(&self, context: &str, question: &str) -> Result<String, ExplanationError>;
}

/// Context block handed to the service alongside the question.
pub fn build_context(smiles: &str, properties: &str, toxicity: &str) -> String {
    format!(
        "Analysis for molecule with SMILES: {smiles}\n\n{properties}\n\n{toxicity}\n\n\
         Please consider all the above information when answering the following question."
    )
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!("{context}\n\nQuestion: {question}")
}

#[derive(Debug, Clone)]
pub struct DisabledService {
    reason: String,
}

impl DisabledService {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl ExplanationService for DisabledService {
    fn generate(&self, _context: &str, _question: &str) -> Result<String, ExplanationError> {
        Err(ExplanationError::Disabled(self.reason.clone()))
    }
}

#[derive(Clone)]
pub struct GeminiService {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl GeminiService {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExplanationError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            model: model.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Reads the API key from the variable named by `api_key_env`.
    pub fn from_config(config: &ExplanationConfig) -> Result<Self, ExplanationError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExplanationError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(
            config.base_url.as_str(),
            config.model.as_str(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

impl std::fmt::Debug for GeminiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiService")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ExplanationService for GeminiService {
    fn generate(&self, context: &str, question: &str) -> Result<String, ExplanationError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(context, question) }] }]
        });
        debug!(model = %self.model, "requesting explanation");
        let resp = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()?;
        let status = resp.status().as_u16();
        let reply: Value = resp
            .json()
            .map_err(|e| ExplanationError::Malformed(e.to_string()))?;
        if status >= 400 {
            let message = reply["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error")
                .to_owned();
            warn!(status, %message, "explanation request rejected");
            return Err(ExplanationError::Status { status, message });
        }
        reply["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| ExplanationError::Malformed("no candidate text in reply".to_owned()))
    }
}

/// Service for `config`: Gemini when enabled and keyed, otherwise disabled.
pub fn service_from_config(config: &ExplanationConfig) -> Arc<dyn ExplanationService> {
    if !config.enabled {
        return Arc::new(DisabledService::new("disabled in configuration"));
    }
    match GeminiService::from_config(config) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            warn!(error = %e, "explanation service not available");
            Arc::new(DisabledService::new(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    struct Captured {
        request_line: String,
        api_key: Option<String>,
        body: String,
    }

    /// Serve one HTTP response and hand back what was received.
    fn one_shot(status: &str, reply: &str) -> (String, thread::JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
            reply.len()
        );
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut length = 0;
            let mut api_key = None;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" {
                    break;
                }
                let (name, value) = line.split_once(':').unwrap();
                match name.to_ascii_lowercase().as_str() {
                    "content-length" => length = value.trim().parse().unwrap(),
                    API_KEY_HEADER => api_key = Some(value.trim().to_owned()),
                    _ => {}
                }
            }
            let mut body = vec![0; length];
            reader.read_exact(&mut body).unwrap();
            reader.get_mut().write_all(response.as_bytes()).unwrap();
            Captured {
                request_line,
                api_key,
                body: String::from_utf8(body).unwrap(),
            }
        });
        (url, handle)
    }

    fn service(url: &str) -> GeminiService {
        GeminiService::new(url, "gemini-1.5-flash", "test-key", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn context_layout() {
        let ctx = build_context("CCO", "props", "tox");
        assert_eq!(
            ctx,
            "Analysis for molecule with SMILES: CCO\n\nprops\n\ntox\n\n\
             Please consider all the above information when answering the following question."
        );
        assert!(build_prompt(&ctx, "Is it safe?").ends_with("question.\n\nQuestion: Is it safe?"));
    }

    #[test]
    fn gemini_request_and_reply() {
        let (url, server) = one_shot(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"Ethanol is a small alcohol."}]}}]}"#,
        );
        let answer = service(&url).generate("context", "What is it?").unwrap();
        assert_eq!(answer, "Ethanol is a small alcohol.");

        let request = server.join().unwrap();
        assert!(request
            .request_line
            .starts_with("POST /v1beta/models/gemini-1.5-flash:generateContent "));
        assert_eq!(request.api_key.as_deref(), Some("test-key"));
        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            "context\n\nQuestion: What is it?"
        );
    }

    #[test]
    fn http_errors_carry_the_api_message() {
        let (url, server) = one_shot("403 Forbidden", r#"{"error":{"message":"API key not valid"}}"#);
        let err = service(&url).generate("c", "q").unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, ExplanationError::Status { status: 403, ref message } if message == "API key not valid"));
    }

    #[test]
    fn replies_without_text_are_malformed() {
        let (url, server) = one_shot("200 OK", r#"{"candidates":[]}"#);
        let err = service(&url).generate("c", "q").unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, ExplanationError::Malformed(_)));
    }

    #[test]
    fn unreachable_service_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let err = service(&url).generate("c", "q").unwrap_err();
        assert!(matches!(err, ExplanationError::Transport(_)));
    }

    #[test]
    fn transport_errors_never_carry_the_key() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let secret = "SECRET_KEY_123";
        let err = GeminiService::new(&url, "m", secret, Duration::from_secs(2))
            .unwrap()
            .generate("c", "q")
            .unwrap_err();
        let mut text = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            text.push_str(&inner.to_string());
            source = std::error::Error::source(inner);
        }
        assert!(!text.contains(secret), "{text}");
        assert!(!format!("{err:?}").contains(secret));
        let service = GeminiService::new(&url, "m", secret, Duration::from_secs(2)).unwrap();
        assert!(!format!("{service:?}").contains(secret));
    }

    #[test]
    fn missing_key_disables_the_service() {
        let config = ExplanationConfig {
            api_key_env: "MOLTOX_TEST_KEY_THAT_IS_NEVER_SET".to_owned(),
            ..ExplanationConfig::default()
        };
        assert!(matches!(
            GeminiService::from_config(&config),
            Err(ExplanationError::MissingApiKey(_))
        ));
        let err = service_from_config(&config).generate("c", "q").unwrap_err();
        assert!(err.to_string().contains("MOLTOX_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn disabled_by_config() {
        let config = ExplanationConfig {
            enabled: false,
            ..ExplanationConfig::default()
        };
        let err = service_from_config(&config).generate("c", "q").unwrap_err();
        assert!(matches!(err, ExplanationError::Disabled(_)));
    }
}
