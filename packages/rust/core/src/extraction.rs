//! Parameter extraction through the OpenRouter chat-completions API.
//!
//! The report text is wrapped in an extraction prompt and sent as a single
//! user message. The model's reply is unwrapped from any Markdown code fence,
//! parsed as a JSON object of parameter values, and the fixed overrides are
//! applied before the set is handed back.

use std::future::Future;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use simreport_shared::schema::{
    BEAM_COUNT, DECLINATION_ANGLE, EXTRACTED_PARAMETERS, INCLINATION_ANGLE, STRAND_COUNT,
    WORK_DONE,
};
use simreport_shared::{OpenRouterConfig, ParameterSet, Result, SimReportError};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("simreport/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body quoted in an error message.
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Values forced onto every extracted set, whatever the model returned.
pub const PARAMETER_OVERRIDES: [(&str, f64); 4] = [
    (STRAND_COUNT, 6.0),
    (BEAM_COUNT, 2.0),
    (INCLINATION_ANGLE, 0.0),
    (DECLINATION_ANGLE, 0.0),
];

// ---------------------------------------------------------------------------
// ParameterSource
// ---------------------------------------------------------------------------

/// Turns report text into a [`ParameterSet`].
pub trait ParameterSource: Send + Sync {
    fn extract(&self, report_text: &str) -> impl Future<Output = Result<ParameterSet>> + Send;
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Settings for [`OpenRouterSource`].
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// API root; `/chat/completions` is appended.
    pub base_url: Url,
    pub api_key: String,
    /// OpenRouter model ID, e.g. `anthropic/claude-3-opus`.
    pub model_id: String,
    pub timeout_secs: u64,
    /// Report text is cut to this many characters before prompting.
    pub max_report_chars: usize,
}

impl ExtractionConfig {
    pub fn new(openrouter: &OpenRouterConfig, api_key: String) -> Self {
        Self {
            base_url: openrouter.base_url.clone(),
            api_key,
            model_id: openrouter.default_model.clone(),
            timeout_secs: openrouter.timeout_secs,
            max_report_chars: openrouter.max_report_chars,
        }
    }
}

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// OpenRouterSource
// ---------------------------------------------------------------------------

/// [`ParameterSource`] backed by an OpenRouter chat model.
pub struct OpenRouterSource {
    client: Client,
    endpoint: String,
    config: ExtractionConfig,
}

impl OpenRouterSource {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SimReportError::config(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.as_str().trim_end_matches('/')
        );

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.config.model_id
    }
}

impl ParameterSource for OpenRouterSource {
    #[instrument(skip_all, fields(model = %self.config.model_id, chars = report_text.len()))]
    async fn extract(&self, report_text: &str) -> Result<ParameterSet> {
        let prompt = build_prompt(truncate_chars(report_text, self.config.max_report_chars));
        let request = ChatRequest {
            model: &self.config.model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SimReportError::Extraction(format!("OpenRouter request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SimReportError::Extraction(format!(
                "OpenRouter returned HTTP {status}: {}",
                truncate_chars(&body, ERROR_BODY_PREVIEW_CHARS)
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            SimReportError::Extraction(format!("malformed OpenRouter response: {e}"))
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                SimReportError::Extraction("OpenRouter response contained no message".into())
            })?;
        debug!(reply_chars = content.len(), "received model reply");

        let mut params = parse_parameters(&content)?;
        apply_overrides(&mut params);

        info!(
            params = params.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "extracted parameters from report"
        );
        Ok(params)
    }
}

// ---------------------------------------------------------------------------
// Prompt and reply handling
// ---------------------------------------------------------------------------

/// The extraction prompt for one report.
pub fn build_prompt(report_text: &str) -> String {
    let vocabulary = EXTRACTED_PARAMETERS
        .into_iter()
        .chain([WORK_DONE])
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Task: Extract specific engineering parameters from the following ANSYS report and \
format them into values only.

Extract values for:
{vocabulary}.

Formatting Rules:
- Return the results as a JSON object with parameter names as keys and values as \
floating-point numbers or strings.
- Use scientific notation when appropriate (e.g., 1.017e-9).
- Mark missing data as null.
- Apply these manual overrides:
    - {STRAND_COUNT} = 6
    - {BEAM_COUNT} = 2
    - Angle of Inclination/Declination = 0
- Format Reaction Forces as a nested array, e.g., [[0,850,0],[0,850,0]].

ANSYS REPORT (extracted from PDF):
{report_text}

Output JSON format only, no explanations or additional text:
"
    )
}

/// Parse a model reply into parameters.
///
/// A fenced block (```` ```json ```` or bare ```` ``` ````) is unwrapped
/// first; otherwise the whole reply is parsed.
pub fn parse_parameters(reply: &str) -> Result<ParameterSet> {
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid regex"));

    let json = FENCE_RE
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map_or(reply, |m| m.as_str())
        .trim();

    serde_json::from_str(json)
        .map_err(|e| SimReportError::parse(format!("model reply is not a JSON parameter object: {e}")))
}

/// Force the fixed override values onto `params`.
pub fn apply_overrides(params: &mut ParameterSet) {
    for (key, value) in PARAMETER_OVERRIDES {
        params.insert(key, value);
    }
}

/// The first `max_chars` characters of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
