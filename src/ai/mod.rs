mod gemini;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

pub use gemini::GeminiClient;

/// A generative text model.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Free text completion.
    async fn generate_text(&self, prompt: &str) -> anyhow::Result<String>;
    /// Completion constrained to a JSON document.
    async fn generate_json(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Removes ```json / ``` fences a model wraps around JSON output.
pub fn strip_code_fences(raw: &str) -> String {
    lazy_static! {
        static ref FENCE_RE: Regex = Regex::new(r"```(?:json|JSON)?\n?|\n?```").unwrap();
    }
    FENCE_RE.replace_all(raw, "").trim().to_string()
}

/// Outermost `{ ... }` span, for answers with prose around the JSON.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parses model output as `T`: fences stripped first, then the outermost
/// object tried when the whole text does not parse.
pub fn parse_model_json<T: serde::de::DeserializeOwned>(raw: &str) -> anyhow::Result<T> {
    let clean = strip_code_fences(raw);
    match serde_json::from_str::<T>(&clean) {
        Ok(v) => Ok(v),
        Err(first) => {
            let Some(span) = extract_json_object(&clean) else {
                anyhow::bail!("no JSON object in model response: {first}");
            };
            serde_json::from_str::<T>(span)
                .map_err(|e| anyhow::anyhow!("could not parse model response: {e}"))
        }
    }
}

/// Model used when no API key is configured; every call fails so callers
/// take their degraded path.
pub struct UnconfiguredModel;

#[async_trait]
impl TextModel for UnconfiguredModel {
    async fn generate_text(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("generative model is not configured")
    }
    async fn generate_json(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("generative model is not configured")
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;

    /// Replays canned responses and counts calls.
    #[derive(Default)]
    pub struct ScriptedModel {
        responses: Mutex<Vec<anyhow::Result<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<anyhow::Result<String>>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted response left")))
        }
    }

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn generate_text(&self, _prompt: &str) -> anyhow::Result<String> {
            self.next()
        }
        async fn generate_json(&self, _prompt: &str) -> anyhow::Result<String> {
            self.next()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn strips_json_fences() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn parses_object_wrapped_in_prose() {
        let raw = "Here is your plan:\n{\"Monday\": \"Run\"}\nEnjoy!";
        let v: Value = parse_model_json(raw).unwrap();
        assert_eq!(v["Monday"], "Run");
    }

    #[test]
    fn rejects_text_without_json() {
        let err = parse_model_json::<Value>("sorry, I cannot help").unwrap_err();
        assert!(err.to_string().contains("no JSON object"));
    }

    #[tokio::test]
    async fn unconfigured_model_always_fails() {
        assert!(UnconfiguredModel.generate_json("x").await.is_err());
        assert!(UnconfiguredModel.generate_text("x").await.is_err());
    }
}
