use serde_json::{json, Value};

use super::{
    http_client, AiError, AiRequest, AiResponse, LlmProvider, DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM,
    DEFAULT_TEMPERATURE,
};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str) -> Self {
        AnthropicProvider {
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn body(&self, req: &AiRequest) -> Value {
        let system = if req.system.is_empty() {
            DEFAULT_SYSTEM
        } else {
            req.system.as_str()
        };
        json!({
            "model": self.model,
            "max_tokens": req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "system": system,
            "messages": [{"role": "user", "content": req.prompt}]
        })
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn complete(&self, req: &AiRequest) -> Result<AiResponse, AiError> {
        let client = http_client()?;

        let resp = client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&self.body(req))
            .send()
            .map_err(|e| AiError(format!("Anthropic request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(AiError(format!("Anthropic returned {}: {}", status, text)));
        }

        let json: Value = resp
            .json()
            .map_err(|e| AiError(format!("Anthropic JSON parse error: {}", e)))?;

        Ok(AiResponse {
            text: response_text(&json),
            provider: self.name().into(),
            model: self.model.clone(),
        })
    }
}

/// Text of the first content block.
fn response_text(json: &Value) -> String {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_puts_system_at_top_level() {
        let p = AnthropicProvider::new("k", "claude-3-5-sonnet-20240620");
        let body = p.body(&AiRequest {
            system: "Return strict JSON only.".into(),
            prompt: "brief".into(),
            max_tokens: Some(4000),
            temperature: None,
        });
        assert_eq!(body["system"], "Return strict JSON only.");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"].as_array().map(|m| m.len()), Some(1));
    }

    #[test]
    fn extracts_first_text_block() {
        let v = json!({"content": [{"type": "text", "text": "hello"}]});
        assert_eq!(response_text(&v), "hello");
        assert_eq!(response_text(&json!({"content": []})), "");
    }
}
