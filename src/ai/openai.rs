use serde_json::{json, Value};

use super::{
    http_client, AiError, AiRequest, AiResponse, LlmProvider, DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM,
    DEFAULT_TEMPERATURE,
};

pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Self {
        let base_url = if base_url.is_empty() {
            "https://api.openai.com/v1".to_string()
        } else {
            base_url.trim_end_matches('/').to_string()
        };
        OpenAiProvider {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url,
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
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": req.prompt}
            ],
            "max_tokens": req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": req.temperature.unwrap_or(DEFAULT_TEMPERATURE)
        })
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn complete(&self, req: &AiRequest) -> Result<AiResponse, AiError> {
        let url = format!("{}/chat/completions", self.base_url);
        let client = http_client()?;

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.body(req))
            .send()
            .map_err(|e| AiError(format!("OpenAI request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(AiError(format!("OpenAI returned {}: {}", status, text)));
        }

        let json: Value = resp
            .json()
            .map_err(|e| AiError(format!("OpenAI JSON parse error: {}", e)))?;

        Ok(AiResponse {
            text: response_text(&json),
            provider: self.name().into(),
            model: self.model.clone(),
        })
    }
}

fn response_text(json: &Value) -> String {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_uses_defaults() {
        let p = OpenAiProvider::new("k", "gpt-4o-mini", "");
        let body = p.body(&AiRequest {
            system: String::new(),
            prompt: "hi".into(),
            max_tokens: None,
            temperature: None,
        });
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"], DEFAULT_SYSTEM);
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(p.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn custom_base_url_is_trimmed() {
        let p = OpenAiProvider::new("k", "m", "http://localhost:8080/v1/");
        assert_eq!(p.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn extracts_first_choice() {
        let v = json!({"choices": [{"message": {"content": "{\"ok\":true}"}}]});
        assert_eq!(response_text(&v), "{\"ok\":true}");
        assert_eq!(response_text(&json!({})), "");
    }
}
