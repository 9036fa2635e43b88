use serde_json::Value;

/// Extract a JSON object from LLM response text (handles markdown fences,
/// leading prose, trailing commas). Returns `None` when nothing parses;
/// callers fall back to their template path.
pub fn parse_json_from_text(text: &str) -> Option<Value> {
    log::debug!("AI raw response: {}", truncate(text, 500));

    // Try direct parse first
    if let Ok(v) = serde_json::from_str::<Value>(text.trim()) {
        return Some(v);
    }

    // Strip markdown code fences
    let stripped = text.replace("```json", "").replace("```JSON", "").replace("```", "");
    if let Ok(v) = serde_json::from_str::<Value>(stripped.trim()) {
        return Some(v);
    }

    // First balanced { ... } block, skipping braces inside strings
    let candidate = first_object(text)?;
    if let Ok(v) = serde_json::from_str::<Value>(candidate) {
        return Some(v);
    }
    let fixed = candidate.replace(",}", "}").replace(",]", "]");
    serde_json::from_str::<Value>(&fixed).ok()
}

fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_json() {
        let v = parse_json_from_text(r#"{"title": "Hello"}"#).unwrap();
        assert_eq!(v["title"], "Hello");
    }

    #[test]
    fn fenced_json() {
        let v = parse_json_from_text("```json\n{\"slug\": \"cold-brew\"}\n```").unwrap();
        assert_eq!(v["slug"], "cold-brew");
    }

    #[test]
    fn json_after_prose_with_braces_in_strings() {
        let text = r#"Sure! Here it is: {"articleHtml": "<p>{not a brace}</p>", "n": 1} Hope that helps."#;
        let v = parse_json_from_text(text).unwrap();
        assert_eq!(v["articleHtml"], "<p>{not a brace}</p>");
        assert_eq!(v["n"], 1);
    }

    #[test]
    fn trailing_comma_is_repaired() {
        let v = parse_json_from_text(r#"Result: {"tags": ["a", "b",],}"#).unwrap();
        assert_eq!(v["tags"][1], "b");
    }

    #[test]
    fn garbage_yields_none() {
        assert!(parse_json_from_text("no json here").is_none());
        assert!(parse_json_from_text("{ unbalanced").is_none());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
