use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::brief::{ArticleConfig, Brief};
use crate::ai::{self, prompts, AiRequest, LlmProvider};
use crate::seo::html_escape;

const SECTION_FILLER: &str = "Section content pending. Replace with provider output.";
const INTRO: &str = "Intro paragraph that frames the topic, intent, and outcome for the reader.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftMeta {
    pub title: String,
    pub description: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub meta: DraftMeta,
    pub article_html: String,
    pub jsonld: Vec<String>,
}

/// Draft as models actually return it: meta fields may be missing and
/// JSON-LD entries may be objects rather than strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDraft {
    #[serde(default)]
    meta: RawMeta,
    #[serde(default)]
    article_html: String,
    #[serde(default)]
    jsonld: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMeta {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    slug: String,
}

/// Write the article draft, via the provider when one is configured.
pub fn write_draft(
    provider: Option<&dyn LlmProvider>,
    brief: &Brief,
    article: &ArticleConfig,
) -> Draft {
    if let Some(provider) = provider {
        let req = AiRequest {
            system: prompts::draft_system(),
            prompt: prompts::draft(brief, article),
            max_tokens: Some(4000),
            temperature: None,
        };
        match provider.complete(&req) {
            Ok(resp) => match parse_draft(&resp.text) {
                Some(draft) => return draft,
                None => log::warn!("{} draft was not usable, using template", resp.provider),
            },
            Err(e) => log::warn!("Draft generation failed: {}", e),
        }
    }
    fallback_draft(brief, article)
}

/// Accept a model draft only when it has a title and article body.
fn parse_draft(text: &str) -> Option<Draft> {
    let value = ai::parse_json_from_text(text)?;
    let raw: RawDraft = serde_json::from_value(value).ok()?;
    let title = raw.meta.title.trim().to_string();
    if title.is_empty() || raw.article_html.trim().is_empty() {
        return None;
    }
    let slug = if raw.meta.slug.trim().is_empty() {
        slug::slugify(&title)
    } else {
        raw.meta.slug.trim().to_string()
    };
    Some(Draft {
        meta: DraftMeta {
            title,
            description: raw.meta.description,
            slug,
        },
        article_html: raw.article_html,
        jsonld: raw
            .jsonld
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
    })
}

fn paragraph(text: &str) -> String {
    format!("<p>{}</p>", html_escape(text))
}

/// Capitalise the first character.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Template draft built from the brief outline.
pub fn fallback_draft(brief: &Brief, article: &ArticleConfig) -> Draft {
    let kw = article.keyword.trim();
    let title = format!("{}: The Complete Guide", capitalize(kw));
    let description = format!(
        "Everything you need to know about {}: selection, pricing and best practices.",
        kw
    );

    let sections: Vec<String> = brief
        .outline
        .iter()
        .map(|sec| {
            let mut html = format!("<h2>{}</h2>", html_escape(&sec.h2));
            if !sec.h3.is_empty() {
                for h3 in &sec.h3 {
                    html.push_str(&format!(
                        "<h3>{}</h3>{}",
                        html_escape(h3),
                        paragraph(SECTION_FILLER)
                    ));
                }
            } else if sec.h2.to_lowercase().contains("faq") && !brief.faqs.is_empty() {
                for f in &brief.faqs {
                    html.push_str(&format!("<h3>{}</h3>{}", html_escape(&f.q), paragraph(&f.a)));
                }
            } else {
                html.push_str(&paragraph(SECTION_FILLER));
            }
            html
        })
        .collect();

    let article_html = format!(
        "\n<h1>{}</h1>\n{}\n{}\n",
        html_escape(&title),
        paragraph(INTRO),
        sections.join("\n")
    );

    let mut jsonld = vec![json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": title,
        "description": description
    })
    .to_string()];
    if !brief.faqs.is_empty() {
        let questions: Vec<Value> = brief
            .faqs
            .iter()
            .map(|f| {
                json!({
                    "@type": "Question",
                    "name": f.q,
                    "acceptedAnswer": {"@type": "Answer", "text": f.a}
                })
            })
            .collect();
        jsonld.push(
            json!({
                "@context": "https://schema.org",
                "@type": "FAQPage",
                "mainEntity": questions
            })
            .to_string(),
        );
    }

    Draft {
        meta: DraftMeta {
            title,
            description,
            slug: slug::slugify(kw),
        },
        article_html,
        jsonld,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(keyword: &str) -> ArticleConfig {
        ArticleConfig {
            keyword: keyword.into(),
            ..ArticleConfig::default()
        }
    }

    #[test]
    fn fallback_draft_shape() {
        let a = article("wholesale coffee beans");
        let brief = Brief::fallback(&a, &[]);
        let d = fallback_draft(&brief, &a);
        assert_eq!(d.meta.title, "Wholesale coffee beans: The Complete Guide");
        assert_eq!(d.meta.slug, "wholesale-coffee-beans");
        assert!(d.article_html.contains("<h1>Wholesale coffee beans: The Complete Guide</h1>"));
        assert!(d.article_html.contains("<h2>Pricing &amp; Contracts</h2>"));
        assert!(d.article_html.contains("<h3>What is wholesale coffee beans?</h3>"));
        assert_eq!(d.jsonld.len(), 2);
        assert!(d.jsonld[1].contains("FAQPage"));
    }

    #[test]
    fn fallback_escapes_keyword() {
        let a = article("<b>beans</b>");
        let d = fallback_draft(&Brief::fallback(&a, &[]), &a);
        assert!(!d.article_html.contains("<b>beans</b>"));
        assert!(d.article_html.contains("&lt;b&gt;beans&lt;/b&gt;"));
    }

    #[test]
    fn parse_draft_fills_slug_and_stringifies_jsonld() {
        let text = r#"{"meta":{"title":"Cold Brew at Scale","description":"d"},
            "articleHtml":"<p>[INTERNAL_LINK:cold brew]</p>",
            "jsonld":[{"@type":"Article"},"{\"@type\":\"FAQPage\"}"]}"#;
        let d = parse_draft(text).unwrap();
        assert_eq!(d.meta.slug, "cold-brew-at-scale");
        assert_eq!(d.jsonld[0], r#"{"@type":"Article"}"#);
        assert_eq!(d.jsonld[1], r#"{"@type":"FAQPage"}"#);
    }

    #[test]
    fn parse_draft_requires_title_and_body() {
        assert!(parse_draft(r#"{"meta":{"title":""},"articleHtml":"<p>x</p>"}"#).is_none());
        assert!(parse_draft(r#"{"meta":{"title":"T"},"articleHtml":"  "}"#).is_none());
        assert!(parse_draft(r#"{"stub":true}"#).is_none());
    }

    #[test]
    fn write_draft_without_provider_uses_template() {
        let a = article("decaf");
        let d = write_draft(None, &Brief::fallback(&a, &[]), &a);
        assert_eq!(d.meta.slug, "decaf");
    }
}
