use serde::{Deserialize, Serialize};

use crate::ai::{self, prompts, AiRequest, LlmProvider};
use crate::seo::LinkRule;

// ── Request Types ─────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Brand {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub sitemap_url: Option<String>,
    #[serde(default)]
    pub tone: Vec<String>,
    #[serde(default)]
    pub link_policy: Option<LinkPolicyInput>,
}

impl Brand {
    pub fn display_name(&self) -> &str {
        match self.brand.as_deref() {
            Some(b) if !b.trim().is_empty() => b,
            _ => &self.site,
        }
    }
}

/// `brand.link_policy` as sent by the form. Missing fields take server defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkPolicyInput {
    #[serde(default)]
    pub max_internal: Option<i64>,
    #[serde(default)]
    pub utm: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleConfig {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub wordcount: Option<u32>,
    #[serde(default)]
    pub cta: Option<String>,
    #[serde(default)]
    pub tone: Vec<String>,
    /// Canonical URL the article will be published at, if known.
    #[serde(default)]
    pub url: Option<String>,
}

// ── Brief ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub h2: String,
    #[serde(default)]
    pub h3: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub q: String,
    pub a: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalLink {
    pub anchor: Vec<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brief {
    pub outline: Vec<OutlineSection>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    #[serde(default)]
    pub internal_links: Vec<InternalLink>,
    #[serde(default = "default_wordcount")]
    pub wordcount: u32,
    #[serde(default = "default_cta")]
    pub cta: String,
}

fn default_wordcount() -> u32 {
    1400
}

fn default_cta() -> String {
    "none".to_string()
}

impl Brief {
    /// Template brief used when no provider is configured or its output
    /// cannot be used.
    pub fn fallback(article: &ArticleConfig, link_map: &[LinkRule]) -> Brief {
        let kw = article.keyword.trim();
        Brief {
            outline: vec![
                section(format!("Understanding {}", kw), &["What it means", "Why it matters"]),
                section(
                    format!("Key Factors that Impact {}", kw),
                    &["Quality", "Origin", "Seasonality"],
                ),
                section("How to Choose a Provider".into(), &["Criteria", "Red flags"]),
                section(
                    "Pricing & Contracts".into(),
                    &["Typical ranges", "Negotiation tips"],
                ),
                section("FAQs".into(), &[]),
            ],
            entities: [kw, "sourcing", "roaster", "sustainability", "cupping"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            faqs: vec![
                Faq {
                    q: format!("What is {}?", kw),
                    a: format!("{} refers to...", kw),
                },
                Faq {
                    q: format!("How do I evaluate quality for {}?", kw),
                    a: "Look for...".into(),
                },
            ],
            internal_links: internal_links(link_map),
            wordcount: article.wordcount.unwrap_or_else(default_wordcount),
            cta: article.cta.clone().unwrap_or_else(default_cta),
        }
    }
}

fn section(h2: String, h3: &[&str]) -> OutlineSection {
    OutlineSection {
        h2,
        h3: h3.iter().map(|s| s.to_string()).collect(),
    }
}

fn internal_links(link_map: &[LinkRule]) -> Vec<InternalLink> {
    link_map
        .iter()
        .map(|r| InternalLink {
            anchor: r.keywords.clone(),
            url: r.url.clone(),
        })
        .collect()
}

/// Build the content brief, via the provider when one is configured.
pub fn make_brief(
    provider: Option<&dyn LlmProvider>,
    brand: &Brand,
    article: &ArticleConfig,
    link_map: &[LinkRule],
) -> Brief {
    if let Some(provider) = provider {
        let req = AiRequest {
            system: prompts::brief_system(),
            prompt: prompts::brief(brand, article, link_map),
            max_tokens: Some(2000),
            temperature: None,
        };
        match provider.complete(&req) {
            Ok(resp) => match parse_brief(&resp.text) {
                Some(brief) => return brief,
                None => log::warn!("{} brief was not usable, using template", resp.provider),
            },
            Err(e) => log::warn!("Brief generation failed: {}", e),
        }
    }
    Brief::fallback(article, link_map)
}

fn parse_brief(text: &str) -> Option<Brief> {
    let value = ai::parse_json_from_text(text)?;
    let brief: Brief = serde_json::from_value(value).ok()?;
    if brief.outline.is_empty() {
        None
    } else {
        Some(brief)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, AiResponse};

    struct Canned(Result<String, String>);

    impl LlmProvider for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }
        fn complete(&self, _req: &AiRequest) -> Result<AiResponse, AiError> {
            self.0
                .clone()
                .map(|text| AiResponse {
                    text,
                    provider: "canned".into(),
                    model: "test".into(),
                })
                .map_err(AiError)
        }
    }

    fn article(keyword: &str) -> ArticleConfig {
        ArticleConfig {
            keyword: keyword.into(),
            ..ArticleConfig::default()
        }
    }

    #[test]
    fn fallback_without_provider() {
        let rules = vec![LinkRule {
            keywords: vec!["house blend".into()],
            url: "/products/house-blend".into(),
            priority: 30,
        }];
        let b = make_brief(None, &Brand::default(), &article("wholesale coffee"), &rules);
        assert_eq!(b.outline.len(), 5);
        assert_eq!(b.outline[0].h2, "Understanding wholesale coffee");
        assert_eq!(b.internal_links[0].url, "/products/house-blend");
        assert_eq!(b.wordcount, 1400);
        assert_eq!(b.cta, "none");
    }

    #[test]
    fn provider_json_is_used() {
        let p = Canned(Ok(
            "```json\n{\"outline\":[{\"h2\":\"Intro\"}],\"wordcount\":900}\n```".into(),
        ));
        let b = make_brief(Some(&p), &Brand::default(), &article("x"), &[]);
        assert_eq!(b.outline[0].h2, "Intro");
        assert!(b.outline[0].h3.is_empty());
        assert_eq!(b.wordcount, 900);
        assert_eq!(b.cta, "none");
    }

    #[test]
    fn unusable_output_falls_back() {
        let p = Canned(Ok("{\"stub\":true}".into()));
        let b = make_brief(Some(&p), &Brand::default(), &article("decaf"), &[]);
        assert_eq!(b.outline[0].h2, "Understanding decaf");

        let p = Canned(Err("OpenAI returned 500".into()));
        let b = make_brief(Some(&p), &Brand::default(), &article("decaf"), &[]);
        assert_eq!(b.outline.len(), 5);
    }

    #[test]
    fn brand_display_name_prefers_brand() {
        let b = Brand {
            brand: Some("Yield Coffee Roasters".into()),
            site: "https://www.yieldcoffee.com".into(),
            ..Brand::default()
        };
        assert_eq!(b.display_name(), "Yield Coffee Roasters");
        let b = Brand {
            brand: Some(" ".into()),
            site: "https://www.yieldcoffee.com".into(),
            ..Brand::default()
        };
        assert_eq!(b.display_name(), "https://www.yieldcoffee.com");
    }
}
