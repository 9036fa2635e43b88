use serde_json::json;

use crate::content::brief::{ArticleConfig, Brand, Brief};
use crate::seo::LinkRule;

/// System prompt for the brief step
pub fn brief_system() -> String {
    "You are a senior SEO strategist and technical editor. Return strict JSON only.".to_string()
}

/// System prompt for the draft step
pub fn draft_system() -> String {
    "You write authoritative, conversion-minded long-form content. Return strict JSON only."
        .to_string()
}

/// Ask for a content brief. The link map is offered as the list of internal
/// link targets the article may reference.
pub fn brief(brand: &Brand, article: &ArticleConfig, link_map: &[LinkRule]) -> String {
    let links: Vec<_> = link_map
        .iter()
        .map(|r| json!({"anchor": r.keywords, "url": r.url}))
        .collect();
    let input = json!({
        "brand": brand.display_name(),
        "site": brand.site,
        "tone": brand.tone,
        "keyword": article.keyword,
        "audience": article.audience,
        "intent": article.intent,
        "wordcount": article.wordcount,
        "internalLinks": links,
    });
    format!(
        "{}\n\
         Return JSON with keys: outline (array of {{h2, h3[]}}), entities[], faqs[{{q,a}}], \
         internalLinks (as provided), wordcount (number), cta (\"none\"|\"inline\"|\"card\").",
        serde_json::to_string_pretty(&input).unwrap_or_default()
    )
}

/// Ask for the article draft following a brief.
pub fn draft(brief: &Brief, article: &ArticleConfig) -> String {
    let tone = if article.tone.is_empty() {
        vec!["professional".to_string()]
    } else {
        article.tone.clone()
    };
    format!(
        "Follow this brief to create an expert article. Return JSON with keys: \
         meta:{{title,description,slug}}, articleHtml (string; valid HTML inside <article> tags is fine), \
         jsonld (array of JSON-LD strings).\n\
         Brief JSON: {}\n\
         Constraints: wordcount {}±15%, include internal link placeholders like [INTERNAL_LINK:anchor] \
         where relevant, tone {}.",
        serde_json::to_string(brief).unwrap_or_default(),
        brief.wordcount,
        serde_json::to_string(&tone).unwrap_or_default()
    )
}
