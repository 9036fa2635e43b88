use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::sitemap::{SiteInventory, SiteTarget};

/// Caller-supplied keyword → URL rule. The URL is trusted even when it is
/// not part of the sitemap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub url: String,
}

/// Keyword set bound to one destination. Higher priority resolves first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRule {
    pub keywords: Vec<String>,
    pub url: String,
    pub priority: u32,
}

pub const PRIORITY_MANUAL: u32 = 100;
pub const PRIORITY_PRODUCT: u32 = 30;
pub const PRIORITY_COLLECTION: u32 = 20;
pub const PRIORITY_BLOG: u32 = 10;

/// Build the ordered link map: overrides first, then phrases derived from
/// product, collection and blog slugs. No two returned rules share a URL.
pub fn build_link_map(inventory: &SiteInventory, overrides: &[OverrideRule]) -> Vec<LinkRule> {
    let mut candidates: Vec<LinkRule> = Vec::new();

    for o in overrides {
        let url = o.url.trim();
        if url.is_empty() {
            continue;
        }
        candidates.push(LinkRule {
            keywords: o
                .keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            url: url.to_string(),
            priority: PRIORITY_MANUAL,
        });
    }

    let tiers: [(&[SiteTarget], u32); 3] = [
        (&inventory.products, PRIORITY_PRODUCT),
        (&inventory.collections, PRIORITY_COLLECTION),
        (&inventory.blogs, PRIORITY_BLOG),
    ];
    for (targets, priority) in tiers {
        for t in targets {
            let keywords = match deslugify(&t.path()) {
                Some(phrase) => vec![phrase],
                None => Vec::new(),
            };
            candidates.push(LinkRule {
                keywords,
                url: t.loc.trim().to_string(),
                priority,
            });
        }
    }

    // Candidates are already in tier order, so the first rule seen for a URL
    // is the one kept.
    let mut rules: Vec<LinkRule> = Vec::new();
    let mut by_url: HashMap<String, usize> = HashMap::new();
    for c in candidates {
        match by_url.get(&c.url) {
            Some(&idx) => merge_keywords(&mut rules[idx].keywords, c.keywords),
            None => {
                by_url.insert(c.url.clone(), rules.len());
                let mut keywords = Vec::new();
                merge_keywords(&mut keywords, c.keywords);
                rules.push(LinkRule {
                    keywords,
                    url: c.url,
                    priority: c.priority,
                });
            }
        }
    }

    rules.retain(|r| !r.keywords.is_empty());
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));

    log::debug!("Link map: {} rules from {} overrides", rules.len(), overrides.len());
    rules
}

/// Case-insensitive union, keeping the first spelling seen.
fn merge_keywords(into: &mut Vec<String>, extra: Vec<String>) {
    for k in extra {
        let lower = k.to_lowercase();
        if !into.iter().any(|e| e.to_lowercase() == lower) {
            into.push(k);
        }
    }
}

/// Turn the last path segment into an anchor phrase:
/// `/products/ethiopian-yirgacheffe` → `ethiopian yirgacheffe`.
/// Percent-encoded segments are decoded first. Returns `None` when nothing
/// alphabetic remains.
pub fn deslugify(path: &str) -> Option<String> {
    let raw = path
        .split(['/', '?', '#'])
        .filter(|s| !s.is_empty())
        .last()?;
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let segment: &str = &decoded;
    let segment = segment
        .strip_suffix(".html")
        .or_else(|| segment.strip_suffix(".htm"))
        .unwrap_or(segment);

    let phrase = segment
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if phrase.chars().any(|c| c.is_alphabetic()) {
        Some(phrase)
    } else {
        None
    }
}
