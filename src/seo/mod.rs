pub mod inject;
pub mod linkmap;
pub mod sitemap;

// Re-export commonly used functions
pub use inject::{inject_internal_links, inject_with_report, InjectOptions, LinkPolicy};
pub use linkmap::{build_link_map, LinkRule, OverrideRule};
pub use sitemap::{fetch_inventory, SiteInventory, SiteTarget};

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Normalize a keyword phrase for comparison: trimmed, lowercased,
/// whitespace runs collapsed, `&amp;` read as `&`.
pub(crate) fn normalize_phrase(s: &str) -> String {
    s.replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
