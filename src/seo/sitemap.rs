use chrono::{DateTime, FixedOffset, NaiveDate};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Failed to fetch sitemap: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to fetch sitemap: {0}")]
    Status(u16),
    #[error("Sitemap XML parse error: {0}")]
    Xml(String),
}

/// One indexed URL from a sitemap `<url>` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteTarget {
    pub loc: String,
    pub lastmod: Option<DateTime<FixedOffset>>,
}

impl SiteTarget {
    pub fn new(loc: impl Into<String>) -> Self {
        SiteTarget {
            loc: loc.into(),
            lastmod: None,
        }
    }

    /// URL path used for categorisation. A `loc` that is not an absolute URL
    /// is taken as a path as-is.
    pub fn path(&self) -> String {
        match url::Url::parse(&self.loc) {
            Ok(u) => u.path().to_string(),
            Err(_) => self.loc.clone(),
        }
    }
}

/// Site URLs partitioned by path heuristic.
/// Every element of `all` is in exactly one of the four partitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteInventory {
    pub all: Vec<SiteTarget>,
    pub pages: Vec<SiteTarget>,
    pub collections: Vec<SiteTarget>,
    pub products: Vec<SiteTarget>,
    pub blogs: Vec<SiteTarget>,
}

impl SiteInventory {
    pub fn from_targets(targets: Vec<SiteTarget>) -> Self {
        let mut inv = SiteInventory::default();
        for t in &targets {
            let path = t.path();
            if path.contains("/collections/") {
                inv.collections.push(t.clone());
            } else if path.contains("/products/") {
                inv.products.push(t.clone());
            } else if path.contains("/blogs/") {
                inv.blogs.push(t.clone());
            } else {
                inv.pages.push(t.clone());
            }
        }
        inv.all = targets;
        inv
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// A parsed sitemap file: either a list of URLs or an index of child sitemaps.
#[derive(Debug, Clone, PartialEq)]
pub enum SitemapDocument {
    UrlSet(Vec<SiteTarget>),
    Index(Vec<String>),
}

/// Parse sitemap XML (`<urlset>` or `<sitemapindex>`).
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut is_index = false;
    let mut current_element = String::new();
    let mut in_entry = false;

    let mut entry_loc = String::new();
    let mut entry_lastmod = String::new();

    let mut targets: Vec<SiteTarget> = Vec::new();
    let mut children: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "sitemapindex" => is_index = true,
                    "url" | "sitemap" => {
                        in_entry = true;
                        entry_loc.clear();
                        entry_lastmod.clear();
                    }
                    _ => {}
                }
                current_element = name;
            }
            Ok(Event::Text(ref e)) => {
                if in_entry {
                    let text = e
                        .unescape()
                        .map_err(|e| SitemapError::Xml(e.to_string()))?
                        .to_string();
                    push_field(&current_element, &text, &mut entry_loc, &mut entry_lastmod);
                }
            }
            Ok(Event::CData(ref e)) => {
                if in_entry {
                    let text = String::from_utf8_lossy(e).to_string();
                    push_field(&current_element, &text, &mut entry_loc, &mut entry_lastmod);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if (name == "url" || name == "sitemap") && in_entry {
                    in_entry = false;
                    let loc = entry_loc.trim();
                    if loc.is_empty() {
                        // skip
                    } else if name == "sitemap" {
                        children.push(loc.to_string());
                    } else {
                        targets.push(SiteTarget {
                            loc: loc.to_string(),
                            lastmod: parse_lastmod(&entry_lastmod),
                        });
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SitemapError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if is_index {
        Ok(SitemapDocument::Index(children))
    } else {
        Ok(SitemapDocument::UrlSet(targets))
    }
}

fn push_field(element: &str, text: &str, loc: &mut String, lastmod: &mut String) {
    match element {
        "loc" => loc.push_str(text),
        "lastmod" => lastmod.push_str(text),
        _ => {}
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_lastmod(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(d) => d
            .and_hms_opt(0, 0, 0)
            .map(|ndt| ndt.and_utc().fixed_offset()),
        Err(_) => {
            log::debug!("Ignoring unparseable lastmod '{}'", raw);
            None
        }
    }
}

fn fetch_xml(client: &reqwest::blocking::Client, url: &str) -> Result<String, SitemapError> {
    let resp = client.get(url).send()?;
    if !resp.status().is_success() {
        return Err(SitemapError::Status(resp.status().as_u16()));
    }
    Ok(resp.text()?)
}

/// Fetch a sitemap (following one level of sitemap index) and partition it.
/// Child sitemaps that fail to load are skipped.
pub fn fetch_inventory(sitemap_url: &str) -> Result<SiteInventory, SitemapError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let xml = fetch_xml(&client, sitemap_url)?;
    let targets = match parse_sitemap(&xml)? {
        SitemapDocument::UrlSet(targets) => targets,
        SitemapDocument::Index(children) => {
            let mut targets = Vec::new();
            for child in &children {
                let parsed = fetch_xml(&client, child).and_then(|x| parse_sitemap(&x));
                match parsed {
                    Ok(SitemapDocument::UrlSet(mut t)) => targets.append(&mut t),
                    Ok(SitemapDocument::Index(_)) => {
                        log::warn!("Skipping nested sitemap index {}", child);
                    }
                    Err(e) => log::warn!("Skipping child sitemap {}: {}", child, e),
                }
            }
            targets
        }
    };

    let inv = SiteInventory::from_targets(targets);
    log::info!(
        "Sitemap {}: {} urls ({} pages, {} collections, {} products, {} blogs)",
        sitemap_url,
        inv.all.len(),
        inv.pages.len(),
        inv.collections.len(),
        inv.products.len(),
        inv.blogs.len()
    );
    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URLSET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://shop.example.com/</loc><lastmod>2024-05-01</lastmod></url>
  <url><loc>https://shop.example.com/products/ethiopian-yirgacheffe</loc><lastmod>2024-05-02T10:00:00+02:00</lastmod></url>
  <url><loc>https://shop.example.com/collections/single-origin</loc></url>
  <url><loc>https://shop.example.com/blogs/news/brewing-guide</loc><lastmod>yesterday</lastmod></url>
  <url><loc>   </loc></url>
</urlset>"#;

    #[test]
    fn parses_urlset_and_skips_empty_loc() {
        let doc = parse_sitemap(URLSET).unwrap();
        let SitemapDocument::UrlSet(targets) = doc else {
            panic!("expected urlset");
        };
        assert_eq!(targets.len(), 4);
        assert_eq!(targets[1].loc, "https://shop.example.com/products/ethiopian-yirgacheffe");
        assert!(targets[0].lastmod.is_some());
        assert!(targets[1].lastmod.is_some());
        assert!(targets[2].lastmod.is_none());
        assert!(targets[3].lastmod.is_none());
    }

    #[test]
    fn parses_sitemap_index() {
        let xml = r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://shop.example.com/sitemap_products_1.xml</loc></sitemap>
  <sitemap><loc><![CDATA[https://shop.example.com/sitemap_pages_1.xml]]></loc></sitemap>
</sitemapindex>"#;
        assert_eq!(
            parse_sitemap(xml).unwrap(),
            SitemapDocument::Index(vec![
                "https://shop.example.com/sitemap_products_1.xml".to_string(),
                "https://shop.example.com/sitemap_pages_1.xml".to_string(),
            ])
        );
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_sitemap("<urlset><url><loc>x</url></urlset>").is_err());
    }

    #[test]
    fn partition_by_path() {
        let SitemapDocument::UrlSet(targets) = parse_sitemap(URLSET).unwrap() else {
            panic!("expected urlset");
        };
        let inv = SiteInventory::from_targets(targets);
        assert_eq!(inv.pages.len(), 1);
        assert_eq!(inv.products.len(), 1);
        assert_eq!(inv.collections.len(), 1);
        assert_eq!(inv.blogs.len(), 1);
        assert_eq!(
            inv.pages.len() + inv.collections.len() + inv.products.len() + inv.blogs.len(),
            inv.all.len()
        );
    }

    #[test]
    fn relative_loc_is_categorised_by_itself() {
        let inv = SiteInventory::from_targets(vec![
            SiteTarget::new("/products/ethiopian-yirgacheffe"),
            SiteTarget::new("/about"),
        ]);
        assert_eq!(inv.products.len(), 1);
        assert_eq!(inv.pages.len(), 1);
    }

    #[test]
    fn collections_checked_before_products() {
        let inv = SiteInventory::from_targets(vec![SiteTarget::new(
            "https://shop.example.com/collections/espresso/products/house-blend",
        )]);
        assert_eq!(inv.collections.len(), 1);
        assert!(inv.products.is_empty());
    }

    #[test]
    fn lastmod_formats() {
        let d = parse_lastmod("2024-05-01").unwrap();
        assert_eq!(d.to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert!(parse_lastmod("2024-05-02T10:00:00+02:00").is_some());
        assert!(parse_lastmod("not a date").is_none());
        assert!(parse_lastmod("").is_none());
    }
}
