use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::linkmap::LinkRule;
use super::{html_escape, normalize_phrase};
use crate::error::EngineError;

const PLACEHOLDER_MARKER: &str = "[INTERNAL_LINK:";

/// A placeholder contained in a single text span.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[INTERNAL_LINK:([^\[\]<]*)\]").unwrap());

/// A placeholder anywhere in the rendered output, possibly spanning markup.
/// Never runs past another `[`.
static LEFTOVER_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[INTERNAL_LINK:([^\[\]]*)\]").unwrap());

static HREF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// Elements whose text content is never linked.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

const UTM_SOURCE: &str = "seo-engine";
const UTM_MEDIUM: &str = "internal-link";
const DEFAULT_UTM_CAMPAIGN: &str = "article";

// ── Types ─────────────────────────────────────────────

/// Per-document link policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPolicy {
    /// Maximum number of links inserted into one document. Negative is invalid.
    pub cap: i64,
    /// Append UTM parameters to inserted URLs.
    pub utm: bool,
    #[serde(default)]
    pub utm_campaign: Option<String>,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        LinkPolicy {
            cap: 6,
            utm: true,
            utm_campaign: None,
        }
    }
}

impl LinkPolicy {
    fn validate(&self) -> Result<(usize, Option<String>), EngineError> {
        let cap = usize::try_from(self.cap).map_err(|_| {
            EngineError::Configuration(format!("cap must be non-negative, got {}", self.cap))
        })?;

        if !self.utm {
            return Ok((cap, None));
        }
        let campaign = self
            .utm_campaign
            .as_deref()
            .unwrap_or(DEFAULT_UTM_CAMPAIGN);
        if campaign.is_empty()
            || campaign
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '&' | '#' | '=' | '?'))
        {
            return Err(EngineError::Configuration(format!(
                "utm_campaign '{}' is not a valid query value",
                campaign
            )));
        }
        Ok((
            cap,
            Some(format!(
                "utm_source={}&utm_medium={}&utm_campaign={}",
                UTM_SOURCE, UTM_MEDIUM, campaign
            )),
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InjectOptions {
    /// Canonical URL of the document being generated, if known. Rules
    /// pointing at it are never applied.
    pub self_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectMode {
    Placeholder,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkUsage {
    pub url: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionReport {
    pub mode: InjectMode,
    pub inserted: usize,
    /// True when the cap prevented at least one otherwise valid link.
    pub capped: bool,
    pub usage: Vec<LinkUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub html: String,
    pub report: InjectionReport,
}

// ── Public API ────────────────────────────────────────

/// Insert internal links into an HTML fragment. See [`inject_with_report`].
pub fn inject_internal_links(
    html: &str,
    link_map: &[LinkRule],
    policy: &LinkPolicy,
) -> Result<String, EngineError> {
    inject_with_report(html, link_map, policy, &InjectOptions::default()).map(|i| i.html)
}

/// Insert internal links and report which destinations were used.
///
/// Placeholders (`[INTERNAL_LINK:text]`) are resolved when the fragment has
/// any; otherwise plain prose is scanned for rule keywords. Either way at
/// most `policy.cap` links are added, each destination at most once, never
/// inside an existing anchor. Only an invalid policy is an error.
pub fn inject_with_report(
    html: &str,
    link_map: &[LinkRule],
    policy: &LinkPolicy,
    options: &InjectOptions,
) -> Result<Injection, EngineError> {
    let (cap, utm_query) = policy.validate()?;

    let doc = scan(html);
    let self_url = options.self_url.as_deref().map(Destination::parse);
    let site_host = self_url
        .as_ref()
        .and_then(|d| d.host.clone())
        .or_else(|| link_map.iter().find_map(|r| Destination::parse(&r.url).host));
    let mut state = LinkState {
        cap,
        utm_query,
        self_url,
        site_host,
        used: doc
            .existing_hrefs
            .iter()
            .filter(|h| is_navigable(h))
            .map(|h| Destination::parse(h))
            .collect(),
        usage: Vec::new(),
        inserted: 0,
        capped: false,
    };

    let (mode, html) = if html.contains(PLACEHOLDER_MARKER) {
        let spans = resolve_placeholders(doc.spans, link_map, &mut state);
        (InjectMode::Placeholder, strip_leftover_placeholders(&render(&spans)))
    } else {
        let spans = scan_free_text(doc.spans, link_map, &mut state);
        (InjectMode::FreeText, render(&spans))
    };

    log::debug!(
        "Injected {} internal links ({:?}, cap {}, capped: {})",
        state.inserted,
        mode,
        cap,
        state.capped
    );

    Ok(Injection {
        html,
        report: InjectionReport {
            mode,
            inserted: state.inserted,
            capped: state.capped,
            usage: state.usage,
        },
    })
}

// ── Link bookkeeping ──────────────────────────────────

/// Destination identity: host (when absolute) plus path without trailing
/// slash. Query and fragment are ignored.
#[derive(Debug, Clone, PartialEq)]
struct Destination {
    host: Option<String>,
    path: String,
}

impl Destination {
    fn parse(url: &str) -> Self {
        let url = url.trim();
        match url::Url::parse(url) {
            Ok(u) => Destination {
                host: u.host_str().map(|h| h.to_lowercase()),
                path: u.path().trim_end_matches('/').to_string(),
            },
            Err(_) => {
                let end = url.find(['?', '#']).unwrap_or(url.len());
                Destination {
                    host: None,
                    path: url[..end].trim_end_matches('/').to_string(),
                }
            }
        }
    }

    /// A relative URL equals an absolute one only on the site's own host.
    fn same_as(&self, other: &Destination, site_host: Option<&str>) -> bool {
        self.path == other.path
            && match (&self.host, &other.host) {
                (Some(a), Some(b)) => a == b,
                (None, None) => true,
                (Some(h), None) | (None, Some(h)) => site_host == Some(h.as_str()),
            }
    }
}

struct LinkState {
    cap: usize,
    utm_query: Option<String>,
    self_url: Option<Destination>,
    site_host: Option<String>,
    used: Vec<Destination>,
    usage: Vec<LinkUsage>,
    inserted: usize,
    capped: bool,
}

impl LinkState {
    fn eligible(&self, url: &str) -> bool {
        let dest = Destination::parse(url);
        let site = self.site_host.as_deref();
        if self.self_url.as_ref().is_some_and(|s| s.same_as(&dest, site)) {
            return false;
        }
        !self.used.iter().any(|u| u.same_as(&dest, site))
    }

    fn at_cap(&self) -> bool {
        self.inserted >= self.cap
    }

    /// Record an inserted link and return its anchor markup.
    fn anchor(&mut self, url: &str, text: &str) -> String {
        self.used.push(Destination::parse(url));
        self.inserted += 1;
        match self.usage.iter_mut().find(|u| u.url == url) {
            Some(u) => u.count += 1,
            None => self.usage.push(LinkUsage {
                url: url.to_string(),
                count: 1,
            }),
        }

        let href = match &self.utm_query {
            Some(q) => append_query(url, q),
            None => url.to_string(),
        };
        format!(r#"<a href="{}">{}</a>"#, html_escape(&href), text)
    }
}

/// Hrefs that point at a page. Empty, fragment-only and non-http scheme
/// links never occupy a destination.
fn is_navigable(href: &str) -> bool {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    !href.is_empty()
        && !href.starts_with('#')
        && !["mailto:", "tel:", "javascript:", "data:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
}

fn append_query(url: &str, query: &str) -> String {
    let (base, fragment) = match url.find('#') {
        Some(i) => (&url[..i], &url[i..]),
        None => (url, ""),
    };
    let sep = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };
    format!("{}{}{}{}", base, sep, query, fragment)
}

// ── Document scanning ─────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Span {
    /// Tags, comments, and unparseable tails. Passed through verbatim.
    Markup(String),
    Text { text: String, linkable: bool },
    /// An anchor inserted by the injector.
    Link(String),
}

struct Document {
    spans: Vec<Span>,
    existing_hrefs: Vec<String>,
}

/// Split an HTML fragment into markup and text spans. Text inside anchors and
/// raw-text elements is marked unlinkable. A `<` that never closes turns the
/// rest of the input into one opaque markup span.
fn scan(html: &str) -> Document {
    let mut spans = Vec::new();
    let mut existing_hrefs = Vec::new();
    let mut anchor_depth = 0usize;
    let mut raw_element: Option<&str> = None;
    let mut pos = 0;

    while pos < html.len() {
        if let Some(name) = raw_element.take() {
            let closing = format!("</{}", name);
            let end = html[pos..]
                .to_ascii_lowercase()
                .find(&closing)
                .map(|i| pos + i)
                .unwrap_or(html.len());
            push_text(&mut spans, &html[pos..end], false);
            pos = end;
            continue;
        }

        let Some(start) = next_tag_start(html, pos) else {
            push_text(&mut spans, &html[pos..], anchor_depth == 0);
            break;
        };
        push_text(&mut spans, &html[pos..start], anchor_depth == 0);

        let end = if html[start..].starts_with("<!--") {
            html[start..].find("-->").map(|i| start + i + 3)
        } else {
            tag_end(html, start).map(|i| i + 1)
        };
        let Some(end) = end else {
            spans.push(Span::Markup(html[start..].to_string()));
            break;
        };

        let tag = &html[start..end];
        if let Some((name, closing)) = tag_name(tag) {
            if name == "a" {
                if closing {
                    anchor_depth = anchor_depth.saturating_sub(1);
                } else if !tag.ends_with("/>") {
                    anchor_depth += 1;
                    if let Some(href) = href_of(tag) {
                        existing_hrefs.push(href);
                    }
                }
            } else if !closing {
                raw_element = RAW_TEXT_ELEMENTS.iter().copied().find(|e| *e == name);
            }
        }
        spans.push(Span::Markup(tag.to_string()));
        pos = end;
    }

    Document {
        spans,
        existing_hrefs,
    }
}

fn push_text(spans: &mut Vec<Span>, text: &str, linkable: bool) {
    if !text.is_empty() {
        spans.push(Span::Text {
            text: text.to_string(),
            linkable,
        });
    }
}

/// Next `<` that opens a tag, end tag, comment or declaration. A `<` followed
/// by anything else is text.
fn next_tag_start(html: &str, from: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut i = from;
    while let Some(off) = html[i..].find('<') {
        let at = i + off;
        match bytes.get(at + 1) {
            Some(b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?') => {
                return Some(at)
            }
            _ => i = at + 1,
        }
    }
    None
}

/// Index of the `>` closing the tag at `start`, honouring quoted attribute
/// values.
fn tag_end(html: &str, start: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut quote: Option<u8> = None;
    let mut prev = b'<';
    for (i, &b) in bytes.iter().enumerate().skip(start + 1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if (b == b'"' || b == b'\'') && prev == b'=' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
        if !b.is_ascii_whitespace() {
            prev = b;
        }
    }
    None
}

/// Lowercased element name and whether the tag is a closing tag.
fn tag_name(tag: &str) -> Option<(String, bool)> {
    let inner = tag.strip_prefix('<')?;
    let (inner, closing) = match inner.strip_prefix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };
    let name: String = inner
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if name.is_empty() {
        None
    } else {
        Some((name.to_ascii_lowercase(), closing))
    }
}

fn href_of(tag: &str) -> Option<String> {
    let caps = HREF_ATTR.captures(tag)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().replace("&amp;", "&"))
}

fn render(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Span::Markup(s) | Span::Link(s) | Span::Text { text: s, .. } => out.push_str(s),
        }
    }
    out
}

// ── Mode A: placeholders ──────────────────────────────

fn resolve_placeholders(spans: Vec<Span>, rules: &[LinkRule], state: &mut LinkState) -> Vec<Span> {
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        let (text, linkable) = match span {
            Span::Text { text, linkable } => (text, linkable),
            other => {
                out.push(other);
                continue;
            }
        };

        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_text(&mut out, &text[last..whole.start()], linkable);
            let anchor_text = inner.as_str().trim();

            let rule = if linkable {
                match_placeholder(anchor_text, rules, state)
            } else {
                None
            };
            match rule {
                Some(rule) => {
                    let link = state.anchor(&rule.url, anchor_text);
                    out.push(Span::Link(link));
                }
                None => push_text(&mut out, anchor_text, false),
            }
            last = whole.end();
        }
        push_text(&mut out, &text[last..], linkable);
    }
    out
}

/// First eligible rule with a keyword equal to the anchor text. Returns
/// `None` (and marks the report capped) when the cap is already reached.
fn match_placeholder<'r>(
    anchor_text: &str,
    rules: &'r [LinkRule],
    state: &mut LinkState,
) -> Option<&'r LinkRule> {
    let wanted = normalize_phrase(anchor_text);
    if wanted.is_empty() {
        return None;
    }
    let rule = rules.iter().find(|r| {
        state.eligible(&r.url) && r.keywords.iter().any(|k| normalize_phrase(k) == wanted)
    })?;
    if state.at_cap() {
        state.capped = true;
        return None;
    }
    Some(rule)
}

/// Remove placeholder syntax that could not be resolved span-locally, e.g.
/// a placeholder inside tag markup or one whose text spans several elements.
fn strip_leftover_placeholders(html: &str) -> String {
    LEFTOVER_PLACEHOLDER
        .replace_all(html, |caps: &regex::Captures| caps[1].to_string())
        .replace(PLACEHOLDER_MARKER, "")
}

// ── Mode B: free text ─────────────────────────────────

/// Rules ordered by their longest keyword (longest first), ties kept in
/// rule order.
fn free_text_order(rules: &[LinkRule]) -> Vec<&LinkRule> {
    let mut ordered: Vec<&LinkRule> = rules.iter().collect();
    ordered.sort_by_key(|r| {
        std::cmp::Reverse(r.keywords.iter().map(|k| k.chars().count()).max().unwrap_or(0))
    });
    ordered
}

/// Case-insensitive pattern for a keyword as it appears in HTML text:
/// whitespace runs are flexible, `&` may be escaped, and word boundaries are
/// required at alphanumeric ends.
fn keyword_regex(keyword: &str) -> Option<Regex> {
    let norm = normalize_phrase(keyword);
    if norm.is_empty() {
        return None;
    }
    let body = norm
        .split(' ')
        .map(|word| {
            word.split('&')
                .map(|part| regex::escape(&html_escape(part)))
                .collect::<Vec<_>>()
                .join("(?:&amp;|&)")
        })
        .collect::<Vec<_>>()
        .join(r"\s+");

    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let prefix = if is_word(norm.chars().next()) { r"\b" } else { "" };
    let suffix = if is_word(norm.chars().last()) { r"\b" } else { "" };

    match Regex::new(&format!("(?i){}{}{}", prefix, body, suffix)) {
        Ok(re) => Some(re),
        Err(e) => {
            log::debug!("Skipping keyword '{}': {}", keyword, e);
            None
        }
    }
}

/// First match of any of the rule's keywords (longest keyword first) in a
/// linkable text span at or after `from`. Returns the span index and byte range.
fn find_keyword(
    spans: &[Span],
    from: usize,
    patterns: &[Regex],
) -> Option<(usize, std::ops::Range<usize>)> {
    for re in patterns {
        for (i, span) in spans.iter().enumerate().skip(from) {
            if let Span::Text {
                text,
                linkable: true,
            } = span
            {
                if let Some(m) = re.find(text) {
                    return Some((i, m.range()));
                }
            }
        }
    }
    None
}

/// Link the first occurrence of each rule's keyword, moving a cursor forward
/// past every inserted anchor. Text behind the cursor is never revisited.
fn scan_free_text(mut spans: Vec<Span>, rules: &[LinkRule], state: &mut LinkState) -> Vec<Span> {
    let mut cursor = 0;

    for rule in free_text_order(rules) {
        if !state.eligible(&rule.url) {
            continue;
        }

        let mut keywords: Vec<&String> = rule.keywords.iter().collect();
        keywords.sort_by_key(|k| std::cmp::Reverse(k.chars().count()));
        let patterns: Vec<Regex> = keywords.iter().filter_map(|k| keyword_regex(k)).collect();

        let Some((idx, range)) = find_keyword(&spans, cursor, &patterns) else {
            continue;
        };
        if state.at_cap() {
            state.capped = true;
            break;
        }

        let Span::Text { text, .. } = &spans[idx] else {
            continue;
        };
        let before = text[..range.start].to_string();
        let matched = text[range.clone()].to_string();
        let after = text[range.end..].to_string();

        let link = state.anchor(&rule.url, &matched);
        spans.splice(
            idx..=idx,
            [
                Span::Text {
                    text: before,
                    linkable: true,
                },
                Span::Link(link),
                Span::Text {
                    text: after,
                    linkable: true,
                },
            ],
        );
        cursor = idx + 2;
    }

    spans
}
