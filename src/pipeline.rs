use serde::{Deserialize, Serialize};

use crate::ai::LlmProvider;
use crate::config::Config;
use crate::content::draft::DraftMeta;
use crate::content::{apply_template, make_brief, write_draft, ArticleConfig, Brand};
use crate::error::PipelineError;
use crate::seo::inject::InjectionReport;
use crate::seo::{
    build_link_map, fetch_inventory, inject_with_report, InjectOptions, LinkPolicy, OverrideRule,
    SiteInventory,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub brand: Brand,
    #[serde(default)]
    pub article: ArticleConfig,
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateOutput {
    pub html: String,
    pub meta: DraftMeta,
    pub links: InjectionReport,
}

/// `brand.sitemap_url`, else `<site>/sitemap.xml`.
pub fn resolve_sitemap_url(brand: &Brand) -> Option<String> {
    if let Some(url) = brand.sitemap_url.as_deref().map(str::trim) {
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }
    let site = brand.site.trim();
    if site.is_empty() {
        return None;
    }
    url::Url::parse(site)
        .and_then(|base| base.join("/sitemap.xml"))
        .map(|u| u.to_string())
        .ok()
}

/// Link policy for a request: request values first, then config defaults.
pub fn resolve_policy(brand: &Brand, config: &Config) -> LinkPolicy {
    let defaults = &config.link_policy;
    let input = brand.link_policy.clone().unwrap_or_default();
    LinkPolicy {
        cap: input.max_internal.unwrap_or(defaults.max_internal),
        utm: input.utm.unwrap_or(defaults.utm),
        utm_campaign: defaults.utm_campaign.clone(),
    }
}

/// Run the whole generation flow for one request.
pub fn generate_article(
    config: &Config,
    provider: Option<&dyn LlmProvider>,
    request: &GenerateRequest,
) -> Result<GenerateOutput, PipelineError> {
    let sitemap_url = resolve_sitemap_url(&request.brand).ok_or(PipelineError::MissingSitemap)?;
    let inventory = fetch_inventory(&sitemap_url)?;
    render_article(config, provider, request, &inventory)
}

/// Everything after the sitemap fetch. Pure apart from provider calls.
pub fn render_article(
    config: &Config,
    provider: Option<&dyn LlmProvider>,
    request: &GenerateRequest,
    inventory: &SiteInventory,
) -> Result<GenerateOutput, PipelineError> {
    let policy = resolve_policy(&request.brand, config);
    let link_map = build_link_map(inventory, &request.overrides);

    let brief = make_brief(provider, &request.brand, &request.article, &link_map);
    let draft = write_draft(provider, &brief, &request.article);
    let html = apply_template(&draft);

    let options = InjectOptions {
        self_url: request.article.url.clone(),
    };
    let injection = inject_with_report(&html, &link_map, &policy, &options)?;

    log::info!(
        "Generated '{}' with {} internal links ({} rules available)",
        draft.meta.slug,
        injection.report.inserted,
        link_map.len()
    );

    Ok(GenerateOutput {
        html: injection.html,
        meta: draft.meta,
        links: injection.report,
    })
}
