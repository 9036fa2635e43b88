use thiserror::Error;

use crate::seo::sitemap::SitemapError;

/// Contract violations in the parameters handed to the link engine.
/// Data-shape problems (bad HTML, unmatched placeholders) never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid link policy: {0}")]
    Configuration(String),
}

/// Failures of the full generate pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing site/sitemap_url")]
    MissingSitemap,
    #[error(transparent)]
    Sitemap(#[from] SitemapError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
