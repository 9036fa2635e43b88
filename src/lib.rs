#[macro_use]
extern crate rocket;

pub mod ai;
pub mod config;
pub mod content;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod seo;


pub use error::{EngineError, PipelineError};
pub use seo::{
    build_link_map, inject_internal_links, LinkPolicy, LinkRule, OverrideRule, SiteInventory,
};
