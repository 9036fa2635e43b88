pub mod brief;
pub mod draft;
pub mod template;

pub use brief::{make_brief, ArticleConfig, Brand, Brief};
pub use draft::{write_draft, Draft};
pub use template::apply_template;
