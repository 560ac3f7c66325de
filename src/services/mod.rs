pub mod events;
pub mod keywords;
pub mod linking;
pub mod quality;
pub mod sitemap;
pub mod url_mapper;

pub use events::{ContentEvent, EventBus};
pub use keywords::KeywordService;
pub use linking::LinkingEngine;
pub use quality::QualityReporter;
pub use sitemap::SitemapService;
