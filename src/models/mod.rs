mod content;
mod keyword;
mod links;
mod report;
mod sitemap;

pub use content::*;
pub use keyword::*;
pub use links::*;
pub use report::*;
pub use sitemap::*;
