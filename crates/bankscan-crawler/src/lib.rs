pub mod catalog;
pub mod detail;
pub mod error;
pub mod session;
pub mod wait;

mod dom;

pub use catalog::crawl_catalog;
pub use detail::extract_details;
pub use error::CrawlError;
pub use session::Session;
