pub mod lavoz;
pub mod traits;
pub mod types;

pub use lavoz::LavozScraper;
pub use traits::ListingSource;
