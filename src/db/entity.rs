pub mod api_cache;
pub mod bookmark;
pub mod sentiment;

pub use api_cache::Entity as ApiCacheRows;
pub use api_cache::Model as ApiCacheRow;
pub use bookmark::Entity as Bookmarks;
pub use bookmark::Model as Bookmark;
pub use sentiment::Entity as CoinSentiments;
pub use sentiment::Model as CoinSentiment;
