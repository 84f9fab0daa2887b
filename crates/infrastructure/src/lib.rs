pub mod database;
pub mod http;

pub use database::Database;
pub use http::{HttpLinkValidator, HttpSourceFetcher};
