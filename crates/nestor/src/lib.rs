//! Nestor - Natural-Language Property Search
//!
//! Loads listing tables from local delimited files and answers free-text
//! queries such as "cheapest 2bhk in mumbai under 1cr" with a filtered,
//! ranked and rendered list of properties.

pub mod city;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod matching;
pub mod paraphrase;
pub mod price;
pub mod query;
pub mod ranking;
pub mod report;
pub mod session;
pub mod table;

pub use config::Config;
pub use engine::{Reply, SearchEngine, SearchResult, NO_MATCHES_MESSAGE};
pub use error::{NestorError, Result};
pub use query::{Filter, Intent};
pub use session::Session;
pub use table::{Record, Table, Value};
