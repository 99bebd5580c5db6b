//! IBOV Core: fetch, validate and transform the B3 daily index composition.
//!
//! This crate covers everything up to the in-memory table:
//! - Column contract and local file layout (`schema`)
//! - Windows-1252 text codec (`text`)
//! - Two-request fetch with JSON/CSV payload sniffing (`fetch`)
//! - Two-attempt parse and required-column validation (`validate`)
//! - Whitespace trimming, locale number coercion, date stamping (`transform`)

pub mod fetch;
pub mod schema;
pub mod text;
pub mod transform;
pub mod validate;

pub use fetch::{B3Fetcher, FetchConfig, FetchError, PortfolioSource};
pub use schema::{RawTable, REQUIRED_COLUMNS};
pub use transform::{process, ProcessingError};
pub use validate::{validate, ParseOutcome, ParseStrategy, ValidationError};
