pub mod error;
pub mod fraud;
pub mod models;
pub mod parser;
pub mod resolve;
pub mod tracking;

pub use error::{AdError, Result};
pub use fraud::{
    EventMetadata, FraudCheck, FraudConfig, FraudDetection, FraudFlag, InMemoryFraudDetection,
};
pub use models::{Offset, Vast};
pub use parser::parse;
pub use resolve::{resolve_wrappers, HttpFetcher, VastFetcher, DEFAULT_MAX_WRAPPER_DEPTH};
pub use tracking::{
    AdRepository, ClickOutcome, ImpressionOutcome, TrackAdClick, TrackAdImpression,
};
