//! Request, snapshot and result types shared by the pipelines, the server and the CLI

mod discovery;
mod requests;
mod snapshot;

pub use discovery::{DiscoveryResult, RecommendedRepo};
pub use requests::{AnalysisRequest, DiscoveryFilters, DiscoveryRequest, MAX_RESULTS_RANGE, MIN_QUERY_CHARS};
pub use snapshot::{ConfigFile, LanguageBytes, RepoSnapshot};
