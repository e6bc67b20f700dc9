//! Gateway Adapters
//!
//! Implementations of the AnalysisGateway port.
//!
//! - **HttpAnalysisGateway** - reqwest client for the analysis service
//! - **MockAnalysisGateway** - configurable fake for tests

mod http_gateway;
mod mock_gateway;
mod wire;

pub use http_gateway::{HttpAnalysisGateway, HttpGatewayConfig};
pub use mock_gateway::{MockAnalysisGateway, MockCall, MockOperation, MOCK_CANDIDATE_ID};
