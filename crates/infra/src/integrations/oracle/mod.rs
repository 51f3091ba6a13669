//! Oracle SCM cloud integration
//!
//! - `auth`: interactive OAuth orchestration and the bearer-token front door
//! - `callback`: loopback listener for the authorization redirect
//! - `soap`: BI Publisher SOAP envelopes and response framing
//! - `report`: report execution and chunked download pipeline

pub mod auth;
pub mod callback;
pub mod report;
pub mod soap;

pub use auth::OracleAuthManager;
pub use callback::CallbackServer;
pub use report::{AccessTokenProvider, ReportDownload, ReportService};
