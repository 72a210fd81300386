//! Orchestrator Services
//!
//! Each service composes the cache with one expensive collaborator and owns
//! entity construction for its artifact kind. Requests run their steps
//! sequentially; cache write-backs are detached so a client disconnect never
//! loses a computed result.

pub mod contracts;
pub mod dynamic_analysis;
pub mod static_analysis;
pub mod test_cases;

pub use contracts::ContractService;
pub use dynamic_analysis::DynamicAnalysisService;
pub use static_analysis::StaticAnalysisService;
pub use test_cases::TestCaseService;
