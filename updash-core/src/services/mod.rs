//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod credential;
pub mod dashboard;
pub mod endpoints;
pub mod listing;
pub mod logging;
pub mod migration;
pub mod pagination;
pub mod resources;
pub mod vault;

pub use credential::{validate_token, CredentialService, CredentialState, CredentialStatus};
pub use dashboard::{
    AnalyticsView, CredentialProblem, DashboardService, DashboardView, MonthSummary, ViewOutcome,
};
pub use endpoints::{ApiHandlers, ApiResponse};
pub use listing::{Completion, ListingState, ListingView, Ticket};
pub use logging::{EntryPoint, EventCount, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use pagination::{collect_all, AggregationError, AggregationRun, ResourceQuery};
pub use resources::{Aggregated, FetchSettings, ResourceService, TransactionsQuery};
pub use vault::{TokenVault, VaultKey};
