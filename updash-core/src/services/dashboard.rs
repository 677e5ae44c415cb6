//! Dashboard service - the overview and analytics views
//!
//! Each view resolves the user's token once, then runs its independent
//! fetches concurrently and waits for all of them. A failing part never
//! cancels or hides the others.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::summary::{spending_by_category, total_balance};
use crate::domain::{
    CategoryBreakdown, DateFilter, IncomeSpending, Page, TrendPoint, UpAccount, UpTransaction,
};
use crate::services::credential::{CredentialService, CredentialState};
use crate::services::pagination::AggregationRun;
use crate::services::resources::ResourceService;

/// Why a view could not use the stored token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialProblem {
    /// No token stored yet
    NotConfigured,
    /// A token is stored but cannot be decrypted
    DecryptionFailed,
    /// The Up API refused the token
    TokenRejected,
}

impl CredentialProblem {
    pub fn message(&self) -> &'static str {
        match self {
            CredentialProblem::NotConfigured => {
                "API token not configured. Please add your Up Banking token in Settings."
            }
            CredentialProblem::DecryptionFailed => {
                "Failed to decrypt your API token. Please re-enter it in Settings."
            }
            CredentialProblem::TokenRejected => {
                "Your Up Banking token seems invalid or expired. Please update it in Settings."
            }
        }
    }
}

/// A view, or the reason it needs a (new) token first
#[derive(Debug)]
pub enum ViewOutcome<T> {
    NeedsToken(CredentialProblem),
    Ready(T),
}

/// Income and spending for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month: Option<String>,
    pub filter: DateFilter,
    pub totals: IncomeSpending,
    pub transaction_count: usize,
    /// All pages were read; false when the page cap stopped the walk
    pub complete: bool,
    pub warnings: Vec<String>,
}

impl MonthSummary {
    fn from_run(filter: DateFilter, run: &AggregationRun<UpTransaction>) -> Self {
        Self {
            month: filter.month_label(),
            filter,
            totals: IncomeSpending::from_transactions(&run.items),
            transaction_count: run.items.len(),
            complete: run.is_complete(),
            warnings: run.warnings(),
        }
    }
}

/// The overview screen; each part carries its own outcome
#[derive(Debug)]
pub struct DashboardView {
    pub accounts: Result<AggregationRun<UpAccount>>,
    /// Sum of balances, present when accounts loaded
    pub total_balance: Option<i64>,
    pub recent: Result<Page<UpTransaction>>,
    pub month: Result<MonthSummary>,
}

impl DashboardView {
    /// Set when any part was refused by the Up API
    pub fn credential_problem(&self) -> Option<CredentialProblem> {
        let rejected = [
            self.accounts.as_ref().err(),
            self.recent.as_ref().err(),
            self.month.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .any(|e| matches!(e, Error::RemoteAuth(_)));
        rejected.then_some(CredentialProblem::TokenRejected)
    }
}

/// Spending by category for one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsView {
    pub month: Option<String>,
    pub breakdown: CategoryBreakdown,
    pub trend: TrendPoint,
    pub complete: bool,
    pub warnings: Vec<String>,
}

/// Service assembling views from the credential and resource services
pub struct DashboardService {
    credentials: Arc<CredentialService>,
    resources: Arc<ResourceService>,
}

impl DashboardService {
    pub fn new(credentials: Arc<CredentialService>, resources: Arc<ResourceService>) -> Self {
        Self {
            credentials,
            resources,
        }
    }

    async fn token(&self, user_id: &str) -> Result<std::result::Result<String, CredentialProblem>> {
        Ok(match self.credentials.get_decrypted_credential(user_id).await? {
            CredentialState::Ready(token) => Ok(token),
            CredentialState::NotConfigured => Err(CredentialProblem::NotConfigured),
            CredentialState::DecryptionFailed => Err(CredentialProblem::DecryptionFailed),
        })
    }

    /// Accounts, the first page of transactions and this month's totals
    ///
    /// `now` picks the calendar month (UTC).
    pub async fn dashboard(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ViewOutcome<DashboardView>> {
        let token = match self.token(user_id).await? {
            Ok(token) => token,
            Err(problem) => return Ok(ViewOutcome::NeedsToken(problem)),
        };

        let filter = DateFilter::month_containing(now);
        let recent_size = self.resources.settings().recent_page_size;
        let (accounts, recent, month) = tokio::join!(
            self.resources.list_accounts(&token),
            self.resources.recent_transactions(&token, recent_size),
            self.resources.transactions_in_range(&token, filter),
        );

        let accounts = accounts.map_err(Error::from);
        let total = accounts.as_ref().ok().map(|run| total_balance(&run.items));
        let month = month
            .map(|run| MonthSummary::from_run(filter, &run))
            .map_err(Error::from);

        Ok(ViewOutcome::Ready(DashboardView {
            accounts,
            total_balance: total,
            recent,
            month,
        }))
    }

    /// Spending by category and the income/spending trend point
    ///
    /// The month's transactions are required. The category list only
    /// supplies names; when it fails, buckets are labelled by id.
    pub async fn analytics(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ViewOutcome<AnalyticsView>> {
        let token = match self.token(user_id).await? {
            Ok(token) => token,
            Err(problem) => return Ok(ViewOutcome::NeedsToken(problem)),
        };

        let filter = DateFilter::month_containing(now);
        let (transactions, categories) = tokio::join!(
            self.resources.transactions_in_range(&token, filter),
            self.resources.list_categories(&token),
        );

        let run = match transactions {
            Ok(run) => run,
            Err(failure) => {
                return match failure.error {
                    Error::RemoteAuth(_) => {
                        Ok(ViewOutcome::NeedsToken(CredentialProblem::TokenRejected))
                    }
                    error => Err(error),
                }
            }
        };

        let mut warnings = run.warnings();
        let names: HashMap<String, String> = match categories {
            Ok(categories) => categories
                .into_iter()
                .map(|c| (c.id, c.attributes.name))
                .collect(),
            Err(error) => {
                warnings.push(format!(
                    "Category names unavailable: {}",
                    error.user_message()
                ));
                HashMap::new()
            }
        };

        let totals = IncomeSpending::from_transactions(&run.items);
        let month = filter.month_label();
        Ok(ViewOutcome::Ready(AnalyticsView {
            breakdown: spending_by_category(&run.items, &names),
            trend: TrendPoint::new(month.clone().unwrap_or_default(), totals),
            month,
            complete: run.is_complete(),
            warnings,
        }))
    }
}
