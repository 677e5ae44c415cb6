//! Derived aggregates over a collected set of resources
//!
//! Everything here is a pure function of its input slice: the same
//! transactions give the same result no matter how many pages it took to
//! assemble them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::resource::{UpAccount, UpTransaction};

/// Bucket id used for transactions without a category
pub const UNCATEGORIZED: &str = "uncategorized";

/// Number of distinct chart colors; buckets cycle through them by rank
pub const PALETTE_SIZE: usize = 5;

/// Income and spending totals in minor units
///
/// `spending` is the signed sum of negative amounts, so it is always `<= 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeSpending {
    pub income: i64,
    pub spending: i64,
}

impl IncomeSpending {
    pub fn from_amounts(amounts: impl IntoIterator<Item = i64>) -> Self {
        amounts.into_iter().fold(Self::default(), |mut acc, amount| {
            if amount > 0 {
                acc.income = acc.income.saturating_add(amount);
            } else if amount < 0 {
                acc.spending = acc.spending.saturating_add(amount);
            }
            acc
        })
    }

    pub fn from_transactions(transactions: &[UpTransaction]) -> Self {
        Self::from_amounts(transactions.iter().map(UpTransaction::amount))
    }

    /// Income plus (signed) spending
    pub fn net(&self) -> i64 {
        self.income.saturating_add(self.spending)
    }
}

/// Spending total for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBucket {
    pub category_id: String,
    pub name: String,
    /// Absolute spending in minor units
    pub total: i64,
    /// Chart color index, derived from the bucket's rank
    pub palette_slot: usize,
}

/// Spending grouped by category, largest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub buckets: Vec<CategoryBucket>,
    /// Absolute spending across all buckets
    pub total_spending: i64,
}

/// Group spending transactions by category
///
/// Only negative amounts count. Buckets are sorted by total, descending; ties
/// keep the order in which each category was first seen. `names` maps
/// category ids to display names; ids without an entry are shown as-is.
pub fn spending_by_category(
    transactions: &[UpTransaction],
    names: &HashMap<String, String>,
) -> CategoryBreakdown {
    let mut order: Vec<(String, i64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut total_spending = 0i64;

    for tx in transactions.iter().filter(|tx| tx.amount() < 0) {
        let id = tx.category_id().unwrap_or(UNCATEGORIZED);
        let abs = tx.amount().saturating_abs();
        total_spending = total_spending.saturating_add(abs);

        match index.get(id) {
            Some(&i) => order[i].1 = order[i].1.saturating_add(abs),
            None => {
                index.insert(id.to_string(), order.len());
                order.push((id.to_string(), abs));
            }
        }
    }

    // Vec::sort_by is stable, which keeps first-seen order for equal totals
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let buckets = order
        .into_iter()
        .enumerate()
        .map(|(rank, (category_id, total))| CategoryBucket {
            name: display_name(&category_id, names),
            category_id,
            total,
            palette_slot: rank % PALETTE_SIZE,
        })
        .collect();

    CategoryBreakdown {
        buckets,
        total_spending,
    }
}

fn display_name(category_id: &str, names: &HashMap<String, String>) -> String {
    if let Some(name) = names.get(category_id) {
        return name.clone();
    }
    if category_id == UNCATEGORIZED {
        "Uncategorized".to_string()
    } else {
        category_id.to_string()
    }
}

/// One point of the income vs spending chart
///
/// This is a presentation value: spending is shown as a positive number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: String,
    pub income: i64,
    pub spending: i64,
}

impl TrendPoint {
    pub fn new(month: impl Into<String>, totals: IncomeSpending) -> Self {
        Self {
            month: month.into(),
            income: totals.income,
            spending: totals.spending.saturating_abs(),
        }
    }
}

/// Sum of all account balances in minor units
pub fn total_balance(accounts: &[UpAccount]) -> i64 {
    accounts
        .iter()
        .map(|a| a.attributes.balance.value_in_base_units)
        .fold(0i64, i64::saturating_add)
}
