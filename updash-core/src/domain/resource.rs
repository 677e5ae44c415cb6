//! Up Banking API resources and pagination models
//!
//! These mirror the JSON:API shapes the Up API returns. Unknown fields are
//! ignored so that additions on the remote side do not break decoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::money::MonetaryAmount;

/// Reference to another resource (`{ "type": ..., "id": ... }`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// A to-one relationship whose target may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<ResourceRef>,
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountAttributes {
    pub display_name: String,
    /// TRANSACTIONAL, SAVER or HOME_LOAN
    pub account_type: String,
    /// INDIVIDUAL or JOINT
    #[serde(default)]
    pub ownership_type: String,
    pub balance: MonetaryAmount,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpAccount {
    pub id: String,
    pub attributes: AccountAttributes,
}

// =============================================================================
// Transactions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAttributes {
    /// HELD or SETTLED
    pub status: String,
    #[serde(default)]
    pub raw_text: Option<String>,
    pub description: String,
    #[serde(default)]
    pub message: Option<String>,
    pub amount: MonetaryAmount,
    #[serde(default)]
    pub foreign_amount: Option<MonetaryAmount>,
    #[serde(default)]
    pub settled_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRelationships {
    #[serde(default)]
    pub account: Relationship,
    #[serde(default)]
    pub category: Relationship,
    #[serde(default)]
    pub parent_category: Relationship,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpTransaction {
    pub id: String,
    pub attributes: TransactionAttributes,
    #[serde(default)]
    pub relationships: TransactionRelationships,
}

impl UpTransaction {
    /// Amount in minor units
    pub fn amount(&self) -> i64 {
        self.attributes.amount.value_in_base_units
    }

    /// Category id, if the transaction has been categorized
    pub fn category_id(&self) -> Option<&str> {
        self.relationships
            .category
            .data
            .as_ref()
            .map(|r| r.id.as_str())
    }
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAttributes {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpCategory {
    pub id: String,
    pub attributes: CategoryAttributes,
}

// =============================================================================
// Pagination
// =============================================================================

/// Links to neighbouring pages; `None` means there is nothing in that direction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// One page of a list endpoint, items in server order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub links: PageLinks,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            links: PageLinks::default(),
        }
    }

    pub fn is_last(&self) -> bool {
        self.links.next.is_none()
    }
}

/// Direction a cursor points in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorKind {
    After,
    Before,
}

impl CursorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CursorKind::After => "after",
            CursorKind::Before => "before",
        }
    }

    /// The query parameter the Up API uses for this direction
    pub fn query_param(&self) -> &'static str {
        match self {
            CursorKind::After => "page[after]",
            CursorKind::Before => "page[before]",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "after" => Some(CursorKind::After),
            "before" => Some(CursorKind::Before),
            _ => None,
        }
    }
}

impl fmt::Display for CursorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque position in a remote collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub kind: CursorKind,
    pub value: String,
}

impl Cursor {
    pub fn after(value: impl Into<String>) -> Self {
        Self {
            kind: CursorKind::After,
            value: value.into(),
        }
    }

    pub fn before(value: impl Into<String>) -> Self {
        Self {
            kind: CursorKind::Before,
            value: value.into(),
        }
    }

    /// Extract the cursor from an absolute page link
    ///
    /// `page[after]` wins over `page[before]` when both are present. Returns
    /// `None` for missing links, unparseable URLs and links with no cursor.
    pub fn from_link(link: Option<&str>) -> Option<Self> {
        let url = Url::parse(link?).ok()?;
        let mut before = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "page[after]" if !value.is_empty() => return Some(Cursor::after(value)),
                "page[before]" if !value.is_empty() => before = Some(Cursor::before(value)),
                _ => {}
            }
        }
        before
    }
}
