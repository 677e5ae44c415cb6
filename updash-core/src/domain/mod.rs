//! Core domain entities
//!
//! Pure data structures and calculations - no I/O or external dependencies.

pub mod filter;
pub mod money;
pub mod resource;
pub mod result;
mod secret;
pub mod summary;

pub use filter::DateFilter;
pub use money::MonetaryAmount;
pub use resource::{
    Cursor, CursorKind, Page, PageLinks, UpAccount, UpCategory, UpTransaction,
};
pub use secret::{EncryptedSecret, StoredCredential, AUTH_TAG_LENGTH, IV_LENGTH};
pub use summary::{CategoryBreakdown, CategoryBucket, IncomeSpending, TrendPoint};
