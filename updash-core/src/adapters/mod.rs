//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the CredentialStore port
//! - Up Banking HTTP client for ResourceApi

pub mod duckdb;
pub mod up_bank;

#[cfg(test)]
pub mod up_bank_mock;
