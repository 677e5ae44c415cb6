//! Shared fakes for unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::domain::result::{Error, Result};
use crate::domain::StoredCredential;
use crate::ports::{CredentialStore, ResourceApi};
use crate::services::credential::CredentialService;
use crate::services::vault::{TokenVault, VaultKey};

/// Canned replies per collection, e.g. "transactions" or "accounts"
///
/// The collection is the first path segment of the requested target. Each
/// fetch pops the next reply for that collection; running out is an error.
#[derive(Default)]
pub struct FakeApi {
    replies: Mutex<HashMap<String, VecDeque<Result<JsonValue>>>>,
    targets: Mutex<Vec<String>>,
    tokens: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, collection: &str, reply: Result<JsonValue>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

fn collection_of(target: &str) -> String {
    let path = target
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map_or("", |(_, p)| p))
        .unwrap_or(target);
    let path = path.strip_prefix("api/v1/").unwrap_or(path);
    path.split(['?', '/']).next().unwrap_or("").to_string()
}

#[async_trait]
impl ResourceApi for FakeApi {
    async fn fetch(&self, target: &str, token: &str) -> Result<JsonValue> {
        self.targets.lock().unwrap().push(target.to_string());
        self.tokens.lock().unwrap().push(token.to_string());
        let collection = collection_of(target);
        self.replies
            .lock()
            .unwrap()
            .get_mut(&collection)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(Error::Other(format!("no reply for {}", collection))))
    }
}

/// HashMap-backed credential store
#[derive(Default)]
pub struct MemoryStore {
    pub rows: Mutex<HashMap<String, StoredCredential>>,
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<StoredCredential>> {
        Ok(self.rows.lock().unwrap().get(user_id).cloned())
    }

    async fn update(&self, user_id: &str, credential: &StoredCredential) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert(user_id.to_string(), credential.clone());
        Ok(())
    }
}

/// Credential service over a fresh key and an empty memory store
pub fn credential_service() -> (Arc<CredentialService>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let vault = Arc::new(TokenVault::new(&VaultKey::generate()).unwrap());
    let service = CredentialService::new(store.clone(), vault);
    (Arc::new(service), store)
}

pub fn page_json(data: Vec<JsonValue>, next: Option<&str>) -> JsonValue {
    json!({ "data": data, "links": { "prev": null, "next": next } })
}

pub fn account_json(id: &str, name: &str, balance: i64) -> JsonValue {
    json!({
        "id": id,
        "attributes": {
            "displayName": name,
            "accountType": "TRANSACTIONAL",
            "ownershipType": "INDIVIDUAL",
            "balance": money_json(balance),
            "createdAt": "2024-01-01T00:00:00+10:00"
        }
    })
}

pub fn transaction_json(id: &str, amount: i64, category: Option<&str>) -> JsonValue {
    json!({
        "id": id,
        "attributes": {
            "status": "SETTLED",
            "description": format!("Merchant {}", id),
            "amount": money_json(amount),
            "createdAt": "2025-03-10T09:30:00+11:00"
        },
        "relationships": {
            "category": { "data": category.map(|c| json!({ "type": "categories", "id": c })) }
        }
    })
}

pub fn category_json(id: &str, name: &str) -> JsonValue {
    json!({ "id": id, "attributes": { "name": name } })
}

fn money_json(value: i64) -> JsonValue {
    let sign = if value < 0 { "-" } else { "" };
    json!({
        "currencyCode": "AUD",
        "value": format!("{}{}.{:02}", sign, value.abs() / 100, value.abs() % 100),
        "valueInBaseUnits": value
    })
}
