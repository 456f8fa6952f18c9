// src/app/accounts.rs

//! A minimal accounts domain: open an account, deposit into it, read it back.

use crate::core::handler::ActionHandler;
use crate::core::invocation::PendingInvocation;
use crate::core::response::ActionResponse;
use crate::core::storage::MemoryStore;
use crate::core::validation::{FieldFailure, ValidationVerdict, Validator};
use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const MAX_DISPLAY_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccount {
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub email: String,
    pub amount_cents: i64,
}

/// The stored form of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub display_name: String,
    pub balance_cents: i64,
}

fn account_key(email: &str) -> String {
    format!("account:{}", email.to_ascii_lowercase())
}

fn check_email(email: &str, failures: &mut Vec<FieldFailure>) {
    if !email.contains('@') {
        failures.push(FieldFailure::new("email", "must contain @"));
    }
}

pub struct OpenAccountValidator;

impl Validator<OpenAccount> for OpenAccountValidator {
    fn validate(&self, instance: &OpenAccount) -> Option<ValidationVerdict> {
        let mut failures = Vec::new();
        check_email(&instance.email, &mut failures);
        let name = instance.display_name.trim();
        if name.is_empty() {
            failures.push(FieldFailure::new("display_name", "must not be empty"));
        } else if name.chars().count() > MAX_DISPLAY_NAME_LEN {
            failures.push(FieldFailure::new(
                "display_name",
                format!("must be at most {MAX_DISPLAY_NAME_LEN} characters"),
            ));
        }
        Some(ValidationVerdict::from_failures(failures))
    }
}

pub struct DepositValidator;

impl Validator<Deposit> for DepositValidator {
    fn validate(&self, instance: &Deposit) -> Option<ValidationVerdict> {
        let mut failures = Vec::new();
        check_email(&instance.email, &mut failures);
        if instance.amount_cents <= 0 {
            failures.push(FieldFailure::new("amount_cents", "must be greater than 0"));
        }
        Some(ValidationVerdict::from_failures(failures))
    }
}

fn load_account(
    store: &MemoryStore,
    request_id: u64,
    email: &str,
) -> anyhow::Result<Option<Account>> {
    store
        .get(request_id, &account_key(email))
        .map(serde_json::from_value::<Account>)
        .transpose()
        .context("stored account is corrupt")
}

pub struct OpenAccountHandler {
    store: MemoryStore,
}

impl OpenAccountHandler {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActionHandler for OpenAccountHandler {
    async fn call(&self, invocation: &PendingInvocation) -> anyhow::Result<ActionResponse> {
        let request = invocation
            .argument::<OpenAccount>("account")
            .ok_or_else(|| anyhow!("missing required argument 'account'"))?;
        let id = invocation.request_id();

        if load_account(&self.store, id, &request.email)?.is_some() {
            bail!("account '{}' already exists", request.email);
        }

        let account = Account {
            email: request.email.clone(),
            display_name: request.display_name.trim().to_string(),
            balance_cents: 0,
        };
        self.store
            .put(id, account_key(&account.email), serde_json::to_value(&account)?)?;
        Ok(ActionResponse::new(201, json!(account)))
    }
}

pub struct DepositHandler {
    store: MemoryStore,
}

impl DepositHandler {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActionHandler for DepositHandler {
    async fn call(&self, invocation: &PendingInvocation) -> anyhow::Result<ActionResponse> {
        let deposit = invocation
            .argument::<Deposit>("deposit")
            .ok_or_else(|| anyhow!("missing required argument 'deposit'"))?;
        let id = invocation.request_id();

        let mut account = load_account(&self.store, id, &deposit.email)?
            .ok_or_else(|| anyhow!("account '{}' does not exist", deposit.email))?;
        account.balance_cents = account
            .balance_cents
            .checked_add(deposit.amount_cents)
            .ok_or_else(|| anyhow!("balance overflow for account '{}'", deposit.email))?;

        self.store
            .put(id, account_key(&account.email), serde_json::to_value(&account)?)?;
        Ok(ActionResponse::ok(json!(account)))
    }
}

pub struct GetAccountHandler {
    store: MemoryStore,
}

impl GetAccountHandler {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActionHandler for GetAccountHandler {
    async fn call(&self, invocation: &PendingInvocation) -> anyhow::Result<ActionResponse> {
        let email = invocation
            .argument::<String>("email")
            .ok_or_else(|| anyhow!("missing required argument 'email'"))?;

        match load_account(&self.store, invocation.request_id(), email)? {
            Some(account) => Ok(ActionResponse::ok(json!(account))),
            None => Ok(ActionResponse::new(
                404,
                json!({ "Error": true, "Message": format!("account '{email}' not found") }),
            )),
        }
    }
}
