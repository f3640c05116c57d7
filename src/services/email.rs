//! Account email service
//!
//! The account's email addresses as an audited collection. Addresses are
//! validated before any write, and compared case-insensitively unless the
//! settings turn that off.

use std::sync::Arc;

use tracing::debug;

use super::collection::{update_policy, AuditedCollection, CollectionConfig};
use crate::audit::AuditRecord;
use crate::config::Settings;
use crate::error::{SyncError, SyncResult};
use crate::models::{AccountEmail, CallContext, EmailAddress, ObjectType, ParentId};
use crate::storage::{Database, Transaction};
use crate::sync::{EquivalenceResolver, SyncOutcome, SynchronizationPlan};

/// Service for an account's email addresses
pub struct AccountEmailService {
    emails: AuditedCollection<EmailAddress>,
}

impl AccountEmailService {
    /// Create a service configured from `settings`
    pub fn new(db: Arc<Database>, settings: &Settings) -> Self {
        let resolver = if settings.case_insensitive_email_keys {
            EquivalenceResolver::case_insensitive()
        } else {
            EquivalenceResolver::natural_key()
        };

        let config = CollectionConfig::new(ObjectType::AccountEmail)
            .with_resolver(resolver)
            .with_update_policy(update_policy(settings));

        Self {
            emails: AuditedCollection::new(db, config),
        }
    }

    /// All addresses of an account, ordered by address
    pub fn get_emails(&self, account: ParentId) -> SyncResult<Vec<AccountEmail>> {
        self.emails.get_all(account)
    }

    /// Replace the account's addresses with `addresses`
    pub fn save_emails(
        &self,
        account: ParentId,
        addresses: &[String],
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        let desired = build_emails(account, addresses)?;
        self.emails.save_all(account, desired, context)
    }

    /// Same as `save_emails`, inside a transaction the caller holds
    pub fn save_emails_in(
        &self,
        tx: &mut Transaction,
        account: ParentId,
        addresses: &[String],
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        let desired = build_emails(account, addresses)?;
        self.emails.save_all_in(tx, account, desired, context)
    }

    /// Preview what `save_emails` would change
    pub fn preview_emails(
        &self,
        account: ParentId,
        addresses: &[String],
    ) -> SyncResult<SynchronizationPlan<EmailAddress>> {
        let desired = build_emails(account, addresses)?;
        self.emails.plan(account, desired)
    }

    pub fn add_email(
        &self,
        account: ParentId,
        address: &str,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        let email = build_email(account, address)?;
        self.emails.add_one(account, email, context)
    }

    /// Remove an address; removing one the account does not have changes nothing
    pub fn remove_email(
        &self,
        account: ParentId,
        address: &str,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        let email = AccountEmail::email(account, address);
        if email.natural_key.is_empty() {
            return Err(SyncError::invalid_input("Email address cannot be empty"));
        }
        self.emails.remove_one(account, email, context)
    }

    pub fn email_history(&self, account: ParentId) -> SyncResult<Vec<AuditRecord>> {
        self.emails.history(account)
    }

    /// Check the store is reachable by running an empty transaction
    pub fn ping(&self) -> SyncResult<()> {
        let txid = self.emails.database().run_in_transaction(|tx| Ok(tx.id()))?;
        debug!(txid, "ping");
        Ok(())
    }
}

fn build_email(account: ParentId, address: &str) -> SyncResult<AccountEmail> {
    let email = AccountEmail::email(account, address);
    email
        .payload
        .validate()
        .map_err(|e| SyncError::invalid_input(e.to_string()))?;
    Ok(email)
}

fn build_emails(account: ParentId, addresses: &[String]) -> SyncResult<Vec<AccountEmail>> {
    addresses
        .iter()
        .map(|address| build_email(account, address))
        .collect()
}
