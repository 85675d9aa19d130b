/// Account resolution: one CA account per (email, directory URL)
use crate::error::{IssuerError, Result};
use crate::model::Account;
use crate::store::CertificateStore;
use certdesk_acme::{AccountKey, AcmeError, AcmeTransport, Credentials, Registration};
use certdesk_crypto::{Encryptor, KeyType, PrivateKey, generate_key};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// An account together with its decrypted signing key.
#[derive(Debug)]
pub struct ResolvedAccount {
    pub account: Account,
    pub key: AccountKey,
}

impl ResolvedAccount {
    /// Request credentials. Fails if the CA never accepted the account.
    pub fn credentials(&self) -> Result<Credentials<'_>> {
        let registration = self.account.registration.as_ref().ok_or_else(|| {
            IssuerError::InvalidState(format!("account {} is not registered", self.account.id))
        })?;
        Ok(Credentials::new(&self.key, &registration.account_url))
    }
}

/// Finds or creates CA accounts.
///
/// New accounts get a P-256 key, stored encrypted before registration so a
/// registration that fails halfway is retried with the same key.
pub struct AccountManager {
    store: Arc<dyn CertificateStore>,
    transport: Arc<dyn AcmeTransport>,
    encryptor: Arc<Encryptor>,
    directory_url: String,
}

impl AccountManager {
    pub fn new(
        store: Arc<dyn CertificateStore>,
        transport: Arc<dyn AcmeTransport>,
        encryptor: Arc<Encryptor>,
        directory_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            encryptor,
            directory_url: directory_url.into(),
        }
    }

    pub fn directory_url(&self) -> &str {
        &self.directory_url
    }

    /// Return the registered account for `email`, creating it if needed.
    pub async fn resolve(&self, email: &str) -> Result<ResolvedAccount> {
        let email = email.trim();
        if email.is_empty() {
            return Err(IssuerError::Validation("email is required".to_string()));
        }

        let mut account = match self.store.find_account(email, &self.directory_url).await? {
            Some(account) => account,
            None => {
                let pem = generate_key(KeyType::Ecc, 256)?.to_pem()?;
                let account = Account::new(
                    email,
                    &self.directory_url,
                    self.encryptor.encrypt_string(&pem)?,
                );
                self.store.save_account(&account).await?;
                tracing::info!(account_id = %account.id, email = %email, "Created account key");
                account
            }
        };

        let key = self.account_key(&account)?;

        if account.registration.is_none() {
            let registration = self.register(&key, email).await?;
            account.registration = Some(registration);
            account.updated_at = Utc::now();
            self.store.save_account(&account).await?;
        }

        Ok(ResolvedAccount { account, key })
    }

    /// Load a stored account by id.
    pub async fn load(&self, account_id: Uuid) -> Result<ResolvedAccount> {
        let account = self
            .store
            .get_account(account_id)
            .await?
            .ok_or_else(|| IssuerError::NotFound(format!("account {}", account_id)))?;
        let key = self.account_key(&account)?;
        Ok(ResolvedAccount { account, key })
    }

    fn account_key(&self, account: &Account) -> Result<AccountKey> {
        let pem = self.encryptor.decrypt_string(&account.encrypted_private_key)?;
        let key = PrivateKey::from_pem(&pem)?;
        Ok(AccountKey::from_private_key(&key)?)
    }

    async fn register(&self, key: &AccountKey, email: &str) -> Result<Registration> {
        match self.transport.register(key, &[email.to_string()]).await {
            Ok(registration) => Ok(registration),
            Err(AcmeError::AccountAlreadyExists { account_url }) => {
                tracing::info!(
                    account_url = %account_url,
                    "Account already registered, looking it up"
                );
                Ok(self.transport.lookup_account(key).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("directory_url", &self.directory_url)
            .finish_non_exhaustive()
    }
}
