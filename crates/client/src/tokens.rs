//! Access/refresh token storage.
//!
//! Tokens live in the session scope. Older clients kept them in the
//! persistent scope; those copies are moved over the first time they are
//! read and never written there again.

use crate::storage::{keys, KeyValueStore, KeyValueStoreExt};
use gymdesk_core::error::GymResult;
use gymdesk_core::User;
use std::sync::Arc;

#[derive(Clone)]
pub struct TokenStore {
    session: Arc<dyn KeyValueStore>,
    persistent: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(session: Arc<dyn KeyValueStore>, persistent: Arc<dyn KeyValueStore>) -> Self {
        Self {
            session,
            persistent,
        }
    }

    pub fn access_token(&self) -> GymResult<Option<String>> {
        self.read_migrating(keys::TOKEN)
    }

    pub fn refresh_token(&self) -> GymResult<Option<String>> {
        self.read_migrating(keys::REFRESH_TOKEN)
    }

    pub fn set_tokens(&self, access: &str, refresh: &str) -> GymResult<()> {
        self.session.set(keys::TOKEN, access)?;
        self.session.set(keys::REFRESH_TOKEN, refresh)?;
        self.persistent.remove(keys::TOKEN)?;
        self.persistent.remove(keys::REFRESH_TOKEN)?;
        Ok(())
    }

    /// Removes every copy of both tokens and the cached user.
    pub fn clear_tokens(&self) -> GymResult<()> {
        for key in [keys::TOKEN, keys::REFRESH_TOKEN] {
            self.session.remove(key)?;
            self.persistent.remove(key)?;
        }
        self.persistent.remove(keys::USER)?;
        Ok(())
    }

    pub fn user(&self) -> GymResult<Option<User>> {
        self.persistent.get_json(keys::USER)
    }

    pub fn set_user(&self, user: &User) -> GymResult<()> {
        self.persistent.set_json(keys::USER, user)
    }

    fn read_migrating(&self, key: &str) -> GymResult<Option<String>> {
        if let Some(token) = self.session.get(key)? {
            return Ok(Some(token));
        }

        match self.persistent.get(key)? {
            Some(legacy) => {
                tracing::debug!(key, "migrating legacy token into session scope");
                self.session.set(key, &legacy)?;
                self.persistent.remove(key)?;
                Ok(Some(legacy))
            }
            None => Ok(None),
        }
    }
}
