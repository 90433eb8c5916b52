//! Store Adapter
//!
//! Serializes values into the raw store, optionally sealing them with a
//! secret, and reports missing or unreadable entries as [`Lookup::NotFound`].

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::KvStore;
use crate::crypto::Cipher;
use crate::error::Result;

// == Lookup ==
/// Outcome of reading a cached value.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// A value is stored under the key
    Found(Value),
    /// Nothing usable is stored under the key
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

/// On-disk representation of a cached value.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "format", content = "payload", rename_all = "lowercase")]
enum Envelope {
    Plain(Value),
    Sealed(String),
}

// == Store Adapter ==
/// Typed access to a [`KvStore`].
#[derive(Clone)]
pub struct StoreAdapter {
    store: Arc<dyn KvStore>,
    cipher: Arc<dyn Cipher>,
}

impl StoreAdapter {
    pub fn new(store: Arc<dyn KvStore>, cipher: Arc<dyn Cipher>) -> Self {
        Self { store, cipher }
    }

    // == Read ==
    /// Reads the value under `key`, decrypting it with `secret` when sealed.
    ///
    /// Corrupt entries (unparseable or failing decryption) are deleted and
    /// reported as not found. A sealed entry read without a secret is also
    /// not found but stays in place.
    pub fn read(&self, key: &str, secret: Option<&str>) -> Result<Lookup> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(Lookup::NotFound);
        };

        let envelope: Envelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => return self.discard_corrupt(key, &e.to_string()),
        };

        match (envelope, secret) {
            (Envelope::Plain(value), _) => Ok(Lookup::Found(value)),
            (Envelope::Sealed(_), None) => {
                warn!("Entry '{}' is encrypted and no secret was supplied", key);
                Ok(Lookup::NotFound)
            }
            (Envelope::Sealed(ciphertext), Some(secret)) => {
                let plaintext = match self.cipher.decrypt(&ciphertext, secret) {
                    Ok(plaintext) => plaintext,
                    Err(e) => return self.discard_corrupt(key, &e.to_string()),
                };
                match serde_json::from_str(&plaintext) {
                    Ok(value) => Ok(Lookup::Found(value)),
                    Err(e) => self.discard_corrupt(key, &e.to_string()),
                }
            }
        }
    }

    // == Write ==
    /// Stores `value` under `key`, sealing it when a secret is given.
    pub fn write(&self, key: &str, value: &Value, secret: Option<&str>) -> Result<()> {
        let envelope = match secret {
            Some(secret) => {
                let plaintext = serde_json::to_string(value)?;
                Envelope::Sealed(self.cipher.encrypt(&plaintext, secret)?)
            }
            None => Envelope::Plain(value.clone()),
        };
        self.store.set(key, serde_json::to_string(&envelope)?)
    }

    /// Deletes whatever is stored under `key`.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.delete(key)
    }

    /// Moves the raw entry under `from` to `to` without decoding it.
    ///
    /// Returns false if nothing was stored under `from`.
    pub fn move_raw(&self, from: &str, to: &str) -> Result<bool> {
        let Some(raw) = self.store.get(from)? else {
            return Ok(false);
        };
        self.store.delete(from)?;
        self.store.set(to, raw)?;
        Ok(true)
    }

    /// Lists every key of the underlying store.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.store.list_keys()
    }

    // == Records ==
    /// Reads an unencrypted bookkeeping record. Corrupt records are dropped.
    pub fn read_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Dropping corrupt record '{}': {}", key, e);
                self.store.delete(key)?;
                Ok(None)
            }
        }
    }

    /// Writes an unencrypted bookkeeping record.
    pub fn write_record<T: Serialize>(&self, key: &str, record: &T) -> Result<()> {
        self.store.set(key, serde_json::to_string(record)?)
    }

    fn discard_corrupt(&self, key: &str, reason: &str) -> Result<Lookup> {
        warn!("Discarding corrupt entry '{}': {}", key, reason);
        self.store.delete(key)?;
        Ok(Lookup::NotFound)
    }
}
