// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record encryption hook for the persistent adapters.
//
// No cipher ships with this crate. Callers plug one in through
// `CryptoSettings`; adapters then store `{id, data}` envelopes where `id` is
// the plaintext key (so keyed lookups keep working) and `data` is whatever
// the cipher produced. Matching always runs on decrypted records.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use datamanager_model::Record;

use crate::error::StoreError;

/// Encrypts and decrypts whole records.
pub trait RecordCipher: Send + Sync {
    fn encrypt(&self, record: &Record, options: &Value) -> Result<Value, StoreError>;
    fn decrypt(&self, payload: &Value, options: &Value) -> Result<Record, StoreError>;
}

/// A [`RecordCipher`] built from two closures.
pub struct FnCipher<E, D> {
    encrypt: E,
    decrypt: D,
}

impl<E, D> FnCipher<E, D>
where
    E: Fn(&Record, &Value) -> Result<Value, StoreError> + Send + Sync,
    D: Fn(&Value, &Value) -> Result<Record, StoreError> + Send + Sync,
{
    pub fn new(encrypt: E, decrypt: D) -> Self {
        Self { encrypt, decrypt }
    }
}

impl<E, D> RecordCipher for FnCipher<E, D>
where
    E: Fn(&Record, &Value) -> Result<Value, StoreError> + Send + Sync,
    D: Fn(&Value, &Value) -> Result<Record, StoreError> + Send + Sync,
{
    fn encrypt(&self, record: &Record, options: &Value) -> Result<Value, StoreError> {
        (self.encrypt)(record, options)
    }

    fn decrypt(&self, payload: &Value, options: &Value) -> Result<Record, StoreError> {
        (self.decrypt)(payload, options)
    }
}

/// A cipher plus the options passed to it on every call (keys, IVs, ...).
#[derive(Clone)]
pub struct CryptoSettings {
    pub cipher: Arc<dyn RecordCipher>,
    pub options: Value,
}

impl CryptoSettings {
    pub fn new(cipher: impl RecordCipher + 'static) -> Self {
        Self {
            cipher: Arc::new(cipher),
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    /// Wrap `record` as `{id, data}`. The `id` member is omitted for keyless
    /// records.
    pub fn seal(&self, record: &Record, record_id: &str) -> Result<Value, StoreError> {
        let data = self.cipher.encrypt(record, &self.options)?;
        let mut envelope = Map::new();
        if let Some(key) = record.key(record_id) {
            envelope.insert("id".to_string(), key.clone());
        }
        envelope.insert("data".to_string(), data);
        Ok(Value::Object(envelope))
    }

    /// Decrypt an envelope produced by [`CryptoSettings::seal`].
    pub fn unseal(&self, envelope: &Value) -> Result<Record, StoreError> {
        let data = envelope
            .get("data")
            .ok_or_else(|| StoreError::Crypto("envelope has no data member".to_string()))?;
        self.cipher.decrypt(data, &self.options)
    }
}

impl fmt::Debug for CryptoSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoSettings")
            .field("cipher", &"<dyn RecordCipher>")
            .field("options", &self.options)
            .finish()
    }
}

/// Stored form of `record`: an envelope when a cipher is configured, else the
/// record itself.
pub(crate) fn encode(
    crypto: Option<&CryptoSettings>,
    record: &Record,
    record_id: &str,
) -> Result<Value, StoreError> {
    match crypto {
        Some(crypto) => crypto.seal(record, record_id),
        None => Ok(Value::Object(record.fields().clone())),
    }
}

/// Inverse of [`encode`].
pub(crate) fn decode(crypto: Option<&CryptoSettings>, stored: Value) -> Result<Record, StoreError> {
    match crypto {
        Some(crypto) => crypto.unseal(&stored),
        None => Ok(Record::try_from(stored)?),
    }
}

#[cfg(test)]
pub(crate) mod test_cipher {
    use super::*;

    /// Reversible stand-in cipher: the record's JSON text, reversed.
    pub fn reversing() -> CryptoSettings {
        CryptoSettings::new(FnCipher::new(
            |record: &Record, _: &Value| {
                let text = serde_json::to_string(record)?;
                Ok(Value::String(text.chars().rev().collect()))
            },
            |payload: &Value, _: &Value| {
                let text = payload
                    .as_str()
                    .ok_or_else(|| StoreError::Crypto("payload is not a string".into()))?;
                let plain: String = text.chars().rev().collect();
                Ok(serde_json::from_str(&plain)?)
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::test_cipher::reversing;
    use super::*;
    use serde_json::json;

    fn rec(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn test_seal_keeps_plaintext_key() {
        let crypto = reversing();
        let sealed = crypto.seal(&rec(json!({"id": 7, "secret": "x"})), "id").unwrap();
        assert_eq!(sealed["id"], json!(7));
        assert!(!sealed["data"].as_str().unwrap().contains("\"secret\""));
    }

    #[test]
    fn test_unseal_restores_record() {
        let crypto = reversing();
        let record = rec(json!({"id": "a", "n": [1, 2]}));
        let sealed = crypto.seal(&record, "id").unwrap();
        assert_eq!(crypto.unseal(&sealed).unwrap(), record);
    }

    #[test]
    fn test_keyless_record_has_no_id_member() {
        let sealed = reversing().seal(&rec(json!({"n": 1})), "id").unwrap();
        assert!(sealed.get("id").is_none());
    }

    #[test]
    fn test_unseal_without_data_fails() {
        let err = reversing().unseal(&json!({"id": 1})).unwrap_err();
        assert!(matches!(err, StoreError::Crypto(_)));
    }

    #[test]
    fn test_plain_encode_decode() {
        let record = rec(json!({"id": 1}));
        let stored = encode(None, &record, "id").unwrap();
        assert_eq!(stored, json!({"id": 1}));
        assert_eq!(decode(None, stored).unwrap(), record);
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = decode(None, json!([1])).unwrap_err();
        assert!(matches!(err, StoreError::Model(_)));
    }
}
