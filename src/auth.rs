//! Verification of the signed `initData` string the host platform hands to
//! the embedded web client.
//!
//! The signature is HMAC-SHA256 over the *data-check string* (every field
//! except `hash`, sorted by key, joined as `key=value` lines), keyed by
//! `HMAC-SHA256(key = "WebAppData", message = bot_token)`.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

pub const HASH_FIELD: &str = "hash";
pub const AUTH_DATE_FIELD: &str = "auth_date";
pub const USER_FIELD: &str = "user";

const KEY_LABEL: &[u8] = b"WebAppData";

/// Decoded `initData` pairs in arrival order. A key may repeat; every pair
/// takes part in the data-check string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitData {
    fields: Vec<(String, String)>,
}

impl InitData {
    /// Decode a url-encoded `initData` string.
    pub fn parse(raw: &str) -> Self {
        Self {
            fields: url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key` to a single value, replacing every existing pair for it.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter().position(|(k, _)| *k == key) {
            Some(pos) => {
                self.fields[pos].1 = value;
                let mut index = 0;
                self.fields.retain(|(k, _)| {
                    let keep = *k != key || index == pos;
                    index += 1;
                    keep
                });
            }
            None => self.fields.push((key, value)),
        }
    }

    /// Remove every pair for `key`, returning the first value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let first = self.get(key).map(str::to_string);
        self.fields.retain(|(k, _)| k != key);
        first
    }

    pub fn auth_date(&self) -> Option<i64> {
        self.get(AUTH_DATE_FIELD)?.parse().ok()
    }

    /// `key=value` lines of every pair except `hash`, stably sorted by key.
    pub fn data_check_string(&self) -> String {
        let mut pairs: Vec<_> = self
            .fields
            .iter()
            .filter(|(key, _)| key != HASH_FIELD)
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Re-encode as a url-encoded query string.
    pub fn to_query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

/// Identity bound to a connection after a successful `authenticate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedUser {
    /// The `id` of the `user` object, as sent (number or string).
    pub id: serde_json::Value,
    pub auth_date: i64,
}

impl AuthenticatedUser {
    /// String form of the id, for logs and persisted records.
    pub fn id_string(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

fn keyed_mac(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
}

/// Per-application key derived from the bot token.
pub fn secret_key(bot_token: &str) -> [u8; 32] {
    let mut mac = keyed_mac(KEY_LABEL);
    mac.update(bot_token.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    key
}

fn data_check_mac(init_data: &InitData, bot_token: &str) -> HmacSha256 {
    let mut mac = keyed_mac(&secret_key(bot_token));
    mac.update(init_data.data_check_string().as_bytes());
    mac
}

/// Lowercase hex signature the platform would attach to `init_data`.
pub fn sign(init_data: &InitData, bot_token: &str) -> String {
    hex::encode(data_check_mac(init_data, bot_token).finalize().into_bytes())
}

/// Checks the `hash` field against the data-check string in constant time.
pub fn verify_signature(init_data: &InitData, bot_token: &str) -> bool {
    let Some(hash) = init_data.get(HASH_FIELD) else {
        return false;
    };
    // The platform only emits lowercase hex.
    if !hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return false;
    }
    let Ok(expected) = hex::decode(hash) else {
        return false;
    };
    data_check_mac(init_data, bot_token)
        .verify_slice(&expected)
        .is_ok()
}

/// `auth_date` is no more than `max_age_secs` in the past.
pub fn is_fresh(auth_date: i64, now: i64, max_age_secs: i64) -> bool {
    now.saturating_sub(auth_date) <= max_age_secs
}

/// Signature and freshness together.
pub fn verify(init_data: &InitData, bot_token: &str, now: i64, max_age_secs: i64) -> bool {
    verify_signature(init_data, bot_token)
        && init_data
            .auth_date()
            .is_some_and(|date| is_fresh(date, now, max_age_secs))
}

fn user_id(raw_user: &str) -> Option<serde_json::Value> {
    let user: serde_json::Value = serde_json::from_str(raw_user).ok()?;
    match user.get("id")? {
        id @ (serde_json::Value::Number(_) | serde_json::Value::String(_)) => Some(id.clone()),
        _ => None,
    }
}

/// Full check of a raw `initData` string: signature, then freshness, then
/// the embedded user object.
pub fn authenticate(
    raw: &str,
    bot_token: &str,
    now: i64,
    max_age_secs: i64,
) -> Result<AuthenticatedUser, AuthError> {
    let init_data = InitData::parse(raw);

    if !verify_signature(&init_data, bot_token) {
        return Err(AuthError::InvalidSignature);
    }

    let auth_date = init_data.auth_date().ok_or(AuthError::Expired)?;
    if !is_fresh(auth_date, now, max_age_secs) {
        return Err(AuthError::Expired);
    }

    let id = init_data
        .get(USER_FIELD)
        .and_then(user_id)
        .ok_or(AuthError::InvalidUserData)?;

    Ok(AuthenticatedUser { id, auth_date })
}
