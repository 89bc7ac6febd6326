//! AWS Signature Version 4 query-string signing for S3 object URLs
//!
//! Produces presigned GET/PUT URLs so a build can reach exactly one object
//! for a bounded time without holding long-lived credentials. Signing is a
//! pure computation: no network, no disk, no clock (the caller supplies
//! the timestamp).

use crate::error::{DircacheError, DircacheResult};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const REQUEST_TYPE: &str = "aws4_request";
const SIGNED_HEADERS: &str = "host";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Long-lived object store credentials
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub id: String,
    secret: String,
}

impl KeyPair {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Short-lived session token issued alongside temporary credentials
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityToken(String);

impl SecurityToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityToken(<redacted>)")
    }
}

/// HTTP verb a presigned URL is valid for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Put,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved object location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// `http` or `https`
    pub scheme: String,
    /// Host, optionally with `:port`
    pub hostname: String,
    /// Absolute object path, starting with `/`
    pub path: String,
    /// Region the bucket lives in; part of the credential scope
    pub region: String,
}

/// A single signing request. Built fresh per transfer and discarded.
#[derive(Debug, Clone)]
pub struct SignedUrlRequest<'a> {
    pub key_pair: &'a KeyPair,
    pub security_token: Option<&'a SecurityToken>,
    pub verb: Verb,
    pub location: &'a Location,
    pub expires_secs: u64,
    pub timestamp: DateTime<Utc>,
}

impl SignedUrlRequest<'_> {
    /// Sign the request and return the presigned URL
    pub fn to_url(&self) -> DircacheResult<Url> {
        self.validate()?;

        let query = self.canonical_query_params();
        let signature = self.signature(&query);

        // The signature is not part of the signed query; it always goes last
        let url = format!(
            "{}://{}{}?{}&X-Amz-Signature={}",
            self.location.scheme,
            self.location.hostname,
            encode_path(&self.location.path),
            query_string(&query),
            signature
        );
        Ok(Url::parse(&url)?)
    }

    fn validate(&self) -> DircacheResult<()> {
        if self.expires_secs == 0 {
            return Err(DircacheError::signature("expiry must be at least one second"));
        }
        if self.key_pair.secret().is_empty() {
            return Err(DircacheError::signature("secret access key is empty"));
        }
        if self.key_pair.id.is_empty() {
            return Err(DircacheError::signature("access key id is empty"));
        }
        if self.location.region.trim().is_empty() {
            return Err(DircacheError::signature("region is missing"));
        }
        if self.location.hostname.is_empty() {
            return Err(DircacheError::signature("hostname is missing"));
        }
        if !self.location.path.starts_with('/') {
            return Err(DircacheError::signature(format!(
                "object path {:?} must be absolute",
                self.location.path
            )));
        }
        Ok(())
    }

    /// `YYYYMMDD`
    fn date(&self) -> String {
        self.timestamp.format("%Y%m%d").to_string()
    }

    /// `YYYYMMDDThhmmssZ`
    fn amz_timestamp(&self) -> String {
        self.timestamp.format("%Y%m%dT%H%M%SZ").to_string()
    }

    fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.date(),
            self.location.region,
            SERVICE,
            REQUEST_TYPE
        )
    }

    fn canonical_query_params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("X-Amz-Algorithm", ALGORITHM.to_string());
        params.insert(
            "X-Amz-Credential",
            format!("{}/{}", self.key_pair.id, self.credential_scope()),
        );
        params.insert("X-Amz-Date", self.amz_timestamp());
        params.insert("X-Amz-Expires", self.expires_secs.to_string());
        if let Some(token) = self.security_token {
            params.insert("X-Amz-Security-Token", token.as_str().to_string());
        }
        params.insert("X-Amz-SignedHeaders", SIGNED_HEADERS.to_string());
        params
    }

    fn canonical_request(&self, query: &BTreeMap<&'static str, String>) -> String {
        let path = encode_path(&self.location.path);
        let query = query_string(query);
        let host = format!("host:{}\n", self.location.hostname);
        [
            self.verb.as_str(),
            path.as_str(),
            query.as_str(),
            host.as_str(),
            SIGNED_HEADERS,
            UNSIGNED_PAYLOAD,
        ]
        .join("\n")
    }

    fn string_to_sign(&self, query: &BTreeMap<&'static str, String>) -> String {
        let timestamp = self.amz_timestamp();
        let scope = self.credential_scope();
        let request_hash = hex::encode(Sha256::digest(self.canonical_request(query)));
        [
            ALGORITHM,
            timestamp.as_str(),
            scope.as_str(),
            request_hash.as_str(),
        ]
        .join("\n")
    }

    fn signing_key(&self) -> Vec<u8> {
        let date = self.date();
        let mut key = format!("AWS4{}", self.key_pair.secret()).into_bytes();
        for part in [
            date.as_str(),
            self.location.region.as_str(),
            SERVICE,
            REQUEST_TYPE,
        ] {
            key = hmac_sha256(&key, part.as_bytes());
        }
        key
    }

    fn signature(&self, query: &BTreeMap<&'static str, String>) -> String {
        hex::encode(hmac_sha256(
            &self.signing_key(),
            self.string_to_sign(query).as_bytes(),
        ))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn query_string(params: &BTreeMap<&'static str, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", uri_encode(key, true), uri_encode(value, true)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_path(path: &str) -> String {
    uri_encode(path, false)
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
/// `/` is left alone in paths.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
