// web-server/src/siwe.rs
//! EIP-4361 (Sign-In with Ethereum) messages.
//!
//! A message looks like:
//!
//! ```text
//! example.com wants you to sign in with your Ethereum account:
//! 0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2
//!
//! Sign in to the dashboard.
//!
//! URI: https://example.com
//! Version: 1
//! Chain ID: 11155111
//! Nonce: 8fZk2mQ1LsP0aXcV
//! Issued At: 2024-05-01T12:00:00Z
//! ```
//!
//! Parsing is line oriented. Signatures are EIP-191 `personal_sign`
//! signatures over the exact message text.
use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, PrimitiveSignature};
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const MIN_NONCE_LEN: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SiweError {
    #[error("missing message header")]
    MissingHeader,
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("address checksum mismatch")]
    BadChecksum,
    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),
    #[error("nonce must be at least 8 alphanumeric characters")]
    InvalidNonce,
    #[error("unexpected line: {0}")]
    UnexpectedLine(String),
    #[error("message has expired")]
    Expired,
    #[error("message is not yet valid")]
    NotYetValid,
    #[error("domain mismatch: expected {expected}, found {found}")]
    DomainMismatch { expected: String, found: String },
    #[error("malformed signature: {0}")]
    InvalidSignature(String),
    #[error("signature does not match address")]
    SignatureMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    pub scheme: Option<String>,
    pub domain: String,
    pub address: Address,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

#[derive(Default)]
struct Fields {
    uri: Option<String>,
    version: Option<String>,
    chain_id: Option<u64>,
    nonce: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    expiration_time: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
    request_id: Option<String>,
    resources: Vec<String>,
}

fn parse_time(field: &'static str, value: &str) -> Result<DateTime<Utc>, SiweError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| SiweError::InvalidField { field, value: value.to_string() })
}

/// Parse an address, enforcing EIP-55 when the input is mixed case
pub fn parse_address(raw: &str) -> Result<Address, SiweError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| SiweError::InvalidAddress(raw.to_string()))?;
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SiweError::InvalidAddress(raw.to_string()));
    }

    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(raw, None).map_err(|_| SiweError::BadChecksum);
    }

    Address::from_str(raw).map_err(|_| SiweError::InvalidAddress(raw.to_string()))
}

impl SiweMessage {
    pub fn parse(message: &str) -> Result<Self, SiweError> {
        let mut lines = message.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).peekable();

        let header = lines.next().ok_or(SiweError::MissingHeader)?;
        let origin = header.strip_suffix(HEADER_SUFFIX).ok_or(SiweError::MissingHeader)?;
        let (scheme, domain) = match origin.split_once("://") {
            Some((scheme, domain)) => (Some(scheme.to_string()), domain.to_string()),
            None => (None, origin.to_string()),
        };
        if domain.is_empty() {
            return Err(SiweError::MissingHeader);
        }

        let address = parse_address(lines.next().ok_or(SiweError::MissingField("address"))?)?;

        // Blank lines around an optional statement
        while lines.peek().map_or(false, |l| l.is_empty()) {
            lines.next();
        }
        let statement = match lines.peek() {
            Some(line) if !line.starts_with("URI: ") => {
                let statement = line.to_string();
                lines.next();
                Some(statement)
            }
            _ => None,
        };

        let mut fields = Fields::default();
        let mut in_resources = false;

        for line in lines {
            if line.is_empty() {
                continue;
            }
            if in_resources {
                match line.strip_prefix("- ") {
                    Some(resource) => {
                        fields.resources.push(resource.to_string());
                        continue;
                    }
                    None => return Err(SiweError::UnexpectedLine(line.to_string())),
                }
            }
            if line == "Resources:" {
                in_resources = true;
                continue;
            }

            let (key, value) = line
                .split_once(": ")
                .ok_or_else(|| SiweError::UnexpectedLine(line.to_string()))?;
            match key {
                "URI" => fields.uri = Some(value.to_string()),
                "Version" => fields.version = Some(value.to_string()),
                "Chain ID" => {
                    let chain_id = value.parse::<u64>().map_err(|_| SiweError::InvalidField {
                        field: "Chain ID",
                        value: value.to_string(),
                    })?;
                    fields.chain_id = Some(chain_id);
                }
                "Nonce" => fields.nonce = Some(value.to_string()),
                "Issued At" => fields.issued_at = Some(parse_time("Issued At", value)?),
                "Expiration Time" => fields.expiration_time = Some(parse_time("Expiration Time", value)?),
                "Not Before" => fields.not_before = Some(parse_time("Not Before", value)?),
                "Request ID" => fields.request_id = Some(value.to_string()),
                _ => return Err(SiweError::UnexpectedLine(line.to_string())),
            }
        }

        let version = fields.version.ok_or(SiweError::MissingField("Version"))?;
        if version != "1" {
            return Err(SiweError::UnsupportedVersion(version));
        }

        let nonce = fields.nonce.ok_or(SiweError::MissingField("Nonce"))?;
        if nonce.len() < MIN_NONCE_LEN || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SiweError::InvalidNonce);
        }

        Ok(Self {
            scheme,
            domain,
            address,
            statement,
            uri: fields.uri.ok_or(SiweError::MissingField("URI"))?,
            version,
            chain_id: fields.chain_id.ok_or(SiweError::MissingField("Chain ID"))?,
            nonce,
            issued_at: fields.issued_at.ok_or(SiweError::MissingField("Issued At"))?,
            expiration_time: fields.expiration_time,
            not_before: fields.not_before,
            request_id: fields.request_id,
            resources: fields.resources,
        })
    }

    /// Check the validity window against `now`
    pub fn validate_time(&self, now: DateTime<Utc>) -> Result<(), SiweError> {
        if let Some(expiration) = self.expiration_time {
            if now >= expiration {
                return Err(SiweError::Expired);
            }
        }
        if let Some(not_before) = self.not_before {
            if now < not_before {
                return Err(SiweError::NotYetValid);
            }
        }
        Ok(())
    }

    pub fn validate_domain(&self, expected: &str) -> Result<(), SiweError> {
        if self.domain != expected {
            return Err(SiweError::DomainMismatch {
                expected: expected.to_string(),
                found: self.domain.clone(),
            });
        }
        Ok(())
    }
}

impl FromStr for SiweMessage {
    type Err = SiweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}://", scheme)?;
        }
        writeln!(f, "{}{}", self.domain, HEADER_SUFFIX)?;
        writeln!(f, "{}", self.address.to_checksum(None))?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{}", statement)?;
            writeln!(f)?;
        }
        writeln!(f, "URI: {}", self.uri)?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Chain ID: {}", self.chain_id)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        write!(f, "Issued At: {}", self.issued_at.to_rfc3339_opts(SecondsFormat::Millis, true))?;
        if let Some(expiration) = self.expiration_time {
            write!(f, "\nExpiration Time: {}", expiration.to_rfc3339_opts(SecondsFormat::Millis, true))?;
        }
        if let Some(not_before) = self.not_before {
            write!(f, "\nNot Before: {}", not_before.to_rfc3339_opts(SecondsFormat::Millis, true))?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, "\nRequest ID: {}", request_id)?;
        }
        if !self.resources.is_empty() {
            write!(f, "\nResources:")?;
            for resource in &self.resources {
                write!(f, "\n- {}", resource)?;
            }
        }
        Ok(())
    }
}

/// Recover the signer of an EIP-191 personal message and compare it with `expected`
pub fn verify_signature(message: &str, signature: &str, expected: Address) -> Result<(), SiweError> {
    let raw = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(raw).map_err(|e| SiweError::InvalidSignature(e.to_string()))?;
    let signature = PrimitiveSignature::try_from(bytes.as_slice())
        .map_err(|e| SiweError::InvalidSignature(e.to_string()))?;

    let recovered = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| SiweError::InvalidSignature(e.to_string()))?;

    if recovered != expected {
        tracing::debug!("Recovered {} but message names {}", recovered, expected);
        return Err(SiweError::SignatureMismatch);
    }
    Ok(())
}
