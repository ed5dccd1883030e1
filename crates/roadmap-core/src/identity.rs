//! Caller identities
//!
//! Two independent identities are derived per request:
//! - [`QuotaIdentity`] from transport metadata; keys the usage counters and
//!   cannot be chosen by the caller
//! - [`OwnershipIdentity`] from the `X-Client-Id` header; scopes report
//!   visibility and is caller-controlled (pseudonymous, not authenticated)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Header carrying the ownership token
pub const OWNERSHIP_HEADER: &str = "x-client-id";

/// Header consulted for the quota identity when proxies are trusted
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Canonical network address keying the usage counters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotaIdentity(String);

impl QuotaIdentity {
    /// Identity for an address; IPv4-mapped IPv6 collapses to IPv4
    #[must_use]
    pub fn from_ip(ip: IpAddr) -> Self {
        Self(ip.to_canonical().to_string())
    }

    /// Identity text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuotaIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque caller token; only ever compared for equality
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnershipIdentity(String);

impl OwnershipIdentity {
    /// Maximum token length
    pub const MAX_LEN: usize = 128;

    /// Parse a header value: trimmed, 1..=128 visible ASCII characters
    ///
    /// # Errors
    /// Returns error if the token is empty, too long, or not visible ASCII
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(IdentityError::MissingOwnership);
        }
        if token.len() > Self::MAX_LEN || !token.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(IdentityError::InvalidOwnership);
        }
        Ok(Self(token.to_string()))
    }

    /// Token text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnershipIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity resolution failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Ownership header absent or blank
    #[error("X-Client-Id header is required")]
    MissingOwnership,

    /// Ownership header present but malformed
    #[error("X-Client-Id header must be 1-128 visible ASCII characters")]
    InvalidOwnership,
}

/// Derives identities from request metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver {
    trust_forwarded_for: bool,
}

impl IdentityResolver {
    /// Resolver using only the peer address
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            trust_forwarded_for: false,
        }
    }

    /// Honour the first `X-Forwarded-For` hop (deploy behind a trusted proxy only)
    #[inline]
    #[must_use]
    pub const fn with_trusted_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Quota identity for a request
    ///
    /// `None` when no address is usable; the governor denies such callers.
    #[must_use]
    pub fn quota_identity(
        &self,
        peer: Option<SocketAddr>,
        forwarded_for: Option<&str>,
    ) -> Option<QuotaIdentity> {
        if self.trust_forwarded_for {
            let first_hop = forwarded_for
                .and_then(|v| v.split(',').next())
                .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
            if let Some(ip) = first_hop {
                return Some(QuotaIdentity::from_ip(ip));
            }
        }
        peer.map(|addr| QuotaIdentity::from_ip(addr.ip()))
    }

    /// Ownership identity from the raw header value
    ///
    /// # Errors
    /// Returns [`IdentityError::MissingOwnership`] when the header is absent
    pub fn ownership_identity(&self, header: Option<&str>) -> Result<OwnershipIdentity, IdentityError> {
        header
            .ok_or(IdentityError::MissingOwnership)
            .and_then(OwnershipIdentity::parse)
    }
}
