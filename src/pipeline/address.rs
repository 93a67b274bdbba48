//! Validated 4-byte network addresses.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::effect::compose;
use crate::error::AddressError;

/// A 4-byte address parsed out of body text. Displays in dotted-decimal form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 4]);

impl Address {
    pub const fn new(octets: [u8; 4]) -> Self {
        Self(octets)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<Ipv4Addr> for Address {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr.octets())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Ipv4Addr::from(self.0), f)
    }
}

/// Strict parser from a candidate substring to an [`Address`].
pub type ParseAddress = fn(&str) -> Result<Address, AddressError>;

/// Parse any network address.
pub fn parse_ip(candidate: &str) -> Result<IpAddr, AddressError> {
    candidate
        .parse::<IpAddr>()
        .map_err(|_| AddressError::Invalid(candidate.to_string()))
}

/// Keep only addresses of the 4-byte family.
pub fn require_v4(addr: IpAddr) -> Result<Address, AddressError> {
    match addr {
        IpAddr::V4(v4) => Ok(Address::from(v4)),
        IpAddr::V6(v6) => Err(AddressError::Invalid(v6.to_string())),
    }
}

/// Default parser: a general address parse followed by the 4-byte check.
pub fn parse_address(candidate: &str) -> Result<Address, AddressError> {
    compose(parse_ip, require_v4)(candidate)
}
