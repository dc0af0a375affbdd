use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    fmt,
    str::FromStr,
};

fn parse_hex_32(raw: &str) -> Result<[u8; 32]> {
    let trimmed = raw.trim();
    let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(cleaned).wrap_err_with(|| format!("'{raw}' is not hex"))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| eyre!("'{raw}' must encode 32 bytes, got {}", bytes.len()))
}

/// Identity of a signer or of the sender recorded in a mint event.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct AccountId(pub [u8; 32]);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({self})")
    }
}

impl FromStr for AccountId {
    type Err = color_eyre::eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        parse_hex_32(s).map(Self)
    }
}

/// Deployment address of the game contract.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ContractAddress(pub [u8; 32]);

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractAddress({self})")
    }
}

impl FromStr for ContractAddress {
    type Err = color_eyre::eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        parse_hex_32(s)
            .map(Self)
            .wrap_err("invalid contract address")
    }
}
