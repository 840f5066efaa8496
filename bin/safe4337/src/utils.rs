use ethers::types::{Address, Bytes, U256};
use expanded_pathbuf::ExpandedPathBuf;
use safe4337_account::SafeDeployment;
use serde::de::DeserializeOwned;
use std::{fs::File, io::BufReader, str::FromStr};

/// Parses address from string
pub fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_str(s).map_err(|_| format!("String {s} is not a valid address"))
}

/// Parses U256 from string (decimal, or hex with a `0x` prefix)
pub fn parse_u256(s: &str) -> Result<U256, String> {
    match s.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(s, 10),
    }
    .map_err(|_| format!("String {s} is not a valid U256"))
}

/// Parses hex encoded bytes from string
pub fn parse_bytes(s: &str) -> Result<Bytes, String> {
    Bytes::from_str(s).map_err(|_| format!("String {s} is not valid hex data"))
}

/// Parses a deployment preset (`v0.2.0` or `v0.3.0`)
pub fn parse_deployment(s: &str) -> Result<SafeDeployment, String> {
    match s {
        "v0.2.0" => Ok(SafeDeployment::v0_2_0()),
        "v0.3.0" => Ok(SafeDeployment::v0_3_0()),
        _ => Err(format!("String {s} is not a valid deployment (v0.2.0, v0.3.0)")),
    }
}

pub fn validate_private_key(hex_string: &str) -> Result<String, String> {
    let hex = hex_string.strip_prefix("0x").unwrap_or(hex_string);

    if hex.chars().count() != 64 {
        return Err(format!("{hex_string} is not a valid private key"));
    }

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("{hex_string} is not a valid hexadecimal string"));
    }

    Ok(String::from(hex))
}

/// Reads a JSON file
pub fn read_json<T: DeserializeOwned>(path: &ExpandedPathBuf) -> eyre::Result<T> {
    let file = File::open(&path.0)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_radix() {
        assert_eq!(parse_u256("100"), Ok(100.into()));
        assert_eq!(parse_u256("0x100"), Ok(256.into()));
        assert!(parse_u256("0xzz").is_err());
    }

    #[test]
    fn deployment_presets() {
        assert!(parse_deployment("v0.2.0").unwrap().is_v6());
        assert!(!parse_deployment("v0.3.0").unwrap().is_v6());
        assert!(parse_deployment("v0.4.0").is_err());
    }

    #[test]
    fn private_key() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert_eq!(validate_private_key(key), Ok(key.to_string()));
        assert_eq!(validate_private_key(&format!("0x{key}")), Ok(key.to_string()));
        assert!(validate_private_key("0x1234").is_err());
    }
}
