use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Validates Solana public key
pub fn validate_pubkey(value: &str) -> Result<Pubkey, String> {
    if value.trim().is_empty() {
        return Err("Public key cannot be empty".to_string());
    }
    Pubkey::from_str(value).map_err(|e| format!("Invalid public key: {}", e))
}

/// Validates a `0x`-prefixed 20 byte EVM address and returns it lower-cased
pub fn validate_evm_address(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("Address cannot be empty".to_string());
    }
    let hex = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| "Address must start with 0x".to_string())?;
    if hex.len() != 40 {
        return Err(format!(
            "Address must contain 40 hex characters, found {}",
            hex.len()
        ));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("Address contains non-hex characters".to_string());
    }
    Ok(format!("0x{}", hex.to_ascii_lowercase()))
}

/// Validates HTTP/HTTPS URL
pub fn validate_http_url(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("URL cannot be empty".to_string());
    }
    let url = url::Url::parse(value).map_err(|e| format!("Invalid URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err("URL must use http or https scheme".to_string()),
    }
    if url.host_str().filter(|h| !h.is_empty()).is_none() {
        return Err("URL must have a valid host".to_string());
    }
    Ok(())
}

/// Splits a comma separated id list, trimming and dropping empty entries
pub fn split_ids(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Trims ids and removes empty entries and duplicates, keeping first-seen order
pub fn dedup_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(ToOwned::to_owned)
        .collect()
}
