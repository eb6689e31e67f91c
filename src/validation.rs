use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Invalid block number: {0}")]
    InvalidBlockNumber(String),

    #[error("Invalid volume: {0}")]
    InvalidVolume(String),
}

/// `0x` followed by 40 hex digits, any case. Returns the lowercase form.
pub fn validate_wallet_address(address: &str) -> Result<String, ValidationError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ValidationError::MissingParameter("address".to_string()));
    }

    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| ValidationError::InvalidAddress(address.to_string()))?;

    // 20 bytes
    match hex::decode(body) {
        Ok(bytes) if bytes.len() == 20 => Ok(format!("0x{}", body.to_lowercase())),
        _ => Err(ValidationError::InvalidAddress(address.to_string())),
    }
}

/// Decimal block number, returned trimmed.
pub fn validate_block_number(block: &str) -> Result<String, ValidationError> {
    let block = block.trim();
    if block.is_empty() {
        return Err(ValidationError::MissingParameter("blockNumber".to_string()));
    }
    if !block.bytes().all(|b| b.is_ascii_digit()) || block.parse::<u64>().is_err() {
        return Err(ValidationError::InvalidBlockNumber(block.to_string()));
    }
    Ok(block.to_string())
}

pub fn validate_volume(volume: f64) -> Result<f64, ValidationError> {
    if !volume.is_finite() || volume < 0.0 {
        return Err(ValidationError::InvalidVolume(volume.to_string()));
    }
    Ok(volume)
}
