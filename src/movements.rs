// src/movements.rs
use alloy::primitives::U256;

use crate::error::ReconcileError;
use crate::grouper::TransactionGroup;
use crate::models::{AssetKind, Movement, RawEntry, TxStatus, ZERO_ADDRESS};
use crate::units::{self, NATIVE_DECIMALS};

/// Earliest timestamp of the group. Internal calls sometimes report a
/// slightly later time than the call that triggered them.
pub fn earliest_timestamp(group: &TransactionGroup) -> Result<u64, ReconcileError> {
    let mut earliest: Option<u64> = None;
    for entry in group.entries() {
        let raw = entry.time_stamp();
        let ts: u64 = raw
            .trim()
            .parse()
            .map_err(|_| ReconcileError::MalformedTimestamp(raw.to_string()))?;
        earliest = Some(earliest.map_or(ts, |e| e.min(ts)));
    }
    earliest.ok_or_else(|| ReconcileError::MalformedTimestamp(String::new()))
}

/// Fee for the whole hash in native units: `gasUsed * gasPrice / 10^18`,
/// read from the first token entry, else the first native entry.
///
/// `None` when neither carries both fields.
pub fn gas_cost(group: &TransactionGroup) -> Result<Option<f64>, ReconcileError> {
    let token = group
        .token
        .first()
        .map(|tx| (tx.gas_used.as_deref(), tx.gas_price.as_deref()));
    let native = group
        .native
        .first()
        .map(|tx| (tx.gas_used.as_deref(), tx.gas_price.as_deref()));

    let source = [token, native].into_iter().flatten().find_map(|fields| match fields {
        (Some(used), Some(price)) if !used.trim().is_empty() && !price.trim().is_empty() => {
            Some((used, price))
        }
        _ => None,
    });

    let Some((used, price)) = source else {
        return Ok(None);
    };

    let used = units::parse_amount("gasUsed", used)?;
    let price = units::parse_amount("gasPrice", price)?;
    let fee: U256 = used
        .checked_mul(price)
        .ok_or_else(|| ReconcileError::amount("gasUsed", &used.to_string()))?;

    units::scale_down("gasUsed", fee, NATIVE_DECIMALS).map(Some)
}

/// `Fail` when any entry of the group carries an error flag.
pub fn group_status(group: &TransactionGroup) -> TxStatus {
    if group.entries().any(|e| e.failed()) {
        TxStatus::Fail
    } else {
        TxStatus::Success
    }
}

/// Expand one hash group into directional movements.
///
/// Zero-value entries are dropped. Any unreadable field fails the whole group.
pub fn extract(group: &TransactionGroup, native_symbol: &str) -> Result<Vec<Movement>, ReconcileError> {
    let timestamp = earliest_timestamp(group)?;
    let gas = gas_cost(group)?;
    let status = group_status(group);

    let mut movements = Vec::new();

    for entry in group.entries() {
        let movement = match entry {
            RawEntry::Native(tx) => native_movement(&tx.from, &tx.to, &tx.value, native_symbol)?,
            RawEntry::Internal(tx) => native_movement(&tx.from, &tx.to, &tx.value, native_symbol)?,
            RawEntry::Token(tx) => {
                let amount = units::parse_amount("value", &tx.value)?;
                if amount.is_zero() {
                    None
                } else {
                    let decimals = units::parse_decimals("tokenDecimal", tx.token_decimal.as_deref())?;
                    Some(Draft {
                        from: &tx.from,
                        to: &tx.to,
                        contract: &tx.contract_address,
                        symbol: &tx.token_symbol,
                        decimals,
                        value: units::scale_down("value", amount, decimals)?,
                        kind: AssetKind::Token,
                    })
                }
            }
        };

        if let Some(d) = movement {
            movements.push(Movement {
                hash: group.hash.clone(),
                timestamp,
                gas,
                status,
                from_address: d.from.to_string(),
                contract_address: d.contract.to_string(),
                to_address: d.to.to_string(),
                symbol: d.symbol.to_string(),
                decimals: d.decimals,
                value: d.value,
                kind: d.kind,
            });
        }
    }

    Ok(movements)
}

struct Draft<'a> {
    from: &'a str,
    to: &'a str,
    contract: &'a str,
    symbol: &'a str,
    decimals: u32,
    value: f64,
    kind: AssetKind,
}

fn native_movement<'a>(
    from: &'a str,
    to: &'a str,
    value: &str,
    native_symbol: &'a str,
) -> Result<Option<Draft<'a>>, ReconcileError> {
    let amount = units::parse_amount("value", value)?;
    if amount.is_zero() {
        return Ok(None);
    }
    Ok(Some(Draft {
        from,
        to,
        contract: ZERO_ADDRESS,
        symbol: native_symbol,
        decimals: NATIVE_DECIMALS,
        value: units::scale_down("value", amount, NATIVE_DECIMALS)?,
        kind: AssetKind::Native,
    }))
}
