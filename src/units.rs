// src/units.rs
//! Fixed-point chain amounts → floating display amounts.
//!
//! Raw values arrive as base-10 integer strings scaled by `10^decimals`.
//! They are parsed into `U256` so nothing is lost before the final split into
//! a whole part and a fraction; the fraction is scaled exactly with `Decimal`.

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::ReconcileError;

/// Decimal exponent of the native asset (and the default for tokens that
/// don't report one).
pub const NATIVE_DECIMALS: u32 = 18;

/// Largest scale `Decimal` can carry exactly.
const DECIMAL_MAX_SCALE: u32 = 28;

const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// Parse an unsigned base-10 integer string.
pub fn parse_amount(field: &'static str, raw: &str) -> Result<U256, ReconcileError> {
    let s = raw.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ReconcileError::amount(field, raw));
    }
    U256::from_str_radix(s, 10).map_err(|_| ReconcileError::amount(field, raw))
}

/// Parse a decimal exponent, defaulting to 18 when the field is absent or blank.
pub fn parse_decimals(field: &'static str, raw: Option<&str>) -> Result<u32, ReconcileError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(NATIVE_DECIMALS),
        Some(s) => s.parse().map_err(|_| ReconcileError::amount(field, s)),
    }
}

/// `amount / 10^decimals` as `f64`.
pub fn scale_down(field: &'static str, amount: U256, decimals: u32) -> Result<f64, ReconcileError> {
    let scale = U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| ReconcileError::amount(field, &decimals.to_string()))?;

    let whole = amount / scale;
    let frac = amount % scale;

    let frac_f64 = if decimals <= DECIMAL_MAX_SCALE {
        // frac < 10^28 < 2^96, the two low limbs hold all of it
        let limbs = frac.as_limbs();
        let frac_u128 = (limbs[0] as u128) | ((limbs[1] as u128) << 64);
        Decimal::try_from_i128_with_scale(frac_u128 as i128, decimals)
            .ok()
            .and_then(|d| d.to_f64())
            .ok_or_else(|| ReconcileError::amount(field, &amount.to_string()))?
    } else {
        u256_to_f64(frac) / 10f64.powi(decimals as i32)
    };

    Ok(u256_to_f64(whole) + frac_f64)
}

/// Parse and scale in one step; `decimals` defaults to 18.
pub fn normalize(field: &'static str, raw: &str, decimals: Option<u32>) -> Result<f64, ReconcileError> {
    let amount = parse_amount(field, raw)?;
    scale_down(field, amount, decimals.unwrap_or(NATIVE_DECIMALS))
}

fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * TWO_POW_64 + limb as f64)
}
