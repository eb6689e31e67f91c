// src/pairer.rs
use crate::models::{Leg, Movement, SwapRecord};

/// Turn the movements of one hash into canonical records for `wallet`.
///
/// - outgoing and incoming present: every outgoing × incoming pair whose
///   symbols differ (a 2-out/2-in hash yields four records); legs carry the
///   asset's contract address
/// - outgoing only: one send per movement, `from.address` is the wallet
/// - incoming only: one receive per movement, `to.address` is the wallet
pub fn pair_movements(mut movements: Vec<Movement>, wallet: &str) -> Vec<SwapRecord> {
    movements.sort_by_key(|m| m.timestamp);

    let (outgoing, incoming): (Vec<&Movement>, Vec<&Movement>) = {
        let touching: Vec<&Movement> = movements
            .iter()
            .filter(|m| same_address(&m.from_address, wallet) || same_address(&m.to_address, wallet))
            .collect();
        (
            touching.iter().copied().filter(|m| same_address(&m.from_address, wallet)).collect(),
            touching.iter().copied().filter(|m| same_address(&m.to_address, wallet)).collect(),
        )
    };

    let mut records = Vec::new();

    if !outgoing.is_empty() && !incoming.is_empty() {
        for out in &outgoing {
            for inc in &incoming {
                if out.symbol == inc.symbol {
                    continue;
                }
                records.push(SwapRecord {
                    hash: out.hash.clone(),
                    timestamp: out.timestamp,
                    gas: out.gas,
                    status: out.status,
                    from: leg(out, &out.contract_address),
                    to: leg(inc, &inc.contract_address),
                });
            }
        }
    } else if !outgoing.is_empty() {
        for out in &outgoing {
            records.push(SwapRecord {
                hash: out.hash.clone(),
                timestamp: out.timestamp,
                gas: out.gas,
                status: out.status,
                from: leg(out, wallet),
                to: leg(out, &out.to_address),
            });
        }
    } else {
        for inc in &incoming {
            records.push(SwapRecord {
                hash: inc.hash.clone(),
                timestamp: inc.timestamp,
                gas: inc.gas,
                status: inc.status,
                from: leg(inc, &inc.from_address),
                to: leg(inc, wallet),
            });
        }
    }

    records
}

/// Most recent first. Stable, so records of one hash keep pairing order.
pub fn sort_newest_first(records: &mut [SwapRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn leg(movement: &Movement, address: &str) -> Leg {
    Leg {
        address: address.to_string(),
        contract_address: movement.contract_address.clone(),
        symbol: movement.symbol.clone(),
        decimals: movement.decimals,
        value: movement.value,
    }
}
