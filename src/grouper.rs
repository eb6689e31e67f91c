// src/grouper.rs
use std::collections::HashMap;

use crate::models::{InternalTransfer, NativeTransfer, ProviderLists, RawEntry, TokenTransfer};

/// Every raw entry that shares one transaction hash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionGroup {
    pub hash: String,
    pub native: Vec<NativeTransfer>,
    pub internal: Vec<InternalTransfer>,
    pub token: Vec<TokenTransfer>,
}

impl TransactionGroup {
    fn new(hash: String) -> Self {
        Self {
            hash,
            ..Default::default()
        }
    }

    /// Native, then internal, then token entries, each in provider order.
    pub fn entries(&self) -> impl Iterator<Item = RawEntry<'_>> {
        self.native
            .iter()
            .map(RawEntry::Native)
            .chain(self.internal.iter().map(RawEntry::Internal))
            .chain(self.token.iter().map(RawEntry::Token))
    }

    pub fn len(&self) -> usize {
        self.native.len() + self.internal.len() + self.token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Group the three provider lists by transaction hash.
///
/// Hashes are compared lowercase. Groups come back in first-seen order and
/// every entry keeps its position relative to others of the same kind.
pub fn group_by_hash(lists: ProviderLists) -> Vec<TransactionGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<TransactionGroup> = Vec::new();

    for tx in lists.native {
        let i = slot(&mut index, &mut groups, &tx.hash);
        groups[i].native.push(tx);
    }
    for tx in lists.internal {
        let i = slot(&mut index, &mut groups, &tx.hash);
        groups[i].internal.push(tx);
    }
    for tx in lists.token {
        let i = slot(&mut index, &mut groups, &tx.hash);
        groups[i].token.push(tx);
    }

    groups
}

fn slot(index: &mut HashMap<String, usize>, groups: &mut Vec<TransactionGroup>, hash: &str) -> usize {
    let key = hash.to_ascii_lowercase();
    if let Some(&i) = index.get(&key) {
        return i;
    }
    groups.push(TransactionGroup::new(key.clone()));
    index.insert(key, groups.len() - 1);
    groups.len() - 1
}
