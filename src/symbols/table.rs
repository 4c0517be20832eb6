//! Name ↔ address table for resolved breakpoints

use std::collections::HashMap;

use serde::Serialize;

/// Bidirectional breakpoint table
///
/// Built once by the resolver; the two maps are exact inverses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BreakpointTable {
    name_to_address: HashMap<String, String>,
    address_to_name: HashMap<String, String>,
}

impl BreakpointTable {
    /// Only the resolver constructs tables, after checking the bijection
    pub(super) fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut table = Self::default();
        for (name, address) in pairs {
            table.address_to_name.insert(address.clone(), name.clone());
            table.name_to_address.insert(name, address);
        }
        table
    }

    /// Address of a named breakpoint
    pub fn address_of(&self, name: &str) -> Option<&str> {
        self.name_to_address.get(name).map(String::as_str)
    }

    /// Breakpoint name at an address, case-insensitive in the hex digits
    pub fn name_of(&self, address: &str) -> Option<&str> {
        self.address_to_name
            .get(&normalize_address(address))
            .map(String::as_str)
    }

    pub fn name_to_address(&self) -> &HashMap<String, String> {
        &self.name_to_address
    }

    pub fn address_to_name(&self) -> &HashMap<String, String> {
        &self.address_to_name
    }

    pub fn len(&self) -> usize {
        self.name_to_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_address.is_empty()
    }

    /// Entries sorted by address, for display
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .name_to_address
            .iter()
            .map(|(n, a)| (n.as_str(), a.as_str()))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)));
        entries
    }
}

/// Canonical form of a hex address: trimmed, uppercase, no `0x` prefix
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    let address = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    address.to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("1fdaa"), "1FDAA");
        assert_eq!(normalize_address(" 0x1fdaa\n"), "1FDAA");
        assert_eq!(normalize_address("1FDAA"), "1FDAA");
    }

    #[test]
    fn test_lookup_both_ways() {
        let table = BreakpointTable::from_pairs([
            ("start".to_string(), "1FDAA".to_string()),
            ("done".to_string(), "1FDB4".to_string()),
        ]);
        assert_eq!(table.address_of("start"), Some("1FDAA"));
        assert_eq!(table.name_of("1fdb4"), Some("done"));
        assert_eq!(table.name_of("0"), None);
        assert_eq!(table.sorted(), vec![("start", "1FDAA"), ("done", "1FDB4")]);
    }
}
