//! Breakpoint resolution from the assembler listing and the map file
//!
//! Breakpoints are named by labels in the listing (`name:` at the start of
//! a line). The map file ties addresses to listing line numbers:
//!
//! ```text
//! 1FDAA resetVec CODE >67:/home/user/project/build/main.s
//! ```
//!
//! Resolution is all-or-nothing. A breakpoint that silently failed to
//! resolve would turn into a run that waits for an address that is never
//! hit.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::common::{Error, Result};

use super::table::{normalize_address, BreakpointTable};

/// One relevant map file entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct CrossReferenceRecord {
    address: String,
    line_number: usize,
}

/// Resolves breakpoint names to addresses
#[derive(Debug, Clone)]
pub struct SymbolResolver {
    region_tag: String,
}

impl SymbolResolver {
    /// `region_tag` selects the map records that describe code addresses
    pub fn new(region_tag: impl Into<String>) -> Self {
        Self {
            region_tag: region_tag.into(),
        }
    }

    /// Read both artifacts from disk and resolve `names`
    pub fn resolve_files(
        &self,
        listing: &Path,
        map: &Path,
        names: &[String],
    ) -> Result<BreakpointTable> {
        let listing_text =
            std::fs::read_to_string(listing).map_err(|e| Error::file_read(listing, e))?;
        let map_text = std::fs::read_to_string(map).map_err(|e| Error::file_read(map, e))?;
        self.resolve(&listing_text, &map_text, names)
    }

    /// Resolve `names` from listing and map contents
    pub fn resolve(&self, listing: &str, map: &str, names: &[String]) -> Result<BreakpointTable> {
        let mut seen = HashSet::new();
        let names: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| seen.insert(*n))
            .collect();

        let labels = index_labels(listing, &names)?;

        let mut name_to_address: HashMap<&str, String> = HashMap::new();
        let mut address_to_name: HashMap<String, &str> = HashMap::new();

        for record in map
            .lines()
            .filter_map(|line| parse_record(line, &self.region_tag))
        {
            let Some(&name) = labels.get(&record.line_number) else {
                continue;
            };

            if let Some(existing) = name_to_address.get(name) {
                if *existing == record.address {
                    continue;
                }
                return Err(Error::AmbiguousBreakpoint {
                    name: name.to_string(),
                    detail: format!(
                        "line {} maps to both {} and {}",
                        record.line_number, existing, record.address
                    ),
                });
            }
            if let Some(other) = address_to_name.get(&record.address) {
                return Err(Error::AmbiguousBreakpoint {
                    name: name.to_string(),
                    detail: format!("address {} is also \"{}\"", record.address, other),
                });
            }

            tracing::trace!(name, address = %record.address, "Resolved breakpoint");
            address_to_name.insert(record.address.clone(), name);
            name_to_address.insert(name, record.address);
        }

        let missing: Vec<String> = names
            .iter()
            .filter(|n| !name_to_address.contains_key(*n))
            .map(|n| n.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::UnresolvedBreakpoint { names: missing });
        }

        tracing::debug!(count = name_to_address.len(), "Breakpoints resolved");
        Ok(BreakpointTable::from_pairs(
            name_to_address
                .into_iter()
                .map(|(n, a)| (n.to_string(), a)),
        ))
    }
}

/// Map 1-indexed listing line numbers to the requested label defined there
fn index_labels<'a>(listing: &str, names: &[&'a str]) -> Result<HashMap<usize, &'a str>> {
    let mut line_to_name = HashMap::new();
    let mut name_to_line: HashMap<&str, usize> = HashMap::new();

    for (index, line) in listing.lines().enumerate() {
        let line_number = index + 1;
        for &name in names {
            if !is_label(line, name) {
                continue;
            }
            if let Some(&first) = name_to_line.get(name) {
                return Err(Error::DuplicateLabel {
                    name: name.to_string(),
                    first,
                    second: line_number,
                });
            }
            name_to_line.insert(name, line_number);
            line_to_name.insert(line_number, name);
        }
    }

    Ok(line_to_name)
}

fn is_label(line: &str, name: &str) -> bool {
    line.strip_prefix(name)
        .is_some_and(|rest| rest.starts_with(':'))
}

/// Parse `<address> <region tag> ... ><line>:<path>`
///
/// Records outside the region, without a hex address or without a line
/// reference are skipped.
fn parse_record(line: &str, region_tag: &str) -> Option<CrossReferenceRecord> {
    let (address, rest) = line.trim_start().split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    if !rest.starts_with(region_tag) {
        return None;
    }

    let address = normalize_address(address);
    if address.is_empty() || !address.chars().all(|c| c.is_ascii_hexdigit()) {
        tracing::debug!(line, "Skipping map record without a hex address");
        return None;
    }

    let after = &rest[rest.find('>')? + 1..];
    let number = &after[..after.find(':')?];
    let line_number = match number.trim().parse() {
        Ok(n) => n,
        Err(_) => {
            tracing::debug!(line, "Skipping map record with bad line number");
            return None;
        }
    };

    Some(CrossReferenceRecord {
        address,
        line_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: &str = "resetVec CODE";

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const LISTING: &str = "\
; firmware listing
start:
    movlw 0x01
loop:
    incf counter
    goto loop
done:
    sleep
";

    const MAP: &str = "\
1fd9a resetVec CODE >1:/build/main.s
1FDAA resetVec CODE >2:/build/main.s
1FDAC resetVec CODE >3:/build/main.s
1FDB0 resetVec CODE >4:/build/main.s
0040 cinit CODE >7:/build/main.s
1FDB8 resetVec CODE >7:/build/main.s
garbage
1FDC0 resetVec CODE no line here
";

    #[test]
    fn test_resolves_and_tables_are_inverse() {
        let resolver = SymbolResolver::new(TAG);
        let requested = names(&["start", "loop", "done"]);
        let table = resolver.resolve(LISTING, MAP, &requested).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.address_of("start"), Some("1FDAA"));
        assert_eq!(table.address_of("loop"), Some("1FDB0"));
        assert_eq!(table.address_of("done"), Some("1FDB8"));

        for name in &requested {
            let address = &table.name_to_address()[name];
            assert_eq!(&table.address_to_name()[address], name);
        }
        assert_eq!(table.address_to_name().len(), table.name_to_address().len());
    }

    #[test]
    fn test_other_regions_are_ignored() {
        // Line 7 also appears under `cinit`, which must not bind
        let table = SymbolResolver::new(TAG)
            .resolve(LISTING, MAP, &names(&["done"]))
            .unwrap();
        assert_eq!(table.name_of("0040"), None);
        assert_eq!(table.name_of("1FDB8"), Some("done"));
    }

    #[test]
    fn test_duplicate_label_fails() {
        let listing = "start:\n nop\nstart:\n nop\n";
        let err = SymbolResolver::new(TAG)
            .resolve(listing, MAP, &names(&["start"]))
            .unwrap_err();
        match err {
            Error::DuplicateLabel {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "start");
                assert_eq!((first, second), (1, 3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_name_fails_without_partial_table() {
        let err = SymbolResolver::new(TAG)
            .resolve(LISTING, MAP, &names(&["start", "missing", "done"]))
            .unwrap_err();
        match err {
            Error::UnresolvedBreakpoint { names } => assert_eq!(names, vec!["missing"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_label_without_map_record_is_unresolved() {
        let listing = "orphan:\n";
        let err = SymbolResolver::new(TAG)
            .resolve(listing, "1000 resetVec CODE >9:/x.s\n", &names(&["orphan"]))
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedBreakpoint { .. }));
    }

    #[test]
    fn test_label_prefix_is_not_a_match() {
        let listing = "loop2:\nloop:\n";
        let map = "10 resetVec CODE >1:/a.s\n20 resetVec CODE >2:/a.s\n";
        let table = SymbolResolver::new(TAG)
            .resolve(listing, map, &names(&["loop"]))
            .unwrap();
        assert_eq!(table.address_of("loop"), Some("20"));
    }

    #[test]
    fn test_conflicting_addresses_are_ambiguous() {
        let listing = "start:\n";
        let map = "10 resetVec CODE >1:/a.s\n10 resetVec CODE >1:/a.s\n12 resetVec CODE >1:/a.s\n";
        let err = SymbolResolver::new(TAG)
            .resolve(listing, map, &names(&["start"]))
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousBreakpoint { .. }));
    }

    #[test]
    fn test_shared_address_is_ambiguous() {
        let listing = "a:\nb:\n";
        let map = "10 resetVec CODE >1:/a.s\n10 resetVec CODE >2:/a.s\n";
        let err = SymbolResolver::new(TAG)
            .resolve(listing, map, &names(&["a", "b"]))
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousBreakpoint { .. }));
    }

    #[test]
    fn test_non_hex_address_is_skipped() {
        let map = "zzz_not_hex resetVec CODE >1:/a.s\n0x1fd00 resetVec CODE >3:/a.s\n";
        let resolver = SymbolResolver::new(TAG);

        let err = resolver
            .resolve("start:\n nop\n", map, &names(&["start"]))
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedBreakpoint { .. }));

        let table = resolver
            .resolve("start:\n nop\nnext:\n", map, &names(&["next"]))
            .unwrap();
        assert_eq!(table.address_of("next"), Some("1FD00"));
    }

    #[test]
    fn test_repeated_request_is_resolved_once() {
        let table = SymbolResolver::new(TAG)
            .resolve(LISTING, MAP, &names(&["start", "start"]))
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_files() {
        let dir = tempfile::tempdir().unwrap();
        let listing = dir.path().join("main.s");
        let map = dir.path().join("main.cmf");
        std::fs::write(&listing, LISTING).unwrap();
        std::fs::write(&map, MAP).unwrap();

        let table = SymbolResolver::new(TAG)
            .resolve_files(&listing, &map, &names(&["loop"]))
            .unwrap();
        assert_eq!(table.address_of("loop"), Some("1FDB0"));

        let err = SymbolResolver::new(TAG)
            .resolve_files(&dir.path().join("nope.s"), &map, &names(&["loop"]))
            .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
