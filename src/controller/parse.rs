//! Interpretation of debugger output
//!
//! The debugger's replies are plain text meant for humans. These functions
//! pick the few facts the harness needs out of the raw lines.

use crate::common::{Error, Result};
use crate::symbols::normalize_address;

/// Printed when the firmware image was loaded
pub const PROGRAM_SUCCEEDED: &str = "Program succeeded.";

const ADDRESS_MARKER: &str = "\taddress:";
const CYCLE_COUNT_MARKER: &str = "Stopwatch cycle count = ";
const ERROR_PREFIX: &str = ">Error:";
const SYMBOL_MISSING: &str = "Symbol does not exist";
const INVALID_STIMULUS: &str = "Invalid stimulus file";

/// Line text without terminator, prompt characters and surrounding spaces
fn strip_prompt(line: &str) -> &str {
    line.trim_start_matches('>').trim()
}

/// Whether a prelude's output reports a successful program load
pub fn program_loaded(lines: &[String]) -> bool {
    lines
        .iter()
        .any(|line| strip_prompt(line).starts_with(PROGRAM_SUCCEEDED))
}

/// Address of the breakpoint the target halted at
///
/// The halt report contains a tab-indented `address:` line; the address is
/// everything after its last colon, normalized to uppercase hex.
pub fn breakpoint_address(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .find(|line| line.contains(ADDRESS_MARKER))
        .and_then(|line| {
            let address = &line[line.rfind(':')? + 1..];
            let address = normalize_address(address);
            (!address.is_empty()).then_some(address)
        })
}

/// Integer value from the reply to `print`
///
/// Expects `name = value` on the first line. Some values are printed on
/// the following line, leaving nothing after the `=`.
pub fn variable_value(name: &str, command: &str, lines: &[String]) -> Result<i64> {
    let first = lines
        .first()
        .map(|l| l.trim())
        .ok_or_else(|| Error::unexpected_output(command, lines))?;

    let value = match first.rfind('=') {
        Some(index) => first[index + 1..].trim(),
        None if first.contains(SYMBOL_MISSING) => first,
        None => return Err(Error::unexpected_output(command, lines)),
    };

    if value.starts_with(SYMBOL_MISSING) {
        return Err(Error::SymbolNotFound {
            name: name.to_string(),
            output: lines.concat(),
        });
    }

    let value = if value.is_empty() {
        lines
            .get(1)
            .map(|l| l.trim())
            .ok_or_else(|| Error::unexpected_output(command, lines))?
    } else {
        value
    };

    parse_integer(value).ok_or_else(|| Error::unexpected_output(command, lines))
}

/// Decimal, or hex with a `0x` prefix
pub fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Cycles from `Stopwatch cycle count = N (x ms)`
pub fn cycle_count(lines: &[String]) -> Option<u64> {
    lines.iter().find_map(|line| {
        let start = line.find(CYCLE_COUNT_MARKER)? + CYCLE_COUNT_MARKER.len();
        let rest = &line[start..];
        let end = rest.find('(').unwrap_or(rest.len());
        rest[..end].trim().parse().ok()
    })
}

/// Whether the reply to `watch` reports an error
pub fn watch_rejected(lines: &[String]) -> bool {
    lines
        .first()
        .is_some_and(|line| line.starts_with(ERROR_PREFIX))
}

/// Whether the reply to `stim` rejects the file
pub fn stimulus_rejected(lines: &[String]) -> bool {
    lines
        .iter()
        .any(|line| strip_prompt(line).starts_with(INVALID_STIMULUS))
}
