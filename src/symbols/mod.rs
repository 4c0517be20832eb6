//! Breakpoint name resolution

mod resolver;
mod table;

pub use resolver::SymbolResolver;
pub use table::{normalize_address, BreakpointTable};
