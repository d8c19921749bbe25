//! # mpdat
//!
//! `mpdat` is a GMPL/AMPL data-section parser. It reads `set` and `param`
//! statements (flat lists, matrix tables with transpose, slice/splice
//! records, and tabbing blocks) into a [`SymbolTable`] of typed values
//! queryable by name and by subscript key.
//!
//! ```no_run
//! let table = mpdat::load_path("steel.dat").unwrap();
//! let demand = table.symbol("demand").unwrap();
//! let cost = demand.get("spoons").unwrap().get("FRA").unwrap();
//! ```

mod assemble;
pub mod dat;
mod error;
pub mod grammar;
mod table;
pub mod utils;

pub use dat::atoms::{Atom, Tuple};
pub use error::{Error, Result};
pub use table::{Indexed, Kind, Resolved, Symbol, SymbolTable, Value};

/// Loads the GMPL data file at `path` into a symbol table
pub fn load_path(path: &str) -> Result<SymbolTable> {
    let text = std::fs::read_to_string(path)?;
    load_str(&text)
}

/// Loads GMPL data text into a fresh symbol table
pub fn load_str(text: &str) -> Result<SymbolTable> {
    SymbolTable::parse_str(text)
}
