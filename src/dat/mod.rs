pub mod atoms;
pub mod loader;

pub use atoms::{Atom, Cell, Domain, MatrixBlock, SlicePos, Tuple};

use std::fmt;

use pest::iterators::Pair;

use crate::dat::atoms::{fmt_tuple, slice_from_entry};
use crate::grammar::Rule;

// ==============================
// ROOT RULES
// ==============================

/// Set declaration: `set NAME [dimen N] [{domain}];`
#[derive(Clone, Debug)]
pub struct SetDecl {
    pub name: String,
    pub dimen: Option<usize>,
    pub domain: Option<Domain>,
}

impl SetDecl {
    pub fn from_entry(entry: Pair<Rule>) -> Self {
        let mut name = String::new();
        let mut dimen = None;
        let mut domain = None;

        for pair in entry.into_inner() {
            match pair.as_rule() {
                Rule::name => name = pair.as_str().to_string(),
                Rule::dimen_clause => {
                    for inner in pair.into_inner() {
                        if inner.as_rule() == Rule::number {
                            dimen = Some(inner.as_str().parse().unwrap_or(1));
                        }
                    }
                }
                Rule::subscript_domain => domain = Some(Domain::from_entry(pair)),
                _ => {}
            }
        }

        Self {
            name,
            dimen,
            domain,
        }
    }
}

impl fmt::Display for SetDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "set {}", self.name)?;
        if let Some(dimen) = self.dimen {
            write!(f, " dimen {}", dimen)?;
        }
        if let Some(domain) = &self.domain {
            write!(f, " {}", domain)?;
        }
        Ok(())
    }
}

/// One item of a data body, before assembly
#[derive(Clone, Debug)]
pub enum DataItem {
    Atom(Atom),
    Dot,
    /// Paren tuple: an element, or a slice prefix when it contains `*`
    Tuple(Vec<SlicePos>),
    /// Bracket slice header
    Slice(Vec<SlicePos>),
    Matrix(MatrixBlock),
}

impl fmt::Display for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataItem::Atom(atom) => write!(f, "{}", atom),
            DataItem::Dot => write!(f, "."),
            DataItem::Tuple(ps) => {
                let parts: Vec<String> = ps.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", parts.join(","))
            }
            DataItem::Slice(ps) => {
                let parts: Vec<String> = ps.iter().map(|p| p.to_string()).collect();
                write!(f, "[{}]", parts.join(","))
            }
            DataItem::Matrix(m) => write!(f, "{}", m),
        }
    }
}

/// Set data values, optionally for one subscript member
#[derive(Clone, Debug)]
pub struct SetData {
    pub name: String,
    pub member: Option<Tuple>,
    pub items: Vec<DataItem>,
}

impl SetData {
    pub fn from_entry(entry: Pair<Rule>) -> Self {
        let mut name = String::new();
        let mut member = None;
        let mut items = Vec::new();

        for pair in entry.into_inner() {
            match pair.as_rule() {
                Rule::name => name = pair.as_str().to_string(),
                Rule::set_member => {
                    member = Some(pair.into_inner().map(Atom::from_entry).collect());
                }
                Rule::atom => items.push(DataItem::Atom(Atom::from_entry(pair))),
                Rule::tuple => items.push(DataItem::Tuple(slice_from_entry(pair))),
                Rule::set_matrix => items.push(DataItem::Matrix(MatrixBlock::from_entry(pair))),
                _ => {}
            }
        }

        Self {
            name,
            member,
            items,
        }
    }
}

impl fmt::Display for SetData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "data: set {}", self.name)?;
        if let Some(member) = &self.member {
            write!(f, "[{}]", fmt_tuple(member))?;
        }
        write!(f, " := <{} item(s)>", self.items.len())
    }
}

/// Param declaration: `param NAME [{domain}] [default ATOM];`
#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub name: String,
    pub domain: Option<Domain>,
    pub default: Option<Atom>,
}

impl ParamDecl {
    pub fn from_entry(entry: Pair<Rule>) -> Self {
        let mut name = String::new();
        let mut domain = None;
        let mut default = None;

        for pair in entry.into_inner() {
            match pair.as_rule() {
                Rule::name => name = pair.as_str().to_string(),
                Rule::subscript_domain => domain = Some(Domain::from_entry(pair)),
                Rule::param_default => default = default_from_entry(pair),
                _ => {}
            }
        }

        Self {
            name,
            domain,
            default,
        }
    }
}

impl fmt::Display for ParamDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "param {}", self.name)?;
        if let Some(domain) = &self.domain {
            write!(f, " {}", domain)?;
        }
        if let Some(default) = &self.default {
            write!(f, " default {}", default)?;
        }
        Ok(())
    }
}

/// Param data values: flat runs, slices, and table blocks
#[derive(Clone, Debug)]
pub struct ParamData {
    pub name: String,
    pub default: Option<Atom>,
    pub items: Vec<DataItem>,
}

impl ParamData {
    pub fn from_entry(entry: Pair<Rule>) -> Self {
        let mut name = String::new();
        let mut default = None;
        let mut items = Vec::new();

        for pair in entry.into_inner() {
            match pair.as_rule() {
                Rule::name => name = pair.as_str().to_string(),
                Rule::param_default => default = default_from_entry(pair),
                Rule::atom => items.push(DataItem::Atom(Atom::from_entry(pair))),
                Rule::dot => items.push(DataItem::Dot),
                Rule::slice => items.push(DataItem::Slice(slice_from_entry(pair))),
                Rule::param_matrix => items.push(DataItem::Matrix(MatrixBlock::from_entry(pair))),
                _ => {}
            }
        }

        Self {
            name,
            default,
            items,
        }
    }
}

impl fmt::Display for ParamData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "data: param {}", self.name)?;
        if let Some(default) = &self.default {
            write!(f, " default {}", default)?;
        }
        write!(f, " := <{} item(s)>", self.items.len())
    }
}

/// Tabbing data: `param [default D] : [KEYSET :] COL.. := rows;`
/// distributing each named column into its own symbol
#[derive(Clone, Debug)]
pub struct Tabbing {
    pub default: Option<Atom>,
    pub key_set: Option<String>,
    pub cols: Vec<String>,
    pub cells: Vec<Cell>,
}

impl Tabbing {
    pub fn from_entry(entry: Pair<Rule>) -> Self {
        let mut default = None;
        let mut key_set = None;
        let mut cols = Vec::new();
        let mut cells = Vec::new();

        for pair in entry.into_inner() {
            match pair.as_rule() {
                Rule::param_default => default = default_from_entry(pair),
                Rule::tab_key => {
                    key_set = pair.into_inner().next().map(|p| p.as_str().to_string());
                }
                Rule::tab_col => {
                    if let Some(inner) = pair.into_inner().next() {
                        cols.push(inner.as_str().to_string());
                    }
                }
                Rule::atom => cells.push(Cell::Atom(Atom::from_entry(pair))),
                Rule::dot => cells.push(Cell::Dot),
                _ => {}
            }
        }

        Self {
            default,
            key_set,
            cols,
            cells,
        }
    }
}

impl fmt::Display for Tabbing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "data: param :")?;
        if let Some(key_set) = &self.key_set {
            write!(f, " {} :", key_set)?;
        }
        for col in &self.cols {
            write!(f, " {}", col)?;
        }
        write!(f, " := <{} cell(s)>", self.cells.len())
    }
}

/// Pull the atom out of a `param_default` pair
fn default_from_entry(entry: Pair<Rule>) -> Option<Atom> {
    entry
        .into_inner()
        .find(|p| p.as_rule() == Rule::atom)
        .map(Atom::from_entry)
}

// ==============================
// ROOT ENTRY ENUM
// ==============================

/// Root entry type, one per statement
#[derive(Clone, Debug)]
pub enum Entry {
    SetDecl(SetDecl),
    SetData(SetData),
    ParamDecl(ParamDecl),
    ParamData(ParamData),
    Tabbing(Tabbing),
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Entry::SetDecl(d) => write!(f, "{}", d),
            Entry::SetData(d) => write!(f, "{}", d),
            Entry::ParamDecl(d) => write!(f, "{}", d),
            Entry::ParamData(d) => write!(f, "{}", d),
            Entry::Tabbing(t) => write!(f, "{}", t),
        }
    }
}
