use std::fmt;
use std::io::Read;

use indexmap::IndexMap;

use crate::assemble;
use crate::dat::atoms::{Atom, Tuple, fmt_tuple};
use crate::dat::loader;
use crate::error::{Error, Result};

// ==============================
// SYMBOLS AND VALUES
// ==============================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Set,
    Param,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Kind::Set => write!(f, "set"),
            Kind::Param => write!(f, "param"),
        }
    }
}

/// Tagged value store behind a symbol
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Unsubscripted param
    Scalar(Atom),
    /// A set's elements, in insertion order, duplicates as given
    Sequence(Vec<Tuple>),
    /// Elements of a set with a subscript domain, one sequence per member
    IndexedSequence(IndexMap<Tuple, Vec<Tuple>>),
    /// Subscripted param; keys unique, last assignment wins
    Mapping(IndexMap<Tuple, Atom>),
}

/// A named set or parameter with its declared shape and values.
///
/// `dimen` is the element width for sets and the key width for params
/// (0 for scalars); `domain_width` is the resolved width of the subscript
/// domain, which for params equals `dimen`.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: Kind,
    pub dimen: Option<usize>,
    pub domain: Vec<String>,
    pub domain_width: usize,
    pub default: Option<Atom>,
    pub value: Value,
}

impl Symbol {
    /// How many key atoms a full lookup needs
    pub fn key_width(&self) -> usize {
        match self.kind {
            Kind::Param => self.dimen.unwrap_or(0),
            Kind::Set => self.domain_width,
        }
    }

    pub(crate) fn populated(&self) -> bool {
        match &self.value {
            Value::Scalar(_) => true,
            Value::Sequence(seq) => !seq.is_empty(),
            Value::IndexedSequence(map) => !map.is_empty(),
            Value::Mapping(map) => !map.is_empty(),
        }
    }

    /// Scalar param value, if this is an assigned scalar
    pub fn as_atom(&self) -> Option<&Atom> {
        match &self.value {
            Value::Scalar(atom) => Some(atom),
            _ => None,
        }
    }

    /// A plain set's elements
    pub fn elements(&self) -> Option<&[Tuple]> {
        match &self.value {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// A subscripted param's mapping
    pub fn mapping(&self) -> Option<&IndexMap<Tuple, Atom>> {
        match &self.value {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Set membership check against a full element tuple
    pub fn contains(&self, tuple: &[Atom]) -> bool {
        match &self.value {
            Value::Sequence(seq) => seq.iter().any(|t| t.as_slice() == tuple),
            _ => false,
        }
    }

    /// Convenience membership check for dimen-1 sets
    pub fn contains_atom(&self, atom: &Atom) -> bool {
        self.contains(std::slice::from_ref(atom))
    }

    /// Step one subscript deeper; yields a value, a member's elements, or
    /// an intermediate partial view
    pub fn get(&self, key: impl Into<Atom>) -> Result<Resolved<'_>> {
        Indexed {
            sym: self,
            prefix: Vec::new(),
        }
        .get(key)
    }

    /// Resolve a full (or partial) key tuple in one call, against the same
    /// store `get` traverses
    pub fn lookup(&self, keys: &[Atom]) -> Result<Resolved<'_>> {
        let mut resolved = Resolved::Partial(Indexed {
            sym: self,
            prefix: Vec::new(),
        });
        for key in keys {
            resolved = resolved.get(key.clone())?;
        }
        Ok(resolved)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        if !self.domain.is_empty() {
            write!(f, "{{{}}}", self.domain.join(", "))?;
        }
        if let Some(default) = &self.default {
            write!(f, " default {}", default)?;
        }
        match &self.value {
            Value::Scalar(atom) => write!(f, " := {}", atom),
            Value::Sequence(seq) => write!(f, " := <{} element(s)>", seq.len()),
            Value::IndexedSequence(map) => write!(f, " := <{} member(s)>", map.len()),
            Value::Mapping(map) => write!(f, " := <{} value(s)>", map.len()),
        }
    }
}

// ==============================
// QUERY VIEWS
// ==============================

/// Partial view over a subscripted symbol: a key prefix awaiting the
/// remaining subscripts
#[derive(Clone, Debug)]
pub struct Indexed<'a> {
    sym: &'a Symbol,
    prefix: Tuple,
}

impl<'a> Indexed<'a> {
    pub fn get(mut self, key: impl Into<Atom>) -> Result<Resolved<'a>> {
        self.prefix.push(key.into());
        let width = self.sym.key_width();
        if self.prefix.len() > width {
            return Err(Error::DimensionMismatch {
                symbol: self.sym.name.clone(),
                expected: width,
                found: self.prefix.len(),
            });
        }
        if self.prefix.len() < width {
            return Ok(Resolved::Partial(self));
        }

        // Full key; defaults substitute lazily, only here
        match &self.sym.value {
            Value::Mapping(map) => match map.get(&self.prefix) {
                Some(atom) => Ok(Resolved::Atom(atom)),
                None => match &self.sym.default {
                    Some(default) => Ok(Resolved::Atom(default)),
                    None => Err(Error::MissingKey {
                        symbol: self.sym.name.clone(),
                        key: fmt_tuple(&self.prefix),
                    }),
                },
            },
            Value::IndexedSequence(map) => match map.get(&self.prefix) {
                Some(elements) => Ok(Resolved::Elements(elements)),
                None => Err(Error::MissingKey {
                    symbol: self.sym.name.clone(),
                    key: fmt_tuple(&self.prefix),
                }),
            },
            Value::Scalar(_) | Value::Sequence(_) => Err(Error::DimensionMismatch {
                symbol: self.sym.name.clone(),
                expected: 0,
                found: self.prefix.len(),
            }),
        }
    }
}

/// Result of an index step: a stored atom (or default), a member's
/// elements, or a view awaiting more subscripts
#[derive(Clone, Debug)]
pub enum Resolved<'a> {
    Atom(&'a Atom),
    Elements(&'a [Tuple]),
    Partial(Indexed<'a>),
}

impl<'a> Resolved<'a> {
    /// Continue indexing; errors when the value is already fully resolved
    pub fn get(self, key: impl Into<Atom>) -> Result<Resolved<'a>> {
        match self {
            Resolved::Partial(view) => view.get(key),
            Resolved::Atom(_) | Resolved::Elements(_) => Err(Error::DimensionMismatch {
                symbol: "<resolved value>".to_string(),
                expected: 0,
                found: 1,
            }),
        }
    }

    pub fn as_atom(&self) -> Option<&'a Atom> {
        match self {
            Resolved::Atom(atom) => Some(*atom),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_atom().and_then(|a| a.as_f64())
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.as_atom().and_then(|a| a.as_str())
    }

    pub fn as_elements(&self) -> Option<&'a [Tuple]> {
        match self {
            Resolved::Elements(elements) => Some(*elements),
            _ => None,
        }
    }
}

// ==============================
// SYMBOL TABLE
// ==============================

/// Process-scoped store mapping symbol name to typed value.
///
/// One table is exclusively owned by one loading session; repeated load
/// calls merge into the same symbols in statement order, and a fatal error
/// aborts the current load without rolling back earlier statements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` into a fresh table
    pub fn parse_str(text: &str) -> Result<Self> {
        let mut table = Self::new();
        table.load_string(text)?;
        Ok(table)
    }

    /// Merge more statements into this table
    pub fn load_string(&mut self, text: &str) -> Result<()> {
        let pairs = loader::parse(text)?;
        for entry in loader::consume(pairs) {
            assemble::apply(self, entry)?;
        }
        Ok(())
    }

    /// Merge statements read from a stream
    pub fn load_file<R: Read>(&mut self, mut reader: R) -> Result<()> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.load_string(&text)
    }

    /// Look a symbol up by name
    pub fn symbol(&self, name: &str) -> Result<&Symbol> {
        self.symbols.get(name).ok_or_else(|| Error::UndefinedSymbol {
            name: name.to_string(),
        })
    }

    /// All defined symbol names, in first-seen order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(|s| s.as_str())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }

    pub(crate) fn insert(&mut self, sym: Symbol) {
        self.symbols.insert(sym.name.clone(), sym);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_access() {
        let table = SymbolTable::parse_str("param T := 4;").unwrap();
        let t = table.symbol("T").unwrap();
        assert_eq!(t.as_atom(), Some(&Atom::from(4)));
    }

    #[test]
    fn test_undefined_symbol() {
        let table = SymbolTable::parse_str("param T := 4;").unwrap();
        let err = table.symbol("missing").unwrap_err();
        assert!(matches!(err, Error::UndefinedSymbol { .. }));
    }

    #[test]
    fn test_default_fallback() {
        let table = SymbolTable::parse_str(
            "param foo {s} default 3; param foo := Jan 1;",
        )
        .unwrap();
        let foo = table.symbol("foo").unwrap();
        assert_eq!(foo.get("Jan").unwrap().as_f64(), Some(1.0));
        assert_eq!(foo.get("Mar").unwrap().as_f64(), Some(3.0));
    }

    #[test]
    fn test_missing_key() {
        let table =
            SymbolTable::parse_str("param foo {s}; param foo := Jan 1;").unwrap();
        let foo = table.symbol("foo").unwrap();
        let err = foo.get("Apr").unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
    }

    #[test]
    fn test_nested_and_flat_agree() {
        let table = SymbolTable::parse_str(
            "param foo {s, t}; param foo := 1 2 Hi 99 3 4;",
        )
        .unwrap();
        let foo = table.symbol("foo").unwrap();
        let nested = foo.get(1).unwrap().get(2).unwrap();
        assert_eq!(nested.as_str(), Some("Hi"));
        let flat = foo.lookup(&[Atom::from(1), Atom::from(2)]).unwrap();
        assert_eq!(flat.as_str(), Some("Hi"));
        assert_eq!(foo.lookup(&[Atom::from(99), Atom::from(3)]).unwrap().as_f64(), Some(4.0));
    }

    #[test]
    fn test_over_indexing() {
        let table = SymbolTable::parse_str("param T := 4;").unwrap();
        let t = table.symbol("T").unwrap();
        assert!(matches!(
            t.get("x"),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_names_in_order() {
        let table =
            SymbolTable::parse_str("set b := 1 2; set a := 3; param z := 9;").unwrap();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names, vec!["b", "a", "z"]);
    }
}
