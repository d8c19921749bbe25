use std::fmt;
use std::hash::{Hash, Hasher};

use pest::iterators::Pair;

use crate::grammar::Rule;

// ==============================
// ATOMS AND TUPLES
// ==============================

/// A single data atom: a number or a (possibly quoted) symbol.
///
/// A token is a number only if the whole run matches the number grammar,
/// so `01Jan` and `1e` come through as symbols. Quoted strings keep their
/// inner text verbatim, whitespace included.
#[derive(Clone, Debug)]
pub enum Atom {
    Num(f64),
    Sym(String),
}

/// Ordered multi-dimensional key; its length is the dimension
pub type Tuple = Vec<Atom>;

impl Atom {
    pub fn from_entry(entry: Pair<Rule>) -> Self {
        let inner = entry.into_inner().next().unwrap();
        match inner.as_rule() {
            Rule::number => Atom::Num(inner.as_str().parse().unwrap_or(0.0)),
            Rule::quoted => {
                let s = inner.as_str();
                // Delimiters are single ASCII quote chars
                Atom::Sym(s[1..s.len() - 1].to_string())
            }
            _ => Atom::Sym(inner.as_str().to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Atom::Num(n) => Some(*n),
            Atom::Sym(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::Num(_) => None,
            Atom::Sym(s) => Some(s),
        }
    }
}

// Number atoms compare and hash by bit pattern, so they are usable as
// tuple-key components
impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Atom::Num(a), Atom::Num(b)) => a.to_bits() == b.to_bits(),
            (Atom::Sym(a), Atom::Sym(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Atom {}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Atom::Num(n) => n.to_bits().hash(state),
            Atom::Sym(s) => s.hash(state),
        }
    }
}

impl PartialEq<f64> for Atom {
    fn eq(&self, other: &f64) -> bool {
        matches!(self, Atom::Num(n) if n.to_bits() == other.to_bits())
    }
}

impl PartialEq<&str> for Atom {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, Atom::Sym(s) if s == other)
    }
}

impl From<f64> for Atom {
    fn from(n: f64) -> Self {
        Atom::Num(n)
    }
}

impl From<i64> for Atom {
    fn from(n: i64) -> Self {
        Atom::Num(n as f64)
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::Sym(s.to_string())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            // Integral values print without a trailing ".0"
            Atom::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Atom::Num(n) => write!(f, "{}", n),
            Atom::Sym(s) => write!(f, "{}", s),
        }
    }
}

/// Render a tuple the way it appears in source, comma-separated
pub fn fmt_tuple(tuple: &[Atom]) -> String {
    let parts: Vec<String> = tuple.iter().map(|a| a.to_string()).collect();
    parts.join(",")
}

// ==============================
// SLICES
// ==============================

/// One position of a slice or paren tuple: fixed atom or `*` wildcard
#[derive(Clone, Debug, PartialEq)]
pub enum SlicePos {
    Fixed(Atom),
    Wild,
}

/// Parse the positions of a `tuple` or `slice` pair
pub fn slice_from_entry(entry: Pair<Rule>) -> Vec<SlicePos> {
    entry
        .into_inner()
        .map(|pair| match pair.as_rule() {
            Rule::atom => SlicePos::Fixed(Atom::from_entry(pair)),
            Rule::wild => SlicePos::Wild,
            rule => unreachable!("slice position: {rule:?}"),
        })
        .collect()
}

/// Number of `*` positions
pub fn wild_count(slice: &[SlicePos]) -> usize {
    slice.iter().filter(|p| matches!(p, SlicePos::Wild)).count()
}

/// Interleave `fills` into the wildcard positions of `slice`, in order.
/// Callers guarantee `fills.len() == wild_count(slice)`.
pub fn fill_slice(slice: &[SlicePos], fills: &[Atom]) -> Tuple {
    let mut fills = fills.iter();
    slice
        .iter()
        .map(|pos| match pos {
            SlicePos::Fixed(atom) => atom.clone(),
            SlicePos::Wild => fills.next().unwrap().clone(),
        })
        .collect()
}

impl fmt::Display for SlicePos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SlicePos::Fixed(atom) => write!(f, "{}", atom),
            SlicePos::Wild => write!(f, "*"),
        }
    }
}

// ==============================
// MATRIX BLOCKS
// ==============================

/// One cell of a table body
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Atom(Atom),
    Plus,
    Minus,
    Dot,
}

/// A `: col col := ...` table block. Cells arrive as a flat run; rows are
/// recovered later by column count, since newlines are insignificant.
#[derive(Clone, Debug)]
pub struct MatrixBlock {
    pub transpose: bool,
    pub cols: Vec<Atom>,
    pub cells: Vec<Cell>,
}

impl MatrixBlock {
    pub fn from_entry(entry: Pair<Rule>) -> Self {
        let mut transpose = false;
        let mut cols = Vec::new();
        let mut cells = Vec::new();

        for pair in entry.into_inner() {
            match pair.as_rule() {
                Rule::transpose => transpose = true,
                Rule::label => {
                    let inner = pair.into_inner().next().unwrap();
                    cols.push(Atom::from_entry(inner));
                }
                Rule::atom => cells.push(Cell::Atom(Atom::from_entry(pair))),
                Rule::plus => cells.push(Cell::Plus),
                Rule::minus => cells.push(Cell::Minus),
                Rule::dot => cells.push(Cell::Dot),
                _ => {}
            }
        }

        Self {
            transpose,
            cols,
            cells,
        }
    }
}

impl fmt::Display for MatrixBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.transpose {
            write!(f, "(tr) ")?;
        }
        write!(f, "<{} cols, {} cells>", self.cols.len(), self.cells.len())
    }
}

// ==============================
// SUBSCRIPT DOMAINS
// ==============================

/// Subscript domain of a declaration; only the set names are retained,
/// binder identifiers ("r in REGION") are discarded
#[derive(Clone, Debug, Default)]
pub struct Domain {
    pub sets: Vec<String>,
}

impl Domain {
    pub fn from_entry(entry: Pair<Rule>) -> Self {
        let mut sets = Vec::new();

        for item in entry.into_inner() {
            for pair in item.into_inner() {
                if pair.as_rule() == Rule::name {
                    sets.push(pair.as_str().to_string());
                }
            }
        }

        Self { sets }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.sets.join(", "))
    }
}
