//! Converts intermediate records into dimension-checked tuples and merges
//! them into the symbol table.
//!
//! All four record encodings funnel through the same wildcard machinery:
//! a data body with no explicit slice behaves as the all-wildcard slice,
//! so flat lists are just splices over `(*, *, ...)`.

use indexmap::IndexMap;
use log::debug;

use crate::dat::atoms::{fill_slice, wild_count};
use crate::dat::{
    Atom, Cell, DataItem, Entry, MatrixBlock, ParamData, ParamDecl, SetData, SetDecl, SlicePos,
    Tabbing, Tuple,
};
use crate::error::{Error, Result};
use crate::table::{Kind, Symbol, SymbolTable, Value};

/// Merge one statement's record into the table
pub fn apply(table: &mut SymbolTable, entry: Entry) -> Result<()> {
    match entry {
        Entry::SetDecl(decl) => set_decl(table, decl),
        Entry::SetData(data) => set_data(table, data),
        Entry::ParamDecl(decl) => param_decl(table, decl),
        Entry::ParamData(data) => param_data(table, data),
        Entry::Tabbing(tab) => tabbing(table, tab),
    }
}

/// Width contributed by a subscript domain: a declared set contributes its
/// dimen, anything else contributes 1
fn domain_width(table: &SymbolTable, domain: &[String]) -> usize {
    domain
        .iter()
        .map(|name| match table.get(name) {
            Some(sym) if sym.kind == Kind::Set => sym.dimen.unwrap_or(1),
            _ => 1,
        })
        .sum()
}

fn dimension_error(symbol: &str, expected: usize, found: usize) -> Error {
    Error::DimensionMismatch {
        symbol: symbol.to_string(),
        expected,
        found,
    }
}

// ==============================
// DECLARATIONS
// ==============================

fn set_decl(table: &mut SymbolTable, decl: SetDecl) -> Result<()> {
    let SetDecl {
        name,
        dimen,
        domain,
    } = decl;
    debug!("declare set {name}");

    let domain_sets = domain.map(|d| d.sets);
    let width = domain_sets
        .as_ref()
        .map(|sets| domain_width(table, sets))
        .unwrap_or(0);

    if table.get(&name).is_none() {
        let domain_sets = domain_sets.unwrap_or_default();
        let value = if domain_sets.is_empty() {
            Value::Sequence(Vec::new())
        } else {
            Value::IndexedSequence(IndexMap::new())
        };
        table.insert(Symbol {
            name,
            kind: Kind::Set,
            dimen: dimen.or(Some(1)),
            domain: domain_sets,
            domain_width: width,
            default: None,
            value,
        });
        return Ok(());
    }

    let sym = table.get_mut(&name).unwrap();
    if sym.kind != Kind::Set {
        return Err(Error::Redeclaration { symbol: name });
    }
    if let Some(d) = dimen {
        match sym.dimen {
            Some(cur) if cur != d => return Err(Error::Redeclaration { symbol: name }),
            _ => sym.dimen = Some(d),
        }
    }
    if let Some(sets) = domain_sets {
        if sym.domain.is_empty() && !sym.populated() {
            sym.domain = sets;
            sym.domain_width = width;
            sym.value = Value::IndexedSequence(IndexMap::new());
        } else if sym.domain != sets {
            return Err(Error::Redeclaration { symbol: name });
        }
    }
    Ok(())
}

fn param_decl(table: &mut SymbolTable, decl: ParamDecl) -> Result<()> {
    let ParamDecl {
        name,
        domain,
        default,
    } = decl;
    debug!("declare param {name}");

    let domain_sets = domain.map(|d| d.sets);
    let width = domain_sets.as_ref().map(|sets| domain_width(table, sets));

    if table.get(&name).is_none() {
        table.insert(Symbol {
            name,
            kind: Kind::Param,
            dimen: Some(width.unwrap_or(0)),
            domain: domain_sets.unwrap_or_default(),
            domain_width: width.unwrap_or(0),
            default,
            value: Value::Mapping(IndexMap::new()),
        });
        return Ok(());
    }

    let sym = table.get_mut(&name).unwrap();
    if sym.kind != Kind::Param {
        return Err(Error::Redeclaration { symbol: name });
    }
    if let (Some(w), Some(sets)) = (width, domain_sets) {
        match sym.dimen {
            // Changing the shape of an existing param is a conflict,
            // populated or not
            Some(cur) if cur != w => return Err(Error::Redeclaration { symbol: name }),
            _ => {
                sym.dimen = Some(w);
                sym.domain = sets;
                sym.domain_width = w;
            }
        }
    }
    if default.is_some() {
        sym.default = default;
    }
    Ok(())
}

// ==============================
// SET DATA
// ==============================

fn set_data(table: &mut SymbolTable, data: SetData) -> Result<()> {
    let SetData {
        name,
        member,
        items,
    } = data;
    debug!("set data for {name}");

    if table.get(&name).is_none() {
        // Created by data alone; element width is inferred from the records
        table.insert(Symbol {
            name: name.clone(),
            kind: Kind::Set,
            dimen: None,
            domain: Vec::new(),
            domain_width: 0,
            default: None,
            value: Value::Sequence(Vec::new()),
        });
    }

    let sym = table.get(&name).unwrap();
    if sym.kind != Kind::Set {
        return Err(Error::Redeclaration { symbol: name });
    }
    let member_width = sym.domain_width;
    let has_domain = !sym.domain.is_empty();
    let dimen = sym.dimen.unwrap_or_else(|| infer_set_dimen(&items));

    let member = match member {
        Some(m) => {
            if !has_domain {
                return Err(Error::UndefinedDomain {
                    symbol: name,
                    context: "subscripted data for a set with no declared domain".to_string(),
                });
            }
            if m.len() != member_width {
                return Err(dimension_error(&name, member_width, m.len()));
            }
            Some(m)
        }
        None => {
            if has_domain {
                return Err(Error::UndefinedDomain {
                    symbol: name,
                    context: "data for a subscripted set needs a [member] subscript".to_string(),
                });
            }
            None
        }
    };

    let elements = expand_set_items(&name, dimen, items)?;

    let sym = table.get_mut(&name).unwrap();
    sym.dimen = Some(dimen);
    match (&mut sym.value, member) {
        (Value::Sequence(seq), None) => seq.extend(elements),
        (Value::IndexedSequence(map), Some(m)) => {
            map.entry(m).or_insert_with(Vec::new).extend(elements);
        }
        _ => unreachable!("set store shape follows its domain"),
    }
    Ok(())
}

/// Element width when no declaration fixed it: a matrix enumerates pairs,
/// an explicit tuple shows its own width, flat atoms are single elements
fn infer_set_dimen(items: &[DataItem]) -> usize {
    match items.first() {
        Some(DataItem::Matrix(_)) => 2,
        Some(DataItem::Tuple(ps)) => ps.len(),
        _ => 1,
    }
}

/// Expand a set data body into element tuples
fn expand_set_items(name: &str, dimen: usize, items: Vec<DataItem>) -> Result<Vec<Tuple>> {
    let mut slice: Vec<SlicePos> = vec![SlicePos::Wild; dimen];
    let mut fill: Vec<Atom> = Vec::new();
    let mut out: Vec<Tuple> = Vec::new();

    for item in items {
        match item {
            DataItem::Tuple(ps) => {
                if !fill.is_empty() {
                    return Err(dimension_error(name, wild_count(&slice), fill.len()));
                }
                if ps.len() != dimen {
                    return Err(dimension_error(name, dimen, ps.len()));
                }
                if wild_count(&ps) > 0 {
                    // New slice prefix; following atoms fill its wildcards
                    slice = ps;
                } else {
                    out.push(
                        ps.into_iter()
                            .map(|p| match p {
                                SlicePos::Fixed(atom) => atom,
                                SlicePos::Wild => unreachable!(),
                            })
                            .collect(),
                    );
                }
            }
            DataItem::Atom(atom) => {
                let wilds = wild_count(&slice);
                fill.push(atom);
                if fill.len() == wilds {
                    out.push(fill_slice(&slice, &fill));
                    fill.clear();
                }
            }
            DataItem::Matrix(block) => {
                if !fill.is_empty() {
                    return Err(dimension_error(name, wild_count(&slice), fill.len()));
                }
                let wilds = wild_count(&slice);
                if wilds != 2 {
                    return Err(dimension_error(name, 2, wilds));
                }
                for (row, cells) in matrix_rows(name, &block)? {
                    for (col, cell) in block.cols.iter().zip(&cells) {
                        let pair = if block.transpose {
                            [col.clone(), row.clone()]
                        } else {
                            [row.clone(), col.clone()]
                        };
                        match cell {
                            Cell::Plus => out.push(fill_slice(&slice, &pair)),
                            Cell::Minus => {}
                            Cell::Atom(_) | Cell::Dot => {
                                return Err(dimension_error(name, 2, block.cols.len()));
                            }
                        }
                    }
                }
            }
            DataItem::Slice(_) | DataItem::Dot => {
                unreachable!("not produced by the set data grammar")
            }
        }
    }

    if !fill.is_empty() {
        return Err(dimension_error(name, wild_count(&slice), fill.len()));
    }
    Ok(out)
}

// ==============================
// PARAM DATA
// ==============================

fn param_data(table: &mut SymbolTable, data: ParamData) -> Result<()> {
    let ParamData {
        name,
        default,
        items,
    } = data;
    debug!("param data for {name}");

    if table.get(&name).is_none() {
        table.insert(Symbol {
            name: name.clone(),
            kind: Kind::Param,
            dimen: None,
            domain: Vec::new(),
            domain_width: 0,
            default: None,
            value: Value::Mapping(IndexMap::new()),
        });
    }

    let sym = table.get(&name).unwrap();
    if sym.kind != Kind::Param {
        return Err(Error::Redeclaration { symbol: name });
    }
    let dimen = match sym.dimen {
        Some(d) => d,
        None => infer_param_dimen(&name, &items)?,
    };

    // A data-statement default attaches to the symbol; later lookups fall
    // back to it
    if default.is_some() {
        table.get_mut(&name).unwrap().default = default;
    }

    if dimen == 0 {
        let sym = table.get_mut(&name).unwrap();
        sym.dimen = Some(0);
        match items.as_slice() {
            [] => {}
            [DataItem::Atom(atom)] => sym.value = Value::Scalar(atom.clone()),
            _ => return Err(dimension_error(&name, 1, items.len())),
        }
        return Ok(());
    }

    let pairs = expand_param_items(&name, dimen, items)?;

    let sym = table.get_mut(&name).unwrap();
    sym.dimen = Some(dimen);
    match &mut sym.value {
        Value::Mapping(map) => {
            for (key, value) in pairs {
                map.insert(key, value);
            }
        }
        _ => return Err(Error::Redeclaration { symbol: name }),
    }
    Ok(())
}

/// Key width when no declaration fixed it: one atom is a scalar, a matrix
/// keys on (row, col), a slice shows the full width. A bare run of several
/// atoms has no recoverable shape.
fn infer_param_dimen(name: &str, items: &[DataItem]) -> Result<usize> {
    match items.first() {
        None => Ok(0),
        Some(DataItem::Matrix(_)) => Ok(2),
        Some(DataItem::Slice(ps)) => Ok(ps.len()),
        Some(DataItem::Atom(_)) | Some(DataItem::Dot) => {
            if items.len() == 1 {
                Ok(0)
            } else {
                Err(dimension_error(name, 1, items.len()))
            }
        }
        Some(DataItem::Tuple(_)) => unreachable!("not produced by the param data grammar"),
    }
}

/// Expand a param data body into (key, value) pairs. `.` cells and values
/// consume their position but produce no entry.
fn expand_param_items(
    name: &str,
    dimen: usize,
    items: Vec<DataItem>,
) -> Result<Vec<(Tuple, Atom)>> {
    let mut slice: Vec<SlicePos> = vec![SlicePos::Wild; dimen];
    let mut fill: Vec<Atom> = Vec::new();
    let mut out: Vec<(Tuple, Atom)> = Vec::new();

    for item in items {
        match item {
            DataItem::Slice(ps) => {
                if !fill.is_empty() {
                    return Err(dimension_error(name, wild_count(&slice), fill.len()));
                }
                if ps.len() != dimen {
                    return Err(dimension_error(name, dimen, ps.len()));
                }
                slice = ps;
            }
            DataItem::Atom(atom) => {
                if fill.len() < wild_count(&slice) {
                    fill.push(atom);
                } else {
                    let key = fill_slice(&slice, &fill);
                    fill.clear();
                    out.push((key, atom));
                }
            }
            DataItem::Dot => {
                if fill.len() < wild_count(&slice) {
                    return Err(dimension_error(name, wild_count(&slice), fill.len()));
                }
                // Placeholder value: the key stays absent and falls back to
                // the default at query time
                fill.clear();
            }
            DataItem::Matrix(block) => {
                if !fill.is_empty() {
                    return Err(dimension_error(name, wild_count(&slice), fill.len()));
                }
                let wilds = wild_count(&slice);
                if wilds != 2 {
                    return Err(dimension_error(name, 2, wilds));
                }
                for (row, cells) in matrix_rows(name, &block)? {
                    for (col, cell) in block.cols.iter().zip(&cells) {
                        let pair = if block.transpose {
                            [col.clone(), row.clone()]
                        } else {
                            [row.clone(), col.clone()]
                        };
                        match cell {
                            Cell::Atom(value) => {
                                out.push((fill_slice(&slice, &pair), value.clone()));
                            }
                            Cell::Dot => {}
                            Cell::Plus | Cell::Minus => {
                                unreachable!("not produced by the param matrix grammar")
                            }
                        }
                    }
                }
            }
            DataItem::Tuple(_) => unreachable!("not produced by the param data grammar"),
        }
    }

    if !fill.is_empty() {
        return Err(dimension_error(name, wild_count(&slice), fill.len()));
    }
    Ok(out)
}

// ==============================
// TABBING DATA
// ==============================

fn tabbing(table: &mut SymbolTable, tab: Tabbing) -> Result<()> {
    let Tabbing {
        default,
        key_set,
        cols,
        cells,
    } = tab;
    debug!("tabbing data for {}", cols.join(", "));

    // Every column must name a declared, subscripted param; their shared
    // dimen is the key width of each row
    let mut key_width: Option<usize> = None;
    for col in &cols {
        let sym = table.get(col).ok_or_else(|| Error::UndefinedSymbol {
            name: col.clone(),
        })?;
        if sym.kind != Kind::Param {
            return Err(Error::Redeclaration { symbol: col.clone() });
        }
        let d = sym.dimen.unwrap_or(0);
        if d == 0 {
            return Err(dimension_error(col, 1, 0));
        }
        match key_width {
            None => key_width = Some(d),
            Some(k) if k != d => return Err(dimension_error(col, k, d)),
            _ => {}
        }
    }
    let k = key_width.unwrap_or(1);

    let stride = k + cols.len();
    if cells.len() % stride != 0 {
        return Err(dimension_error(&cols.join(","), stride, cells.len() % stride));
    }

    let mut rows: Vec<(Tuple, Vec<Cell>)> = Vec::new();
    for chunk in cells.chunks(stride) {
        let mut key = Vec::with_capacity(k);
        for cell in &chunk[..k] {
            match cell {
                Cell::Atom(atom) => key.push(atom.clone()),
                _ => return Err(dimension_error(&cols.join(","), stride, key.len())),
            }
        }
        rows.push((key, chunk[k..].to_vec()));
    }

    // The statement default covers every listed column that has none yet
    if let Some(dft) = &default {
        for col in &cols {
            let sym = table.get_mut(col).unwrap();
            if sym.default.is_none() {
                sym.default = Some(dft.clone());
            }
        }
    }

    for (key, values) in &rows {
        for (col, cell) in cols.iter().zip(values) {
            if let Cell::Atom(value) = cell {
                let sym = table.get_mut(col).unwrap();
                match &mut sym.value {
                    Value::Mapping(map) => {
                        map.insert(key.clone(), value.clone());
                    }
                    _ => return Err(Error::Redeclaration { symbol: col.clone() }),
                }
            }
        }
    }

    // The optional key column header also feeds the named set
    if let Some(set_name) = key_set {
        if table.get(&set_name).is_none() {
            table.insert(Symbol {
                name: set_name.clone(),
                kind: Kind::Set,
                dimen: Some(k),
                domain: Vec::new(),
                domain_width: 0,
                default: None,
                value: Value::Sequence(Vec::new()),
            });
        }
        let sym = table.get_mut(&set_name).unwrap();
        if sym.kind != Kind::Set {
            return Err(Error::Redeclaration { symbol: set_name });
        }
        match sym.dimen {
            None => sym.dimen = Some(k),
            Some(d) if d != k => return Err(dimension_error(&set_name, d, k)),
            _ => {}
        }
        match &mut sym.value {
            Value::Sequence(seq) => seq.extend(rows.into_iter().map(|(key, _)| key)),
            _ => {
                return Err(Error::UndefinedDomain {
                    symbol: set_name,
                    context: "tabbing key column cannot target a subscripted set".to_string(),
                });
            }
        }
    }
    Ok(())
}

// ==============================
// SHARED
// ==============================

/// Recover (row label, cells) rows from a block's flat cell stream. The
/// stride is fixed by the header, so newlines never matter.
fn matrix_rows(name: &str, block: &MatrixBlock) -> Result<Vec<(Atom, Vec<Cell>)>> {
    let stride = block.cols.len() + 1;
    if block.cells.len() % stride != 0 {
        return Err(dimension_error(name, stride, block.cells.len() % stride));
    }
    let mut rows = Vec::with_capacity(block.cells.len() / stride);
    for chunk in block.cells.chunks(stride) {
        let label = match &chunk[0] {
            Cell::Atom(atom) => atom.clone(),
            _ => return Err(dimension_error(name, stride, 0)),
        };
        rows.push((label, chunk[1..].to_vec()));
    }
    Ok(rows)
}
