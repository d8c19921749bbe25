use log::debug;
use pest::Parser;
use pest::iterators::Pairs;

use crate::dat::{self, Entry};
use crate::error::{Error, Result};
use crate::grammar::{DataParser, Rule};

/// Parse the text using Pest
pub fn parse(data: &str) -> Result<Pairs<'_, Rule>> {
    let mut entries = DataParser::parse(Rule::root, data).map_err(Error::from_parse)?;

    // There will always be at least an "EOI", so this will not error
    let entry = entries.next().unwrap();
    Ok(entry.into_inner())
}

/// Convert the AST Pest Pairs into intermediate records
pub fn consume(entries: Pairs<'_, Rule>) -> Vec<Entry> {
    let mut records: Vec<Entry> = Vec::new();
    for entry in entries {
        match entry.as_rule() {
            Rule::SET_DECL => {
                debug!("SET");
                records.push(Entry::SetDecl(dat::SetDecl::from_entry(entry)));
            }
            Rule::SET_DATA => {
                debug!("DATA:SET");
                records.push(Entry::SetData(dat::SetData::from_entry(entry)));
            }
            Rule::PARAM_DECL => {
                debug!("PARAM");
                records.push(Entry::ParamDecl(dat::ParamDecl::from_entry(entry)));
            }
            Rule::PARAM_DATA => {
                debug!("DATA:PARAM");
                records.push(Entry::ParamData(dat::ParamData::from_entry(entry)));
            }
            Rule::PARAM_TABBING => {
                debug!("DATA:TABBING");
                records.push(Entry::Tabbing(dat::Tabbing::from_entry(entry)));
            }

            // Ignored
            Rule::DATA_MARK => {}
            Rule::END_MARK => {}
            Rule::EOI => {}

            // Catch-all
            _ => {
                let (line, _) = entry.line_col();
                let rule = entry.as_rule();
                let text = entry.as_str();
                unreachable!("unexpected: {line} rule: {rule:?}\ntext: {text}");
            }
        };
    }
    records
}
