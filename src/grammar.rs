use pest_derive::Parser;

/// Pest parser for the data-section grammar in `dat.pest`
#[derive(Parser)]
#[grammar = "dat.pest"]
pub struct DataParser;
