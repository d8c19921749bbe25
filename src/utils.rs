use crate::dat::Entry;

pub fn print_entries(entries: &[Entry], verbose: bool) {
    for entry in entries {
        if verbose {
            println!("{:?}", entry)
        } else {
            println!("{}", entry)
        }
    }
}
