//! The per-project address-hash table as CSV.

use std::io::Write;
use std::path::Path;

use crate::error::{Result, ScrubError};
use crate::model::hash_table::{domain_of, AddressHashTable};

/// Header row. `Role` is reserved for downstream annotation and left blank.
pub const HEADER: &str = "Domain,Role,Hash";

/// Write `table` to `path`: one row per address, in address order.
///
/// Only the domain of each address is written; the raw address never
/// leaves memory.
pub fn write_hash_table(table: &AddressHashTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| ScrubError::io(path, e))?;
    let mut out = std::io::BufWriter::new(file);
    render(table, &mut out)
        .and_then(|_| out.flush())
        .map_err(|e| ScrubError::io(path, e))
}

fn render(table: &AddressHashTable, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for (address, hash) in table.iter() {
        writeln!(out, "{},,{}", csv_escape(domain_of(address)), csv_escape(hash))?;
    }
    Ok(())
}

/// Escape a value for CSV (RFC 4180).
///
/// Wraps in double quotes if the value contains commas, quotes, or newlines.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("acme.com"), "acme.com");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_render_rows_in_address_order() {
        let mut table = AddressHashTable::new();
        table.insert("zed@b.org".into(), "h2".into());
        table.insert("amy@a.com".into(), "h1".into());

        let mut buf = Vec::new();
        render(&table, &mut buf).expect("render");
        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "Domain,Role,Hash\na.com,,h1\nb.org,,h2\n"
        );
    }

    #[test]
    fn test_empty_table_is_header_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("email-hashes.csv");
        write_hash_table(&AddressHashTable::new(), &path).expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "Domain,Role,Hash\n");
    }
}
