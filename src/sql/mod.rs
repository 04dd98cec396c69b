//! Bulk-statement plumbing shared by the query builders and the writers.

pub mod builders;

use std::collections::HashMap;

/// One bulk write: `prefix + join(values, ", ") + suffix` forms a single
/// statement. `values` maps a record's primary hash to its tuple literal, so
/// a batch that sees the same key twice keeps only the later tuple and the
/// same row never appears twice in one `ON CONFLICT DO UPDATE` statement.
#[derive(Debug, Clone)]
pub struct QueryTriple {
    pub prefix: String,
    pub suffix: String,
    pub values: HashMap<String, String>,
}

impl QueryTriple {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            values: HashMap::new(),
        }
    }

    /// Two triples merge when they target the same statement shape.
    pub fn same_statement(&self, other: &QueryTriple) -> bool {
        self.prefix == other.prefix && self.suffix == other.suffix
    }

    /// Union the other triple's values into this one; key conflicts keep the
    /// later (incoming) tuple.
    pub fn merge_from(&mut self, other: QueryTriple) {
        self.values.extend(other.values);
    }

    pub fn assemble(&self) -> String {
        let tuples: Vec<&str> = self.values.values().map(String::as_str).collect();
        format!("{} {}{}", self.prefix, tuples.join(", "), self.suffix)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Literal helpers
// ----------------------------------------------------------------------------

/// Single-quoted literal with embedded quotes doubled.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

pub fn opt_num<T: std::fmt::Display>(v: &Option<T>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "NULL".to_string(),
    }
}

pub fn boolean(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

pub fn ts(t: &chrono::NaiveDateTime) -> String {
    format!("'{}'", t.format("%Y-%m-%d %H:%M:%S%.6f"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_doubles_embedded_quotes() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("it's"), "'it''s'");
    }

    #[test]
    fn merge_keeps_later_tuple_per_key() {
        let mut a = QueryTriple::new("INSERT INTO t (c) VALUES", "");
        a.values.insert("k1".into(), "('old')".into());
        let mut b = QueryTriple::new("INSERT INTO t (c) VALUES", "");
        b.values.insert("k1".into(), "('new')".into());
        b.values.insert("k2".into(), "('other')".into());

        assert!(a.same_statement(&b));
        a.merge_from(b);
        assert_eq!(a.values.len(), 2);
        assert_eq!(a.values["k1"], "('new')");
    }

    #[test]
    fn assemble_joins_tuples() {
        let mut t = QueryTriple::new("INSERT INTO t (c) VALUES", " ON CONFLICT DO NOTHING");
        t.values.insert("k".into(), "('v')".into());
        assert_eq!(
            t.assemble(),
            "INSERT INTO t (c) VALUES ('v') ON CONFLICT DO NOTHING"
        );
    }
}
