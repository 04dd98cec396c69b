//! Tab-separated field cursor used by the record decoders.
//!
//! Numeric accessors treat an empty field as absent; booleans are `1`/`0`
//! (empty reads as false, matching what collectors emit for unset flags).

use crate::error::{AppError, AppResult};
use chrono::NaiveDateTime;

pub(crate) struct Fields<'a> {
    parts: Vec<&'a str>,
    pos: usize,
}

impl<'a> Fields<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            parts: line.split('\t').collect(),
            pos: 0,
        }
    }

    fn take(&mut self, name: &'static str) -> AppResult<&'a str> {
        let v = self
            .parts
            .get(self.pos)
            .copied()
            .ok_or_else(|| AppError::Decode(format!("missing field '{name}' (index {})", self.pos)))?;
        self.pos += 1;
        Ok(v)
    }

    pub fn text(&mut self, name: &'static str) -> AppResult<String> {
        Ok(self.take(name)?.to_string())
    }

    /// Consume a wire field the aggregator does not use. Still errors when
    /// the row is short, keeping row-length validation intact.
    pub fn skip(&mut self, name: &'static str) -> AppResult<()> {
        self.take(name).map(|_| ())
    }

    pub fn u64_req(&mut self, name: &'static str) -> AppResult<u64> {
        let raw = self.take(name)?;
        raw.parse()
            .map_err(|_| AppError::Decode(format!("field '{name}': invalid u64 '{raw}'")))
    }

    pub fn u8_req(&mut self, name: &'static str) -> AppResult<u8> {
        let raw = self.take(name)?;
        raw.parse()
            .map_err(|_| AppError::Decode(format!("field '{name}': invalid u8 '{raw}'")))
    }

    pub fn u32_opt(&mut self, name: &'static str) -> AppResult<Option<u32>> {
        let raw = self.take(name)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse()
            .map(Some)
            .map_err(|_| AppError::Decode(format!("field '{name}': invalid u32 '{raw}'")))
    }

    pub fn i32_opt(&mut self, name: &'static str) -> AppResult<Option<i32>> {
        let raw = self.take(name)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse()
            .map(Some)
            .map_err(|_| AppError::Decode(format!("field '{name}': invalid i32 '{raw}'")))
    }

    pub fn i64_opt(&mut self, name: &'static str) -> AppResult<Option<i64>> {
        let raw = self.take(name)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse()
            .map(Some)
            .map_err(|_| AppError::Decode(format!("field '{name}': invalid i64 '{raw}'")))
    }

    pub fn bool01(&mut self, name: &'static str) -> AppResult<bool> {
        let raw = self.take(name)?;
        match raw {
            "1" => Ok(true),
            "0" | "" => Ok(false),
            other => Err(AppError::Decode(format!(
                "field '{name}': invalid flag '{other}'"
            ))),
        }
    }

    pub fn timestamp(&mut self, name: &'static str) -> AppResult<NaiveDateTime> {
        let raw = self.take(name)?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|_| AppError::Decode(format!("field '{name}': invalid timestamp '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_walks_fields_in_order() {
        let mut f = Fields::new("add\t42\t\t1\t2021-03-01 08:30:00.123456");
        assert_eq!(f.text("action").unwrap(), "add");
        assert_eq!(f.u64_req("seq").unwrap(), 42);
        assert_eq!(f.u32_opt("asn").unwrap(), None);
        assert!(f.bool01("flag").unwrap());
        let ts = f.timestamp("timestamp").unwrap();
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2021-03-01");
    }

    #[test]
    fn missing_field_is_a_decode_error() {
        let mut f = Fields::new("only-one");
        f.text("first").unwrap();
        assert!(f.text("second").is_err());
    }

    #[test]
    fn bad_number_names_the_field() {
        let mut f = Fields::new("abc");
        let err = f.u64_req("sequence").unwrap_err();
        assert!(err.to_string().contains("sequence"));
    }
}
