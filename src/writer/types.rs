use crate::sql::QueryTriple;

/// Writer class tag. One class today; the tag stays so a future split of
/// base-attribute writers from prefix writers only touches routing, not the
/// pool plumbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterType {
    Default,
    // BaseAttribute,
}

impl WriterType {
    pub const ALL: &'static [WriterType] = &[WriterType::Default];

    pub fn as_str(&self) -> &'static str {
        match self {
            WriterType::Default => "default",
        }
    }
}

/// One unit of bulk work headed for a writer pool. `key` is the bus record
/// key (peer hash, router hash, ...) and drives sticky routing.
#[derive(Debug)]
pub struct IntakeItem {
    pub key: String,
    pub triple: QueryTriple,
    pub wtype: WriterType,
}
