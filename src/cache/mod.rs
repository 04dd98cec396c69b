pub mod attr_dedup;
pub mod router;

pub use attr_dedup::AttrDedupCache;
pub use router::{RouterCache, RouterEntry};
