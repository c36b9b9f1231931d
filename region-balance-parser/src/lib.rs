pub mod error;
pub mod ir;
pub mod text;

pub use error::ParseError;
pub use ir::{RegionIr, SnapshotIr, StoreIr};
pub use text::{format_snapshot, parse_snapshot};
