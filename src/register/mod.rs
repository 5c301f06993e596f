//! Battery register decoding: schema and raw store, value conversion and the
//! canonical remapping published to the rest of the bridge.

pub mod canonical;
pub mod convert;
pub mod display;
pub mod marstek;
pub mod schema;
pub mod status;

pub use canonical::{CanonicalDescriptor, CanonicalId, CanonicalMapper, CanonicalTable, MappingRule};
pub use convert::{Value, WireType};
pub use schema::{Access, BlockRequest, RegisterDescriptor, RegisterId, RegisterSchema};
