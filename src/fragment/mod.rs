//! Fragment primitives and the receiver-side fragment table.
//!
//! Each datagram carries one [`Fragment`]: a fixed [`FragmentHeader`] plus a
//! slice of the application message. Fragments sharing a [`SeqId`] are
//! collected into a [`FragmentGroup`] by the [`FragmentTable`], which decides
//! when a group is complete or stale.

pub mod error;
pub mod fragmenter;
pub mod group;
pub mod header;
pub mod id;
pub mod index;
pub mod packet;
pub mod table;

pub use error::ParseError;
pub use fragmenter::{FragmentationError, Fragmenter};
pub use group::{FragmentGroup, InsertOutcome};
pub use header::{FragmentHeader, HEADER_LEN};
pub use id::SeqId;
pub use index::FragmentIndex;
pub use packet::Fragment;
pub use table::{Disposition, EvictionPolicy, FragmentTable};
