pub mod entry;
pub mod position;

pub use entry::{
    normalize_added_by, Entry, EntryPatch, Placement, RenormalizeOrder, VoteDirection, ANONYMOUS,
};
pub use position::{OrderingError, Position};
