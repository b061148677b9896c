mod error;
mod slot_file;

pub use error::{FileError, FileResult};
pub use slot_file::SlotFile;

/// Slot index within a slot file
pub type SlotId = usize;
