//! Various utilities functions and types

mod serial;

pub use self::serial::CommitSerial;
pub(crate) use self::serial::CommitCounter;
