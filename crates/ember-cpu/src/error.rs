use ember_ids::RegistryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ThreadError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadError {
    /// All raw-thread slots hold live threads. Surfaced to the execution
    /// driver as a capacity limit, not a fault.
    #[error("no free raw thread slot")]
    NoFreeSlot,

    /// The requested raw slot already holds a live thread.
    #[error("raw thread slot {index} is occupied")]
    SlotOccupied { index: usize },

    /// The requested raw slot index does not exist.
    #[error("raw thread slot {index} is out of range")]
    SlotOutOfRange { index: usize },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
