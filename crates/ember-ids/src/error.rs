use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors surfaced by the identity and singleton registries.
///
/// Absence and type mismatch are deliberately *not* errors: both lookups
/// return `None` so a stale handle of the wrong type is indistinguishable
/// from a removed one at the API boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Every non-null u32 handle is occupied. Pathological; existing entries
    /// remain intact and no state is mutated.
    #[error("handle space exhausted")]
    HandleSpaceExhausted,

    /// A singleton of this type is already installed.
    #[error("singleton already exists: {type_name}")]
    AlreadyExists { type_name: &'static str },
}
