//! Adapter-level error type (spec section 7): wraps the coprocessor-domain
//! [`buscore::BusError`] and adds the host-side failure modes the spec
//! calls out as fatal-at-startup (missing firmware, failed shared-memory
//! mapping) versus synchronous-to-the-caller (bad configuration).

use buscore::BusError;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("bus engine error: {0:?}")]
    Bus(BusError),

    #[error("invalid adapter configuration: {0}")]
    InvalidConfiguration(&'static str),

    #[error("register handle table is full")]
    HandleTableFull,

    #[error("no register installed under handle {0}")]
    UnknownHandle(u8),

    #[error("coprocessor firmware image missing or failed to load")]
    FirmwareMissing,

    #[error("shared-memory mailbox mapping failed")]
    MailboxMappingFailed,
}

impl From<BusError> for AdapterError {
    fn from(e: BusError) -> Self {
        AdapterError::Bus(e)
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
