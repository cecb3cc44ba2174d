use thiserror::Error;

/// Errors surfaced by the receiver's control plane.
///
/// Data-plane failures inside a running pipeline are logged and converted
/// into stage termination instead; see `stages`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The SDR device rejected an operation.
    #[error("sdr device error: {0}")]
    Device(String),

    /// Built without device support and no capture file was given.
    #[error("built without rtl-sdr support; pass --input-file <capture.cu8>")]
    NoSource,
}

pub type Result<T> = std::result::Result<T, Error>;
