use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("address {addr} out of range for a {len}-byte store")]
    OutOfRange { addr: usize, len: usize },
}
