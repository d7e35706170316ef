use thiserror::Error;

use crate::bus::BusError;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("failed to prepare notification storage: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Bus(#[from] BusError),
}
