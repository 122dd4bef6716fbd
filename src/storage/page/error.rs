use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Not enough space in page")]
    InsufficientSpace,
    #[error("Record not found")]
    RecordNotFound,
    #[error("Invalid slot ID")]
    InvalidSlotId,
    #[error("Record is not deleted")]
    RecordNotDeleted,
}
