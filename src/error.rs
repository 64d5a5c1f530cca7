use thiserror::Error;

use crate::invoke::MAX_ARGS;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("too many call arguments: got {0}, limit is {MAX_ARGS}")]
    TooManyArgs(usize),

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error("invocation of '{method}' failed: {message}")]
    Invoke { method: String, message: String },
}

pub type Result<T> = std::result::Result<T, PoolError>;
