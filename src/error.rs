use thiserror::Error;

/// Why an allocate or free call did not fully succeed.
///
/// These are ordinary values. Nothing in the allocator panics or aborts
/// for them, so a caller can retry, log or degrade as it sees fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// No unit of the buffer is free.
  #[error("out of memory (requested {requested} units, none free)")]
  OutOfMemory { requested: usize },

  /// Some units are free, but fewer than requested even when fragmented.
  #[error("insufficient memory (requested {requested} units, {available} free)")]
  InsufficientMemory { requested: usize, available: usize },

  /// At least one span handed to `free` fell outside the buffer. Every
  /// in-bounds span of the same call was still released.
  #[error("{rejected} span(s) outside the buffer were not freed")]
  InvalidMemoryLocations { rejected: usize },
}

pub type Result<T> = core::result::Result<T, AllocError>;

/// Flat status code view of an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryStatus {
  Success,
  OutOfMemory,
  InsufficientMemory,
  InvalidMemoryLocations,
}

impl MemoryStatus {
  pub fn of<T>(result: &Result<T>) -> Self {
    match result {
      Ok(_) => MemoryStatus::Success,
      Err(error) => error.status(),
    }
  }
}

impl AllocError {
  pub fn status(&self) -> MemoryStatus {
    match self {
      AllocError::OutOfMemory { .. } => MemoryStatus::OutOfMemory,
      AllocError::InsufficientMemory { .. } => MemoryStatus::InsufficientMemory,
      AllocError::InvalidMemoryLocations { .. } => MemoryStatus::InvalidMemoryLocations,
    }
  }
}
