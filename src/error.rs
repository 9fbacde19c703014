//! Error types for threadmpi

use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for runtime operations.
///
/// A send to an out-of-range destination is not an error: it is dropped
/// silently. A receive that is never matched blocks forever and is not
/// reported either.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid runtime or topology construction parameters
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Grid coordinates outside `[0, rows) x [0, columns)`
    #[error("Grid index ({row}, {column}) out of range for {rows}x{columns} grid")]
    Index {
        /// Requested row
        row: i32,
        /// Requested column
        column: i32,
        /// Grid rows
        rows: i32,
        /// Grid columns
        columns: i32,
    },

    /// Rank has no cell in the grid
    #[error("Rank {0} is not placed in the grid")]
    UnknownRank(i32),

    /// Invalid rank specified
    #[error("Invalid rank: {0}")]
    InvalidRank(i32),

    /// Tag reserved for collectives or otherwise out of range
    #[error("Invalid tag: {0}")]
    InvalidTag(i32),

    /// Caller buffer too small for the requested count
    #[error("Invalid buffer: need {needed} bytes, have {available}")]
    InvalidBuffer {
        /// Bytes required by `count * element_size`
        needed: usize,
        /// Bytes available in the caller's buffer
        available: usize,
    },

    /// A worker thread panicked before returning
    #[error("Worker {0} panicked")]
    WorkerPanicked(i32),
}

impl Error {
    /// Byte length of `count` elements of `element_size` bytes, checked
    /// against `available`.
    ///
    /// An overflowing product saturates to `usize::MAX`, which no buffer can
    /// satisfy.
    pub(crate) fn check_len(count: usize, element_size: usize, available: usize) -> Result<usize> {
        let needed = count.saturating_mul(element_size);
        Self::check_buffer(needed, available)?;
        Ok(needed)
    }

    /// Check that `available` bytes can hold `needed` bytes.
    pub(crate) fn check_buffer(needed: usize, available: usize) -> Result<()> {
        if needed <= available {
            Ok(())
        } else {
            Err(Error::InvalidBuffer { needed, available })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_buffer_accepts_exact_and_larger() {
        assert!(Error::check_buffer(8, 8).is_ok());
        assert!(Error::check_buffer(4, 8).is_ok());
        assert_eq!(
            Error::check_buffer(9, 8),
            Err(Error::InvalidBuffer {
                needed: 9,
                available: 8
            })
        );
    }

    #[test]
    fn check_len_rejects_overflow() {
        assert_eq!(Error::check_len(3, 4, 12), Ok(12));
        assert_eq!(Error::check_len(0, usize::MAX, 0), Ok(0));
        assert_eq!(
            Error::check_len(usize::MAX, 2, 0),
            Err(Error::InvalidBuffer {
                needed: usize::MAX,
                available: 0
            })
        );
    }

    #[test]
    fn display_messages() {
        let err = Error::Index {
            row: 3,
            column: 0,
            rows: 3,
            columns: 3,
        };
        assert_eq!(
            err.to_string(),
            "Grid index (3, 0) out of range for 3x3 grid"
        );
        assert_eq!(Error::InvalidRank(-4).to_string(), "Invalid rank: -4");
        assert_eq!(Error::WorkerPanicked(2).to_string(), "Worker 2 panicked");
    }
}
