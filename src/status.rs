//! Message status information.
//!
//! This module provides the [`Status`] struct returned by receive and probe
//! operations.

/// Information about a received or probed message.
///
/// Returned by [`Communicator::recv`](crate::Communicator::recv) (describing
/// what was copied) and [`Communicator::probe`](crate::Communicator::probe)
/// (describing a queued envelope without consuming it).
///
/// # Example
///
/// ```
/// use threadmpi::{Config, Runtime, ANY_SOURCE, ANY_TAG};
///
/// let runtime = Runtime::new(Config::new(2)).unwrap();
/// runtime.run(|world| {
///     if world.rank() == 0 {
///         world.send(&[1.0f64, 2.0], 1, 9)?;
///     } else {
///         let mut buf = [0.0f64; 2];
///         let status = world.recv(&mut buf, ANY_SOURCE, ANY_TAG)?;
///         assert_eq!((status.source, status.tag, status.bytes), (0, 9, 16));
///         assert_eq!(status.count::<f64>(), 2);
///     }
///     Ok(())
/// }).unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Source rank of the message.
    pub source: i32,
    /// Tag of the message.
    pub tag: i32,
    /// Bytes copied (receive) or queued (probe).
    pub bytes: usize,
}

impl Status {
    /// Number of whole `T` elements covered by `bytes`.
    pub fn count<T>(&self) -> usize {
        match std::mem::size_of::<T>() {
            0 => 0,
            size => self.bytes / size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_rounds_down_to_whole_elements() {
        let status = Status {
            source: 1,
            tag: 0,
            bytes: 10,
        };
        assert_eq!(status.count::<u8>(), 10);
        assert_eq!(status.count::<i32>(), 2);
        assert_eq!(status.count::<f64>(), 1);
    }
}
