//! Owned, tagged payloads in transit between two workers.

/// One copied unit of payload addressed to a mailbox.
///
/// The envelope owns its bytes from the moment `send` copies them out of the
/// caller's buffer until the receiver copies them into its destination
/// buffer and drops the envelope.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Envelope {
    source: i32,
    tag: i32,
    data: Box<[u8]>,
}

impl Envelope {
    /// Copy `data` into a new envelope.
    pub(crate) fn copy_from(data: &[u8], source: i32, tag: i32) -> Self {
        Envelope {
            source,
            tag,
            data: data.into(),
        }
    }

    /// Rank of the worker that produced this envelope.
    pub(crate) fn source(&self) -> i32 {
        self.source
    }

    /// Tag chosen by the sender, or `ANY_TAG`.
    pub(crate) fn tag(&self) -> i32 {
        self.tag
    }

    /// Payload length in bytes.
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Whether this envelope satisfies a `(source, tag)` filter.
    pub(crate) fn matches(&self, source: i32, tag: i32) -> bool {
        (source == crate::ANY_SOURCE || source == self.source)
            && (tag == crate::ANY_TAG || tag == self.tag)
    }

    /// Copy as much of the payload as fits into `buf`, consuming the envelope.
    ///
    /// Returns the number of bytes copied; the shorter length wins.
    pub(crate) fn deliver(self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ANY_SOURCE, ANY_TAG};

    #[test]
    fn copy_owns_payload() {
        let mut src = vec![1u8, 2, 3, 4, 5, 6];
        let env = Envelope::copy_from(&src, 0, 7);
        src.fill(0);
        assert_eq!(env.bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(env.len(), 6);
        assert_eq!(env.source(), 0);
        assert_eq!(env.tag(), 7);
    }

    #[test]
    fn empty_payload() {
        let env = Envelope::copy_from(&[], 1, 0);
        assert!(env.is_empty());
        assert_eq!(env.len(), 0);
    }

    #[test]
    fn filter_matching() {
        let env = Envelope::copy_from(&[0u8], 2, 5);
        assert!(env.matches(2, 5));
        assert!(env.matches(ANY_SOURCE, 5));
        assert!(env.matches(2, ANY_TAG));
        assert!(env.matches(ANY_SOURCE, ANY_TAG));
        assert!(!env.matches(1, 5));
        assert!(!env.matches(2, 4));
    }

    #[test]
    fn untagged_envelope_only_matches_any_tag() {
        let env = Envelope::copy_from(&[0u8], 2, ANY_TAG);
        assert!(env.matches(2, ANY_TAG));
        assert!(!env.matches(2, 0));
    }

    #[test]
    fn deliver_truncates_to_shorter() {
        let env = Envelope::copy_from(&[1u8; 10], 0, 0);
        let mut small = [0u8; 4];
        assert_eq!(env.deliver(&mut small), 4);
        assert_eq!(small, [1; 4]);

        let env = Envelope::copy_from(&[2u8; 3], 0, 0);
        let mut large = [0u8; 8];
        assert_eq!(env.deliver(&mut large), 3);
        assert_eq!(large, [2, 2, 2, 0, 0, 0, 0, 0]);
    }
}
