//! IMAP command tag generator.

use std::sync::atomic::{AtomicU32, Ordering};

/// Tags wrap after this many commands; a polling session never gets close.
const TAG_SPACE: u32 = 100_000;

/// Tag generator for IMAP commands.
///
/// Generates sequential tags in the format "A0000", "A0001", etc. Each
/// session owns its own generator, so tags only need to be unique among the
/// commands in flight on one connection.
#[derive(Debug)]
pub struct TagGenerator {
    counter: AtomicU32,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            counter: AtomicU32::new(0),
            prefix,
        }
    }

    /// Generates the next tag.
    #[must_use]
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) % TAG_SPACE;
        format!("{}{:04}", self.prefix, n)
    }

    /// Returns the number of tags handed out so far.
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_generation() {
        let generator = TagGenerator::default();
        assert_eq!(generator.next(), "A0000");
        assert_eq!(generator.next(), "A0001");
        assert_eq!(generator.next(), "A0002");
        assert_eq!(generator.issued(), 3);
    }

    #[test]
    fn test_custom_prefix() {
        let generator = TagGenerator::new('C');
        assert_eq!(generator.next(), "C0000");
        assert_eq!(generator.next(), "C0001");
    }

    #[test]
    fn test_wraps_instead_of_overflowing() {
        let generator = TagGenerator::default();
        generator.counter.store(TAG_SPACE - 1, Ordering::Relaxed);
        assert_eq!(generator.next(), "A99999");
        assert_eq!(generator.next(), "A0000");
    }
}
