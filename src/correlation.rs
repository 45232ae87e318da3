//! Correlation identifiers and their generator.
//!
//! An id pairs a `request` frame with the `return` or `error` frame that
//! eventually answers it. Ids are short strings of lowercase ASCII letters,
//! so they never contain the frame delimiter.

use std::fmt;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Default number of symbols in a generated correlation id.
pub const DEFAULT_ID_LENGTH: usize = 10;

const ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Opaque correlation identifier carried in-band inside every frame.
///
/// The responder echoes it unchanged; nothing else interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Borrow the correlation id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces fixed-length random correlation ids.
///
/// The randomness source is injected so tests can use a seeded generator.
/// It does not need to be cryptographically secure: the goal is a low
/// collision rate among outstanding requests. Ids are not checked against
/// the pending table, so a collision silently reuses an id.
pub struct CorrelationIdGenerator {
    // ---
    length: usize,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl CorrelationIdGenerator {
    /// Create a generator seeded from OS entropy.
    ///
    /// A `length` of zero is clamped to one.
    pub fn new(length: usize) -> Self {
        Self::with_rng(length, StdRng::from_entropy())
    }

    /// Create a generator over an explicit randomness source.
    pub fn with_rng<R>(length: usize, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        Self {
            length: length.max(1),
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Number of symbols in every generated id.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Generate a new correlation id.
    pub fn generate(&self) -> CorrelationId {
        // ---
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let id: String = (0..self.length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();

        CorrelationId(id)
    }
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}

impl fmt::Debug for CorrelationIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationIdGenerator")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_default_format() {
        // ---
        let id = CorrelationIdGenerator::default().generate();
        assert_eq!(id.as_str().len(), DEFAULT_ID_LENGTH);
        assert!(id.as_str().bytes().all(|b| b.is_ascii_lowercase()));
    }

    #[test]
    fn test_configured_length() {
        // ---
        let generator = CorrelationIdGenerator::new(4);
        assert_eq!(generator.generate().as_str().len(), 4);
    }

    #[test]
    fn test_zero_length_is_clamped() {
        // ---
        let generator = CorrelationIdGenerator::new(0);
        assert_eq!(generator.length(), 1);
        assert_eq!(generator.generate().as_str().len(), 1);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        // ---
        let a = CorrelationIdGenerator::with_rng(10, StdRng::seed_from_u64(7));
        let b = CorrelationIdGenerator::with_rng(10, StdRng::seed_from_u64(7));

        for _ in 0..5 {
            assert_eq!(a.generate(), b.generate());
        }
    }

    #[test]
    fn test_constant_source_repeats() {
        // ---
        // A source that never changes yields the same id every time; nothing
        // deduplicates against outstanding ids.
        let generator = CorrelationIdGenerator::with_rng(6, StepRng::new(0, 0));
        let first = generator.generate();
        assert_eq!(first, generator.generate());
        assert_eq!(first.as_str().len(), 6);
    }

    #[test]
    fn test_generate_unique() {
        // ---
        let generator = CorrelationIdGenerator::default();
        let id1 = generator.generate();
        let id2 = generator.generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_display_and_serde() {
        // ---
        let id = CorrelationId::from("abcdefghij");
        assert_eq!(id.to_string(), "abcdefghij");

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abcdefghij\"");
    }
}
