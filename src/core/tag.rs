//! Random identifiers for snapshots and patterns.
//!
//! Tokens are fixed-width lowercase hex drawn uniformly at random and
//! resampled until they miss every value already in use. Two processes
//! allocating against the same remote at the same time can still pick the
//! same token; nothing here coordinates between them.

use std::collections::BTreeSet;

use rand::Rng;

use crate::error::{BlobmanError, Result};

/// Hex digits per token. 8 digits carry 32 bits of entropy.
pub const TOKEN_HEX_WIDTH: usize = 8;

/// Alphabet tokens are rendered in.
pub const TOKEN_ALPHABET: &[u8; 16] = b"0123456789abcdef";

/// Rejection sampler over the `16^width` token space.
#[derive(Debug, Clone, Copy)]
pub struct TokenAllocator {
    width: usize,
}

impl Default for TokenAllocator {
    fn default() -> Self {
        Self::new(TOKEN_HEX_WIDTH)
    }
}

impl TokenAllocator {
    pub fn new(width: usize) -> Self {
        assert!(width > 0 && width <= 16, "token width must be within 1..=16");
        Self { width }
    }

    /// Draw one token without checking for collisions.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        (0..self.width)
            .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
            .collect()
    }

    /// Number of distinct tokens of this width, saturating at `u128::MAX`.
    fn keyspace(&self) -> u128 {
        16u128.saturating_pow(self.width as u32)
    }

    fn is_token(&self, value: &str) -> bool {
        value.len() == self.width && value.bytes().all(|b| TOKEN_ALPHABET.contains(&b))
    }

    /// Allocate a token absent from `existing`.
    pub fn allocate(&self, existing: &BTreeSet<String>) -> Result<String> {
        self.allocate_with(&mut rand::thread_rng(), existing)
    }

    pub fn allocate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        existing: &BTreeSet<String>,
    ) -> Result<String> {
        let taken = existing.iter().filter(|t| self.is_token(t)).count() as u128;
        if taken >= self.keyspace() {
            return Err(BlobmanError::TokenSpaceExhausted { width: self.width });
        }

        loop {
            let candidate = self.sample(rng);
            if !existing.contains(&candidate) {
                return Ok(candidate);
            }
            tracing::trace!(token = %candidate, "token collision, resampling");
        }
    }
}

/// Allocate a snapshot tag that is not among the tags already known remotely.
///
/// `existing` must come from a fresh listing of the backup repository.
pub fn allocate_snapshot_tag(existing: &BTreeSet<String>) -> Result<String> {
    TokenAllocator::default().allocate(existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn all_tokens(width: usize) -> Vec<String> {
        let count = 16usize.pow(width as u32);
        (0..count).map(|n| format!("{:0width$x}", n, width = width)).collect()
    }

    #[test]
    fn test_default_token_shape() {
        let token = allocate_snapshot_tag(&BTreeSet::new()).unwrap();
        assert_eq!(token.len(), TOKEN_HEX_WIDTH);
        assert!(token.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_returns_only_free_value() {
        let allocator = TokenAllocator::new(2);
        let tokens = all_tokens(2);
        assert_eq!(tokens.len(), 256);

        for free in ["00", "7f", "ff"] {
            let existing: BTreeSet<String> =
                tokens.iter().filter(|t| t.as_str() != free).cloned().collect();
            let mut rng = StdRng::seed_from_u64(7);
            assert_eq!(allocator.allocate_with(&mut rng, &existing).unwrap(), free);
        }
    }

    #[test]
    fn test_exhausted_space_errors() {
        let allocator = TokenAllocator::new(1);
        let existing: BTreeSet<String> = all_tokens(1).into_iter().collect();
        assert!(matches!(
            allocator.allocate(&existing),
            Err(BlobmanError::TokenSpaceExhausted { width: 1 })
        ));
    }

    #[test]
    fn test_foreign_values_do_not_count_toward_exhaustion() {
        let allocator = TokenAllocator::new(1);
        let mut existing: BTreeSet<String> = all_tokens(1).into_iter().collect();
        existing.remove("a");
        existing.insert("not-a-token".to_string());
        assert_eq!(allocator.allocate(&existing).unwrap(), "a");
    }

    #[test]
    fn test_never_returns_existing() {
        let allocator = TokenAllocator::new(2);
        let existing: BTreeSet<String> = all_tokens(2).into_iter().step_by(2).collect();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let token = allocator.allocate_with(&mut rng, &existing).unwrap();
            assert!(!existing.contains(&token));
        }
    }
}
