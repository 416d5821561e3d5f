use crate::Result;
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicUsize, Ordering};
use ohno::bail;
use std::sync::Arc;

/// A round-robin pool of API credentials shared by every concurrent caller.
///
/// The pool owns the "current credential" index. Rotation is done with a
/// compare-and-swap against the slot the caller actually used, so when several
/// workers hit the rate limit on the same credential at once, the pool advances
/// exactly one position instead of skipping over healthy credentials.
pub struct TokenPool {
    tokens: Box<[Arc<str>]>,
    current: AtomicUsize,
}

impl TokenPool {
    /// Build a pool from raw credentials, ignoring blank entries.
    ///
    /// # Errors
    ///
    /// Fails if no usable credential remains.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Box<[Arc<str>]> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Arc::from)
            .collect();

        if tokens.is_empty() {
            bail!("at least one GitHub token is required (set GITHUB_TOKENS or pass --github-tokens)");
        }

        Ok(Self {
            tokens,
            current: AtomicUsize::new(0),
        })
    }

    /// Number of credentials in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always `false` once constructed; an empty pool is rejected by [`Self::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The credential currently in use, along with its slot.
    #[must_use]
    pub fn current(&self) -> (usize, Arc<str>) {
        let slot = self.current.load(Ordering::Acquire) % self.tokens.len();
        (slot, Arc::clone(&self.tokens[slot]))
    }

    /// Move past `slot` after it was rate limited. Returns the slot now current.
    ///
    /// If another caller already rotated away from `slot`, the pool is left alone.
    pub fn rotate_from(&self, slot: usize) -> usize {
        let next = (slot + 1) % self.tokens.len();
        match self.current.compare_exchange(slot, next, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => next,
            Err(actual) => actual % self.tokens.len(),
        }
    }
}

impl Debug for TokenPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenPool")
            .field("tokens", &format_args!("<{} redacted>", self.tokens.len()))
            .field("current", &self.current)
            .finish()
    }
}
