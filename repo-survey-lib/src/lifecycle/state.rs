use crate::Result;
use ohno::bail;
use strum::Display;

/// Where a repository is in its clone, build, analyze and delete sequence.
///
/// `Deleted` is the only successful terminal stage. `Errored` is reachable from every
/// non-terminal stage and absorbs every later transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Stage {
    #[default]
    NotCloned,
    Cloned,
    Built,
    Tested,
    Deleted,
    Errored,
}

impl Stage {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted | Self::Errored)
    }

    /// Whether `next` directly follows this stage.
    ///
    /// Building is optional, so `Cloned` may move straight to `Tested`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Errored, _) => true,
            (Self::Deleted, _) => false,
            (_, Self::Errored) => true,
            (Self::NotCloned, Self::Cloned)
            | (Self::Cloned, Self::Built | Self::Tested)
            | (Self::Built, Self::Tested)
            | (Self::Tested, Self::Deleted) => true,
            _ => false,
        }
    }

    /// Move to `next`.
    ///
    /// Once errored, a repository stays errored whatever is requested.
    ///
    /// # Errors
    ///
    /// Fails if `next` does not follow this stage.
    pub fn advance(self, next: Self) -> Result<Self> {
        if !self.can_advance_to(next) {
            bail!("invalid lifecycle transition from {self} to {next}");
        }

        Ok(if self == Self::Errored { Self::Errored } else { next })
    }
}
