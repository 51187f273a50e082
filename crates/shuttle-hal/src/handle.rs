//! [`HandleCache`] – tick-driven re-validation of a selected device.
//!
//! Blocks can be destroyed, ground down or detached from the grid at any
//! time.  Rather than re-scanning the registry on every access, the registry
//! remembers which device it selected and re-selects it when the selection is
//! older than the revalidation interval or when the device reports itself
//! broken.
//!
//! Call [`HandleCache::refresh_if_stale`] at the start of a tick; plain
//! accessors then read [`HandleCache::selected`] without any scanning.

/// Cached index of a selected device plus the tick it was validated on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleCache {
    selected: Option<usize>,
    validated_at: Option<u64>,
    interval: u64,
}

impl HandleCache {
    /// Revalidate at most every `interval` ticks (minimum 1).
    pub fn new(interval: u64) -> Self {
        Self {
            selected: None,
            validated_at: None,
            interval: interval.max(1),
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// `true` when the cached selection must be rebuilt at `tick`.
    pub fn is_stale(&self, tick: u64) -> bool {
        match self.validated_at {
            Some(at) => tick.saturating_sub(at) >= self.interval,
            None => true,
        }
    }

    /// Rebuild the selection through `select` when it is stale, missing, or
    /// `is_valid` rejects the cached index.  Returns the (possibly new)
    /// selection.
    pub fn refresh_if_stale(
        &mut self,
        tick: u64,
        is_valid: impl Fn(usize) -> bool,
        select: impl FnOnce() -> Option<usize>,
    ) -> Option<usize> {
        let cached_ok = self.selected.is_some_and(&is_valid);
        if !cached_ok || self.is_stale(tick) {
            self.selected = select();
            self.validated_at = Some(tick);
        }
        self.selected
    }

    /// Forget the selection; the next refresh rebuilds it.
    pub fn invalidate(&mut self) {
        self.selected = None;
        self.validated_at = None;
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        Self::new(100)
    }
}
