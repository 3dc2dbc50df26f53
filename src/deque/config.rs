//! Construction-time settings for [`BlockingDeque`](super::BlockingDeque)

/// Settings applied when a deque is built and each time it is re-initialized
///
/// # Examples
///
/// ```rust
/// use syncdeque::{BlockingDeque, DequeConfig};
///
/// let config = DequeConfig::new()
///     .initial_capacity(1024)
///     .metrics_enabled(false);
/// let deque: BlockingDeque<u64> = BlockingDeque::with_config(config)?;
/// assert!(deque.is_empty());
/// # Ok::<(), syncdeque::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DequeConfig {
    /// Node slots reserved up front
    pub initial_capacity: usize,
    /// Whether operation metrics are recorded
    pub metrics_enabled: bool,
}

impl DequeConfig {
    /// Default settings: no reserved storage, metrics on
    pub const fn new() -> Self {
        Self {
            initial_capacity: 0,
            metrics_enabled: true,
        }
    }

    /// Reserve room for `capacity` nodes before the first push
    #[must_use]
    pub const fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Turn metrics collection on or off
    #[must_use]
    pub const fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}

impl Default for DequeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = DequeConfig::default().initial_capacity(8).metrics_enabled(false);
        assert_eq!(config.initial_capacity, 8);
        assert!(!config.metrics_enabled);
        assert_eq!(DequeConfig::new(), DequeConfig::default());
    }
}
