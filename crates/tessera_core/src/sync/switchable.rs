//! # Switchable Container
//!
//! Two values and an index. Writers always see `current`, the consumer
//! flips the index and takes `other`.

/// A pair of buffers with one designated as current.
///
/// ## Usage
///
/// ```rust,ignore
/// let mut queue: SwitchableContainer<Vec<u32>> = SwitchableContainer::default();
/// queue.current_mut().push(1);
///
/// queue.switch();
/// for value in queue.other_mut().drain(..) {
///     // pushes made here go to the new current buffer
/// }
/// ```
#[derive(Debug, Default, Clone)]
pub struct SwitchableContainer<T> {
    buffers: [T; 2],
    current: usize,
}

impl<T> SwitchableContainer<T> {
    /// Creates a container from two initial buffers.
    #[must_use]
    pub fn new(first: T, second: T) -> Self {
        Self {
            buffers: [first, second],
            current: 0,
        }
    }

    /// The buffer producers write into.
    #[inline]
    #[must_use]
    pub fn current(&self) -> &T {
        &self.buffers[self.current]
    }

    /// Mutable access to the buffer producers write into.
    #[inline]
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.buffers[self.current]
    }

    /// The buffer not currently written to.
    #[inline]
    #[must_use]
    pub fn other(&self) -> &T {
        &self.buffers[self.current ^ 1]
    }

    /// Mutable access to the buffer not currently written to.
    #[inline]
    pub fn other_mut(&mut self) -> &mut T {
        &mut self.buffers[self.current ^ 1]
    }

    /// Flips which buffer is current.
    #[inline]
    pub fn switch(&mut self) {
        self.current ^= 1;
    }

    /// Index of the current buffer (0 or 1).
    #[inline]
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_flips_buffers() {
        let mut container = SwitchableContainer::new(vec![1], vec![2]);
        assert_eq!(container.current(), &vec![1]);
        assert_eq!(container.other(), &vec![2]);

        container.switch();
        assert_eq!(container.current_index(), 1);
        assert_eq!(container.current(), &vec![2]);
        assert_eq!(container.other(), &vec![1]);
    }

    #[test]
    fn test_push_during_drain_goes_to_next_cycle() {
        let mut container: SwitchableContainer<Vec<u32>> = SwitchableContainer::default();
        container.current_mut().push(1);
        container.switch();

        let drained: Vec<u32> = container.other_mut().drain(..).collect();
        container.current_mut().push(2);

        assert_eq!(drained, vec![1]);
        assert!(container.other().is_empty());
        assert_eq!(container.current(), &vec![2]);
    }
}
