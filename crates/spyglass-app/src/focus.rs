use std::sync::atomic::{AtomicUsize, Ordering};

/// Single source of truth for which node is currently displayed.
///
/// Written only by the input router; read concurrently by every node
/// worker and the renderer. The index is a single atomic, so no reader
/// ever observes a partially updated value and the latest rotate wins.
pub struct FocusState {
    current: AtomicUsize,
    count: usize,
}

impl FocusState {
    /// Focus over `count` nodes, starting at index 0.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    pub fn new(count: usize) -> Self {
        assert!(count >= 1, "focus requires at least one node");
        Self {
            current: AtomicUsize::new(0),
            count,
        }
    }

    /// Index of the currently focused node.
    pub fn get(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Rotate focus by `delta`, wrapping modulo the node count, and return
    /// the new index.
    ///
    /// Single-writer: only the input router rotates, so a plain
    /// load-then-store is race-free.
    pub fn rotate(&self, delta: isize) -> usize {
        let current = self.current.load(Ordering::SeqCst) as isize;
        let next = (current + delta).rem_euclid(self.count as isize) as usize;
        self.current.store(next, Ordering::SeqCst);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let focus = FocusState::new(4);
        assert_eq!(focus.get(), 0);
    }

    #[test]
    fn test_rotate_forward_wraps() {
        let focus = FocusState::new(3);
        assert_eq!(focus.rotate(1), 1);
        assert_eq!(focus.rotate(1), 2);
        // N-1 rotated forward lands back on 0.
        assert_eq!(focus.rotate(1), 0);
    }

    #[test]
    fn test_rotate_backward_wraps() {
        let focus = FocusState::new(3);
        // 0 rotated backward lands on N-1.
        assert_eq!(focus.rotate(-1), 2);
        assert_eq!(focus.rotate(-1), 1);
    }

    #[test]
    fn test_rotate_round_trip_from_any_index() {
        for count in 1..=5 {
            let focus = FocusState::new(count);
            for _ in 0..count {
                let before = focus.get();
                focus.rotate(1);
                focus.rotate(-1);
                assert_eq!(focus.get(), before);
                focus.rotate(1);
            }
        }
    }

    #[test]
    fn test_single_node_always_zero() {
        let focus = FocusState::new(1);
        assert_eq!(focus.rotate(1), 0);
        assert_eq!(focus.rotate(-1), 0);
        assert_eq!(focus.get(), 0);
    }
}
