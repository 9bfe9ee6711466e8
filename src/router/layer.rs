//! Shift layer state

/// Shift flag plus active view with a one-slot view memory.
///
/// Handlers get `&mut LayerState` and may switch views. The shift flag is
/// only changed by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerState<V> {
    shift_active: bool,
    active_view: V,
    previous_view: Option<V>,
}

impl<V: Clone + PartialEq> LayerState<V> {
    pub fn new(initial_view: V) -> Self {
        Self {
            shift_active: false,
            active_view: initial_view,
            previous_view: None,
        }
    }

    pub fn is_shifted(&self) -> bool {
        self.shift_active
    }

    pub fn active_view(&self) -> &V {
        &self.active_view
    }

    pub fn previous_view(&self) -> Option<&V> {
        self.previous_view.as_ref()
    }

    pub fn is_active_view(&self, view: &V) -> bool {
        self.active_view == *view
    }

    /// Switch views; the view being left is remembered
    pub fn set_active_view(&mut self, view: V) {
        if self.active_view == view {
            return;
        }
        let left = std::mem::replace(&mut self.active_view, view);
        self.previous_view = Some(left);
    }

    /// Go back to the remembered view, if any
    pub fn restore_view(&mut self) -> bool {
        match self.previous_view.take() {
            Some(view) => {
                self.active_view = view;
                true
            }
            None => false,
        }
    }

    /// Normal -> ShiftHeld. False if shift was already held.
    pub(super) fn press_shift(&mut self, shift_view: &V) -> bool {
        if self.shift_active {
            return false;
        }
        self.shift_active = true;
        self.set_active_view(shift_view.clone());
        true
    }

    /// ShiftHeld -> Normal. A view chosen while shifted is kept.
    pub(super) fn release_shift(&mut self, shift_view: &V) -> bool {
        if !self.shift_active {
            return false;
        }
        self.shift_active = false;
        if self.is_active_view(shift_view) {
            self.restore_view();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_active_view_remembers_previous() {
        let mut layer = LayerState::new("play");
        layer.set_active_view("browse");
        assert_eq!(*layer.active_view(), "browse");
        assert_eq!(layer.previous_view(), Some(&"play"));

        // Re-selecting the same view keeps the memory
        layer.set_active_view("browse");
        assert_eq!(layer.previous_view(), Some(&"play"));
    }

    #[test]
    fn test_shift_round_trip() {
        let mut layer = LayerState::new("play");
        assert!(layer.press_shift(&"shift"));
        assert!(layer.is_shifted());
        assert!(!layer.press_shift(&"shift"));

        assert!(layer.release_shift(&"shift"));
        assert!(!layer.is_shifted());
        assert_eq!(*layer.active_view(), "play");
        assert!(!layer.release_shift(&"shift"));
    }

    #[test]
    fn test_restore_without_memory() {
        let mut layer = LayerState::new(1u8);
        assert!(!layer.restore_view());
        assert_eq!(*layer.active_view(), 1);
    }
}
