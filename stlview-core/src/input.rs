//! Input accumulation between frames.
//!
//! Window events only ever touch the [`InputTracker`]. Once per frame the
//! tracker hands out a plain [`InputSnapshot`], which is the only thing the
//! camera and frame driver read.

use nalgebra::{Point2, Vector2};

/// Mouse buttons that drive the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragButton {
    /// Orbit
    Left,
    /// Pan
    Right,
}

/// Keyboard commands understood by the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Close,
    ToggleShading,
    ToggleSpin,
}

/// Cursor position at the previous and current frame, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseState {
    pub previous: Point2<f32>,
    pub current: Point2<f32>,
}

impl MouseState {
    pub fn delta(&self) -> Vector2<f32> {
        self.current - self.previous
    }
}

impl Default for MouseState {
    fn default() -> Self {
        Self {
            previous: Point2::origin(),
            current: Point2::origin(),
        }
    }
}

/// Everything one frame needs to know about user input
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub mouse: MouseState,
    pub left: bool,
    pub right: bool,
    /// Vertical scroll in lines accumulated since the last frame
    pub scroll: f32,
    pub toggle_shading: bool,
    pub toggle_spin: bool,
}

/// Collects raw input events and turns them into per-frame snapshots
#[derive(Debug, Clone, Default)]
pub struct InputTracker {
    mouse: MouseState,
    cursor: Option<Point2<f32>>,
    primed: bool,
    left: bool,
    right: bool,
    scroll: f32,
    toggle_shading: bool,
    toggle_spin: bool,
    close_requested: bool,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) {
        self.cursor = Some(Point2::new(x, y));
    }

    pub fn button(&mut self, button: DragButton, pressed: bool) {
        match button {
            DragButton::Left => self.left = pressed,
            DragButton::Right => self.right = pressed,
        }
    }

    pub fn scrolled(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn key_pressed(&mut self, action: KeyAction) {
        match action {
            KeyAction::Close => self.close_requested = true,
            KeyAction::ToggleShading => self.toggle_shading = !self.toggle_shading,
            KeyAction::ToggleSpin => self.toggle_spin = !self.toggle_spin,
        }
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Take the snapshot for a new frame and reset per-frame accumulators.
    ///
    /// The first cursor sample seeds both positions, so it never produces a
    /// jump from the window corner.
    pub fn begin_frame(&mut self) -> InputSnapshot {
        let current = self.cursor.unwrap_or(self.mouse.current);
        if !self.primed && self.cursor.is_some() {
            self.mouse.current = current;
            self.primed = true;
        }
        self.mouse.previous = self.mouse.current;
        self.mouse.current = current;

        InputSnapshot {
            mouse: self.mouse,
            left: self.left,
            right: self.right,
            scroll: std::mem::take(&mut self.scroll),
            toggle_shading: std::mem::take(&mut self.toggle_shading),
            toggle_spin: std::mem::take(&mut self.toggle_spin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_has_no_delta() {
        let mut input = InputTracker::new();
        input.cursor_moved(300.0, 200.0);
        let snapshot = input.begin_frame();
        assert_eq!(snapshot.mouse.delta(), Vector2::zeros());
    }

    #[test]
    fn test_delta_is_current_minus_previous() {
        let mut input = InputTracker::new();
        input.cursor_moved(10.0, 10.0);
        input.begin_frame();

        input.cursor_moved(12.0, 7.0);
        input.cursor_moved(15.0, 4.0);
        let snapshot = input.begin_frame();
        assert_eq!(snapshot.mouse.delta(), Vector2::new(5.0, -6.0));

        // No movement since
        assert_eq!(input.begin_frame().mouse.delta(), Vector2::zeros());
    }

    #[test]
    fn test_scroll_accumulates_then_resets() {
        let mut input = InputTracker::new();
        input.scrolled(1.0);
        input.scrolled(2.5);
        assert_eq!(input.begin_frame().scroll, 3.5);
        assert_eq!(input.begin_frame().scroll, 0.0);
    }

    #[test]
    fn test_buttons_are_held_across_frames() {
        let mut input = InputTracker::new();
        input.button(DragButton::Left, true);
        assert!(input.begin_frame().left);
        assert!(input.begin_frame().left);
        input.button(DragButton::Left, false);
        input.button(DragButton::Right, true);
        let snapshot = input.begin_frame();
        assert!(!snapshot.left);
        assert!(snapshot.right);
    }

    #[test]
    fn test_toggles_fire_once() {
        let mut input = InputTracker::new();
        input.key_pressed(KeyAction::ToggleShading);
        let snapshot = input.begin_frame();
        assert!(snapshot.toggle_shading);
        assert!(!snapshot.toggle_spin);
        assert!(!input.begin_frame().toggle_shading);

        // Two presses in one frame cancel out
        input.key_pressed(KeyAction::ToggleSpin);
        input.key_pressed(KeyAction::ToggleSpin);
        assert!(!input.begin_frame().toggle_spin);
    }

    #[test]
    fn test_escape_sets_close_flag() {
        let mut input = InputTracker::new();
        assert!(!input.close_requested());
        input.key_pressed(KeyAction::Close);
        assert!(input.close_requested());
    }
}
