//! Mapping clicks on a scaled screenshot back to the agent's native screen.
//!
//! Every coordinate sent to the teach endpoint is in the fixed 1920x1080
//! frame, whatever size the screenshot happens to be rendered at.

use serde::{Deserialize, Serialize};

pub const NATIVE_WIDTH: f64 = 1920.0;
pub const NATIVE_HEIGHT: f64 = 1080.0;

/// On-screen bounding box of the rendered screenshot, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayBox {
    pub fn contains(&self, client_x: f64, client_y: f64) -> bool {
        client_x >= self.left
            && client_x <= self.left + self.width
            && client_y >= self.top
            && client_y <= self.top + self.height
    }

    fn is_usable(&self) -> bool {
        [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativePoint {
    pub x: i64,
    pub y: i64,
}

/// Maps a pointer position to the native frame.
///
/// Points outside the box are mapped with the same formula and are not
/// clamped; the orchestrator decides what to do with them. Rounding is
/// half away from zero. Returns `None` for a box with no area.
pub fn to_native(display: &DisplayBox, client_x: f64, client_y: f64) -> Option<NativePoint> {
    if !display.is_usable() || !client_x.is_finite() || !client_y.is_finite() {
        return None;
    }

    let x = ((client_x - display.left) * NATIVE_WIDTH / display.width).round();
    let y = ((client_y - display.top) * NATIVE_HEIGHT / display.height).round();

    Some(NativePoint {
        x: x as i64,
        y: y as i64,
    })
}
