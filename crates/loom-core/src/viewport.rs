//! Screen ↔ world transform: pan, zoom-at-cursor and fit-view.
//!
//! `screen = world * scale + pan`. The viewport is presentation state only
//! and never enters undo history.

use crate::config::CanvasConfig;
use crate::geometry::content_bounds;
use crate::model::{Bounds, Node, Point};
use serde::{Deserialize, Serialize};

/// Host canvas size in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: f32,
    pub height: f32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f32,
    pub pan: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan: Point::ORIGIN,
        }
    }
}

impl Viewport {
    pub fn screen_to_world(&self, px: f32, py: f32) -> Point {
        Point::new((px - self.pan.x) / self.scale, (py - self.pan.y) / self.scale)
    }

    pub fn world_to_screen(&self, wx: f32, wy: f32) -> Point {
        Point::new(wx * self.scale + self.pan.x, wy * self.scale + self.pan.y)
    }

    pub fn screen_rect_to_world(&self, rect: Bounds) -> Bounds {
        let origin = self.screen_to_world(rect.x, rect.y);
        Bounds::new(
            origin.x,
            origin.y,
            rect.width / self.scale,
            rect.height / self.scale,
        )
    }

    /// Accumulate a screen-space drag delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan.x += dx;
        self.pan.y += dy;
    }

    /// Zoom by a wheel delta while keeping the world point under `cursor`
    /// (screen space) stationary.
    pub fn zoom_at(&mut self, cursor: Point, wheel_delta_y: f32, config: &CanvasConfig) {
        let old_scale = self.scale;
        let new_scale = config.clamp_scale(old_scale - wheel_delta_y * config.zoom_sensitivity);
        if new_scale == old_scale {
            return;
        }
        let offset_x = cursor.x - self.pan.x;
        let offset_y = cursor.y - self.pan.y;
        let ratio = (new_scale - old_scale) / old_scale;
        self.pan.x -= offset_x * ratio;
        self.pan.y -= offset_y * ratio;
        self.scale = new_scale;
    }

    /// Frame every node inside the screen. With no nodes the view resets to
    /// scale 1 at the origin.
    pub fn fit_to(&mut self, nodes: &[Node], screen: ScreenSize, config: &CanvasConfig) {
        let Some(content) = content_bounds(nodes) else {
            *self = Viewport::default();
            return;
        };
        let padded = content.expand(config.fit_padding);
        let scale = (screen.width / padded.width)
            .min(screen.height / padded.height)
            .min(1.0)
            .max(config.min_scale);
        let center = padded.center();
        self.scale = scale;
        self.pan = Point::new(
            screen.width / 2.0 - center.x * scale,
            screen.height / 2.0 - center.y * scale,
        );
        log::debug!(
            "fit view: content {}x{} → scale {scale:.3}",
            padded.width,
            padded.height
        );
    }
}
