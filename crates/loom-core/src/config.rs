//! Tunable constants of the interaction engine.
//!
//! Every threshold the canvas uses lives here so a host can override them
//! from JSON without recompiling. Defaults reproduce the reference layout
//! exactly. Changing them changes where nodes land after a drop.

use serde::{Deserialize, Serialize};

// ─── Config ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Snap distance in *screen* pixels; divided by the zoom scale.
    pub snap_threshold_px: f32,

    /// Gap kept between a dropped node and the node it was pushed off.
    pub collision_padding: f32,

    /// Padding around free nodes when a marquee auto-creates a group.
    pub group_padding: f32,

    /// A marquee narrower than this (screen px) only selects.
    pub marquee_min_width: f32,

    /// Maximum retained undo snapshots.
    pub history_limit: usize,

    pub min_scale: f32,
    pub max_scale: f32,

    /// Scale change per unit of wheel `deltaY` while zooming.
    pub zoom_sensitivity: f32,

    /// Padding around the content box when fitting the view.
    pub fit_padding: f32,

    /// Resize floor.
    pub min_node_width: f32,
    pub min_node_height: f32,

    /// Radius (screen px) around a port center that counts as a hit.
    pub port_hit_radius: f32,

    /// Side length (screen px) of the square resize handle at a node's
    /// bottom-right corner.
    pub resize_handle_size: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            snap_threshold_px: 8.0,
            collision_padding: 24.0,
            group_padding: 32.0,
            marquee_min_width: 10.0,
            history_limit: 50,
            min_scale: 0.2,
            max_scale: 3.0,
            zoom_sensitivity: 0.001,
            fit_padding: 100.0,
            min_node_width: 360.0,
            min_node_height: 240.0,
            port_hit_radius: 12.0,
            resize_handle_size: 20.0,
        }
    }
}

impl CanvasConfig {
    /// Load a config from JSON. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns a message when the input is not a JSON object, a field has
    /// the wrong type, or the result fails [`CanvasConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid canvas config: {e}"))?;
        if !value.is_object() {
            return Err("Invalid canvas config: expected a JSON object".to_string());
        }
        let config: Self =
            serde_json::from_value(value).map_err(|e| format!("Invalid canvas config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is finite and positive, the zoom range is
    /// ordered, and at least one undo step is kept.
    ///
    /// # Errors
    /// Names the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("snap_threshold_px", self.snap_threshold_px),
            ("collision_padding", self.collision_padding),
            ("group_padding", self.group_padding),
            ("marquee_min_width", self.marquee_min_width),
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
            ("zoom_sensitivity", self.zoom_sensitivity),
            ("fit_padding", self.fit_padding),
            ("min_node_width", self.min_node_width),
            ("min_node_height", self.min_node_height),
            ("port_hit_radius", self.port_hit_radius),
            ("resize_handle_size", self.resize_handle_size),
        ];
        if let Some((name, value)) = fields
            .iter()
            .find(|(_, value)| !value.is_finite() || *value <= 0.0)
        {
            return Err(format!(
                "Invalid canvas config: {name} must be positive, got {value}"
            ));
        }
        if self.min_scale > self.max_scale {
            return Err(format!(
                "Invalid canvas config: min_scale {} exceeds max_scale {}",
                self.min_scale, self.max_scale
            ));
        }
        if self.history_limit == 0 {
            return Err("Invalid canvas config: history_limit must be at least 1".to_string());
        }
        Ok(())
    }

    /// Clamp a zoom scale to the configured range.
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}
