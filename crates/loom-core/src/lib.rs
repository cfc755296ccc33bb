pub mod collision;
pub mod config;
pub mod connections;
pub mod geometry;
pub mod groups;
pub mod hit;
pub mod id;
pub mod model;
pub mod snap;
pub mod viewport;

pub use collision::{CollisionOutcome, PushDirection, resolve_collisions};
pub use config::CanvasConfig;
pub use geometry::{bounds_of, content_bounds, parse_aspect_ratio, resize_floor};
pub use hit::{HitTarget, PortSide, hit_test, port_position};
pub use id::{GroupId, NodeId};
pub use model::*;
pub use snap::{SnapResult, snap_bounds};
pub use viewport::{ScreenSize, Viewport};
