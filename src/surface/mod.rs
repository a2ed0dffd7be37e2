//! Ad surfaces
//!
//! [`machine`] holds the pure lifecycle shared by every surface kind,
//! built on [`viewability`] and [`gate`]. [`driver`] runs a machine as a
//! tokio task against a session. [`minigame`] is the game menu.

pub mod driver;
pub mod gate;
pub mod machine;
pub mod minigame;
pub mod viewability;

pub use driver::{SurfaceCallbacks, SurfaceHandle, mount};
pub use gate::{BotStatus, FetchGate, GateDecision};
pub use machine::{
    AdSurface, Effect, Event, NO_AD_AVAILABLE, Phase, RenderOutput, SurfaceConfig, SurfaceKind,
    SurfaceParams, native_banner_from_json,
};
pub use minigame::{MiniGameMenu, MiniGameOptions};
pub use viewability::{ViewabilityEvent, ViewabilityState, ViewabilityTracker};
