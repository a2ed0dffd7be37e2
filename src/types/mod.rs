//! Type definitions for the ad SDK
//!
//! This module contains the data structures exchanged with the ad server and
//! the host-facing configuration types with their validators.

pub mod ad;
pub mod context;
pub mod layout;
pub mod message;
pub mod request;
pub mod response;
pub mod theme;
pub mod validation;

pub use ad::AdData;
pub use context::{CustomValue, NativeContext, filter_context_for_privacy};
pub use layout::{MIN_AD_WIDTH, WidthSpec};
pub use message::{ChatMessage, FrameMessage, format_conversation};
pub use request::{
    AdIntegrateRequest, AdRequest, ClickEvent, EngagementEvent, EngagementKind, GameCharacter,
    GameInitRequest, LegacyAdRequest, NativeRequest, SPONSORED_SUGGESTION_FORMAT, SspRequest,
    UserProfileRequest,
};
pub use response::{
    CatalogResponse, FetchAdResponse, GameData, GameLaunch, NO_FILL_MESSAGE, SessionResponse,
};
pub use theme::{Accent, Font, OneOrMany, Theme, ThemeMode};
pub use validation::{BannerPlacement, validate_banner, validate_messages};
