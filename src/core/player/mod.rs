//! Player element discovery and geometry tracking.

pub mod element;
pub mod geometry;
pub mod locator;
pub mod selector;

pub use element::{ElementHandle, ElementSnapshot, ElementStackEntry, Heuristics};
pub use geometry::{
    DisabledReason, GeometryChange, GeometryState, GeometryTracker, PlayerGeometry, PollOutcome,
    Viewport,
};
pub use locator::{LocatorMode, ManualPlayerSelection, PlayerElementLocator};
pub use selector::SelectorSet;
