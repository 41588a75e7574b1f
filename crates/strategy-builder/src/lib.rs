//! Strategy Builder
//!
//! Maps an interpreted intent onto an ordered list of browser steps using
//! a static per-platform template table.

pub mod builder;
pub mod profiles;
pub mod templates;
pub mod types;

pub use builder::{trim_for_fast_mode, BuilderConfig, StrategyBuilder};
pub use profiles::{profile, PlatformProfile};
pub use templates::step_id;
pub use types::{
    estimate_duration_ms, Interaction, Selector, SelectorStrategy, Step, StepKind, StepParams,
    Strategy, Target,
};
