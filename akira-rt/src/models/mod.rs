//! Data models for akira-rt

pub mod flagged_segment;
pub mod parameters;
pub mod retune_session;

pub use flagged_segment::{FlaggedSegment, SegmentReport};
pub use parameters::RetuneParameters;
pub use retune_session::{
    ErrorSeverity, RetuneProgress, RetuneSession, RetuneSessionError, RetuneState, StateTransition,
};
