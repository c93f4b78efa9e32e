//! Error Types
//!
//! This module defines the error types used throughout the animation engine.
//!
//! # Overview
//!
//! The main error type [`AnimationError`] covers configuration failures that
//! are detected while a skeleton, clip library or animation graph is being
//! built, plus the few recoverable runtime conditions:
//! - Missing clips, nodes and transition edges
//! - Malformed skeletons and blend spaces
//! - Pose buffers whose joint counts disagree
//!
//! Numeric invariants that can only break through a programming error
//! (weights leaking during a crossfade, for instance) are not represented
//! here; they are checked with `debug_assert!` or logged.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, AnimationError>`.
//!
//! ```rust,ignore
//! use myth_anim::errors::Result;
//!
//! fn build_graph() -> Result<()> {
//!     let walk = library.get("Walk")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the animation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    // ========================================================================
    // Asset Lookup Errors
    // ========================================================================
    /// No clip with the given name is registered in the clip library.
    #[error("Animation clip not found: {0}")]
    ClipNotFound(String),

    /// A clip carries more than one track for the same joint.
    #[error("Animation clip '{clip}' has more than one track for joint {joint}")]
    DuplicateTrack {
        /// Name of the clip
        clip: String,
        /// The joint animated twice
        joint: usize,
    },

    /// A joint index referenced by a track or a pose lies outside the skeleton.
    #[error("Joint index out of range: {index} (joint count: {count})")]
    JointOutOfRange {
        /// The invalid index
        index: usize,
        /// Number of joints in the skeleton
        count: usize,
    },

    // ========================================================================
    // Skeleton & Pose Errors
    // ========================================================================
    /// A joint's parent does not precede it in the joint array.
    #[error("Joint '{joint}' at index {index} has parent {parent}, which does not precede it")]
    InvalidJointOrder {
        /// Name of the offending joint
        joint: String,
        /// Index of the offending joint
        index: usize,
        /// Its declared parent index
        parent: usize,
    },

    /// Two pose buffers that must be blended have different joint counts.
    #[error("Pose joint count mismatch: expected {expected}, found {found}")]
    PoseMismatch {
        /// Joint count of the destination
        expected: usize,
        /// Joint count of the other pose
        found: usize,
    },

    // ========================================================================
    // Graph Construction Errors
    // ========================================================================
    /// A graph was built without any node.
    #[error("Animation graph '{0}' has no nodes")]
    EmptyGraph(String),

    /// Two nodes in the same graph share a name.
    #[error("Duplicate animation node name: {0}")]
    DuplicateNode(String),

    /// A node name could not be resolved.
    #[error("Animation node not found: {0}")]
    NodeNotFound(String),

    /// A blend space was declared with no entries or non-increasing values.
    #[error("Invalid blend space '{node}': {reason}")]
    InvalidBlendSpace {
        /// Node owning the blend space
        node: String,
        /// What is wrong with it
        reason: String,
    },

    /// A transition was declared with an unusable duration or target.
    #[error("Invalid transition '{from}' -> '{to}': {reason}")]
    InvalidTransition {
        /// Source node name
        from: String,
        /// Target node name
        to: String,
        /// What is wrong with it
        reason: String,
    },

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// The active node has no edge to the requested target.
    #[error("No transition from '{from}' to '{to}'")]
    TransitionNotFound {
        /// Currently active node
        from: String,
        /// Requested target
        to: String,
    },
}

/// Alias for `Result<T, AnimationError>`.
pub type Result<T> = std::result::Result<T, AnimationError>;
