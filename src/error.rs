//! Error types for chain construction and authored-data validation.
//!
//! None of these reach the animation pipeline as hard failures: the node logs them
//! and degrades to passing its input pose through.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DynamicsError {
    #[error("bone '{0}' does not exist in the skeleton")]
    BoneNotFound(String),

    #[error("chain end '{chain_end}' is not a descendant of bound bone '{bound_bone}'")]
    ChainEndNotReachable {
        bound_bone: String,
        chain_end: String,
    },

    #[error("angular limit on {axis} axis has min {min} greater than max {max}; axis left free")]
    InvalidAngularRange { axis: char, min: f32, max: f32 },
}

pub type Result<T> = std::result::Result<T, DynamicsError>;
