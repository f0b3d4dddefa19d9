//! Core types describing simulated bodies, bone bindings, and constraint data.

pub mod bones;
pub mod constraints;
pub mod rigidbody;
pub mod teleport;
pub mod types;

pub use bones::{blend_bone_transforms, BoneContainer, BoneReference, BoneTransform, Skeleton};
pub use constraints::{
    AngularConstraintType, AngularLimit, AngularLimitKind, ConstraintSetup, LimitAnchor,
    LinearLimit, LinearLimitKind, LinearLimitType, PlanarLimit, RotationRetargeting,
    SphericalLimit, SphericalLimitType, Spring, TwistAxis,
};
pub use rigidbody::{AnimRigidBody, CollisionType, WindData};
pub use teleport::{TeleportRequest, TeleportType};
pub use types::{InertiaTensorExt, Transform};
