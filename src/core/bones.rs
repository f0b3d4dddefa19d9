//! Bone references and the skeleton queries the solver needs from the host pipeline.

use super::types::Transform;
use serde::{Deserialize, Serialize};

/// Skeleton and LOD information supplied by the animation pipeline.
pub trait BoneContainer: Sync {
    /// Skeleton index of the bone called `name`.
    fn find_bone(&self, name: &str) -> Option<usize>;

    fn bone_name(&self, bone: usize) -> Option<&str>;

    fn parent_index(&self, bone: usize) -> Option<usize>;

    /// Whether `bone` is part of the required-bone set at the current LOD.
    fn is_bone_required(&self, bone: usize) -> bool;

    fn lod_level(&self) -> usize;
}

/// Reference to a skeleton bone by name, resolved against a [`BoneContainer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoneReference {
    pub name: String,
    #[serde(skip)]
    index: Option<usize>,
}

impl BoneReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.name.is_empty()
    }

    /// Re-resolves the reference; returns whether the bone exists in the skeleton.
    pub fn resolve(&mut self, bones: &dyn BoneContainer) -> bool {
        self.index = if self.is_set() {
            bones.find_bone(&self.name)
        } else {
            None
        };
        self.index.is_some()
    }

    /// Resolved skeleton index, if any. Does not check LOD presence.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Resolved index when the bone is present at the current LOD.
    pub fn valid_index(&self, bones: &dyn BoneContainer) -> Option<usize> {
        self.index.filter(|&index| bones.is_bone_required(index))
    }

    pub fn is_valid_to_evaluate(&self, bones: &dyn BoneContainer) -> bool {
        self.valid_index(bones).is_some()
    }
}

/// Simple skeleton with a per-bone required mask, used by hosts without their own
/// bone container and by tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Skeleton {
    pub names: Vec<String>,
    pub parents: Vec<Option<usize>>,
    pub required: Vec<bool>,
    pub lod: usize,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bone and returns its index. Parents must be added first.
    pub fn add_bone(&mut self, name: impl Into<String>, parent: Option<usize>) -> usize {
        debug_assert!(parent.map_or(true, |p| p < self.names.len()));
        self.names.push(name.into());
        self.parents.push(parent);
        self.required.push(true);
        self.names.len() - 1
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn set_required(&mut self, bone: usize, required: bool) {
        if let Some(slot) = self.required.get_mut(bone) {
            *slot = required;
        }
    }
}

impl BoneContainer for Skeleton {
    fn find_bone(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    fn bone_name(&self, bone: usize) -> Option<&str> {
        self.names.get(bone).map(String::as_str)
    }

    fn parent_index(&self, bone: usize) -> Option<usize> {
        self.parents.get(bone).copied().flatten()
    }

    fn is_bone_required(&self, bone: usize) -> bool {
        self.required.get(bone).copied().unwrap_or(false)
    }

    fn lod_level(&self) -> usize {
        self.lod
    }
}

/// Component-space transform produced for one bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub bone: usize,
    pub transform: Transform,
}

/// Blends evaluated bone transforms into a component-space pose at `alpha`.
pub fn blend_bone_transforms(pose: &mut [Transform], results: &[BoneTransform], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    for result in results {
        if let Some(slot) = pose.get_mut(result.bone) {
            *slot = if alpha >= 1.0 {
                result.transform
            } else {
                slot.lerp(&result.transform, alpha)
            };
        }
    }
}
