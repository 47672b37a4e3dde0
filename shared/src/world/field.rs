use std::fmt;

use crate::PoseSnapshot;

/// Identifies one replicated field within an entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u16);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}

/// The value of one replicated field
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Scalar(f32),
    /// Radians. Interpolated along the shortest arc
    Angle(f32),
    Vector([f32; 3]),
    Text(String),
    Pose(PoseSnapshot),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            FieldValue::Scalar(value) | FieldValue::Angle(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_pose(&self) -> Option<&PoseSnapshot> {
        match self {
            FieldValue::Pose(pose) => Some(pose),
            _ => None,
        }
    }
}

pub type FieldUpdate = (FieldId, FieldValue);
