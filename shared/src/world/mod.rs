pub mod entity;
pub mod field;
pub mod mirror_world;
pub mod ownership;
pub mod replica_world;

pub use entity::ReplicatedEntity;
pub use field::{FieldId, FieldUpdate, FieldValue};
pub use mirror_world::{MirrorEntity, MirrorWorld};
pub use ownership::{Epoch, Ownership};
pub use replica_world::{EntityUpdate, ReplicaWorld, WorldError};
