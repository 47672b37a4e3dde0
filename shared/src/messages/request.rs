use crate::{
    puzzle::ElementId,
    scene::SceneId,
    world::{ownership::Epoch, replica_world::EntityUpdate},
    EntityId, PuzzleId,
};

/// A peer's ask of the authority. Only the authority executes these, and
/// every handler is safe to apply twice
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    SetReady(bool),
    Activate {
        puzzle: PuzzleId,
        element: ElementId,
    },
    Deactivate {
        puzzle: PuzzleId,
        element: ElementId,
    },
    StartPuzzle {
        puzzle: PuzzleId,
    },
    PlaceNote {
        puzzle: PuzzleId,
        slot: usize,
        note: ElementId,
    },
    ClearSlot {
        puzzle: PuzzleId,
        slot: usize,
    },
    /// Fields written by the entity's owner on its own simulation tick
    UpdateFields(EntityUpdate),
    ClaimOwnership {
        entity: EntityId,
    },
    ReleaseOwnership {
        entity: EntityId,
        epoch: Epoch,
    },
    SceneLoaded {
        scene: SceneId,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::SetReady(_) => "set ready",
            Request::Activate { .. } => "activate",
            Request::Deactivate { .. } => "deactivate",
            Request::StartPuzzle { .. } => "start puzzle",
            Request::PlaceNote { .. } => "place note",
            Request::ClearSlot { .. } => "clear slot",
            Request::UpdateFields(_) => "update fields",
            Request::ClaimOwnership { .. } => "claim ownership",
            Request::ReleaseOwnership { .. } => "release ownership",
            Request::SceneLoaded { .. } => "scene loaded",
        }
    }
}
