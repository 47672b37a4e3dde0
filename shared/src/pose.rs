use crate::Tick;

/// A compact avatar pose, sampled by the authority at a low fixed rate
#[derive(Clone, Debug, PartialEq)]
pub struct PoseSnapshot {
    pub tick: Tick,
    pub root: [f32; 3],
    /// Radians about the vertical axis
    pub yaw: f32,
    pub head: [f32; 3],
    pub left_hand: [f32; 3],
    pub right_hand: [f32; 3],
}

impl PoseSnapshot {
    pub fn at_rest(tick: Tick, root: [f32; 3]) -> Self {
        Self {
            tick,
            root,
            yaw: 0.0,
            head: [root[0], root[1] + 1.6, root[2]],
            left_hand: [root[0] - 0.3, root[1] + 1.0, root[2]],
            right_hand: [root[0] + 0.3, root[1] + 1.0, root[2]],
        }
    }
}
