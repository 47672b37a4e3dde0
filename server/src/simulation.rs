use accord_shared::{ReplicaWorld, SimulationTick};

/// Authority-side game logic, run once per simulation tick after incoming
/// Requests are applied. The only place the authority's own entities are
/// written
pub trait Simulation: Send {
    fn tick(&mut self, tick: &SimulationTick, world: &mut ReplicaWorld);
}

impl<F> Simulation for F
where
    F: FnMut(&SimulationTick, &mut ReplicaWorld) + Send,
{
    fn tick(&mut self, tick: &SimulationTick, world: &mut ReplicaWorld) {
        self(tick, world)
    }
}
