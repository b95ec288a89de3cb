//! # Systems
//!
//! A system owns an [`EntityRegistry`](super::EntityRegistry) of related
//! entities and drives them once per frame. Systems never reach into each
//! other's registries; cross-system reads go through public getters.

use crate::scene::SceneGraph;

/// Per-frame data handed to every system.
pub struct FrameContext<'a> {
    /// The scene being simulated.
    pub scene: &'a mut SceneGraph,
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Frame counter, starting at 1.
    pub frame: u64,
}

/// Owner and driver of a group of entities.
pub trait System {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Advances the system by one frame.
    fn update(&mut self, ctx: &mut FrameContext<'_>);

    /// XR presentation started or stopped.
    fn on_xr_present(&mut self, _scene: &mut SceneGraph, _presenting: bool) {}

    /// Disposes every owned entity.
    fn dispose(&mut self, scene: &mut SceneGraph);
}
