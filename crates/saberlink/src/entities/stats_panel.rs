//! # Stats Panel
//!
//! A floating panel in front of the XR player showing renderer counters.
//! There is no text rendering in the scene model, so the panel keeps the
//! formatted lines on its [`StatsDisplay`] component for a renderer to draw.

use crate::render::RenderInfo;
use saberlink_core::{
    Component, ComponentContext, ComponentKind, Entity, Geometry, Material, Mesh, SceneGraph,
};
use saberlink_shared::Vec3;
use std::any::Any;
use std::f32::consts::FRAC_PI_4;

const PANEL_COLOR: u32 = 0x00ff_ffff;

/// Text shown on the panel.
#[derive(Clone, Debug, Default)]
pub struct StatsDisplay {
    info: RenderInfo,
    lines: Vec<String>,
    dirty: bool,
}

impl StatsDisplay {
    /// Sets the counters shown from the next update.
    pub fn set_info(&mut self, info: RenderInfo) {
        if info != self.info {
            self.info = info;
            self.dirty = true;
        }
    }

    /// Formatted lines.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Component for StatsDisplay {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Display
    }

    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _delta: f32) {
        if !std::mem::take(&mut self.dirty) {
            return;
        }
        let info = self.info;
        self.lines = vec![
            format!("frame: {}", info.frame),
            format!("geometries: {}", info.geometries),
            format!("materials: {}", info.materials),
            format!("calls: {}", info.calls),
        ];
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Builds the panel 1.5 m up and 1 m ahead, tilted towards the player.
pub fn spawn_stats_panel(scene: &mut SceneGraph) -> Entity {
    let mesh = Mesh::new(Geometry::plane(0.4, 0.2), Material::new(PANEL_COLOR));
    let mut panel = Entity::with_mesh(scene, "stats-panel", mesh);
    panel.set_position(Vec3::new(0.0, 1.5, -1.0));
    panel.set_rotation(Vec3::new(FRAC_PI_4, 0.0, 0.0));
    panel.set_scale(Vec3::new(2.5, 2.5, 2.5));
    panel.add_component(StatsDisplay::default());
    panel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_follow_latest_info() {
        let mut scene = SceneGraph::new();
        let mut panel = spawn_stats_panel(&mut scene);
        let info = RenderInfo {
            frame: 42,
            geometries: 7,
            materials: 7,
            calls: 3,
        };
        panel.get_mut::<StatsDisplay>().unwrap().set_info(info);
        panel.update(&mut scene, 0.0);

        let lines = panel.get::<StatsDisplay>().unwrap().lines().to_vec();
        assert_eq!(lines[0], "frame: 42");
        assert_eq!(lines[3], "calls: 3");
        assert_eq!(scene.transform(panel.node()).map(|t| t.scale), Some(Vec3::new(2.5, 2.5, 2.5)));
    }
}
