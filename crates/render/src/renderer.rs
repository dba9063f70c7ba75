use std::fmt::Debug;

use fractalspace_kernel::Fractal;

use crate::publisher::DrawBatch;

/// The external draw side: consumes one frame's batches.
///
/// Renderers read the fractal and its batches; they never mutate either.
pub trait Renderer<H> {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame.
    fn render(&self, fractal: &Fractal, batches: &[DrawBatch<H>]) -> Self::Output;
}

/// Produces a human-readable report of what would be drawn.
///
/// Useful for CLI output, logging, and testing the render handoff.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl<H: Debug> Renderer<H> for DebugTextRenderer {
    type Output = String;

    fn render(&self, fractal: &Fractal, batches: &[DrawBatch<H>]) -> String {
        let mut out = String::new();
        let settings = fractal.settings();
        out.push_str(&format!(
            "=== Fractal (frame={}, depth={}, children={}) ===\n",
            fractal.frame(),
            settings.depth,
            settings.child_count
        ));

        let Some(tree) = fractal.tree() else {
            out.push_str("(not built)\n");
            return out;
        };

        let root = tree.root();
        out.push_str(&format!(
            "Root: pos=({:.2}, {:.2}, {:.2}) spin={:.3}deg\n",
            root.world_position.x,
            root.world_position.y,
            root.world_position.z,
            root.spin_angle.to_degrees()
        ));
        out.push_str(&format!("Nodes: {}\n", tree.node_count()));

        for batch in batches {
            let c = batch.bounds.center;
            out.push_str(&format!(
                "  level {}: {} instances scale={:.4} buffer={:?} bounds=({:.2}, {:.2}, {:.2}) size={:.1}\n",
                batch.level,
                batch.instance_count,
                settings.level_scale(batch.level),
                batch.buffer,
                c.x,
                c.y,
                c.z,
                batch.bounds.size.x
            ));
        }

        out
    }
}
