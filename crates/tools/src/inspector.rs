use fractalspace_common::Bounds;
use fractalspace_kernel::{Fractal, FractalTree};

/// Read-only queries against a fractal for debugging and development UI.
pub struct TreeInspector;

impl TreeInspector {
    /// Produce a summary of the fractal state.
    pub fn summary(fractal: &Fractal) -> TreeSummary {
        let settings = fractal.settings();
        let tree = fractal.tree();
        TreeSummary {
            built: tree.is_some(),
            depth: tree.map_or(0, FractalTree::level_count),
            child_count: settings.child_count,
            node_count: tree.map_or(0, FractalTree::node_count),
            frame: fractal.frame(),
            workers: fractal.worker_count(),
            root_spin_degrees: tree.map_or(0.0, |t| t.root().spin_angle.to_degrees()),
            state_hash: tree.map_or(0, FractalTree::state_hash),
            nodes_outside_bounds: tree.map_or(0, |t| {
                Self::nodes_outside(t, &Bounds::cube(t.root().world_position, settings.bounds_extent))
            }),
        }
    }

    /// Count nodes whose position falls outside `bounds`.
    pub fn nodes_outside(tree: &FractalTree, bounds: &Bounds) -> usize {
        (0..tree.level_count())
            .flat_map(|level| tree.level(level))
            .filter(|n| !bounds.contains(n.world_position))
            .count()
    }

    /// Details of one node, or `None` if the position does not exist.
    pub fn inspect_node(tree: &FractalTree, level: usize, index: usize) -> Option<NodeInfo> {
        let node = tree.node(level, index)?;
        let p = node.world_position;
        let r = node.world_rotation;
        Some(NodeInfo {
            level,
            index,
            slot: if level == 0 { 0 } else { index % tree.child_count() },
            parent: tree.parent_of(level, index),
            child_count: tree.children_of(level, index).map_or(0, |c| c.len()),
            position: [p.x, p.y, p.z],
            rotation: [r.x, r.y, r.z, r.w],
            spin_degrees: node.spin_angle.to_degrees(),
        })
    }

    /// Largest distance from the root to any node of `level`. Zero for
    /// levels the tree does not have.
    pub fn level_extent(tree: &FractalTree, level: usize) -> f32 {
        if level >= tree.level_count() {
            return 0.0;
        }
        let origin = tree.root().world_position;
        tree.level(level)
            .iter()
            .map(|n| n.world_position.distance(origin))
            .fold(0.0, f32::max)
    }
}

/// Summary of fractal state for the inspector.
#[derive(Debug, Clone)]
pub struct TreeSummary {
    pub built: bool,
    pub depth: usize,
    pub child_count: u32,
    pub node_count: usize,
    pub frame: u64,
    pub workers: usize,
    pub root_spin_degrees: f32,
    pub state_hash: u64,
    /// Nodes outside the cube reported with every draw.
    pub nodes_outside_bounds: usize,
}

impl std::fmt::Display for TreeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.built {
            return write!(f, "Fractal: not built (workers={})", self.workers);
        }
        write!(
            f,
            "Fractal: depth={} children={} nodes={} frame={} workers={} root_spin={:.3}deg hash={:#018x} outside_bounds={}",
            self.depth,
            self.child_count,
            self.node_count,
            self.frame,
            self.workers,
            self.root_spin_degrees,
            self.state_hash,
            self.nodes_outside_bounds
        )
    }
}

/// Detailed info about a single node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub level: usize,
    pub index: usize,
    pub slot: usize,
    pub parent: Option<usize>,
    pub child_count: usize,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub spin_degrees: f32,
}

impl std::fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node [{}:{}] slot={} parent={} children={} pos=({:.3}, {:.3}, {:.3}) rot=({:.3}, {:.3}, {:.3}, {:.3}) spin={:.2}deg",
            self.level,
            self.index,
            self.slot,
            self.parent
                .map_or_else(|| "-".to_string(), |p| format!("{}:{p}", self.level - 1)),
            self.child_count,
            self.position[0],
            self.position[1],
            self.position[2],
            self.rotation[0],
            self.rotation[1],
            self.rotation[2],
            self.rotation[3],
            self.spin_degrees,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractalspace_common::FractalSettings;
    use fractalspace_kernel::Palette;

    fn fractal(depth: u32) -> Fractal {
        let settings = FractalSettings {
            depth,
            worker_threads: 1,
            ..FractalSettings::default()
        };
        Fractal::new(settings, Palette::standard()).unwrap()
    }

    #[test]
    fn summary_unbuilt_fractal() {
        let f = fractal(3);
        let summary = TreeInspector::summary(&f);
        assert!(!summary.built);
        assert_eq!(summary.node_count, 0);
        assert!(format!("{summary}").contains("not built"));
    }

    #[test]
    fn summary_after_ticks() {
        let mut f = fractal(3);
        f.build().unwrap();
        f.tick(0.5).unwrap();
        f.tick(0.5).unwrap();

        let summary = TreeInspector::summary(&f);
        assert!(summary.built);
        assert_eq!(summary.depth, 3);
        assert_eq!(summary.node_count, 31);
        assert_eq!(summary.frame, 2);
        assert!((summary.root_spin_degrees - 80.0).abs() < 1e-3);
        assert_eq!(summary.state_hash, f.tree().unwrap().state_hash());
        assert!(format!("{summary}").contains("nodes=31"));
        assert_eq!(summary.nodes_outside_bounds, 0);
    }

    #[test]
    fn small_bounds_leave_nodes_outside() {
        let settings = FractalSettings {
            depth: 3,
            worker_threads: 1,
            bounds_extent: 1.0,
            ..FractalSettings::default()
        };
        let mut f = Fractal::new(settings, Palette::standard()).unwrap();
        f.build().unwrap();
        f.tick(0.1).unwrap();

        let summary = TreeInspector::summary(&f);
        // every first-level node sits 0.75 out along one axis
        assert!(summary.nodes_outside_bounds >= 5);
        assert!(summary.nodes_outside_bounds < summary.node_count);

        let tree = f.tree().unwrap();
        let everything = Bounds::cube(tree.root().world_position, 100.0);
        assert_eq!(TreeInspector::nodes_outside(tree, &everything), 0);
    }

    #[test]
    fn inspect_node_reports_links() {
        let mut f = fractal(3);
        f.build().unwrap();
        let tree = f.tree().unwrap();

        let root = TreeInspector::inspect_node(tree, 0, 0).unwrap();
        assert_eq!(root.parent, None);
        assert_eq!(root.child_count, 5);

        let mid = TreeInspector::inspect_node(tree, 1, 3).unwrap();
        assert_eq!(mid.slot, 3);
        assert_eq!(mid.parent, Some(0));
        assert_eq!(mid.child_count, 5);

        let leaf = TreeInspector::inspect_node(tree, 2, 17).unwrap();
        assert_eq!(leaf.slot, 2);
        assert_eq!(leaf.parent, Some(3));
        assert_eq!(leaf.child_count, 0);
        assert!(format!("{leaf}").contains("parent=1:3"));
    }

    #[test]
    fn inspect_node_out_of_range() {
        let mut f = fractal(2);
        f.build().unwrap();
        let tree = f.tree().unwrap();
        assert!(TreeInspector::inspect_node(tree, 1, 5).is_none());
        assert!(TreeInspector::inspect_node(tree, 2, 0).is_none());
    }

    #[test]
    fn level_extent_grows_with_depth() {
        let mut f = fractal(3);
        f.build().unwrap();
        f.tick(0.1).unwrap();
        let tree = f.tree().unwrap();

        assert_eq!(TreeInspector::level_extent(tree, 0), 0.0);
        let first = TreeInspector::level_extent(tree, 1);
        assert!((first - 0.75).abs() < 1e-5);
        assert!(TreeInspector::level_extent(tree, 2) > first);
        assert_eq!(TreeInspector::level_extent(tree, 9), 0.0);
    }
}
