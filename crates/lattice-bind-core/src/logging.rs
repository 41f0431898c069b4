//! Logging and debugging facilities.
//!
//! This module provides:
//! - Target names for filtering the `tracing` output of each subsystem
//! - Debug visualization for scene trees
//!
//! # Tracing Integration
//!
//! Everything is instrumented with the `tracing` crate. To see logs, install
//! a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_bind=debug,lattice_bind_core::scene=trace")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! ```
//! use lattice_bind_core::Scene;
//! use lattice_bind_core::logging::SceneTreeDebug;
//!
//! let mut scene = Scene::new();
//! let list = scene.create_node("list");
//! let row = scene.create_node("row");
//! scene.set_parent(row, Some(list)).unwrap();
//!
//! let output = SceneTreeDebug::new().format_subtree(&scene, list).unwrap();
//! assert!(output.contains("row"));
//! ```

use std::fmt::Write as FmtWrite;

use crate::scene::{NodeId, Scene, SceneResult};

/// `tracing` targets, one per subsystem, for use in filter directives.
pub mod targets {
    /// Everything in this crate.
    pub const CORE: &str = "lattice_bind_core";
    /// Node lifecycle in the scene.
    pub const SCENE: &str = "lattice_bind_core::scene";
    /// Signal emission.
    pub const SIGNAL: &str = "lattice_bind_core::signal";
    /// List add/remove/clear activity.
    pub const LIST_VIEW: &str = "lattice_bind::list_view";
}

/// Branch glyphs used when drawing a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeStyle {
    /// `|`, `+--` and `` `-- ``.
    Ascii,
    /// Box-drawing characters.
    #[default]
    Unicode,
    /// Dashes only, no vertical guides.
    Compact,
}

/// What [`SceneTreeDebug`] prints and how.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// Branch glyphs.
    pub style: TreeStyle,
    /// Append `[NodeId]` to each line.
    pub show_ids: bool,
    /// List component type names under each node.
    pub show_components: bool,
    /// Print nodes whose own active flag is off.
    pub show_inactive: bool,
    /// Stop descending below this depth.
    pub max_depth: Option<usize>,
    /// Spaces per nesting level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_components: false,
            show_inactive: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything, components included.
    pub fn detailed() -> Self {
        Self {
            show_components: true,
            ..Default::default()
        }
    }

    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_components: false,
            ..Default::default()
        }
    }
}

/// Renders a scene (or part of one) as an indented tree.
///
/// Inactive nodes are suffixed with `(inactive)` and nodes waiting to be
/// swept with `(destroying)`.
#[derive(Debug, Clone, Default)]
pub struct SceneTreeDebug {
    options: TreeFormatOptions,
}

impl SceneTreeDebug {
    /// Renderer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer with the given options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format every root node of the scene.
    pub fn format_all(&self, scene: &Scene) -> SceneResult<String> {
        let roots: Vec<NodeId> = scene.root_nodes().collect();

        let mut output = String::new();
        let _ = writeln!(output, "Scene Tree ({} total nodes):", scene.node_count());

        if roots.is_empty() {
            let _ = writeln!(output, "  (empty)");
        } else {
            for root in roots {
                self.format_subtree_into(scene, root, 0, true, &mut output)?;
            }
        }

        Ok(output)
    }

    /// Format a subtree starting from a specific node.
    pub fn format_subtree(&self, scene: &Scene, root: NodeId) -> SceneResult<String> {
        let mut output = String::new();
        self.format_subtree_into(scene, root, 0, true, &mut output)?;
        Ok(output)
    }

    fn format_subtree_into(
        &self,
        scene: &Scene,
        id: NodeId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) -> SceneResult<()> {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        let active = scene.is_active(id)?;
        if !active && !self.options.show_inactive && depth > 0 {
            return Ok(());
        }

        output.push_str(&self.build_prefix(depth, is_last));

        let name = scene.name(id)?;
        output.push_str(if name.is_empty() { "(unnamed)" } else { name });

        if self.options.show_ids {
            let _ = write!(output, " [{id:?}]");
        }
        if !active {
            output.push_str(" (inactive)");
        }
        if scene.is_pending_destroy(id)? {
            output.push_str(" (destroying)");
        }
        output.push('\n');

        if self.options.show_components {
            let prefix = self.build_component_prefix(depth);
            for type_name in scene.components(id)?.type_names() {
                let short_type = type_name.rsplit("::").next().unwrap_or(type_name);
                let _ = writeln!(output, "{prefix}  +{short_type}");
            }
        }

        let children = scene.children(id)?;
        let child_count = children.len();
        for (i, &child) in children.iter().enumerate() {
            self.format_subtree_into(scene, child, depth + 1, i + 1 == child_count, output)?;
        }

        Ok(())
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }

    fn build_component_prefix(&self, depth: usize) -> String {
        let branch = match self.options.style {
            TreeStyle::Ascii => "|",
            TreeStyle::Unicode => "\u{2502}",
            TreeStyle::Compact => "",
        };

        let mut prefix = String::new();
        for _ in 0..depth {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix
    }
}
