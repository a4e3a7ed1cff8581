mod organizer;
mod render;

pub use organizer::{organize, Forest, HierarchyWarning};
pub use render::{
    render_rows, render_text, Avatar, ExpansionState, RenderOptions, RowAction, Toggle, TreeRow,
    INDENT_PER_LEVEL,
};
