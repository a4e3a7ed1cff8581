//! Headless tree rendering: turns a forest plus expansion state into rows.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::organizer::Forest;
use crate::models::FamilyMemberWithChildren;

/// Horizontal indentation per nesting level, in pixels.
pub const INDENT_PER_LEVEL: usize = 24;

/// Ids of expanded nodes. View state only; owned by the tree container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: HashSet<String>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every node in the forest expanded.
    pub fn expand_all(forest: &Forest) -> Self {
        Self {
            expanded: forest.ids().into_iter().map(str::to_string).collect(),
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Flip one node; returns the new state of that node.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        }
    }

    pub fn expand(&mut self, id: &str) {
        self.expanded.insert(id.to_string());
    }

    pub fn collapse(&mut self, id: &str) {
        self.expanded.remove(id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    /// Node has children and is collapsed.
    Expand,
    /// Node has children and is expanded.
    Collapse,
    /// Leaf; reserves the toggle's width so rows line up.
    Spacer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Avatar {
    Image(String),
    Initial(char),
}

impl Avatar {
    pub fn for_node(node: &FamilyMemberWithChildren) -> Self {
        match node.member.visible_image_url() {
            Some(url) => Avatar::Image(url.to_string()),
            None => Avatar::initial_of(&node.member.name),
        }
    }

    /// Placeholder glyph, also used when an image fails to load.
    pub fn initial_of(name: &str) -> Self {
        let initial = name
            .trim()
            .chars()
            .next()
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or('?');
        Avatar::Initial(initial)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    ToggleExpansion,
    View,
    Edit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Offer the edit affordance on every row.
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeRow {
    pub member_id: String,
    pub name: String,
    pub relationship: String,
    pub level: usize,
    pub indent: usize,
    pub toggle: Toggle,
    pub avatar: Avatar,
    pub actions: Vec<RowAction>,
}

/// Visible rows in pre-order. Children of collapsed nodes are skipped.
pub fn render_rows(
    forest: &Forest,
    expansion: &ExpansionState,
    options: RenderOptions,
) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    let mut stack: Vec<(usize, &FamilyMemberWithChildren)> =
        forest.roots.iter().rev().map(|node| (0, node)).collect();

    while let Some((level, node)) = stack.pop() {
        let expanded = expansion.is_expanded(node.id());
        rows.push(render_row(node, level, expanded, options));
        if expanded {
            stack.extend(node.children.iter().rev().map(|child| (level + 1, child)));
        }
    }

    rows
}

fn render_row(
    node: &FamilyMemberWithChildren,
    level: usize,
    expanded: bool,
    options: RenderOptions,
) -> TreeRow {
    let toggle = match (node.has_children(), expanded) {
        (false, _) => Toggle::Spacer,
        (true, true) => Toggle::Collapse,
        (true, false) => Toggle::Expand,
    };

    let mut actions = Vec::with_capacity(3);
    if toggle != Toggle::Spacer {
        actions.push(RowAction::ToggleExpansion);
    }
    actions.push(RowAction::View);
    if options.editable {
        actions.push(RowAction::Edit);
    }

    TreeRow {
        member_id: node.member.id.clone(),
        name: node.member.name.clone(),
        relationship: node.member.relationship.clone(),
        level,
        indent: level * INDENT_PER_LEVEL,
        toggle,
        avatar: Avatar::for_node(node),
        actions,
    }
}

/// Plain-text drawing of rendered rows, two spaces per level.
pub fn render_text(rows: &[TreeRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let marker = match row.toggle {
            Toggle::Collapse => '▾',
            Toggle::Expand => '▸',
            Toggle::Spacer => ' ',
        };
        let avatar = match &row.avatar {
            Avatar::Image(_) => "[img]".to_string(),
            Avatar::Initial(c) => format!("({c})"),
        };
        let _ = writeln!(
            out,
            "{}{} {} {} ({})",
            "  ".repeat(row.level),
            marker,
            avatar,
            row.name,
            row.relationship
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::organize;
    use crate::models::FamilyMember;
    use pretty_assertions::assert_eq;

    fn member(id: &str, parent_id: Option<&str>, name: &str) -> FamilyMember {
        let mut m = FamilyMember::new(
            id.to_string(),
            "memorial_1".to_string(),
            name.to_string(),
            "Relative".to_string(),
        );
        m.parent_id = parent_id.map(str::to_string);
        m
    }

    fn sample_forest() -> Forest {
        organize(&[
            member("1", None, "Alice"),
            member("2", Some("1"), "Bob"),
            member("3", Some("2"), "Cara"),
            member("4", Some("1"), "dora"),
        ])
    }

    #[test]
    fn fully_expanded_rows_follow_preorder_with_indent() {
        let forest = sample_forest();
        let rows = render_rows(&forest, &ExpansionState::expand_all(&forest), RenderOptions::default());

        let shape: Vec<(&str, usize, usize)> = rows
            .iter()
            .map(|r| (r.member_id.as_str(), r.level, r.indent))
            .collect();
        assert_eq!(shape, vec![("1", 0, 0), ("2", 1, 24), ("3", 2, 48), ("4", 1, 24)]);
    }

    #[test]
    fn collapsed_node_hides_descendants() {
        let forest = sample_forest();
        let mut expansion = ExpansionState::expand_all(&forest);
        assert!(!expansion.toggle("2"));

        let rows = render_rows(&forest, &expansion, RenderOptions::default());
        let ids: Vec<&str> = rows.iter().map(|r| r.member_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);
        assert_eq!(rows[1].toggle, Toggle::Expand);
    }

    #[test]
    fn leaves_get_spacer_and_no_toggle_action() {
        let forest = sample_forest();
        let rows = render_rows(&forest, &ExpansionState::expand_all(&forest), RenderOptions::default());
        let leaf = rows.iter().find(|r| r.member_id == "3").unwrap();
        assert_eq!(leaf.toggle, Toggle::Spacer);
        assert_eq!(leaf.actions, vec![RowAction::View]);

        let root = &rows[0];
        assert_eq!(root.toggle, Toggle::Collapse);
        assert_eq!(root.actions, vec![RowAction::ToggleExpansion, RowAction::View]);
    }

    #[test]
    fn edit_action_only_when_opted_in() {
        let forest = sample_forest();
        let expansion = ExpansionState::expand_all(&forest);

        let read_only = render_rows(&forest, &expansion, RenderOptions { editable: false });
        assert!(read_only.iter().all(|r| !r.actions.contains(&RowAction::Edit)));

        let editable = render_rows(&forest, &expansion, RenderOptions { editable: true });
        assert!(editable.iter().all(|r| r.actions.contains(&RowAction::Edit)));
    }

    #[test]
    fn avatar_uses_image_only_for_premium_members() {
        let mut premium = member("1", None, "Alice");
        premium.is_premium = true;
        premium.image_url = Some("https://img.example.com/alice.jpg".to_string());

        let mut demoted = member("2", None, "bob");
        demoted.image_url = Some("https://img.example.com/bob.jpg".to_string());

        let mut premium_no_image = member("3", None, "Cara");
        premium_no_image.is_premium = true;

        let forest = organize(&[premium, demoted, premium_no_image]);
        let rows = render_rows(&forest, &ExpansionState::new(), RenderOptions::default());

        assert_eq!(
            rows[0].avatar,
            Avatar::Image("https://img.example.com/alice.jpg".to_string())
        );
        assert_eq!(rows[1].avatar, Avatar::Initial('B'));
        assert_eq!(rows[2].avatar, Avatar::Initial('C'));
    }

    #[test]
    fn empty_name_uses_question_mark() {
        assert_eq!(Avatar::initial_of("   "), Avatar::Initial('?'));
        assert_eq!(Avatar::initial_of("élise"), Avatar::Initial('É'));
    }

    #[test]
    fn toggle_round_trip() {
        let mut state = ExpansionState::new();
        assert!(state.toggle("a"));
        assert!(state.is_expanded("a"));
        assert!(!state.toggle("a"));
        assert!(!state.is_expanded("a"));
        state.expand("b");
        state.collapse("b");
        assert!(!state.is_expanded("b"));
    }

    #[test]
    fn text_rendering_indents_levels() {
        let forest = sample_forest();
        let rows = render_rows(&forest, &ExpansionState::expand_all(&forest), RenderOptions::default());
        let text = render_text(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("▾ (A) Alice"));
        assert!(lines[2].starts_with("      (C) Cara"));
        assert!(lines[3].starts_with("    (D) dora"));
    }
}
