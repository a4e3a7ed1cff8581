//! Flat member list to forest.
//!
//! The organizer links members in two passes (lookup first, parents second), so
//! input order never matters for correctness. It is total: dangling parents
//! become roots, parent cycles are broken at the member that appears first in
//! the input, and duplicate ids are kept as separate nodes.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{FamilyMember, FamilyMemberWithChildren};

/// Data problems the organizer repaired while building a forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyWarning {
    /// `member_id` sat on a parent cycle and was promoted to a root.
    CycleBroken {
        member_id: String,
        parent_id: Option<String>,
    },
    /// More than one record carried this id; children attach to the first.
    DuplicateId { member_id: String },
}

/// Roots of a memorial's family tree plus any repairs made while linking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    pub roots: Vec<FamilyMemberWithChildren>,
    pub warnings: Vec<HierarchyWarning>,
}

impl Forest {
    /// Total number of nodes across all trees.
    pub fn len(&self) -> usize {
        self.roots.iter().map(FamilyMemberWithChildren::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Pre-order walk yielding each node with its nesting level.
    pub fn walk(&self) -> Vec<(usize, &FamilyMemberWithChildren)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, &FamilyMemberWithChildren)> =
            self.roots.iter().rev().map(|node| (0, node)).collect();
        while let Some((level, node)) = stack.pop() {
            out.push((level, node));
            stack.extend(node.children.iter().rev().map(|child| (level + 1, child)));
        }
        out
    }

    /// Member ids in pre-order.
    pub fn ids(&self) -> Vec<&str> {
        self.walk().into_iter().map(|(_, node)| node.id()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&FamilyMemberWithChildren> {
        self.walk()
            .into_iter()
            .map(|(_, node)| node)
            .find(|node| node.id() == id)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

pub fn organize(members: &[FamilyMember]) -> Forest {
    let mut warnings = Vec::new();

    let mut lookup: HashMap<&str, usize> = HashMap::with_capacity(members.len());
    for (idx, member) in members.iter().enumerate() {
        match lookup.entry(member.id.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(idx);
            }
            Entry::Occupied(_) => {
                tracing::warn!(member_id = %member.id, "Duplicate family member id");
                warnings.push(HierarchyWarning::DuplicateId {
                    member_id: member.id.clone(),
                });
            }
        }
    }

    let mut parent: Vec<Option<usize>> = members
        .iter()
        .map(|member| {
            member
                .parent_id
                .as_deref()
                .and_then(|parent_id| lookup.get(parent_id).copied())
        })
        .collect();

    break_cycles(members, &mut parent, &mut warnings);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); members.len()];
    let mut root_indices = Vec::new();
    for (idx, parent_idx) in parent.iter().enumerate() {
        match parent_idx {
            Some(p) => children[*p].push(idx),
            None => root_indices.push(idx),
        }
    }

    // Pre-order over the now acyclic links; building in reverse means every
    // child is finished before its parent asks for it.
    let mut preorder = Vec::with_capacity(members.len());
    let mut stack: Vec<usize> = root_indices.iter().rev().copied().collect();
    while let Some(idx) = stack.pop() {
        preorder.push(idx);
        stack.extend(children[idx].iter().rev().copied());
    }

    let mut built: Vec<Option<FamilyMemberWithChildren>> = vec![None; members.len()];
    for &idx in preorder.iter().rev() {
        let mut node = FamilyMemberWithChildren::leaf(members[idx].clone());
        node.children = children[idx]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        built[idx] = Some(node);
    }

    let roots = root_indices
        .iter()
        .filter_map(|idx| built[*idx].take())
        .collect();

    Forest { roots, warnings }
}

/// Detach one member per parent cycle so every chain ends at a root.
fn break_cycles(
    members: &[FamilyMember],
    parent: &mut [Option<usize>],
    warnings: &mut Vec<HierarchyWarning>,
) {
    let mut marks = vec![Mark::Unvisited; members.len()];

    for start in 0..members.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        let mut path = Vec::new();
        let mut current = start;
        loop {
            match marks[current] {
                Mark::Done => break,
                Mark::OnPath => {
                    let cycle_start = path.iter().position(|&i| i == current).unwrap_or(0);
                    let breaker = path[cycle_start..]
                        .iter()
                        .copied()
                        .min()
                        .unwrap_or(current);
                    let member = &members[breaker];
                    tracing::warn!(
                        member_id = %member.id,
                        parent_id = ?member.parent_id,
                        "Family member parent cycle broken, promoting member to root"
                    );
                    warnings.push(HierarchyWarning::CycleBroken {
                        member_id: member.id.clone(),
                        parent_id: member.parent_id.clone(),
                    });
                    parent[breaker] = None;
                    break;
                }
                Mark::Unvisited => {
                    marks[current] = Mark::OnPath;
                    path.push(current);
                    match parent[current] {
                        Some(next) => current = next,
                        None => break,
                    }
                }
            }
        }

        for idx in path {
            marks[idx] = Mark::Done;
        }
    }
}
