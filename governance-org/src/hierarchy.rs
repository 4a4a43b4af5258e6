//! Organization hierarchy algorithms
//!
//! The hierarchy is stored flat, one parent pointer per organization. This
//! module turns the flat rows into a forest and walks parent links, without
//! touching storage.
//!
//! ## Forest construction
//!
//! ```text
//! pass 1: id -> index                      O(n)
//! pass 2: link each index to its parent    O(n)
//! emit:   depth-first from the roots       O(n), explicit stack
//! ```
//!
//! A node whose declared parent is missing (tombstoned or absent) is emitted
//! as a root with `detached = true`. Nodes caught in a parent cycle are
//! emitted once as detached roots as well, so every node appears exactly once.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

use crate::organization::Organization;

/// Errors detected while walking parent links.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// A parent link leads back to an organization already visited
    #[error("Cycle detected in organization hierarchy at {0}")]
    Cycle(Uuid),

    /// The walk exceeded the configured depth bound
    #[error("Organization hierarchy deeper than {0} levels")]
    DepthExceeded(usize),
}

/// An organization with its direct children, as rendered in a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationNode {
    /// The organization row
    #[serde(flatten)]
    pub organization: Organization,

    /// Number of active members
    pub member_count: u32,

    /// Direct children, ordered by name
    pub children: Vec<OrganizationNode>,

    /// Declared parent is not part of the forest (tombstoned, missing or cyclic)
    pub detached: bool,
}

impl OrganizationNode {
    /// Organization ID of this node.
    pub fn id(&self) -> Uuid {
        self.organization.id
    }

    /// Total number of nodes in this subtree, including this one.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(|c| c.subtree_size()).sum::<usize>()
    }

    /// Depth-first search for a node by ID.
    pub fn find(&self, id: Uuid) -> Option<&OrganizationNode> {
        if self.id() == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Build a forest from flat organization rows.
///
/// Tombstoned rows in `organizations` are skipped. `member_counts` maps an
/// organization ID to its number of active members; missing entries count
/// as zero.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use uuid::Uuid;
/// use governance_org::{build_forest, NewOrganization, Organization};
///
/// let actor = Uuid::now_v7();
/// let root = Organization::new(NewOrganization::named("Ministry"), actor);
/// let child = Organization::new(NewOrganization::named("Directorate").with_parent(root.id), actor);
///
/// let forest = build_forest(&[root.clone(), child.clone()], &HashMap::new());
/// assert_eq!(forest.len(), 1);
/// assert_eq!(forest[0].children[0].id(), child.id);
/// ```
pub fn build_forest(
    organizations: &[Organization],
    member_counts: &HashMap<Uuid, u32>,
) -> Vec<OrganizationNode> {
    let mut live: Vec<&Organization> = organizations.iter().filter(|o| !o.is_deleted()).collect();
    live.sort_by(|a, b| a.name.cmp(&b.name));

    let index: HashMap<Uuid, usize> = live.iter().enumerate().map(|(i, o)| (o.id, i)).collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); live.len()];
    let mut roots: Vec<(usize, bool)> = Vec::new();
    for (i, org) in live.iter().enumerate() {
        match org.parent_id {
            Some(parent_id) if parent_id != org.id => match index.get(&parent_id) {
                Some(&p) => children[p].push(i),
                None => roots.push((i, true)),
            },
            Some(_) => roots.push((i, true)),
            None => roots.push((i, false)),
        }
    }

    let mut visited = vec![false; live.len()];
    let mut forest: Vec<OrganizationNode> = roots
        .into_iter()
        .map(|(i, detached)| emit(i, detached, &live, &children, member_counts, &mut visited))
        .collect();

    // Anything left unvisited sits on a parent cycle.
    for i in 0..live.len() {
        if !visited[i] {
            forest.push(emit(i, true, &live, &children, member_counts, &mut visited));
        }
    }

    forest
}

fn emit(
    start: usize,
    detached: bool,
    live: &[&Organization],
    children: &[Vec<usize>],
    member_counts: &HashMap<Uuid, u32>,
    visited: &mut [bool],
) -> OrganizationNode {
    // Pre-order walk; each entry keeps the children it claimed.
    visited[start] = true;
    let mut order: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        let claimed: Vec<usize> = children[i].iter().copied().filter(|&c| !visited[c]).collect();
        for &c in &claimed {
            visited[c] = true;
            stack.push(c);
        }
        order.push((i, claimed));
    }

    let node = |i: usize, nodes: Vec<OrganizationNode>, detached: bool| {
        let org = live[i];
        OrganizationNode {
            organization: org.clone(),
            member_count: member_counts.get(&org.id).copied().unwrap_or(0),
            children: nodes,
            detached,
        }
    };
    let take = |built: &mut HashMap<usize, OrganizationNode>, claimed: &[usize]| {
        claimed.iter().filter_map(|c| built.remove(c)).collect::<Vec<_>>()
    };

    // Children always follow their parent in pre-order, so build in reverse.
    let mut built: HashMap<usize, OrganizationNode> = HashMap::with_capacity(order.len());
    for (i, claimed) in order.drain(1..).rev() {
        let nodes = take(&mut built, &claimed);
        built.insert(i, node(i, nodes, false));
    }
    let (_, claimed) = &order[0];
    let nodes = take(&mut built, claimed);
    node(start, nodes, detached)
}

/// Walk parent links from `id` up to its root.
///
/// `lookup` resolves a live organization by ID. The walk stops at a root or
/// at a parent that `lookup` cannot resolve. The result is ordered root
/// first and is empty when `id` itself does not resolve.
///
/// # Errors
///
/// - [`HierarchyError::Cycle`] when an organization is visited twice
/// - [`HierarchyError::DepthExceeded`] after `max_depth` steps
pub fn ancestor_path<'a, F>(
    id: Uuid,
    lookup: F,
    max_depth: usize,
) -> Result<Vec<Organization>, HierarchyError>
where
    F: Fn(Uuid) -> Option<&'a Organization>,
{
    let mut path: Vec<Organization> = Vec::new();
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut current = lookup(id);

    while let Some(org) = current {
        if !seen.insert(org.id) {
            return Err(HierarchyError::Cycle(org.id));
        }
        if path.len() >= max_depth {
            return Err(HierarchyError::DepthExceeded(max_depth));
        }
        path.push(org.clone());
        current = org.parent_id.and_then(&lookup);
    }

    path.reverse();
    Ok(path)
}

/// Number of levels from `id` up to its root, counting `id` itself.
///
/// `parent_of` returns the declared parent, tombstoned or not. Returns 0
/// when `id` does not resolve.
///
/// # Errors
///
/// - [`HierarchyError::Cycle`] when an organization is visited twice
/// - [`HierarchyError::DepthExceeded`] past `max_depth` levels
pub fn depth_of<F>(id: Uuid, parent_of: F, max_depth: usize) -> Result<usize, HierarchyError>
where
    F: Fn(Uuid) -> Option<Option<Uuid>>,
{
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut current = Some(id);
    let mut depth = 0;

    while let Some(node) = current {
        let Some(parent) = parent_of(node) else {
            break;
        };
        if !seen.insert(node) {
            return Err(HierarchyError::Cycle(node));
        }
        depth += 1;
        if depth > max_depth {
            return Err(HierarchyError::DepthExceeded(max_depth));
        }
        current = parent;
    }

    Ok(depth)
}

/// Number of levels in the subtree under `id`, counting `id` itself.
///
/// Follows declared parent links in `organizations`, tombstoned rows
/// included.
pub fn subtree_height(id: Uuid, organizations: &[Organization]) -> usize {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for org in organizations {
        if let Some(parent_id) = org.parent_id {
            children.entry(parent_id).or_default().push(org.id);
        }
    }

    let mut seen: HashSet<Uuid> = HashSet::from([id]);
    let mut level = vec![id];
    let mut height = 0;
    while !level.is_empty() {
        height += 1;
        level = level
            .iter()
            .filter_map(|n| children.get(n))
            .flatten()
            .copied()
            .filter(|c| seen.insert(*c))
            .collect();
    }
    height
}

/// Check whether making `new_parent` the parent of `id` would close a cycle.
///
/// `parent_of` returns the declared parent of an organization, tombstoned
/// or not, so that structural links through deleted rows are honored.
pub fn would_create_cycle<F>(
    id: Uuid,
    new_parent: Uuid,
    parent_of: F,
    max_depth: usize,
) -> Result<bool, HierarchyError>
where
    F: Fn(Uuid) -> Option<Uuid>,
{
    let mut current = Some(new_parent);
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut steps = 0;

    while let Some(node) = current {
        if node == id {
            return Ok(true);
        }
        if !seen.insert(node) {
            return Err(HierarchyError::Cycle(node));
        }
        steps += 1;
        if steps > max_depth {
            return Err(HierarchyError::DepthExceeded(max_depth));
        }
        current = parent_of(node);
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organization::NewOrganization;

    fn org(name: &str, parent: Option<Uuid>) -> Organization {
        let mut input = NewOrganization::named(name);
        input.parent_id = parent;
        Organization::new(input, Uuid::now_v7())
    }

    fn collect_ids(nodes: &[OrganizationNode], out: &mut Vec<Uuid>) {
        for node in nodes {
            out.push(node.id());
            collect_ids(&node.children, out);
        }
    }

    #[test]
    fn test_forest_links_children_in_name_order() {
        let ministry = org("Ministry", None);
        let b = org("B Directorate", Some(ministry.id));
        let a = org("A Directorate", Some(ministry.id));
        let division = org("Division", Some(a.id));

        let mut counts = HashMap::new();
        counts.insert(a.id, 3);

        let forest = build_forest(
            &[division.clone(), b.clone(), ministry.clone(), a.clone()],
            &counts,
        );

        assert_eq!(forest.len(), 1);
        let root = &forest[0];
        assert_eq!(root.id(), ministry.id);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].id(), a.id);
        assert_eq!(root.children[0].member_count, 3);
        assert_eq!(root.children[0].children[0].id(), division.id);
        assert_eq!(root.children[1].member_count, 0);
        assert_eq!(root.subtree_size(), 4);
    }

    #[test]
    fn test_tombstoned_parent_detaches_child() {
        let mut ministry = org("Ministry", None);
        let directorate = org("Directorate", Some(ministry.id));
        ministry.mark_deleted(Uuid::now_v7());

        let forest = build_forest(&[ministry, directorate.clone()], &HashMap::new());

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id(), directorate.id);
        assert!(forest[0].detached);
    }

    #[test]
    fn test_cycle_members_appear_once() {
        let mut a = org("A", None);
        let b = org("B", Some(a.id));
        a.parent_id = Some(b.id);
        let c = org("C", None);

        let forest = build_forest(&[a.clone(), b.clone(), c.clone()], &HashMap::new());

        let mut ids = Vec::new();
        collect_ids(&forest, &mut ids);
        ids.sort();
        let mut expected = vec![a.id, b.id, c.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_deep_chain_builds_without_recursion() {
        let mut rows = vec![org("Level 0", None)];
        for i in 1..1_000 {
            let parent = rows[i - 1].id;
            rows.push(org(&format!("Level {i}"), Some(parent)));
        }

        let forest = build_forest(&rows, &HashMap::new());
        assert_eq!(forest.len(), 1);

        let mut depth = 1;
        let mut node = &forest[0];
        while let Some(child) = node.children.first() {
            node = child;
            depth += 1;
        }
        assert_eq!(depth, rows.len());
        assert_eq!(node.id(), rows[rows.len() - 1].id);
    }

    #[test]
    fn test_depth_and_subtree_height() {
        let ministry = org("Ministry", None);
        let directorate = org("Directorate", Some(ministry.id));
        let division = org("Division", Some(directorate.id));
        let section = org("Section", Some(division.id));
        let rows = vec![ministry.clone(), directorate.clone(), division.clone(), section.clone()];
        let parent_of = |id: Uuid| rows.iter().find(|o| o.id == id).map(|o| o.parent_id);

        assert_eq!(depth_of(ministry.id, parent_of, 64).unwrap(), 1);
        assert_eq!(depth_of(section.id, parent_of, 64).unwrap(), 4);
        assert_eq!(depth_of(Uuid::now_v7(), parent_of, 64).unwrap(), 0);
        assert_eq!(
            depth_of(section.id, parent_of, 3),
            Err(HierarchyError::DepthExceeded(3))
        );

        assert_eq!(subtree_height(ministry.id, &rows), 4);
        assert_eq!(subtree_height(division.id, &rows), 2);
        assert_eq!(subtree_height(section.id, &rows), 1);
    }

    #[test]
    fn test_self_parent_is_detached_root() {
        let mut a = org("A", None);
        a.parent_id = Some(a.id);

        let forest = build_forest(&[a.clone()], &HashMap::new());
        assert_eq!(forest.len(), 1);
        assert!(forest[0].detached);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_ancestor_path_root_first() {
        let ministry = org("Ministry", None);
        let directorate = org("Directorate", Some(ministry.id));
        let division = org("Division", Some(directorate.id));
        let rows: HashMap<Uuid, Organization> = [ministry.clone(), directorate.clone(), division.clone()]
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let path = ancestor_path(division.id, |id| rows.get(&id), 64).unwrap();
        let names: Vec<&str> = path.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Ministry", "Directorate", "Division"]);

        let missing = ancestor_path(Uuid::now_v7(), |id| rows.get(&id), 64).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_ancestor_path_detects_cycle() {
        let mut a = org("A", None);
        let b = org("B", Some(a.id));
        a.parent_id = Some(b.id);
        let rows: HashMap<Uuid, Organization> =
            [a.clone(), b.clone()].into_iter().map(|o| (o.id, o)).collect();

        let result = ancestor_path(a.id, |id| rows.get(&id), 64);
        assert_eq!(result, Err(HierarchyError::Cycle(a.id)));
    }

    #[test]
    fn test_ancestor_path_depth_bound() {
        let root = org("Root", None);
        let mid = org("Mid", Some(root.id));
        let leaf = org("Leaf", Some(mid.id));
        let rows: HashMap<Uuid, Organization> = [root, mid, leaf.clone()]
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let result = ancestor_path(leaf.id, |id| rows.get(&id), 2);
        assert_eq!(result, Err(HierarchyError::DepthExceeded(2)));
    }

    #[test]
    fn test_would_create_cycle() {
        let ministry = org("Ministry", None);
        let directorate = org("Directorate", Some(ministry.id));
        let division = org("Division", Some(directorate.id));
        let other = org("Other", None);
        let parents: HashMap<Uuid, Option<Uuid>> = [&ministry, &directorate, &division, &other]
            .into_iter()
            .map(|o| (o.id, o.parent_id))
            .collect();
        let parent_of = |id: Uuid| parents.get(&id).copied().flatten();

        assert!(would_create_cycle(ministry.id, division.id, parent_of, 64).unwrap());
        assert!(would_create_cycle(ministry.id, ministry.id, parent_of, 64).unwrap());
        assert!(!would_create_cycle(division.id, other.id, parent_of, 64).unwrap());
    }
}
