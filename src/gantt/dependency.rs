//! Dependency graph checks and the arrows drawn between dependent bars.

use std::collections::{HashMap, HashSet};

use crate::fields::DependencyType;
use crate::task::{Task, TaskDependency};

/// Whether adding `predecessor -> successor` would close a cycle in the
/// loaded dependency list.
///
/// Walks depth-first from the successor along existing edges. Reaching the
/// predecessor, or re-entering a node already on the current path, counts
/// as a cycle. The check is only as good as the snapshot it is given.
pub fn would_create_cycle(dependencies: &[TaskDependency], predecessor: u64, successor: u64) -> bool {
    if predecessor == successor {
        return true;
    }
    let mut edges: HashMap<u64, Vec<u64>> = HashMap::new();
    for dep in dependencies {
        edges.entry(dep.predecessor_id).or_default().push(dep.successor_id);
    }

    fn visit(
        node: u64,
        target: u64,
        edges: &HashMap<u64, Vec<u64>>,
        on_path: &mut HashSet<u64>,
        done: &mut HashSet<u64>,
    ) -> bool {
        if node == target || on_path.contains(&node) {
            return true;
        }
        if !done.insert(node) {
            return false;
        }
        on_path.insert(node);
        let found = edges
            .get(&node)
            .is_some_and(|next| next.iter().any(|&n| visit(n, target, edges, on_path, done)));
        on_path.remove(&node);
        found
    }

    visit(successor, predecessor, &edges, &mut HashSet::new(), &mut HashSet::new())
}

/// Why a proposed dependency was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyRejection {
    SelfDependency,
    UnknownTask(u64),
    Duplicate,
    Cycle,
}

impl DependencyRejection {
    pub fn message(&self) -> String {
        match self {
            DependencyRejection::SelfDependency => "a task cannot depend on itself".into(),
            DependencyRejection::UnknownTask(id) => format!("task {id} does not exist"),
            DependencyRejection::Duplicate => "that dependency already exists".into(),
            DependencyRejection::Cycle => "the dependency would create a cycle".into(),
        }
    }
}

/// Full pre-insert check for a new edge.
pub fn check_new_dependency(
    tasks: &[Task],
    dependencies: &[TaskDependency],
    predecessor: u64,
    successor: u64,
) -> Result<(), DependencyRejection> {
    if predecessor == successor {
        return Err(DependencyRejection::SelfDependency);
    }
    for id in [predecessor, successor] {
        if !tasks.iter().any(|t| t.id == id) {
            return Err(DependencyRejection::UnknownTask(id));
        }
    }
    if dependencies
        .iter()
        .any(|d| d.predecessor_id == predecessor && d.successor_id == successor)
    {
        return Err(DependencyRejection::Duplicate);
    }
    if would_create_cycle(dependencies, predecessor, successor) {
        return Err(DependencyRejection::Cycle);
    }
    Ok(())
}

pub fn successors_of(dependencies: &[TaskDependency], task_id: u64) -> Vec<u64> {
    dependencies
        .iter()
        .filter(|d| d.predecessor_id == task_id)
        .map(|d| d.successor_id)
        .collect()
}

pub fn predecessors_of(dependencies: &[TaskDependency], task_id: u64) -> Vec<u64> {
    dependencies
        .iter()
        .filter(|d| d.successor_id == task_id)
        .map(|d| d.predecessor_id)
        .collect()
}

/// Pixel rectangle of a rendered bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRect {
    pub x: f64,
    pub width: f64,
    pub row: usize,
}

/// Horizontal stub length before an arrow turns.
pub const ARROW_STUB: f64 = 8.0;

/// Orthogonal polyline from the predecessor bar to the successor bar.
///
/// Leaves the predecessor's end (FS/FF) or start (SS/SF), steps outward,
/// runs vertically to the successor row, and enters the successor at its
/// start (FS/SS) or end (FF/SF). Points are in pixels, y at row centres.
pub fn arrow_path(from: BarRect, to: BarRect, kind: DependencyType, row_height: f64) -> Vec<(f64, f64)> {
    let centre = |row: usize| row as f64 * row_height + row_height / 2.0;
    let (sx, out) = if kind.from_predecessor_end() {
        (from.x + from.width, ARROW_STUB)
    } else {
        (from.x, -ARROW_STUB)
    };
    let (ex, inward) = if kind.into_successor_start() {
        (to.x, -ARROW_STUB)
    } else {
        (to.x + to.width, ARROW_STUB)
    };
    let sy = centre(from.row);
    let ey = centre(to.row);

    let exit_x = sx + out;
    let entry_x = ex + inward;
    let mut points = vec![(sx, sy), (exit_x, sy)];
    if (exit_x - entry_x).abs() > f64::EPSILON {
        // Route through the gap between the rows when the stubs do not line up.
        let mid_y = if from.row == to.row { sy } else { (sy + ey) / 2.0 };
        points.push((exit_x, mid_y));
        points.push((entry_x, mid_y));
    }
    points.push((entry_x, ey));
    points.push((ex, ey));
    points.dedup();
    points
}

/// Render a polyline as an SVG path `d` attribute.
pub fn svg_path(points: &[(f64, f64)]) -> String {
    let mut out = String::new();
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(if i == 0 { "M" } else { "L" });
        out.push_str(&format!(" {} {}", fmt_px(*x), fmt_px(*y)));
    }
    out
}

fn fmt_px(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(id: u64, p: u64, s: u64) -> TaskDependency {
        TaskDependency {
            id,
            predecessor_id: p,
            successor_id: s,
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
        }
    }

    #[test]
    fn self_dependency_rejected() {
        assert!(would_create_cycle(&[], 4, 4));
    }

    #[test]
    fn reverse_edge_is_a_cycle() {
        let deps = vec![dep(1, 1, 2)];
        assert!(would_create_cycle(&deps, 2, 1));
    }

    #[test]
    fn transitive_back_edge_is_a_cycle() {
        let deps = vec![dep(1, 1, 2), dep(2, 2, 3)];
        assert!(would_create_cycle(&deps, 3, 1));
    }

    #[test]
    fn unrelated_edge_is_accepted() {
        let deps = vec![dep(1, 1, 2), dep(2, 2, 3)];
        assert!(!would_create_cycle(&deps, 4, 5));
        assert!(!would_create_cycle(&deps, 1, 3));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let deps = vec![dep(1, 1, 2), dep(2, 1, 3), dep(3, 2, 4), dep(4, 3, 4)];
        assert!(!would_create_cycle(&deps, 4, 5));
        assert!(would_create_cycle(&deps, 4, 1));
    }

    #[test]
    fn existing_cycle_downstream_is_reported() {
        let deps = vec![dep(1, 2, 3), dep(2, 3, 2)];
        assert!(would_create_cycle(&deps, 1, 2));
    }

    #[test]
    fn check_rejects_unknown_and_duplicate() {
        let tasks = vec![Task::new(1, "Demolition", 0), Task::new(2, "Grading", 0)];
        let deps = vec![dep(1, 1, 2)];
        assert_eq!(check_new_dependency(&tasks, &deps, 1, 9), Err(DependencyRejection::UnknownTask(9)));
        assert_eq!(check_new_dependency(&tasks, &deps, 1, 2), Err(DependencyRejection::Duplicate));
        assert_eq!(check_new_dependency(&tasks, &deps, 2, 1), Err(DependencyRejection::Cycle));
        assert_eq!(check_new_dependency(&tasks, &deps, 1, 1), Err(DependencyRejection::SelfDependency));
        assert_eq!(check_new_dependency(&tasks, &[], 2, 1), Ok(()));
    }

    #[test]
    fn neighbours() {
        let deps = vec![dep(1, 1, 2), dep(2, 1, 3), dep(3, 4, 1)];
        assert_eq!(successors_of(&deps, 1), vec![2, 3]);
        assert_eq!(predecessors_of(&deps, 1), vec![4]);
    }

    #[test]
    fn finish_to_start_arrow_routes_between_rows() {
        let from = BarRect { x: 0.0, width: 100.0, row: 0 };
        let to = BarRect { x: 60.0, width: 40.0, row: 2 };
        let pts = arrow_path(from, to, DependencyType::FinishToStart, 20.0);
        assert_eq!(pts.first(), Some(&(100.0, 10.0)));
        assert_eq!(pts.last(), Some(&(60.0, 50.0)));
        assert_eq!(pts[1], (108.0, 10.0));
        assert_eq!(pts[2], (108.0, 30.0));
        assert_eq!(pts[3], (52.0, 30.0));
        assert_eq!(
            svg_path(&pts),
            "M 100 10 L 108 10 L 108 30 L 52 30 L 52 50 L 60 50"
        );
    }

    #[test]
    fn start_to_start_arrow_leaves_from_left_edge() {
        let from = BarRect { x: 40.0, width: 100.0, row: 1 };
        let to = BarRect { x: 80.0, width: 40.0, row: 0 };
        let pts = arrow_path(from, to, DependencyType::StartToStart, 20.0);
        assert_eq!(pts[0], (40.0, 30.0));
        assert_eq!(pts[1], (32.0, 30.0));
        assert_eq!(pts.last(), Some(&(80.0, 10.0)));
    }

    #[test]
    fn finish_to_finish_enters_successor_end() {
        let from = BarRect { x: 0.0, width: 50.0, row: 0 };
        let to = BarRect { x: 10.0, width: 50.0, row: 1 };
        let pts = arrow_path(from, to, DependencyType::FinishToFinish, 10.0);
        // Stubs sit at x = 58 and x = 68, so the path doglegs.
        assert_eq!(pts.last(), Some(&(60.0, 15.0)));
        assert_eq!(pts[pts.len() - 2], (68.0, 15.0));
    }
}
