//! Critical-path overlay.
//!
//! This is a heuristic, not a CPM pass: a task is highlighted when it is
//! flagged critical, overdue, blocking others, or sits on the longest
//! finish-to-start chain of the loaded graph.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::NaiveDate;

use crate::fields::{DependencyType, Priority, TaskStatus};
use crate::task::{Task, TaskDependency};

use super::position::task_dates_from_estimate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CriticalReason {
    CriticalPriority,
    Overdue,
    BlockingSuccessors,
    LongestChain,
}

impl CriticalReason {
    pub fn label(self) -> &'static str {
        match self {
            CriticalReason::CriticalPriority => "critical priority",
            CriticalReason::Overdue => "overdue",
            CriticalReason::BlockingSuccessors => "blocked with successors",
            CriticalReason::LongestChain => "longest chain",
        }
    }
}

/// Critical task ids mapped to every reason that applies.
pub fn critical_tasks(
    tasks: &[Task],
    dependencies: &[TaskDependency],
    today: NaiveDate,
) -> BTreeMap<u64, Vec<CriticalReason>> {
    let chain: HashSet<u64> = longest_chain(tasks, dependencies, today).into_iter().collect();
    let mut out = BTreeMap::new();

    for task in tasks.iter().filter(|t| !t.is_completed()) {
        let mut reasons = Vec::new();
        if task.priority == Priority::Critical {
            reasons.push(CriticalReason::CriticalPriority);
        }
        if task.due_date.is_some_and(|due| due < today) {
            reasons.push(CriticalReason::Overdue);
        }
        if task.status == TaskStatus::Blocked && dependencies.iter().any(|d| d.predecessor_id == task.id) {
            reasons.push(CriticalReason::BlockingSuccessors);
        }
        if chain.contains(&task.id) {
            reasons.push(CriticalReason::LongestChain);
        }
        if !reasons.is_empty() {
            out.insert(task.id, reasons);
        }
    }
    out
}

/// Task ids along the heaviest finish-to-start chain, in order.
///
/// Weight is the inclusive day count of each task plus edge lag. Tasks on a
/// dependency cycle, or reachable only through one, are left out. Chains of
/// a single task are not reported.
pub fn longest_chain(tasks: &[Task], dependencies: &[TaskDependency], today: NaiveDate) -> Vec<u64> {
    let weights: HashMap<u64, i64> = tasks
        .iter()
        .map(|t| (t.id, task_dates_from_estimate(t, today).duration_days() + 1))
        .collect();
    let mut edges: HashMap<u64, Vec<(u64, i64)>> = HashMap::new();
    for dep in dependencies
        .iter()
        .filter(|d| d.dependency_type == DependencyType::FinishToStart)
        .filter(|d| weights.contains_key(&d.predecessor_id) && weights.contains_key(&d.successor_id))
    {
        edges.entry(dep.predecessor_id).or_default().push((dep.successor_id, dep.lag_days));
    }

    // Heaviest tail from each node and the successor it runs through.
    let mut best: HashMap<u64, (i64, Option<u64>)> = HashMap::new();
    for node in acyclic_order(&weights, &edges).into_iter().rev() {
        let mut best_next = None;
        let mut best_tail = 0;
        for &(next, lag) in edges.get(&node).into_iter().flatten() {
            let Some(&(score, _)) = best.get(&next) else {
                continue;
            };
            let tail = score + lag.max(0);
            if best_next.is_none() || tail > best_tail {
                best_tail = tail;
                best_next = Some(next);
            }
        }
        let score = weights.get(&node).copied().unwrap_or(1) + best_tail;
        best.insert(node, (score, best_next));
    }

    let mut start: Option<(i64, u64)> = None;
    let mut heads: Vec<(u64, i64)> = best
        .iter()
        .filter_map(|(&id, &(score, next))| next.map(|_| (id, score)))
        .collect();
    heads.sort_unstable();
    for (id, score) in heads {
        match start {
            Some((s, _)) if s >= score => {}
            _ => start = Some((score, id)),
        }
    }

    let Some((_, mut node)) = start else {
        return Vec::new();
    };
    let mut chain = vec![node];
    while let Some(&(_, Some(next))) = best.get(&node) {
        chain.push(next);
        node = next;
    }
    chain
}

/// Topological order (Kahn) of the tasks whose predecessors are all
/// acyclic. Cycle members and everything downstream of them never reach
/// in-degree zero and are omitted.
fn acyclic_order(weights: &HashMap<u64, i64>, edges: &HashMap<u64, Vec<(u64, i64)>>) -> Vec<u64> {
    let mut in_degree: BTreeMap<u64, usize> = weights.keys().map(|&id| (id, 0)).collect();
    for &(next, _) in edges.values().flatten() {
        *in_degree.entry(next).or_default() += 1;
    }
    let mut ready: VecDeque<u64> = in_degree.iter().filter(|(_, &n)| n == 0).map(|(&id, _)| id).collect();
    let mut order = Vec::with_capacity(in_degree.len());
    while let Some(node) = ready.pop_front() {
        order.push(node);
        for &(next, _) in edges.get(&node).into_iter().flatten() {
            if let Some(n) = in_degree.get_mut(&next) {
                *n -= 1;
                if *n == 0 {
                    ready.push_back(next);
                }
            }
        }
    }
    order
}
