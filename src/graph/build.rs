//! The execution graph: steps plus merged precedence edges.
//!
//! Explicit `after` declarations and derived conflict edges fold into one
//! edge set. Structural problems (duplicate ids, unknown dependencies,
//! cycles) are hard errors raised here, before anything executes.

use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::cmp::Reverse;

use crate::error::{BelayError, Result};
use crate::graph::conflict::{analyze, ConflictEdge, ConflictKind};
use crate::step::Step;

/// Why a precedence edge exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeReason {
    /// Declared via the step's `after` list.
    Explicit,

    /// Derived from a resource conflict; the earlier-declared step goes
    /// first.
    Conflict { kind: ConflictKind, resource: String },
}

/// One merged precedence edge: `from` must complete before `to`.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub reason: EdgeReason,
}

/// Directed acyclic graph of steps, nodes addressed by declaration index.
#[derive(Debug)]
pub struct ExecutionGraph {
    steps: Vec<Step>,
    index_of: HashMap<String, usize>,
    /// Per node: the nodes that must complete before it.
    dependencies: Vec<BTreeSet<usize>>,
    /// Per node: the nodes waiting on it.
    dependents: Vec<BTreeSet<usize>>,
    edges: Vec<Edge>,
}

impl ExecutionGraph {
    /// Run conflict analysis and build the merged graph in one go.
    pub fn from_steps(steps: Vec<Step>) -> Result<Self> {
        let conflicts = analyze(&steps);
        Self::build(steps, conflicts)
    }

    /// Merge explicit `after` edges with conflict-derived edges and validate
    /// the result.
    ///
    /// A conflict edge is only added for pairs with no explicit order in
    /// either direction (directly or through intermediate steps); an
    /// explicit declaration always wins over the declaration-order
    /// tie-break.
    pub fn build(steps: Vec<Step>, conflicts: Vec<ConflictEdge>) -> Result<Self> {
        let mut index_of = HashMap::with_capacity(steps.len());
        for (idx, step) in steps.iter().enumerate() {
            if index_of.insert(step.id.clone(), idx).is_some() {
                return Err(BelayError::DuplicateStepId {
                    step_id: step.id.clone(),
                });
            }
        }

        let mut edges = Vec::new();
        for (idx, step) in steps.iter().enumerate() {
            for dep in &step.explicit_after {
                match index_of.get(dep) {
                    Some(&dep_idx) => edges.push(Edge {
                        from: dep_idx,
                        to: idx,
                        reason: EdgeReason::Explicit,
                    }),
                    None => {
                        return Err(BelayError::UnknownDependency {
                            step_id: step.id.clone(),
                            missing_id: dep.clone(),
                        })
                    }
                }
            }
        }

        let explicit_reach = reachability(steps.len(), &edges);
        for conflict in conflicts {
            let ordered_already = explicit_reach[conflict.first].contains(&conflict.second)
                || explicit_reach[conflict.second].contains(&conflict.first);
            if !ordered_already {
                edges.push(Edge {
                    from: conflict.first,
                    to: conflict.second,
                    reason: EdgeReason::Conflict {
                        kind: conflict.kind,
                        resource: conflict.resource,
                    },
                });
            }
        }

        let mut dependencies = vec![BTreeSet::new(); steps.len()];
        let mut dependents = vec![BTreeSet::new(); steps.len()];
        for edge in &edges {
            dependencies[edge.to].insert(edge.from);
            dependents[edge.from].insert(edge.to);
        }

        let graph = Self {
            steps,
            index_of,
            dependencies,
            dependents,
            edges,
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(BelayError::CycleDetected {
                step_ids: cycle
                    .into_iter()
                    .map(|idx| graph.steps[idx].id.clone())
                    .collect(),
            });
        }

        Ok(graph)
    }

    /// All steps, in declaration order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// A single step by declaration index.
    pub fn step(&self, idx: usize) -> &Step {
        &self.steps[idx]
    }

    /// Declaration index of a step id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_of.get(id).copied()
    }

    /// The merged edge list, for diagnostics and the graph view.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Direct predecessors of a node.
    pub fn dependencies_of(&self, idx: usize) -> &BTreeSet<usize> {
        &self.dependencies[idx]
    }

    /// Direct dependents of a node.
    pub fn dependents_of(&self, idx: usize) -> &BTreeSet<usize> {
        &self.dependents[idx]
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps in topological order, ties broken by declaration order.
    ///
    /// The graph is validated acyclic at build time, so this always covers
    /// every node.
    pub fn topological_order(&self) -> Vec<&str> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(|d| d.len()).collect();
        let mut heap: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(self.steps.len());
        while let Some(Reverse(idx)) = heap.pop() {
            order.push(self.steps[idx].id.as_str());
            for &dep in &self.dependents[idx] {
                in_degree[dep] -= 1;
                if in_degree[dep] == 0 {
                    heap.push(Reverse(dep));
                }
            }
        }
        order
    }

    /// Groups of steps whose predecessors are all satisfied by earlier
    /// groups; what could run together under unbounded parallelism.
    pub fn parallel_batches(&self) -> Vec<Vec<&str>> {
        let mut in_degree: Vec<usize> = self.dependencies.iter().map(|d| d.len()).collect();
        let mut placed = vec![false; self.steps.len()];
        let mut batches = Vec::new();

        loop {
            let batch: Vec<usize> = (0..self.steps.len())
                .filter(|&idx| !placed[idx] && in_degree[idx] == 0)
                .collect();
            if batch.is_empty() {
                break;
            }
            for &idx in &batch {
                placed[idx] = true;
                for &dep in &self.dependents[idx] {
                    in_degree[dep] -= 1;
                }
            }
            batches.push(
                batch
                    .into_iter()
                    .map(|idx| self.steps[idx].id.as_str())
                    .collect(),
            );
        }
        batches
    }

    /// All nodes downstream of the given node, directly or indirectly.
    pub fn transitive_dependents(&self, idx: usize) -> BTreeSet<usize> {
        let mut result = BTreeSet::new();
        let mut to_visit = vec![idx];
        while let Some(current) = to_visit.pop() {
            for &dep in &self.dependents[current] {
                if result.insert(dep) {
                    to_visit.push(dep);
                }
            }
        }
        result
    }

    /// Find a cycle, returning the participating nodes in walk order with
    /// the entry node repeated at the end.
    fn find_cycle(&self) -> Option<Vec<usize>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs(
            node: usize,
            graph: &ExecutionGraph,
            state: &mut Vec<State>,
            path: &mut Vec<usize>,
        ) -> Option<Vec<usize>> {
            state[node] = State::Visiting;
            path.push(node);

            for &dep in &graph.dependents[node] {
                match state[dep] {
                    State::Visiting => {
                        let cycle_start = path.iter().position(|&n| n == dep).unwrap();
                        let mut cycle = path[cycle_start..].to_vec();
                        cycle.push(dep);
                        return Some(cycle);
                    }
                    State::Unvisited => {
                        if let Some(cycle) = dfs(dep, graph, state, path) {
                            return Some(cycle);
                        }
                    }
                    State::Visited => {}
                }
            }

            path.pop();
            state[node] = State::Visited;
            None
        }

        let mut state = vec![State::Unvisited; self.steps.len()];
        let mut path = Vec::new();
        for node in 0..self.steps.len() {
            if state[node] == State::Unvisited {
                if let Some(cycle) = dfs(node, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }
}

/// Per-node forward reachability over the given edges.
fn reachability(node_count: usize, edges: &[Edge]) -> Vec<BTreeSet<usize>> {
    let mut adjacency = vec![Vec::new(); node_count];
    for edge in edges {
        adjacency[edge.from].push(edge.to);
    }

    let mut reach = vec![BTreeSet::new(); node_count];
    for start in 0..node_count {
        let mut to_visit = adjacency[start].clone();
        while let Some(node) = to_visit.pop() {
            if reach[start].insert(node) {
                to_visit.extend(adjacency[node].iter().copied());
            }
        }
    }
    reach
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepKind;

    fn step(id: &str) -> Step {
        Step::new(id, StepKind::Barrier)
    }

    fn writer(id: &str, path: &str) -> Step {
        Step::new(id, StepKind::Barrier).with_writes([path])
    }

    #[test]
    fn empty_graph_builds() {
        let graph = ExecutionGraph::from_steps(vec![]).unwrap();
        assert!(graph.is_empty());
        assert!(graph.topological_order().is_empty());
    }

    #[test]
    fn single_step_graph() {
        let graph = ExecutionGraph::from_steps(vec![step("only")]).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.topological_order(), vec!["only"]);
    }

    #[test]
    fn duplicate_id_rejected() {
        let result = ExecutionGraph::from_steps(vec![step("twin"), step("twin")]);
        assert!(matches!(
            result,
            Err(BelayError::DuplicateStepId { step_id }) if step_id == "twin"
        ));
    }

    #[test]
    fn unknown_dependency_rejected() {
        let steps = vec![step("a").after(["ghost"])];
        let result = ExecutionGraph::from_steps(steps);
        match result {
            Err(BelayError::UnknownDependency {
                step_id,
                missing_id,
            }) => {
                assert_eq!(step_id, "a");
                assert_eq!(missing_id, "ghost");
            }
            other => panic!("expected UnknownDependency, got {:?}", other),
        }
    }

    #[test]
    fn two_step_cycle_detected() {
        let steps = vec![step("a").after(["b"]), step("b").after(["a"])];
        let result = ExecutionGraph::from_steps(steps);
        match result {
            Err(BelayError::CycleDetected { step_ids }) => {
                assert!(step_ids.contains(&"a".to_string()));
                assert!(step_ids.contains(&"b".to_string()));
                assert_eq!(step_ids.first(), step_ids.last());
            }
            other => panic!("expected CycleDetected, got {:?}", other),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let result = ExecutionGraph::from_steps(vec![step("a").after(["a"])]);
        assert!(matches!(result, Err(BelayError::CycleDetected { .. })));
    }

    #[test]
    fn longer_cycle_lists_all_participants() {
        let steps = vec![
            step("a").after(["c"]),
            step("b").after(["a"]),
            step("c").after(["b"]),
        ];
        match ExecutionGraph::from_steps(steps) {
            Err(BelayError::CycleDetected { step_ids }) => {
                for id in ["a", "b", "c"] {
                    assert!(step_ids.contains(&id.to_string()));
                }
            }
            other => panic!("expected CycleDetected, got {:?}", other),
        }
    }

    #[test]
    fn explicit_edges_order_steps() {
        let steps = vec![
            step("first"),
            step("second").after(["first"]),
            step("third").after(["second"]),
        ];
        let graph = ExecutionGraph::from_steps(steps).unwrap();
        assert_eq!(graph.topological_order(), vec!["first", "second", "third"]);
    }

    #[test]
    fn conflict_edges_fold_into_precedence() {
        let steps = vec![writer("a", "shared.txt"), writer("b", "shared.txt")];
        let graph = ExecutionGraph::from_steps(steps).unwrap();

        let b = graph.index_of("b").unwrap();
        let a = graph.index_of("a").unwrap();
        assert!(graph.dependencies_of(b).contains(&a));
        assert!(matches!(
            graph.edges()[0].reason,
            EdgeReason::Conflict { .. }
        ));
    }

    #[test]
    fn explicit_order_overrides_conflict_tiebreak() {
        // a is declared first, so the tie-break alone would run a before b;
        // the explicit declaration forces the opposite and must not produce
        // a cycle.
        let steps = vec![
            writer("a", "shared.txt").after(["b"]),
            writer("b", "shared.txt"),
        ];
        let graph = ExecutionGraph::from_steps(steps).unwrap();
        assert_eq!(graph.topological_order(), vec!["b", "a"]);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].reason, EdgeReason::Explicit);
    }

    #[test]
    fn transitive_explicit_order_also_suppresses_conflict_edge() {
        let steps = vec![
            writer("a", "shared.txt").after(["mid"]),
            step("mid").after(["b"]),
            writer("b", "shared.txt"),
        ];
        let graph = ExecutionGraph::from_steps(steps).unwrap();
        assert_eq!(graph.topological_order(), vec!["b", "mid", "a"]);
        assert!(graph
            .edges()
            .iter()
            .all(|e| e.reason == EdgeReason::Explicit));
    }

    #[test]
    fn tie_break_is_declaration_order_not_alphabetical() {
        let steps = vec![step("zeta"), step("alpha"), step("mike")];
        let graph = ExecutionGraph::from_steps(steps).unwrap();
        assert_eq!(graph.topological_order(), vec!["zeta", "alpha", "mike"]);
    }

    #[test]
    fn diamond_orders_and_batches() {
        let steps = vec![
            step("a"),
            step("b").after(["a"]),
            step("c").after(["a"]),
            step("d").after(["b", "c"]),
        ];
        let graph = ExecutionGraph::from_steps(steps).unwrap();

        let order = graph.topological_order();
        let pos = |id: &str| order.iter().position(|&s| s == id).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("d"));
        assert!(pos("c") < pos("d"));

        let batches = graph.parallel_batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], vec!["a"]);
        assert_eq!(batches[1], vec!["b", "c"]);
        assert_eq!(batches[2], vec!["d"]);
    }

    #[test]
    fn independent_steps_form_one_batch() {
        let steps = vec![step("a"), step("b"), step("c")];
        let graph = ExecutionGraph::from_steps(steps).unwrap();
        let batches = graph.parallel_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn transitive_dependents_follow_chains() {
        let steps = vec![
            step("a"),
            step("b").after(["a"]),
            step("c").after(["b"]),
            step("lone"),
        ];
        let graph = ExecutionGraph::from_steps(steps).unwrap();

        let a = graph.index_of("a").unwrap();
        let dependents = graph.transitive_dependents(a);
        assert!(dependents.contains(&graph.index_of("b").unwrap()));
        assert!(dependents.contains(&graph.index_of("c").unwrap()));
        assert!(!dependents.contains(&graph.index_of("lone").unwrap()));
    }

    #[test]
    fn conflict_edge_reports_resource() {
        let steps = vec![writer("a", "out/x"), writer("b", "out/x")];
        let graph = ExecutionGraph::from_steps(steps).unwrap();
        match &graph.edges()[0].reason {
            EdgeReason::Conflict { resource, .. } => assert_eq!(resource, "out/x"),
            other => panic!("expected conflict reason, got {:?}", other),
        }
    }

    #[test]
    fn mixed_explicit_and_conflict_edges_merge() {
        let steps = vec![
            step("mkdir").with_writes(["out"]),
            writer("copy-a", "out/a"),
            writer("copy-b", "out/b"),
            step("finish").after(["copy-a", "copy-b"]),
        ];
        let graph = ExecutionGraph::from_steps(steps).unwrap();

        // mkdir conflicts with both copies (subtree containment), so it
        // precedes them; finish follows both explicitly.
        assert_eq!(
            graph.topological_order(),
            vec!["mkdir", "copy-a", "copy-b", "finish"]
        );
        let batches = graph.parallel_batches();
        assert_eq!(batches[0], vec!["mkdir"]);
        assert_eq!(batches[1], vec!["copy-a", "copy-b"]);
        assert_eq!(batches[2], vec!["finish"]);
    }
}
