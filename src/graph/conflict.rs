//! Resource conflict analysis.
//!
//! Given a list of steps with declared resource footprints, computes which
//! pairs must not run concurrently: write-write and read-write overlaps
//! conflict, read-read does not. Every declared entry of a footprint
//! participates in the comparison; a step reading several patterns conflicts
//! with a writer matched by any one of them, not just the first.
//!
//! The analysis is pure: no filesystem access, no side effects.

use std::collections::BTreeSet;
use std::path::Path;

use crate::step::Step;

/// How two steps' footprints collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Both steps write an overlapping resource.
    WriteWrite,

    /// One step writes a resource the other reads.
    ReadWrite,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::WriteWrite => write!(f, "write-write"),
            ConflictKind::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// Derived ordering constraint between two steps with overlapping footprints.
///
/// `first` and `second` are declaration indices with `first < second`; the
/// earlier-declared step takes precedence when no explicit order exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEdge {
    pub first: usize,
    pub second: usize,
    pub kind: ConflictKind,
    /// One resource that collided, for diagnostics.
    pub resource: String,
}

/// Compare every pair of steps and report the conflicting ones.
///
/// O(n²) over the step list and O(|a|·|b|) over each footprint pair, which
/// is fine at the tens-of-steps scale this engine handles.
pub fn analyze(steps: &[Step]) -> Vec<ConflictEdge> {
    let mut edges = Vec::new();
    for i in 0..steps.len() {
        for j in (i + 1)..steps.len() {
            if let Some((kind, resource)) = conflict_between(&steps[i], &steps[j]) {
                edges.push(ConflictEdge {
                    first: i,
                    second: j,
                    kind,
                    resource,
                });
            }
        }
    }
    edges
}

/// The strongest collision between two steps, if any.
fn conflict_between(a: &Step, b: &Step) -> Option<(ConflictKind, String)> {
    if let Some(resource) = overlap(&a.writes, &b.writes) {
        return Some((ConflictKind::WriteWrite, resource));
    }
    if let Some(resource) = overlap(&a.writes, &b.reads) {
        return Some((ConflictKind::ReadWrite, resource));
    }
    if let Some(resource) = overlap(&a.reads, &b.writes) {
        return Some((ConflictKind::ReadWrite, resource));
    }
    None
}

fn overlap(xs: &BTreeSet<String>, ys: &BTreeSet<String>) -> Option<String> {
    for x in xs {
        for y in ys {
            if resources_overlap(x, y) {
                return Some(x.clone());
            }
        }
    }
    None
}

/// Whether two declared resources denote overlapping filesystem footprints.
///
/// Rules, any of which overlaps:
/// - exact equality;
/// - component-wise prefix containment, so a subtree operation on `out`
///   collides with anything touching `out/a` (string prefixes do not count:
///   `ou` does not contain `out/a`);
/// - a glob entry overlaps a concrete path it matches (`test/*.out` vs
///   `test/sample.out`), a path whose subtree contains the pattern's literal
///   root (`test` vs `test/*.in`), and, for `**` patterns, any path inside
///   the root's subtree;
/// - two glob entries overlap when anchored under the same literal root, or
///   when one is a `**` pattern whose root contains the other's.
pub fn resources_overlap(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (is_pattern(a), is_pattern(b)) {
        (false, false) => contains_path(a, b) || contains_path(b, a),
        (true, false) => pattern_overlaps_path(a, b),
        (false, true) => pattern_overlaps_path(b, a),
        (true, true) => {
            let root_a = pattern_root(a);
            let root_b = pattern_root(b);
            root_a == root_b
                || (is_subtree_pattern(a) && contains_path(root_a, root_b))
                || (is_subtree_pattern(b) && contains_path(root_b, root_a))
        }
    }
}

fn pattern_overlaps_path(pattern: &str, path: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(compiled) => {
            let root = pattern_root(pattern);
            compiled.matches(path)
                || contains_path(path, root)
                || (is_subtree_pattern(pattern) && contains_path(root, path))
        }
        // An unparsable pattern degrades to a literal path.
        Err(_) => contains_path(pattern, path) || contains_path(path, pattern),
    }
}

fn is_pattern(resource: &str) -> bool {
    resource.contains(['*', '?', '['])
}

/// `**` spans directories, so the pattern covers its root's whole subtree.
fn is_subtree_pattern(pattern: &str) -> bool {
    pattern.contains("**")
}

/// Component-wise prefix test. An empty parent is the root the resources are
/// declared under, which contains everything.
fn contains_path(parent: &str, child: &str) -> bool {
    if parent.is_empty() {
        return true;
    }
    Path::new(child).starts_with(parent)
}

/// The literal directory a pattern is anchored under: everything before the
/// first metacharacter, trimmed to a whole component. `test/*.in` is anchored
/// under `test`; `*.in` is anchored at the declaration root.
fn pattern_root(pattern: &str) -> &str {
    let meta = pattern.find(['*', '?', '[']).unwrap_or(pattern.len());
    match pattern[..meta].rfind('/') {
        Some(idx) => &pattern[..idx],
        None => "",
    }
}
