//! Directed jointed graph with policy-driven best-path search
//!
//! Nodes hold externally-owned values and are addressed by the index handed
//! out at creation; indices are stable for the life of the graph. Edges
//! ("joints") are directed records carrying an arbitrary payload, and the
//! pathfinder judges them purely through an injected [`SearchPolicy`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use smallvec::SmallVec;

use super::policy::SearchPolicy;

/// Errors from graph accessors and mutators.
///
/// These indicate call-site bugs, not runtime conditions; callers are not
/// expected to recover from them. A search that finds no route is *not* an
/// error, see [`JointedGraph::find_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A node index was not in this graph.
    #[error("node index {index} is not in this graph")]
    OutOfRange {
        /// The offending index
        index: usize,
    },
    /// A joint was requested from a node to itself.
    #[error("joint endpoints must be different nodes")]
    SelfLink,
}

/// A directed edge record: payload plus target node.
#[derive(Debug, Clone)]
struct Joint<J> {
    payload: J,
    target: usize,
}

#[derive(Debug, Clone)]
struct Node<V, J> {
    value: V,
    /// Joints that start at this node. Fan-out is small in practice.
    joints: SmallVec<[Joint<J>; 4]>,
}

/// A directed multigraph keyed by stable node indices.
///
/// `V` is the value stored at each node (typically a handle to a spatial
/// object); `J` is the joint payload. Several joints from one source to the
/// same target may coexist; the graph never compares payloads.
///
/// Node removal is deliberately not offered: indices are promised to stay
/// valid once returned, and nothing here tombstones or reuses them.
#[derive(Debug, Clone, Default)]
pub struct JointedGraph<V, J> {
    nodes: Vec<Node<V, J>>,
}

impl<V, J> JointedGraph<V, J> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Append a node and return its index.
    pub fn add_node(&mut self, value: V) -> usize {
        self.nodes.push(Node {
            value,
            joints: SmallVec::new(),
        });
        self.nodes.len() - 1
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The value at `index`.
    pub fn value(&self, index: usize) -> Result<&V, GraphError> {
        self.check_index(index)?;
        Ok(&self.nodes[index].value)
    }

    /// Iterate node values in index order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.nodes.iter().map(|node| &node.value)
    }

    /// Add a directed joint from `a` to `b` carrying `joint`.
    ///
    /// Bidirectional travel takes two calls, one per direction, each with
    /// its own payload.
    pub fn link(&mut self, a: usize, b: usize, joint: J) -> Result<(), GraphError> {
        self.check_index(a)?;
        self.check_index(b)?;
        if a == b {
            return Err(GraphError::SelfLink);
        }
        self.nodes[a].joints.push(Joint {
            payload: joint,
            target: b,
        });
        Ok(())
    }

    /// Remove every joint from `a` to `b`, regardless of payload.
    pub fn unlink(&mut self, a: usize, b: usize) -> Result<(), GraphError> {
        self.check_index(a)?;
        self.check_index(b)?;
        if a == b {
            return Err(GraphError::SelfLink);
        }
        self.nodes[a].joints.retain(|joint| joint.target != b);
        Ok(())
    }

    /// Iterate the joints leaving `index` as `(payload, target)` pairs.
    pub fn joints(&self, index: usize) -> Result<impl Iterator<Item = (&J, usize)>, GraphError> {
        self.check_index(index)?;
        Ok(self.nodes[index]
            .joints
            .iter()
            .map(|joint| (&joint.payload, joint.target)))
    }

    fn check_index(&self, index: usize) -> Result<(), GraphError> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::OutOfRange { index })
        }
    }
}

impl<V: Clone, J> JointedGraph<V, J> {
    /// Find a best path from `start` to `end` under `policy`.
    ///
    /// Returns the node values along the route in travel order, excluding
    /// `start`'s own value; `find_path(n, n)` returns the single-element
    /// path `[value(n)]`. `Ok(None)` means the open set drained without
    /// reaching `end`; that is a normal outcome for callers to branch on,
    /// not an error.
    ///
    /// The search is A* over the injected policy. Openness is sampled live
    /// as nodes expand, so a joint toggled while a search is in flight may
    /// be observed in both states within that one call. Ties between
    /// equal-cost routes resolve in heap pop order; which optimal path wins
    /// is unspecified.
    pub fn find_path<P>(
        &self,
        start: usize,
        end: usize,
        policy: &P,
    ) -> Result<Option<Vec<V>>, GraphError>
    where
        P: SearchPolicy<V, J>,
    {
        self.check_index(start)?;
        self.check_index(end)?;

        // Already at the destination.
        if start == end {
            return Ok(Some(vec![self.nodes[end].value.clone()]));
        }

        let goal = &self.nodes[end].value;

        // Scratch route data lives only for this call.
        let mut route: Vec<RouteEntry> = vec![RouteEntry::new(); self.nodes.len()];
        route[start].travel_cost = 0.0;
        route[start].heuristic_cost = policy.heuristic(&self.nodes[start].value, goal);
        route[start].scored = true;

        let mut open = BinaryHeap::new();
        open.push(OpenEntry {
            node: start,
            travel_cost: 0.0,
            total_cost: route[start].total_cost(),
        });

        while let Some(current) = open.pop() {
            // Entry superseded by a later, cheaper relaxation.
            if current.travel_cost > route[current.node].travel_cost {
                continue;
            }

            if current.node == end {
                return Ok(Some(self.trace_path(end, &route)));
            }

            for joint in &self.nodes[current.node].joints {
                if !policy.is_open(&joint.payload) {
                    continue;
                }
                let neighbor = joint.target;
                // Score the heuristic once, on first discovery.
                if !route[neighbor].scored {
                    route[neighbor].heuristic_cost =
                        policy.heuristic(&self.nodes[neighbor].value, goal);
                    route[neighbor].scored = true;
                }
                let travel_cost =
                    route[current.node].travel_cost + policy.travel_cost(&joint.payload);
                if travel_cost < route[neighbor].travel_cost {
                    route[neighbor].travel_cost = travel_cost;
                    route[neighbor].parent = Some(current.node);
                    open.push(OpenEntry {
                        node: neighbor,
                        travel_cost,
                        total_cost: travel_cost + route[neighbor].heuristic_cost,
                    });
                }
            }
        }

        log::debug!("no route from node {start} to node {end}");
        Ok(None)
    }

    /// Unwind parent pointers from `end` back to the start, which has no
    /// parent and is therefore left out of the result.
    fn trace_path(&self, end: usize, route: &[RouteEntry]) -> Vec<V> {
        let mut path = Vec::new();
        let mut current = end;
        while let Some(parent) = route[current].parent {
            path.push(self.nodes[current].value.clone());
            current = parent;
        }
        path.reverse();
        path
    }
}

/// Per-node scratch state for one search call.
#[derive(Debug, Clone)]
struct RouteEntry {
    travel_cost: f32,
    heuristic_cost: f32,
    parent: Option<usize>,
    /// Whether the heuristic has been computed for this node.
    scored: bool,
}

impl RouteEntry {
    fn new() -> Self {
        Self {
            travel_cost: f32::INFINITY,
            heuristic_cost: 0.0,
            parent: None,
            scored: false,
        }
    }

    fn total_cost(&self) -> f32 {
        self.travel_cost + self.heuristic_cost
    }
}

/// Open-set entry for the priority queue.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    node: usize,
    /// Travel cost at push time, used to recognize superseded entries.
    travel_cost: f32,
    total_cost: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.total_cost == other.total_cost
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other
            .total_cost
            .partial_cmp(&self.total_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
