// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boykov–Kolmogorov max-flow
//!
//! Augmenting-path solver with dual search trees and orphan adoption, used
//! as the binary engine of the multi-label α-expansion. Graphs here are
//! tiny (one node per arrangement face), so adoption validates candidate
//! parents by walking to the root instead of keeping timestamps.

use std::collections::VecDeque;

const NONE: u32 = u32::MAX;
/// Parent marker for tree roots (nodes linked straight to a terminal)
const TERMINAL: u32 = u32::MAX - 1;
/// Parent marker for orphaned nodes awaiting adoption
const ORPHAN: u32 = u32::MAX - 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tree {
    Free,
    Source,
    Sink,
}

/// Side of the minimum cut a node ends up on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutSide {
    Source,
    Sink,
}

#[derive(Debug, Clone)]
struct Arc {
    head: u32,
    next: u32,
    rcap: f64,
}

/// A max-flow problem instance
#[derive(Debug, Clone)]
pub struct BkGraph {
    first: Vec<u32>,
    arcs: Vec<Arc>,
    /// residual terminal capacity: positive toward source, negative toward sink
    tr_cap: Vec<f64>,
    tree: Vec<Tree>,
    parent: Vec<u32>,
    flow: f64,
}

impl BkGraph {
    /// Create a graph with n non-terminal nodes
    pub fn new(n: usize) -> Self {
        Self {
            first: vec![NONE; n],
            arcs: Vec::new(),
            tr_cap: vec![0.0; n],
            tree: vec![Tree::Free; n],
            parent: vec![NONE; n],
            flow: 0.0,
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.first.len()
    }

    /// Check if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    /// Append an extra node, returning its index
    pub fn add_node(&mut self) -> u32 {
        self.first.push(NONE);
        self.tr_cap.push(0.0);
        self.tree.push(Tree::Free);
        self.parent.push(NONE);
        (self.first.len() - 1) as u32
    }

    /// Add an edge with capacities in both directions
    pub fn add_edge(&mut self, u: u32, v: u32, cap: f64, rev_cap: f64) {
        debug_assert!(u != v);
        let a = self.arcs.len() as u32;
        self.arcs.push(Arc {
            head: v,
            next: self.first[u as usize],
            rcap: cap,
        });
        self.first[u as usize] = a;
        self.arcs.push(Arc {
            head: u,
            next: self.first[v as usize],
            rcap: rev_cap,
        });
        self.first[v as usize] = a + 1;
    }

    /// Add terminal capacities for a node. Opposing capacities cancel
    /// against each other immediately.
    pub fn add_terminal(&mut self, u: u32, cap_source: f64, cap_sink: f64) {
        self.flow += cap_source.min(cap_sink);
        self.tr_cap[u as usize] += cap_source - cap_sink;
    }

    /// residual capacity of arc a in the direction useful for growing
    /// the given tree from its tail
    #[inline]
    fn grow_residual(&self, tree: Tree, a: u32) -> f64 {
        match tree {
            Tree::Source => self.arcs[a as usize].rcap,
            Tree::Sink => self.arcs[(a ^ 1) as usize].rcap,
            Tree::Free => 0.0,
        }
    }

    /// Walk the parent chain; true when it reaches a terminal
    fn rooted(&self, mut u: u32) -> bool {
        let mut steps = 0;
        loop {
            match self.parent[u as usize] {
                TERMINAL => return true,
                NONE | ORPHAN => return false,
                a => u = self.arcs[a as usize].head,
            }
            steps += 1;
            if steps > self.first.len() {
                return false;
            }
        }
    }

    /// Run the solver, returning the max-flow value
    pub fn max_flow(&mut self) -> f64 {
        let n = self.first.len() as u32;
        let mut active: VecDeque<u32> = VecDeque::new();
        let mut orphans: VecDeque<u32> = VecDeque::new();

        for u in 0..n {
            if self.tr_cap[u as usize] > 0.0 {
                self.tree[u as usize] = Tree::Source;
                self.parent[u as usize] = TERMINAL;
                active.push_back(u);
            } else if self.tr_cap[u as usize] < 0.0 {
                self.tree[u as usize] = Tree::Sink;
                self.parent[u as usize] = TERMINAL;
                active.push_back(u);
            }
        }

        loop {
            // growth: expand both trees until they touch
            let mut bridge: Option<(u32, u32, u32)> = None; // (s_node, t_node, s->t arc)
            'grow: while let Some(&p) = active.front() {
                let p_tree = self.tree[p as usize];
                if p_tree == Tree::Free {
                    active.pop_front();
                    continue;
                }
                let mut a = self.first[p as usize];
                while a != NONE {
                    let next_a = self.arcs[a as usize].next;
                    if self.grow_residual(p_tree, a) > 0.0 {
                        let q = self.arcs[a as usize].head;
                        match self.tree[q as usize] {
                            Tree::Free => {
                                self.tree[q as usize] = p_tree;
                                // parent link is the arc from q back to p
                                self.parent[q as usize] = a ^ 1;
                                active.push_back(q);
                            }
                            t if t != p_tree => {
                                bridge = Some(match p_tree {
                                    Tree::Source => (p, q, a),
                                    _ => (q, p, a ^ 1),
                                });
                                break 'grow;
                            }
                            _ => {}
                        }
                    }
                    a = next_a;
                }
                active.pop_front();
            }

            let Some((s_node, t_node, bridge_arc)) = bridge else {
                break;
            };

            // augment along terminal..s_node -> bridge -> t_node..terminal
            let mut bottleneck = self.arcs[bridge_arc as usize].rcap;
            let mut u = s_node;
            while self.parent[u as usize] != TERMINAL {
                let pa = self.parent[u as usize];
                bottleneck = bottleneck.min(self.arcs[(pa ^ 1) as usize].rcap);
                u = self.arcs[pa as usize].head;
            }
            bottleneck = bottleneck.min(self.tr_cap[u as usize]);
            let mut v = t_node;
            while self.parent[v as usize] != TERMINAL {
                let pa = self.parent[v as usize];
                bottleneck = bottleneck.min(self.arcs[pa as usize].rcap);
                v = self.arcs[pa as usize].head;
            }
            bottleneck = bottleneck.min(-self.tr_cap[v as usize]);

            self.arcs[bridge_arc as usize].rcap -= bottleneck;
            self.arcs[(bridge_arc ^ 1) as usize].rcap += bottleneck;

            let mut u = s_node;
            while self.parent[u as usize] != TERMINAL {
                let pa = self.parent[u as usize];
                self.arcs[(pa ^ 1) as usize].rcap -= bottleneck;
                self.arcs[pa as usize].rcap += bottleneck;
                let next = self.arcs[pa as usize].head;
                if self.arcs[(pa ^ 1) as usize].rcap <= 0.0 {
                    self.parent[u as usize] = ORPHAN;
                    orphans.push_back(u);
                }
                u = next;
            }
            self.tr_cap[u as usize] -= bottleneck;
            if self.tr_cap[u as usize] <= 0.0 {
                self.parent[u as usize] = ORPHAN;
                orphans.push_back(u);
            }

            let mut v = t_node;
            while self.parent[v as usize] != TERMINAL {
                let pa = self.parent[v as usize];
                self.arcs[pa as usize].rcap -= bottleneck;
                self.arcs[(pa ^ 1) as usize].rcap += bottleneck;
                let next = self.arcs[pa as usize].head;
                if self.arcs[pa as usize].rcap <= 0.0 {
                    self.parent[v as usize] = ORPHAN;
                    orphans.push_back(v);
                }
                v = next;
            }
            self.tr_cap[v as usize] += bottleneck;
            if self.tr_cap[v as usize] >= 0.0 {
                self.parent[v as usize] = ORPHAN;
                orphans.push_back(v);
            }

            self.flow += bottleneck;

            // adoption: find new parents for orphaned subtrees
            while let Some(o) = orphans.pop_front() {
                let o_tree = self.tree[o as usize];
                let mut adopted = false;
                let mut a = self.first[o as usize];
                while a != NONE {
                    let next_a = self.arcs[a as usize].next;
                    let q = self.arcs[a as usize].head;
                    // residual must point from q toward o for the source
                    // tree, from o toward q for the sink tree
                    let res = match o_tree {
                        Tree::Source => self.arcs[(a ^ 1) as usize].rcap,
                        _ => self.arcs[a as usize].rcap,
                    };
                    if self.tree[q as usize] == o_tree && res > 0.0 && self.rooted(q) {
                        self.parent[o as usize] = a;
                        adopted = true;
                        break;
                    }
                    a = next_a;
                }
                if adopted {
                    continue;
                }
                // no parent found: free the node, re-activate neighbours,
                // orphan the children
                let mut a = self.first[o as usize];
                while a != NONE {
                    let next_a = self.arcs[a as usize].next;
                    let q = self.arcs[a as usize].head;
                    if self.tree[q as usize] == o_tree {
                        let res = match o_tree {
                            Tree::Source => self.arcs[(a ^ 1) as usize].rcap,
                            _ => self.arcs[a as usize].rcap,
                        };
                        if res > 0.0 {
                            active.push_back(q);
                        }
                        let qp = self.parent[q as usize];
                        if qp < ORPHAN && self.arcs[qp as usize].head == o {
                            self.parent[q as usize] = ORPHAN;
                            orphans.push_back(q);
                        }
                    }
                    a = next_a;
                }
                self.tree[o as usize] = Tree::Free;
                self.parent[o as usize] = NONE;
            }
        }

        self.flow
    }

    /// Cut side of a node after `max_flow`. Free nodes default to the
    /// sink side.
    pub fn cut_side(&self, u: u32) -> CutSide {
        if self.tree[u as usize] == Tree::Source {
            CutSide::Source
        } else {
            CutSide::Sink
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_edge() {
        let mut g = BkGraph::new(2);
        g.add_terminal(0, 5.0, 0.0);
        g.add_terminal(1, 0.0, 5.0);
        g.add_edge(0, 1, 3.0, 0.0);
        assert_relative_eq!(g.max_flow(), 3.0);
        assert_eq!(g.cut_side(0), CutSide::Source);
        assert_eq!(g.cut_side(1), CutSide::Sink);
    }

    #[test]
    fn test_terminal_bottleneck() {
        let mut g = BkGraph::new(2);
        g.add_terminal(0, 2.0, 0.0);
        g.add_terminal(1, 0.0, 10.0);
        g.add_edge(0, 1, 100.0, 0.0);
        assert_relative_eq!(g.max_flow(), 2.0);
        // the saturated terminal puts node 0 on the sink side
        assert_eq!(g.cut_side(0), CutSide::Sink);
    }

    #[test]
    fn test_diamond() {
        // two disjoint augmenting paths of capacity 1 and 2
        let mut g = BkGraph::new(2);
        g.add_terminal(0, 3.0, 0.0);
        g.add_terminal(1, 0.0, 3.0);
        g.add_edge(0, 1, 1.0, 0.0);
        g.add_edge(0, 1, 2.0, 0.0);
        assert_relative_eq!(g.max_flow(), 3.0);
    }

    #[test]
    fn test_chain_min_cut() {
        // s -> 0 -> 1 -> 2 -> t with a weak middle link
        let mut g = BkGraph::new(3);
        g.add_terminal(0, 10.0, 0.0);
        g.add_terminal(2, 0.0, 10.0);
        g.add_edge(0, 1, 4.0, 4.0);
        g.add_edge(1, 2, 1.5, 1.5);
        assert_relative_eq!(g.max_flow(), 1.5);
        assert_eq!(g.cut_side(0), CutSide::Source);
        assert_eq!(g.cut_side(1), CutSide::Source);
        assert_eq!(g.cut_side(2), CutSide::Sink);
    }

    #[test]
    fn test_opposing_terminals_cancel() {
        let mut g = BkGraph::new(1);
        g.add_terminal(0, 4.0, 3.0);
        assert_relative_eq!(g.max_flow(), 3.0);
        assert_eq!(g.cut_side(0), CutSide::Source);
    }
}
