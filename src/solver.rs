//! Graph search over board states.
//!
//! Every algorithm keeps the states it generates in a [`SearchTree`] arena:
//! each node stores its board and the id of the node it was expanded from, so
//! the path to any state is an index walk back to the root. Layouts are
//! deduplicated through a closed set of [`LayoutKey`]s (FxHashSet), so a layout
//! is expanded at most once per run.
//!
//! Depth-first and breadth-first search are one traversal that differs only in
//! where children enter the frontier. A* keeps its open set ordered by
//! `(f, g, discovery order)`.
//!
//! Searches are cooperative: a [`CancelToken`] is checked at the top of each
//! iteration, after a state is expanded and between its children. Budget,
//! cancellation and exhaustion all return the best state seen so far instead
//! of an error.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::board::{BoardState, LayoutKey};
use crate::heuristic::Heuristic;

/// Index of a node in a [`SearchTree`].
pub type NodeId = usize;

/// The start state is always the first node.
const ROOT: NodeId = 0;

/// A* open-set entry: `(f, g, discovery sequence, node)`.
type OpenEntry = (u32, u32, u64, NodeId);

/// A generated state and its place in the search.
#[derive(Clone, Debug)]
pub struct Node {
    pub state: BoardState,
    pub parent: Option<NodeId>,
    /// Cached `state.score()`.
    pub score: usize,
    /// Moves from the start (A* cost so far).
    pub g: u32,
    /// Heuristic estimate; 0 outside A*.
    pub h: u32,
    pub f: u32,
}

/// Arena of every state generated during one search.
#[derive(Clone, Debug, Default)]
pub struct SearchTree {
    nodes: Vec<Node>,
}

impl SearchTree {
    fn push(&mut self, state: BoardState, parent: Option<NodeId>, g: u32, h: u32) -> NodeId {
        let score = state.score();
        self.nodes.push(Node {
            state,
            parent,
            score,
            g,
            h,
            f: g + h,
        });
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// States from the root to `id`, following parent links.
    pub fn rewind(&self, id: NodeId) -> Vec<&BoardState> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id);
            path.push(&node.state);
            current = node.parent;
        }
        path.reverse();
        path
    }
}

/// Shared flag used to stop a running search from outside.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why a search stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// A state with score 0 was reached.
    Solved,
    /// The frontier ran empty.
    Exhausted,
    /// The closed set reached the node budget.
    BudgetReached,
    /// The cancel token was set.
    Cancelled,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Termination::Solved => "solved",
            Termination::Exhausted => "exhausted",
            Termination::BudgetReached => "budget reached",
            Termination::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Where the generalized traversal inserts new children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frontier {
    /// Front of the frontier: depth-first.
    Stack,
    /// Back of the frontier: breadth-first.
    Queue,
}

/// Search algorithms selectable from configuration and the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    DepthFirst,
    BreadthFirst,
    BranchAndBound,
    AStar,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::DepthFirst,
        Algorithm::BreadthFirst,
        Algorithm::BranchAndBound,
        Algorithm::AStar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::DepthFirst => "depth_first",
            Algorithm::BreadthFirst => "breadth_first",
            Algorithm::BranchAndBound => "branch_and_bound",
            Algorithm::AStar => "a_star",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one search run.
///
/// `state()` is the returned board: the solved state, or the best state seen
/// when the search was cut short. It is `None` only when A* exhausted its open
/// set without solving; `best_effort()` is still available then.
#[derive(Debug)]
pub struct SearchOutcome {
    tree: SearchTree,
    result: Option<NodeId>,
    best: NodeId,
    pub termination: Termination,
    pub closed_count: usize,
    pub elapsed: Duration,
}

impl SearchOutcome {
    pub fn state(&self) -> Option<&BoardState> {
        self.result.map(|id| &self.tree.get(id).state)
    }

    /// Lowest-scoring state seen, whatever the termination.
    pub fn best_effort(&self) -> &BoardState {
        &self.tree.get(self.best).state
    }

    pub fn is_solved(&self) -> bool {
        self.termination == Termination::Solved
    }

    pub fn score(&self) -> Option<usize> {
        self.result.map(|id| self.tree.get(id).score)
    }

    /// Number of moves from the start to the returned state.
    pub fn depth(&self) -> Option<u32> {
        self.result.map(|id| self.tree.get(id).g)
    }

    /// States from the start to the returned state; empty when there is none.
    pub fn rewind(&self) -> Vec<&BoardState> {
        self.result
            .map(|id| self.tree.rewind(id))
            .unwrap_or_default()
    }

    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    pub fn into_state(mut self) -> Option<BoardState> {
        let id = self.result?;
        Some(self.tree.nodes.swap_remove(id).state)
    }
}

/// Configures and runs searches.
///
/// ```
/// use gaps::board::BoardState;
/// use gaps::solver::Searcher;
///
/// let mut start = BoardState::new(13, 4);
/// start.remove_top_rank();
///
/// let outcome = Searcher::new().max_closed(100).breadth_first(&start);
/// assert!(outcome.is_solved());
/// ```
#[derive(Default)]
pub struct Searcher<'a> {
    max_closed: Option<usize>,
    cancel: Option<CancelToken>,
    on_closed_added: Option<Box<dyn FnMut(usize) + 'a>>,
    on_better_state: Option<Box<dyn FnMut(&BoardState, usize) + 'a>>,
}

impl<'a> Searcher<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop once this many states have been closed.
    pub fn max_closed(mut self, max_closed: usize) -> Self {
        self.max_closed = Some(max_closed);
        self
    }

    pub fn max_closed_opt(mut self, max_closed: Option<usize>) -> Self {
        self.max_closed = max_closed;
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Called with the closed-set size each time a state is closed.
    pub fn on_closed_added(mut self, callback: impl FnMut(usize) + 'a) -> Self {
        self.on_closed_added = Some(Box::new(callback));
        self
    }

    /// Called with the new best state and the closed-set size.
    pub fn on_better_state(mut self, callback: impl FnMut(&BoardState, usize) + 'a) -> Self {
        self.on_better_state = Some(Box::new(callback));
        self
    }

    pub fn depth_first(&mut self, start: &BoardState) -> SearchOutcome {
        self.traverse(start, Frontier::Stack)
    }

    pub fn breadth_first(&mut self, start: &BoardState) -> SearchOutcome {
        self.traverse(start, Frontier::Queue)
    }

    /// Breadth-first traversal keeping the best state; stops at the first
    /// solved state.
    pub fn branch_and_bound(&mut self, start: &BoardState) -> SearchOutcome {
        self.traverse(start, Frontier::Queue)
    }

    /// Runs `algorithm`; `heuristic` is only consulted by A*.
    pub fn run<H: Heuristic + ?Sized>(
        &mut self,
        algorithm: Algorithm,
        start: &BoardState,
        heuristic: &H,
    ) -> SearchOutcome {
        match algorithm {
            Algorithm::DepthFirst => self.depth_first(start),
            Algorithm::BreadthFirst => self.breadth_first(start),
            Algorithm::BranchAndBound => self.branch_and_bound(start),
            Algorithm::AStar => self.a_star(start, heuristic),
        }
    }

    /// Uninformed traversal; `frontier` decides depth- or breadth-first order.
    pub fn traverse(&mut self, start: &BoardState, frontier: Frontier) -> SearchOutcome {
        let algorithm = match frontier {
            Frontier::Stack => "depth_first",
            Frontier::Queue => "breadth_first",
        };
        let mut run = Run::new(self, start, 0, algorithm);
        let mut open = VecDeque::from([ROOT]);

        while let Some(id) = open.pop_front() {
            if run.cancelled() {
                return run.finish_best(Termination::Cancelled);
            }

            let key = run.tree.get(id).state.layout_key();
            if run.closed.contains(&key) {
                continue;
            }
            if run.tree.get(id).score == 0 {
                return run.finish_with(Some(id), Termination::Solved);
            }

            run.close(key);
            run.offer_best(id);
            if run.budget_reached() {
                return run.finish_best(Termination::BudgetReached);
            }

            let depth = run.tree.get(id).g + 1;
            let moves = run.tree.get(id).state.moves();
            if run.cancelled() {
                return run.finish_best(Termination::Cancelled);
            }

            for mv in moves {
                if run.cancelled() {
                    return run.finish_best(Termination::Cancelled);
                }

                let child = mv.into_state();
                if run.closed.contains(&child.layout_key()) {
                    continue;
                }

                let child_id = run.tree.push(child, Some(id), depth, 0);
                match frontier {
                    Frontier::Stack => open.push_front(child_id),
                    Frontier::Queue => open.push_back(child_id),
                }
                run.offer_best(child_id);
            }
        }

        run.finish_best(Termination::Exhausted)
    }

    /// Best-first search ordered by `f = g + h`.
    ///
    /// Ties on `f` go to the lower `g`, then to the state discovered first.
    /// Returns no state when the open set empties without a solution.
    pub fn a_star<H: Heuristic + ?Sized>(
        &mut self,
        start: &BoardState,
        heuristic: &H,
    ) -> SearchOutcome {
        let mut run = Run::new(self, start, heuristic.estimate(start), "a_star");

        let mut discovered = 0u64;
        let mut open: BTreeSet<OpenEntry> = BTreeSet::new();
        let mut open_index: FxHashMap<LayoutKey, (NodeId, u64)> = FxHashMap::default();

        let root = run.tree.get(ROOT);
        open.insert((root.f, root.g, discovered, ROOT));
        open_index.insert(root.state.layout_key(), (ROOT, discovered));

        loop {
            if run.cancelled() {
                return run.finish_best(Termination::Cancelled);
            }

            let Some((_, _, _, id)) = open.pop_first() else {
                return run.finish_with(None, Termination::Exhausted);
            };
            let key = run.tree.get(id).state.layout_key();
            open_index.remove(&key);

            if run.tree.get(id).score == 0 {
                return run.finish_with(Some(id), Termination::Solved);
            }

            run.close(key);
            if run.budget_reached() {
                return run.finish_best(Termination::BudgetReached);
            }

            let g = run.tree.get(id).g + 1;
            let moves = run.tree.get(id).state.moves();
            if run.cancelled() {
                return run.finish_best(Termination::Cancelled);
            }

            for mv in moves {
                if run.cancelled() {
                    return run.finish_best(Termination::Cancelled);
                }

                let child = mv.into_state();
                let child_key = child.layout_key();
                if run.closed.contains(&child_key) {
                    continue;
                }

                let child_id = match open_index.get(&child_key).copied() {
                    // already queued at least as cheaply
                    Some((existing, _)) if run.tree.get(existing).g <= g => continue,
                    Some((existing, sequence)) => {
                        let node = run.tree.get(existing);
                        open.remove(&(node.f, node.g, sequence, existing));

                        let node = run.tree.get_mut(existing);
                        node.g = g;
                        node.f = g + node.h;
                        node.parent = Some(id);
                        open.insert((node.f, g, sequence, existing));
                        existing
                    }
                    None => {
                        let h = heuristic.estimate(&child);
                        let child_id = run.tree.push(child, Some(id), g, h);
                        discovered += 1;
                        open.insert((g + h, g, discovered, child_id));
                        open_index.insert(child_key, (child_id, discovered));
                        child_id
                    }
                };

                run.offer_best(child_id);
            }
        }
    }
}

/// Per-run bookkeeping shared by every algorithm.
struct Run<'r, 'a> {
    searcher: &'r mut Searcher<'a>,
    algorithm: &'static str,
    tree: SearchTree,
    closed: FxHashSet<LayoutKey>,
    best: NodeId,
    best_score: usize,
    started: Instant,
}

impl<'r, 'a> Run<'r, 'a> {
    fn new(searcher: &'r mut Searcher<'a>, start: &BoardState, h: u32, algorithm: &'static str) -> Self {
        let mut tree = SearchTree::default();
        tree.push(start.clone(), None, 0, h);
        let best_score = tree.get(ROOT).score;

        info!(
            event = "search_start",
            algorithm,
            columns = start.columns(),
            rows = start.rows(),
            score = best_score,
            max_closed = ?searcher.max_closed
        );

        Self {
            searcher,
            algorithm,
            tree,
            closed: FxHashSet::default(),
            best: ROOT,
            best_score,
            started: Instant::now(),
        }
    }

    #[inline]
    fn cancelled(&self) -> bool {
        self.searcher
            .cancel
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
    }

    fn budget_reached(&self) -> bool {
        self.searcher
            .max_closed
            .is_some_and(|max| self.closed.len() >= max)
    }

    fn close(&mut self, key: LayoutKey) {
        self.closed.insert(key);
        let count = self.closed.len();
        trace!(closed = count, "state closed");
        if let Some(callback) = self.searcher.on_closed_added.as_mut() {
            callback(count);
        }
    }

    fn offer_best(&mut self, id: NodeId) {
        let score = self.tree.get(id).score;
        if score >= self.best_score {
            return;
        }

        self.best = id;
        self.best_score = score;
        debug!(score, closed = self.closed.len(), "better state found");
        if let Some(callback) = self.searcher.on_better_state.as_mut() {
            callback(&self.tree.get(id).state, self.closed.len());
        }
    }

    fn finish_best(self, termination: Termination) -> SearchOutcome {
        let best = self.best;
        self.finish_with(Some(best), termination)
    }

    fn finish_with(self, result: Option<NodeId>, termination: Termination) -> SearchOutcome {
        let elapsed = self.started.elapsed();

        info!(
            event = "search_end",
            algorithm = self.algorithm,
            termination = %termination,
            closed = self.closed.len(),
            nodes = self.tree.len(),
            best_score = self.best_score,
            duration_ms = elapsed.as_millis() as u64
        );

        SearchOutcome {
            tree: self.tree,
            result,
            best: self.best,
            termination,
            closed_count: self.closed.len(),
            elapsed,
        }
    }
}

/// Depth-first search with an optional node budget.
pub fn depth_first_search(start: &BoardState, max_closed: Option<usize>) -> SearchOutcome {
    Searcher::new().max_closed_opt(max_closed).depth_first(start)
}

/// Breadth-first search with an optional node budget.
pub fn breadth_first_search(start: &BoardState, max_closed: Option<usize>) -> SearchOutcome {
    Searcher::new().max_closed_opt(max_closed).breadth_first(start)
}

/// A* search with an optional node budget.
pub fn a_star<H: Heuristic + ?Sized>(
    start: &BoardState,
    heuristic: &H,
    max_closed: Option<usize>,
) -> SearchOutcome {
    Searcher::new().max_closed_opt(max_closed).a_star(start, heuristic)
}
