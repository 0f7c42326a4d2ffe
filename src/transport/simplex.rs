use super::status::Status;
use crate::Distance;
use crate::Weight;

/// sentinel for "no node"; only the artificial root has no parent
const NONE: usize = usize::MAX;
/// arc is part of the spanning tree basis
const TREE: i8 = 0;
/// arc sits at its lower bound of zero. transportation arcs are
/// uncapacitated, so there is no upper state.
const LOWER: i8 = 1;
/// pricing scans arcs in blocks of BLOCK_FACTOR * sqrt(arcs), never fewer
const MIN_BLOCK: usize = 10;
const BLOCK_FACTOR: f64 = 1.0;

/// Primal network simplex over the dense bipartite transportation graph.
///
/// Nodes 0..n0 are supplies and n0..n0+n1 demands, plus an artificial
/// root. Arc a < n0*n1 joins supply a/n1 to demand a%n1 with the cost
/// taken from a row-major matrix; one artificial arc per node connects
/// it to the root and the artificial arcs form the initial strongly
/// feasible spanning tree. All scratch is reused across solves, so one
/// instance amortizes its allocations over a long sweep.
///
/// Tolerances scale with the largest magnitude among costs and weights:
/// the large epsilon guards balance and feasibility checks, the small
/// one keeps degenerate pricing ties from cycling.
pub struct Simplex {
    // problem shape
    n0: usize,
    n1: usize,
    nodes: usize,
    arcs: usize,
    root: usize,
    supply: Vec<Weight>,
    cost: Vec<Distance>,
    source: Vec<usize>,
    target: Vec<usize>,
    // basis
    flow: Vec<Weight>,
    state: Vec<i8>,
    pi: Vec<Distance>,
    parent: Vec<usize>,
    pred: Vec<usize>,
    forward: Vec<bool>,
    thread: Vec<usize>,
    rev: Vec<usize>,
    succ: Vec<usize>,
    last: Vec<usize>,
    dirty: Vec<usize>,
    // pivot scratch
    block: usize,
    next_arc: usize,
    in_arc: usize,
    apex: usize,
    u_in: usize,
    v_in: usize,
    u_out: usize,
    delta: Weight,
    // tolerances
    n_iter_max: usize,
    factor_large: Distance,
    factor_small: Distance,
    eps_large: Distance,
    eps_small: Distance,
    // diagnostics
    iterations: usize,
}

impl Default for Simplex {
    fn default() -> Self {
        Self::new(100_000, 1_000., 1.)
    }
}

impl Simplex {
    pub fn new(n_iter_max: usize, factor_large: Distance, factor_small: Distance) -> Self {
        Self {
            n0: 0,
            n1: 0,
            nodes: 0,
            arcs: 0,
            root: 0,
            supply: Vec::new(),
            cost: Vec::new(),
            source: Vec::new(),
            target: Vec::new(),
            flow: Vec::new(),
            state: Vec::new(),
            pi: Vec::new(),
            parent: Vec::new(),
            pred: Vec::new(),
            forward: Vec::new(),
            thread: Vec::new(),
            rev: Vec::new(),
            succ: Vec::new(),
            last: Vec::new(),
            dirty: Vec::new(),
            block: 0,
            next_arc: 0,
            in_arc: 0,
            apex: 0,
            u_in: 0,
            v_in: 0,
            u_out: 0,
            delta: 0.,
            n_iter_max,
            factor_large,
            factor_small,
            eps_large: 0.,
            eps_small: 0.,
            iterations: 0,
        }
    }

    /// Solve the transportation problem given by nonnegative supplies,
    /// nonnegative demands, and the dense row-major supplies-by-demands
    /// cost matrix. Totals must already agree within tolerance; balancing
    /// unequal totals is the caller's job.
    pub fn solve(&mut self, supplies: &[Weight], demands: &[Weight], costs: &[Distance]) -> Status {
        assert!(
            costs.len() == supplies.len() * demands.len(),
            "cost matrix must be dense supplies x demands"
        );
        self.iterations = 0;
        match self.reset(supplies, demands, costs) {
            Status::Success => self.minimize(),
            early => early,
        }
    }

    /// total cost of the last flow over the real arcs
    pub fn objective(&self) -> Distance {
        (0..self.arcs).map(|a| self.flow[a] * self.cost[a]).sum()
    }

    /// mass moved from supply i to demand j in the last solve
    pub fn flow(&self, i: usize, j: usize) -> Weight {
        self.flow[i * self.n1 + j]
    }

    /// the full row-major flow matrix of the last solve
    pub fn flows(&self) -> &[Weight] {
        &self.flow[..self.arcs]
    }

    /// pivots performed by the last solve
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Rebuild the problem arrays and the initial spanning tree where
    /// every node hangs off the artificial root. Detects trivially empty
    /// and unbalanced inputs before any pivoting happens.
    fn reset(&mut self, supplies: &[Weight], demands: &[Weight], costs: &[Distance]) -> Status {
        self.n0 = supplies.len();
        self.n1 = demands.len();
        self.nodes = self.n0 + self.n1;
        self.arcs = self.n0 * self.n1;
        self.root = self.nodes;
        self.cost.clear();
        self.cost.extend_from_slice(costs);
        self.flow.clear();
        self.flow.resize(self.arcs, 0.);
        self.state.clear();
        self.state.resize(self.arcs, LOWER);
        let scale = supplies
            .iter()
            .chain(demands)
            .chain(costs)
            .fold(0., |max: f64, x| max.max(x.abs()));
        self.eps_large = f64::EPSILON * self.factor_large * scale;
        self.eps_small = f64::EPSILON * self.factor_small * scale;
        let lhs = supplies.iter().sum::<Weight>();
        let rhs = demands.iter().sum::<Weight>();
        if lhs.abs() <= self.eps_large && rhs.abs() <= self.eps_large {
            return Status::Empty;
        }
        if (lhs - rhs).abs() > self.eps_large {
            return Status::SupplyMismatch;
        }
        self.supply.clear();
        self.supply.extend_from_slice(supplies);
        self.supply.extend(demands.iter().map(|d| -d));
        self.supply.push(rhs - lhs);
        self.source.clear();
        self.target.clear();
        for a in 0..self.arcs {
            self.source.push(a / self.n1);
            self.target.push(self.n0 + a % self.n1);
        }
        self.pi.clear();
        self.pi.resize(self.nodes + 1, 0.);
        self.parent.clear();
        self.parent.resize(self.nodes + 1, NONE);
        self.pred.clear();
        self.pred.resize(self.nodes + 1, NONE);
        self.forward.clear();
        self.forward.resize(self.nodes + 1, false);
        self.thread.clear();
        self.thread.resize(self.nodes + 1, 0);
        self.rev.clear();
        self.rev.resize(self.nodes + 1, 0);
        self.succ.clear();
        self.succ.resize(self.nodes + 1, 0);
        self.last.clear();
        self.last.resize(self.nodes + 1, 0);
        // artificial cost dwarfing any real path
        let art = (costs.iter().fold(0., |max: f64, c| max.max(c.abs())) + 1.)
            * (self.nodes + 1) as Distance;
        self.parent[self.root] = NONE;
        self.pred[self.root] = NONE;
        self.thread[self.root] = 0;
        self.rev[0] = self.root;
        self.succ[self.root] = self.nodes + 1;
        self.last[self.root] = self.root - 1;
        self.pi[self.root] = 0.;
        for u in 0..self.nodes {
            self.parent[u] = self.root;
            self.pred[u] = self.arcs + u;
            self.thread[u] = u + 1;
            self.rev[u + 1] = u;
            self.succ[u] = 1;
            self.last[u] = u;
            self.state.push(TREE);
            if self.supply[u] >= 0. {
                self.forward[u] = true;
                self.pi[u] = 0.;
                self.source.push(u);
                self.target.push(self.root);
                self.flow.push(self.supply[u]);
                self.cost.push(0.);
            } else {
                self.forward[u] = false;
                self.pi[u] = art;
                self.source.push(self.root);
                self.target.push(u);
                self.flow.push(-self.supply[u]);
                self.cost.push(art);
            }
        }
        self.block = ((BLOCK_FACTOR * (self.arcs as f64).sqrt()) as usize).max(MIN_BLOCK);
        self.next_arc = 0;
        Status::Success
    }

    /// Pivot until no arc prices in, then audit the artificial arcs:
    /// any residual flow through the root means the problem was not
    /// actually satisfiable at this tolerance.
    fn minimize(&mut self) -> Status {
        while self.price() {
            self.iterations += 1;
            if self.iterations > self.n_iter_max {
                return Status::MaxIterReached;
            }
            self.join();
            if !self.ratio() {
                return Status::Unbounded;
            }
            self.augment();
            self.rethread();
            self.relabel();
        }
        match self.flow[self.arcs..].iter().any(|f| f.abs() > self.eps_large) {
            true => Status::Infeasible,
            false => Status::Success,
        }
    }

    /// state-signed reduced cost; zero for tree arcs by construction
    fn reduced(&self, e: usize) -> Distance {
        self.state[e] as Distance * (self.cost[e] + self.pi[self.source[e]] - self.pi[self.target[e]])
    }

    /// Block-search pricing: resume where the last scan stopped, examine
    /// ~sqrt(arcs) candidates at a time, and enter the most negative
    /// reduced cost seen in the first block that has one. Artificial arcs
    /// are never priced back in.
    fn price(&mut self) -> bool {
        let mut min = 0.;
        let mut count = self.block;
        for e in self.next_arc..self.arcs {
            let c = self.reduced(e);
            if c < min {
                min = c;
                self.in_arc = e;
            }
            count -= 1;
            if count == 0 {
                if min < -self.eps_small {
                    self.next_arc = e;
                    return true;
                }
                count = self.block;
            }
        }
        for e in 0..self.next_arc {
            let c = self.reduced(e);
            if c < min {
                min = c;
                self.in_arc = e;
            }
            count -= 1;
            if count == 0 {
                if min < -self.eps_small {
                    self.next_arc = e;
                    return true;
                }
                count = self.block;
            }
        }
        min < -self.eps_small
    }

    /// apex of the pivot cycle: nearest common ancestor of the entering
    /// arc's endpoints, found by walking the smaller subtree upward
    fn join(&mut self) {
        let mut u = self.source[self.in_arc];
        let mut v = self.target[self.in_arc];
        while u != v {
            match self.succ[u] < self.succ[v] {
                true => u = self.parent[u],
                false => v = self.parent[v],
            }
        }
        self.apex = u;
    }

    /// Ratio test: walk both legs of the cycle up to the apex and find
    /// the tightest residual. Ties prefer the target-side leg, which
    /// keeps the basis strongly feasible and the pivoting finite.
    fn ratio(&mut self) -> bool {
        // entering arcs always come off their lower bound, so the cycle
        // pushes flow from the arc's source toward its target
        let first = self.source[self.in_arc];
        let second = self.target[self.in_arc];
        self.delta = Weight::INFINITY;
        let mut result = 0;
        let mut u = first;
        while u != self.apex {
            // on this leg only arcs pointing up the tree lose flow
            if self.forward[u] {
                let d = self.flow[self.pred[u]];
                if d < self.delta {
                    self.delta = d;
                    self.u_out = u;
                    result = 1;
                }
            }
            u = self.parent[u];
        }
        let mut u = second;
        while u != self.apex {
            // and on this one only arcs pointing down the tree do
            if !self.forward[u] {
                let d = self.flow[self.pred[u]];
                if d <= self.delta {
                    self.delta = d;
                    self.u_out = u;
                    result = 2;
                }
            }
            u = self.parent[u];
        }
        match result {
            1 => {
                self.u_in = first;
                self.v_in = second;
                true
            }
            2 => {
                self.u_in = second;
                self.v_in = first;
                true
            }
            _ => false,
        }
    }

    /// push delta around the cycle and flip the entering/leaving states
    fn augment(&mut self) {
        if self.delta > 0. {
            self.flow[self.in_arc] += self.delta;
            let mut u = self.source[self.in_arc];
            while u != self.apex {
                let e = self.pred[u];
                match self.forward[u] {
                    true => self.flow[e] -= self.delta,
                    false => self.flow[e] += self.delta,
                }
                u = self.parent[u];
            }
            let mut u = self.target[self.in_arc];
            while u != self.apex {
                let e = self.pred[u];
                match self.forward[u] {
                    true => self.flow[e] += self.delta,
                    false => self.flow[e] -= self.delta,
                }
                u = self.parent[u];
            }
        }
        self.state[self.in_arc] = TREE;
        self.state[self.pred[self.u_out]] = LOWER;
    }

    /// Splice the subtree hanging at u_out back under v_in and repair
    /// every tree array. The thread is a preorder traversal and rev its
    /// inverse; succ counts subtree sizes and last marks where each
    /// subtree's traversal ends. This is the part of the simplex that
    /// earns the O(sqrt) amortized pivot.
    fn rethread(&mut self) {
        let old_rev = self.rev[self.u_out];
        let old_succ = self.succ[self.u_out];
        let old_last = self.last[self.u_out];
        let v_out = self.parent[self.u_out];
        if self.u_in == self.u_out {
            // the subtree keeps its shape and only changes parents
            self.parent[self.u_in] = self.v_in;
            self.pred[self.u_in] = self.in_arc;
            self.forward[self.u_in] = self.u_in == self.source[self.in_arc];
            if self.thread[self.v_in] != self.u_out {
                // excise the subtree from the traversal, reinsert after v_in
                let after = self.thread[old_last];
                self.thread[old_rev] = after;
                self.rev[after] = old_rev;
                let before = self.thread[self.v_in];
                self.thread[self.v_in] = self.u_out;
                self.rev[self.u_out] = self.v_in;
                self.thread[old_last] = before;
                self.rev[before] = old_last;
            }
        } else {
            // where the traversal resumes once u_out's subtree is excised
            let resume = match old_rev == self.v_in {
                true => self.thread[old_last],
                false => self.thread[self.v_in],
            };
            // reverse the stem u_in..u_out, splicing each stem subtree
            // into the traversal as we climb
            let mut stem = self.u_in;
            let mut par = self.v_in;
            let mut last = self.last[self.u_in];
            let mut after = self.thread[last];
            self.thread[self.v_in] = self.u_in;
            self.dirty.clear();
            self.dirty.push(self.v_in);
            while stem != self.u_out {
                let next = self.parent[stem];
                self.thread[last] = next;
                self.dirty.push(last);
                let before = self.rev[stem];
                self.thread[before] = after;
                self.rev[after] = before;
                self.parent[stem] = par;
                par = stem;
                stem = next;
                last = match self.last[stem] == self.last[par] {
                    true => self.rev[par],
                    false => self.last[stem],
                };
                after = self.thread[last];
            }
            self.parent[self.u_out] = par;
            self.thread[last] = resume;
            self.rev[resume] = last;
            self.last[self.u_out] = last;
            if old_rev != self.v_in {
                self.thread[old_rev] = after;
                self.rev[after] = old_rev;
            }
            for i in 0..self.dirty.len() {
                let u = self.dirty[i];
                self.rev[self.thread[u]] = u;
            }
            // the reversed stem swaps the direction of every pred arc
            // and re-derives subtree sizes from the old ones
            let mut sc = 0;
            let ls = self.last[self.u_out];
            let mut u = self.u_out;
            let mut p = self.parent[u];
            while u != self.u_in {
                self.pred[u] = self.pred[p];
                self.forward[u] = !self.forward[p];
                sc += self.succ[u] - self.succ[p];
                self.succ[u] = sc;
                self.last[p] = ls;
                u = p;
                p = self.parent[u];
            }
            self.pred[self.u_in] = self.in_arc;
            self.forward[self.u_in] = self.u_in == self.source[self.in_arc];
            self.succ[self.u_in] = old_succ;
        }
        // propagate last and succ toward the apex on both sides. the
        // v_in side may reach past the apex when v_in closed its
        // ancestors' traversals, so that walk runs to the root.
        let limit = match self.last[self.apex] == self.v_in {
            true => self.apex,
            false => NONE,
        };
        let moved = self.last[self.u_out];
        let mut u = self.v_in;
        while u != NONE && self.last[u] == self.v_in {
            self.last[u] = moved;
            u = self.parent[u];
        }
        if self.apex != old_rev && self.v_in != old_rev {
            let mut u = v_out;
            while u != limit && self.last[u] == old_last {
                self.last[u] = old_rev;
                u = self.parent[u];
            }
        } else if moved != old_last {
            let mut u = v_out;
            while u != limit && self.last[u] == old_last {
                self.last[u] = moved;
                u = self.parent[u];
            }
        }
        let mut u = self.v_in;
        while u != self.apex {
            self.succ[u] += old_succ;
            u = self.parent[u];
        }
        let mut u = v_out;
        while u != self.apex {
            self.succ[u] -= old_succ;
            u = self.parent[u];
        }
    }

    /// shift potentials across the moved subtree so its pred arc prices
    /// to zero again; every other reduced cost is untouched
    fn relabel(&mut self) {
        let sigma = match self.forward[self.u_in] {
            true => self.pi[self.v_in] - self.pi[self.u_in] - self.cost[self.in_arc],
            false => self.pi[self.v_in] - self.pi[self.u_in] + self.cost[self.in_arc],
        };
        let end = self.thread[self.last[self.u_in]];
        let mut u = self.u_in;
        while u != end {
            self.pi[u] += sigma;
            u = self.thread[u];
        }
    }
}
