//! A disjunctive scheduling propagator used to place vehicle breaks between
//! route visits.

#[cfg(test)]
#[path = "../../tests/unit/scheduling/disjunctive_test.rs"]
mod disjunctive_test;

use crate::models::common::{cap_add, Value, MAX_VALUE};

const NEG_INF: Value = -MAX_VALUE;

/// A set of tasks to schedule on one machine: the first `num_chain_tasks`
/// tasks form a precedence chain (route events in visit order), the remaining
/// tasks are free (vehicle breaks). Stored as parallel vectors.
#[derive(Clone, Debug, Default)]
pub struct Tasks {
    /// The amount of leading tasks forming a precedence chain.
    pub num_chain_tasks: usize,
    /// Earliest start of each task.
    pub start_min: Vec<Value>,
    /// Minimal duration of each task.
    pub duration_min: Vec<Value>,
    /// Latest end of each task.
    pub end_max: Vec<Value>,
    /// True for tasks which other tasks may interrupt (travel between visits).
    pub is_preemptible: Vec<bool>,
    /// Closed intervals of forbidden start values per task.
    pub forbidden_intervals: Vec<Vec<(Value, Value)>>,
}

impl Tasks {
    /// Appends a task and returns its position.
    pub fn push(&mut self, start_min: Value, duration_min: Value, end_max: Value, is_preemptible: bool) -> usize {
        self.start_min.push(start_min);
        self.duration_min.push(duration_min);
        self.end_max.push(end_max);
        self.is_preemptible.push(is_preemptible);
        self.forbidden_intervals.push(Vec::default());
        self.len() - 1
    }

    /// Returns the amount of tasks.
    pub fn len(&self) -> usize {
        self.start_min.len()
    }

    /// Returns true if there is no task.
    pub fn is_empty(&self) -> bool {
        self.start_min.is_empty()
    }
}

/// Filters start and end bounds of tasks sharing one machine. The filter is
/// not a fixpoint: callers decide how often to run it.
#[derive(Default)]
pub struct DisjunctivePropagator {
    tree: ThetaLambdaTree,
}

impl DisjunctivePropagator {
    /// Tightens `start_min` upwards and `end_max` downwards, running every
    /// subprocedure forward and once more on the time mirrored tasks.
    /// Returns false when the task set is infeasible.
    pub fn propagate(&mut self, tasks: &mut Tasks) -> bool {
        if !self.pass(tasks) {
            return false;
        }

        Self::mirror(tasks);
        let feasible = self.pass(tasks);
        Self::mirror(tasks);

        feasible
    }

    fn pass(&mut self, tasks: &mut Tasks) -> bool {
        self.precedences(tasks)
            && self.edge_finding(tasks)
            && self.detectable_precedences_with_chain(tasks)
            && self.forbidden_intervals(tasks)
    }

    /// Propagates bounds along the precedence chain.
    fn precedences(&self, tasks: &mut Tasks) -> bool {
        for index in 1..tasks.num_chain_tasks {
            let after_previous = cap_add(tasks.start_min[index - 1], tasks.duration_min[index - 1]);
            tasks.start_min[index] = tasks.start_min[index].max(after_previous);
        }

        for index in (0..tasks.num_chain_tasks.saturating_sub(1)).rev() {
            let before_next = tasks.end_max[index + 1].saturating_sub(tasks.duration_min[index + 1]);
            tasks.end_max[index] = tasks.end_max[index].min(before_next);
        }

        (0..tasks.len()).all(|index| cap_add(tasks.start_min[index], tasks.duration_min[index]) <= tasks.end_max[index])
    }

    /// Vilim's theta-lambda edge finding over all tasks: detects overloads and
    /// pushes tasks which provably run after a prefix set.
    fn edge_finding(&mut self, tasks: &mut Tasks) -> bool {
        let size = tasks.len();
        if size < 2 {
            return true;
        }

        let mut by_start = (0..size).collect::<Vec<_>>();
        by_start.sort_by_key(|&task| tasks.start_min[task]);
        let mut position = vec![0; size];
        by_start.iter().enumerate().for_each(|(leaf, &task)| position[task] = leaf);

        self.tree.reset(size);
        by_start
            .iter()
            .enumerate()
            .for_each(|(leaf, &task)| self.tree.place_theta(leaf, tasks.start_min[task], tasks.duration_min[task]));

        let mut by_end = (0..size).collect::<Vec<_>>();
        by_end.sort_by_key(|&task| std::cmp::Reverse(tasks.end_max[task]));

        let mut in_lambda = vec![false; size];
        let mut pushed = Vec::new();
        let mut current = by_end[0];
        for &next in by_end.iter().skip(1) {
            if self.tree.envelope() > tasks.end_max[current] {
                return false;
            }

            let leaf = position[current];
            self.tree.place_lambda(leaf, tasks.start_min[current], tasks.duration_min[current]);
            in_lambda[leaf] = true;
            current = next;

            while self.tree.envelope_opt() > tasks.end_max[current] {
                match self.tree.responsible() {
                    Some(leaf) if in_lambda[leaf] => {
                        // splittable tasks may interleave, only whole ones
                        // are provably pushed after the theta set
                        if !tasks.is_preemptible[by_start[leaf]] {
                            pushed.push((by_start[leaf], self.tree.envelope()));
                        }
                        self.tree.remove(leaf);
                        in_lambda[leaf] = false;
                    }
                    _ => break,
                }
            }
        }
        if self.tree.envelope() > tasks.end_max[current] {
            return false;
        }

        for (task, start_min) in pushed {
            tasks.start_min[task] = tasks.start_min[task].max(start_min);
            if cap_add(tasks.start_min[task], tasks.duration_min[task]) > tasks.end_max[task] {
                return false;
            }
        }

        true
    }

    /// For every chain task which provably cannot complete before the latest
    /// start of a free task, that free task must end first: accumulates the
    /// energy of all such free tasks and raises the chain start.
    fn detectable_precedences_with_chain(&self, tasks: &mut Tasks) -> bool {
        let mut free = (tasks.num_chain_tasks..tasks.len()).collect::<Vec<_>>();
        free.sort_by_key(|&task| tasks.start_min[task]);

        for chain_task in 0..tasks.num_chain_tasks {
            if tasks.is_preemptible[chain_task] {
                continue;
            }
            let earliest_completion = cap_add(tasks.start_min[chain_task], tasks.duration_min[chain_task]);

            let mut completion = NEG_INF;
            for &task in free.iter().filter(|&&task| {
                earliest_completion > tasks.end_max[task].saturating_sub(tasks.duration_min[task])
            }) {
                completion = cap_add(completion.max(tasks.start_min[task]), tasks.duration_min[task]);
            }

            tasks.start_min[chain_task] = tasks.start_min[chain_task].max(completion);
            if cap_add(tasks.start_min[chain_task], tasks.duration_min[chain_task]) > tasks.end_max[chain_task] {
                return false;
            }
        }

        true
    }

    /// Pushes starts of non preemptible tasks out of their forbidden intervals.
    fn forbidden_intervals(&self, tasks: &mut Tasks) -> bool {
        for task in 0..tasks.len() {
            if tasks.is_preemptible[task] || tasks.forbidden_intervals[task].is_empty() {
                continue;
            }

            loop {
                let start = tasks.start_min[task];
                match tasks.forbidden_intervals[task].iter().find(|&&(low, high)| start >= low && start <= high) {
                    Some(&(_, high)) => tasks.start_min[task] = cap_add(high, 1),
                    None => break,
                }
            }

            if cap_add(tasks.start_min[task], tasks.duration_min[task]) > tasks.end_max[task] {
                return false;
            }
        }

        true
    }

    /// Reflects all tasks through the time origin, reversing the chain, so a
    /// second forward pass filters the symmetric direction. An involution.
    fn mirror(tasks: &mut Tasks) {
        for task in 0..tasks.len() {
            let (start_min, end_max) = (tasks.start_min[task], tasks.end_max[task]);
            tasks.start_min[task] = -end_max;
            tasks.end_max[task] = -start_min;

            let duration = tasks.duration_min[task];
            tasks.forbidden_intervals[task].iter_mut().for_each(|interval| {
                *interval = (-(interval.1 + duration), -(interval.0 + duration));
            });
            tasks.forbidden_intervals[task].reverse();
        }

        let chain = tasks.num_chain_tasks;
        tasks.start_min[..chain].reverse();
        tasks.duration_min[..chain].reverse();
        tasks.end_max[..chain].reverse();
        tasks.is_preemptible[..chain].reverse();
        tasks.forbidden_intervals[..chain].reverse();
    }
}

/// A theta-lambda tree over tasks ordered by earliest start: maintains the
/// energy envelope of the theta set and the best envelope obtainable by
/// adding one lambda (gray) task.
#[derive(Default)]
struct ThetaLambdaTree {
    leaves: usize,
    duration: Vec<Value>,
    envelope: Vec<Value>,
    duration_opt: Vec<Value>,
    envelope_opt: Vec<Value>,
}

impl ThetaLambdaTree {
    fn reset(&mut self, size: usize) {
        self.leaves = size.next_power_of_two();
        let nodes = 2 * self.leaves;
        self.duration = vec![0; nodes];
        self.envelope = vec![NEG_INF; nodes];
        self.duration_opt = vec![0; nodes];
        self.envelope_opt = vec![NEG_INF; nodes];
    }

    fn place_theta(&mut self, leaf: usize, start_min: Value, duration: Value) {
        let node = self.leaves + leaf;
        self.duration[node] = duration;
        self.envelope[node] = cap_add(start_min, duration);
        self.duration_opt[node] = duration;
        self.envelope_opt[node] = self.envelope[node];
        self.update(node);
    }

    fn place_lambda(&mut self, leaf: usize, start_min: Value, duration: Value) {
        let node = self.leaves + leaf;
        self.duration[node] = 0;
        self.envelope[node] = NEG_INF;
        self.duration_opt[node] = duration;
        self.envelope_opt[node] = cap_add(start_min, duration);
        self.update(node);
    }

    fn remove(&mut self, leaf: usize) {
        let node = self.leaves + leaf;
        self.duration[node] = 0;
        self.envelope[node] = NEG_INF;
        self.duration_opt[node] = 0;
        self.envelope_opt[node] = NEG_INF;
        self.update(node);
    }

    fn envelope(&self) -> Value {
        self.envelope[1]
    }

    fn envelope_opt(&self) -> Value {
        self.envelope_opt[1]
    }

    /// Returns the leaf of the gray task responsible for the optional
    /// envelope, if any gray task contributes to it.
    fn responsible(&self) -> Option<usize> {
        if self.envelope_opt[1] <= self.envelope[1] {
            return None;
        }

        let mut node = 1;
        while node < self.leaves {
            let (left, right) = (2 * node, 2 * node + 1);
            node = if self.envelope_opt[node] == self.envelope_opt[right] {
                right
            } else if self.envelope_opt[node] == cap_add(self.envelope_opt[left], self.duration[right]) {
                left
            } else {
                // The envelope comes through theta on the left and the gray
                // duration on the right: switch to duration responsibility.
                let mut gray = right;
                while gray < self.leaves {
                    let (gray_left, gray_right) = (2 * gray, 2 * gray + 1);
                    gray = if self.duration_opt[gray] == cap_add(self.duration_opt[gray_left], self.duration[gray_right])
                    {
                        gray_left
                    } else {
                        gray_right
                    };
                }
                return Some(gray - self.leaves);
            };
        }

        Some(node - self.leaves)
    }

    fn update(&mut self, mut node: usize) {
        node /= 2;
        while node >= 1 {
            let (left, right) = (2 * node, 2 * node + 1);

            self.duration[node] = cap_add(self.duration[left], self.duration[right]);
            self.envelope[node] = self.envelope[right].max(cap_add(self.envelope[left], self.duration[right]));
            self.duration_opt[node] = cap_add(self.duration_opt[left], self.duration[right])
                .max(cap_add(self.duration[left], self.duration_opt[right]));
            self.envelope_opt[node] = self.envelope_opt[right]
                .max(cap_add(self.envelope_opt[left], self.duration[right]))
                .max(cap_add(self.envelope[left], self.duration_opt[right]));

            node /= 2;
        }
    }
}
