//! Given a fixed visit order of one vehicle, finds cumul values minimizing
//! all cumul dependent costs. The per route program has chain difference
//! constraints and separable piecewise linear objectives only, so it is
//! solved exactly over integers with a min-plus piecewise linear chain
//! recursion instead of a floating point simplex. Curves are not assumed
//! convex: nondecreasing piecewise costs may flatten out.

#[cfg(test)]
#[path = "../../tests/unit/lp/cumul_test.rs"]
mod cumul_test;

use crate::models::common::{cap_add, cap_mul, Cost, Value, ValueRange};
use crate::models::piecewise::PiecewiseLinearFunction;

/// A cost term attached to one cumul of a route.
#[derive(Clone, Debug)]
pub enum CumulCostTerm {
    /// Cost `coefficient * max(0, cumul - bound)`.
    SoftUpperBound {
        /// A bound after which the cost applies.
        bound: Value,
        /// A cost per unit of excess.
        coefficient: Cost,
    },
    /// Cost `coefficient * max(0, bound - cumul)`.
    SoftLowerBound {
        /// A bound before which the cost applies.
        bound: Value,
        /// A cost per unit of shortfall.
        coefficient: Cost,
    },
    /// An arbitrary nondecreasing piecewise linear cost of the cumul.
    Piecewise(PiecewiseLinearFunction),
}

/// Describes the cumul program of one route: one entry per visited index, in
/// visit order, with the transit and slack bound of each traversed arc.
#[derive(Clone, Debug, Default)]
pub struct RouteCumulProblem {
    /// Cumul windows per route position.
    pub windows: Vec<ValueRange>,
    /// Fixed transits between consecutive positions (one less than windows).
    pub transits: Vec<Value>,
    /// Slack upper bounds between consecutive positions.
    pub slack_maxes: Vec<Value>,
    /// Cost terms per route position.
    pub cost_terms: Vec<Vec<CumulCostTerm>>,
    /// A span cost applied to `cumul(end) - cumul(start)`.
    pub span_cost_coefficient: Cost,
}

/// Optimal cumul values of one route together with their cumul dependent cost.
#[derive(Clone, Debug)]
pub struct CumulSchedule {
    /// A cumul value per route position.
    pub cumuls: Vec<Value>,
    /// The minimal total of all cumul dependent costs.
    pub cost: Cost,
}

/// Minimizes cumul dependent costs per route. Keeps one reusable stage buffer
/// per vehicle so repeated optimizations amortize their allocations.
pub struct CumulOptimizer {
    stages: Vec<Vec<CostCurve>>,
}

impl CumulOptimizer {
    /// Creates an optimizer for the given fleet size.
    pub fn new(num_vehicles: usize) -> Self {
        Self { stages: (0..num_vehicles).map(|_| Vec::default()).collect() }
    }

    /// Returns optimal cumuls for the route of the given vehicle, or `None`
    /// when the cumul program is infeasible.
    pub fn optimize_route(&mut self, vehicle: usize, problem: &RouteCumulProblem) -> Option<CumulSchedule> {
        let size = problem.windows.len();
        if size == 0 {
            return Some(CumulSchedule { cumuls: Vec::default(), cost: 0 });
        }
        debug_assert!(problem.transits.len() + 1 == size && problem.slack_maxes.len() + 1 == size);

        let stages = &mut self.stages[vehicle];
        stages.clear();

        let mut curve = CostCurve::flat(problem.windows[0]);
        Self::apply_costs(&mut curve, problem, 0, size);
        if curve.is_invalid() {
            return None;
        }
        stages.push(curve.clone());

        for position in 1..size {
            curve = curve.relax(problem.transits[position - 1], problem.slack_maxes[position - 1]);
            curve = curve.restrict(problem.windows[position])?;
            Self::apply_costs(&mut curve, problem, position, size);
            stages.push(curve.clone());
        }

        let (mut next_cumul, cost) = curve.min_point();
        let mut cumuls = vec![0; size];
        cumuls[size - 1] = next_cumul;

        for position in (0..size - 1).rev() {
            let high = cap_add(next_cumul, -problem.transits[position]);
            let low = cap_add(high, -problem.slack_maxes[position]);
            let (argmin, _) = stages[position].min_in_window(low, high);

            next_cumul = argmin;
            cumuls[position] = next_cumul;
        }

        Some(CumulSchedule { cumuls, cost })
    }

    fn apply_costs(curve: &mut CostCurve, problem: &RouteCumulProblem, position: usize, size: usize) {
        for term in &problem.cost_terms[position] {
            match term {
                CumulCostTerm::SoftUpperBound { bound, coefficient } => curve.add_slope_after(*bound, *coefficient),
                CumulCostTerm::SoftLowerBound { bound, coefficient } => curve.add_slope_before(*bound, *coefficient),
                CumulCostTerm::Piecewise(function) => curve.add_piecewise(function),
            }
        }

        if problem.span_cost_coefficient != 0 {
            if position == 0 {
                curve.add_linear(-problem.span_cost_coefficient);
            }
            if position == size - 1 {
                curve.add_linear(problem.span_cost_coefficient);
            }
        }
    }
}

/// A piecewise linear curve on a closed integer domain, kept as the value at
/// the domain start plus segments of integral slopes. No shape is assumed:
/// slopes may rise and fall, so minima can sit anywhere.
#[derive(Clone, Debug)]
struct CostCurve {
    min_x: Value,
    max_x: Value,
    anchor: Cost,
    /// `(start, slope)` pairs; the first starts at `min_x`, each segment runs
    /// until the next start (the last one until `max_x`).
    segments: Vec<(Value, Cost)>,
}

impl CostCurve {
    fn flat(domain: ValueRange) -> Self {
        let segments = if domain.min < domain.max { vec![(domain.min, 0)] } else { Vec::default() };
        Self { min_x: domain.min, max_x: domain.max, anchor: 0, segments }
    }

    fn is_invalid(&self) -> bool {
        self.min_x > self.max_x
    }

    fn value_at(&self, x: Value) -> Cost {
        debug_assert!(x >= self.min_x && x <= self.max_x);
        let mut value = self.anchor;
        for (index, &(start, slope)) in self.segments.iter().enumerate() {
            if start >= x {
                break;
            }
            let until = self.segments.get(index + 1).map_or(self.max_x, |&(next, _)| next).min(x);
            value = cap_add(value, cap_mul(slope, until - start));
        }

        value
    }

    /// Ensures a segment boundary at the given inner point.
    fn split_at(&mut self, x: Value) {
        if x <= self.min_x || x >= self.max_x {
            return;
        }

        match self.segments.binary_search_by_key(&x, |&(start, _)| start) {
            Ok(_) => {}
            Err(position) => {
                let slope = self.segments[position - 1].1;
                self.segments.insert(position, (x, slope));
            }
        }
    }

    /// Adds `slope * max(0, x - from)`.
    fn add_slope_after(&mut self, from: Value, slope: Cost) {
        if slope == 0 || from >= self.max_x {
            return;
        }
        if from <= self.min_x {
            self.anchor = cap_add(self.anchor, cap_mul(slope, self.min_x - from));
            self.segments.iter_mut().for_each(|segment| segment.1 += slope);
            return;
        }

        self.split_at(from);
        self.segments.iter_mut().filter(|segment| segment.0 >= from).for_each(|segment| segment.1 += slope);
    }

    /// Adds `slope * max(0, to - x)`.
    fn add_slope_before(&mut self, to: Value, slope: Cost) {
        if slope == 0 || to <= self.min_x {
            return;
        }
        self.anchor = cap_add(self.anchor, cap_mul(slope, to - self.min_x));

        if to >= self.max_x {
            self.segments.iter_mut().for_each(|segment| segment.1 -= slope);
            return;
        }

        self.split_at(to);
        self.segments.iter_mut().filter(|segment| segment.0 < to).for_each(|segment| segment.1 -= slope);
    }

    /// Adds `slope * x` over the whole domain.
    fn add_linear(&mut self, slope: Cost) {
        self.anchor = cap_add(self.anchor, cap_mul(slope, self.min_x));
        self.segments.iter_mut().for_each(|segment| segment.1 += slope);
    }

    /// Adds a piecewise linear function, decomposed into the value at its
    /// first breakpoint plus slope increments (negative ones flatten the
    /// curve back out):
    /// `f(x) = f(x0) + sum of (slope_k - slope_k-1) * max(0, x - x_k)`.
    fn add_piecewise(&mut self, function: &PiecewiseLinearFunction) {
        self.anchor = cap_add(self.anchor, function.points()[0].1);

        let mut previous_slope = 0;
        for (index, &slope) in function.slopes().iter().enumerate() {
            self.add_slope_after(function.points()[index].0, slope - previous_slope);
            previous_slope = slope;
        }
    }

    /// Returns positions where the curve can change slope: the domain start,
    /// every inner segment start and the domain end, ascending.
    fn boundaries(&self) -> Vec<Value> {
        let mut positions = vec![self.min_x];
        positions.extend(self.segments.iter().map(|&(start, _)| start).filter(|&start| start > self.min_x));
        if self.max_x > self.min_x {
            positions.push(self.max_x);
        }
        positions
    }

    /// Returns the leftmost minimizer and the minimum value.
    fn min_point(&self) -> (Value, Cost) {
        self.min_in_window(self.min_x, self.max_x)
    }

    /// Returns the leftmost minimizer on `[low, high]` intersected with the
    /// domain, together with the minimum value. On every linear piece the
    /// minimum sits at an end, so scanning boundaries is exact.
    fn min_in_window(&self, low: Value, high: Value) -> (Value, Cost) {
        let low = low.clamp(self.min_x, self.max_x);
        let high = high.clamp(self.min_x, self.max_x).max(low);

        let mut best = (low, self.value_at(low));
        let inner = self.boundaries().into_iter().filter(|&x| x > low && x < high);
        for x in inner.chain(std::iter::once(high)) {
            let value = self.value_at(x);
            if value < best.1 {
                best = (x, value);
            }
        }

        best
    }

    /// Returns `m(x) = min f(y)` over `y` in `[x - transit - slack, x - transit]`
    /// intersected with the domain: the reachable cost of the next position.
    /// Exact for arbitrary piecewise linear curves: the window minimum is the
    /// lower envelope of the two clamped window ends and the boundaries the
    /// window slides across, sampled wherever the active piece can change.
    fn relax(&self, transit: Value, slack: Value) -> Self {
        let far = cap_add(transit, slack);
        let min_x = cap_add(self.min_x, transit);
        let max_x = cap_add(self.max_x, far);

        if self.min_x == self.max_x {
            let segments = if min_x < max_x { vec![(min_x, 0)] } else { Vec::default() };
            return Self { min_x, max_x, anchor: self.anchor, segments };
        }

        let boundaries = self.boundaries();
        let right_end = |x: Value| cap_add(x, -transit).clamp(self.min_x, self.max_x);
        let left_end = |x: Value| cap_add(x, -far).clamp(self.min_x, self.max_x);
        let window_min = |x: Value| -> Cost {
            let (left, right) = (left_end(x), right_end(x));
            let mut value = self.value_at(right).min(self.value_at(left));
            for &boundary in &boundaries {
                if boundary > left && boundary < right {
                    value = value.min(self.value_at(boundary));
                }
            }
            value
        };

        // the active piece can only change where a window end crosses a
        // boundary of the curve...
        let mut samples = vec![min_x, max_x];
        for &boundary in &boundaries {
            for shift in [transit, far] {
                let x = cap_add(boundary, shift);
                if x > min_x && x < max_x {
                    samples.push(x);
                }
            }
        }
        samples.sort_unstable();
        samples.dedup();

        // ...or where two contributors (both window ends and the inner
        // boundary plateau, each linear between samples) cross
        let mut points: Vec<(Value, Cost)> = Vec::with_capacity(2 * samples.len());
        for (position, &x1) in samples.iter().enumerate() {
            points.push((x1, window_min(x1)));

            let Some(&x2) = samples.get(position + 1) else { break };
            if x2 - x1 < 2 {
                continue;
            }

            let ends = |x: Value| (self.value_at(right_end(x)), self.value_at(left_end(x)));
            let (right1, left1) = ends(x1);
            let (right2, left2) = ends(x2);
            let plateau = {
                let (left, right) = (left_end(x1 + 1), right_end(x1 + 1));
                boundaries
                    .iter()
                    .filter(|&&boundary| boundary > left && boundary < right)
                    .map(|&boundary| self.value_at(boundary))
                    .min()
            };

            let mut contributors = vec![(right1, right2), (left1, left2)];
            if let Some(plateau) = plateau {
                contributors.push((plateau, plateau));
            }

            for (first, second) in crossing_pairs(&contributors) {
                if let Some(offset) = line_crossing(first, second, x2 - x1) {
                    for x in [x1 + offset, x1 + offset + 1] {
                        if x > x1 && x < x2 {
                            points.push((x, window_min(x)));
                        }
                    }
                }
            }
        }

        points.sort_unstable_by_key(|&(x, _)| x);
        points.dedup_by_key(|&mut (x, _)| x);

        let anchor = points[0].1;
        let mut segments = Vec::with_capacity(points.len());
        for pair in points.windows(2) {
            let ((x1, v1), (x2, v2)) = (pair[0], pair[1]);
            debug_assert!((v2 - v1) % (x2 - x1) == 0);
            segments.push((x1, (v2 - v1) / (x2 - x1)));
        }

        Self { min_x, max_x, anchor, segments }
    }

    /// Intersects the domain with a window, returning `None` when it empties.
    fn restrict(&self, window: ValueRange) -> Option<Self> {
        let min_x = self.min_x.max(window.min);
        let max_x = self.max_x.min(window.max);
        if min_x > max_x {
            return None;
        }

        let anchor = self.value_at(min_x);
        let mut segments = Vec::with_capacity(self.segments.len());
        for (index, &(start, slope)) in self.segments.iter().enumerate() {
            let until = self.segments.get(index + 1).map_or(self.max_x, |&(next, _)| next);
            if until <= min_x || start >= max_x {
                continue;
            }
            segments.push((start.max(min_x), slope));
        }

        Some(Self { min_x, max_x, anchor, segments })
    }
}

/// Enumerates unordered pairs of contributors by their span end values.
fn crossing_pairs(contributors: &[(Cost, Cost)]) -> Vec<((Cost, Cost), (Cost, Cost))> {
    let mut pairs = Vec::default();
    for (index, &first) in contributors.iter().enumerate() {
        for &second in &contributors[index + 1..] {
            pairs.push((first, second));
        }
    }

    pairs
}

/// Returns the floored offset where two lines cross, given their values at
/// both ends of a span of the given width, when the crossing lies strictly
/// inside the span.
fn line_crossing(first: (Cost, Cost), second: (Cost, Cost), width: Value) -> Option<Value> {
    // f(d) = f1 + (f2 - f1) * d / width and alike for g: they meet where
    // (g1 - f1) * width = ((f2 - f1) - (g2 - g1)) * d
    let numerator = (second.0 - first.0) as i128 * width as i128;
    let denominator = ((first.1 - first.0) - (second.1 - second.0)) as i128;
    if denominator == 0 {
        return None;
    }

    let offset = numerator.div_euclid(denominator);
    (offset > 0 && offset < width as i128).then(|| offset as Value)
}

