//! A first solution heuristic sharding a Christofides tour over the fleet.

#[cfg(test)]
#[path = "../../tests/unit/construction/christofides_test.rs"]
mod christofides_test;

use super::{insert_leftovers, FilteredHeuristic};
use crate::filters::LocalSearchFilter;
use crate::model::RoutingModel;
use crate::models::assignment::Assignment;
use crate::models::common::{cap_add, Cost};
use hashbrown::HashSet;

/// Computes a Christofides style tour over the node set (minimum spanning
/// tree, matching of odd degree nodes, Eulerian shortcut) and fills each
/// route from the tour as far as the filters permit before spilling to the
/// next vehicle.
#[derive(Default)]
pub struct ChristofidesBuilder {}

impl ChristofidesBuilder {
    /// Builds a first solution, or returns `None` when the filters block it.
    pub fn build(&self, model: &RoutingModel, filters: &mut [Box<dyn LocalSearchFilter>]) -> Option<Assignment> {
        let mut heuristic = FilteredHeuristic::new(model, filters)?;

        let nodes = (0..model.size())
            .filter(|&index| !model.is_start(index) && !heuristic.is_bound(index))
            .collect::<Vec<_>>();
        let tour = christofides_tour(model, &nodes);

        let mut vehicle = 0;
        for &index in &tour {
            while vehicle < model.num_vehicles() {
                let tail = heuristic.route_tail(vehicle);
                heuristic.append_visit(vehicle, tail, index);
                if heuristic.commit() {
                    break;
                }

                // the route is full: close it and spill to the next vehicle
                heuristic.close_route(vehicle, heuristic.route_tail(vehicle));
                if !heuristic.commit() {
                    return None;
                }
                vehicle += 1;
            }
            if vehicle == model.num_vehicles() {
                break;
            }
        }

        insert_leftovers(model, &mut heuristic);
        heuristic.finalize()
    }
}

/// Returns nodes ordered along a shortcut Eulerian walk of the minimum
/// spanning tree augmented by a greedy matching of its odd degree nodes.
fn christofides_tour(model: &RoutingModel, nodes: &[usize]) -> Vec<usize> {
    if nodes.len() < 2 {
        return nodes.to_vec();
    }

    let weight = |from: usize, to: usize| -> Cost {
        cap_add(model.arc_cost_for_first_solution(from, to), model.arc_cost_for_first_solution(to, from))
    };

    // Prim's minimum spanning tree
    let mut in_tree = vec![false; nodes.len()];
    let mut parent = vec![0usize; nodes.len()];
    let mut distance = vec![Cost::MAX; nodes.len()];
    in_tree[0] = true;
    for (position, &node) in nodes.iter().enumerate().skip(1) {
        distance[position] = weight(nodes[0], node);
    }

    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(nodes.len() - 1);
    for _ in 1..nodes.len() {
        let best = (0..nodes.len())
            .filter(|&position| !in_tree[position])
            .min_by_key(|&position| (distance[position], position))
            .unwrap();

        in_tree[best] = true;
        edges.push((parent[best], best));

        for position in 0..nodes.len() {
            if !in_tree[position] {
                let candidate = weight(nodes[best], nodes[position]);
                if candidate < distance[position] {
                    distance[position] = candidate;
                    parent[position] = best;
                }
            }
        }
    }

    // greedy minimal matching of odd degree nodes
    let mut degree = vec![0usize; nodes.len()];
    edges.iter().for_each(|&(a, b)| {
        degree[a] += 1;
        degree[b] += 1;
    });
    let mut odd = (0..nodes.len()).filter(|&position| degree[position] % 2 == 1).collect::<Vec<_>>();

    while !odd.is_empty() {
        let anchor = odd[0];
        let mate = odd[1..]
            .iter()
            .copied()
            .min_by_key(|&candidate| (weight(nodes[anchor], nodes[candidate]), candidate))
            .unwrap();

        edges.push((anchor, mate));
        odd.retain(|&position| position != anchor && position != mate);
    }

    // Hierholzer walk over the multigraph, then shortcut repeats
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::default(); nodes.len()];
    for (edge, &(a, b)) in edges.iter().enumerate() {
        adjacency[a].push(edge);
        adjacency[b].push(edge);
    }

    let mut used_edges = vec![false; edges.len()];
    let mut stack = vec![0usize];
    let mut walk = Vec::with_capacity(edges.len() + 1);
    while let Some(&position) = stack.last() {
        match adjacency[position].iter().find(|&&edge| !used_edges[edge]).copied() {
            Some(edge) => {
                used_edges[edge] = true;
                let (a, b) = edges[edge];
                stack.push(if a == position { b } else { a });
            }
            None => {
                walk.push(position);
                stack.pop();
            }
        }
    }

    let mut seen: HashSet<usize> = HashSet::default();
    walk.into_iter().filter(|&position| seen.insert(position)).map(|position| nodes[position]).collect()
}
