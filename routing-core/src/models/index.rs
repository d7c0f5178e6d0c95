//! Provides a bijection between problem nodes and variable indices.

#[cfg(test)]
#[path = "../../tests/unit/models/index_test.rs"]
mod index_test;

use hashbrown::HashSet;
use rosomaxa::prelude::{GenericError, GenericResult};

/// Manages the mapping between problem nodes and the variable indices used by
/// the routing model.
///
/// Nodes used as vehicle terminals are duplicated per vehicle, so the index
/// universe has `visitable + 2 * vehicles` entries laid out as
/// `[visitable nodes][vehicle starts][vehicle ends]`. Indices at or above
/// [`RoutingIndexManager::size`] are vehicle ends and carry no successor
/// variable.
#[derive(Clone, Debug)]
pub struct RoutingIndexManager {
    num_nodes: usize,
    num_vehicles: usize,
    starts: Vec<usize>,
    ends: Vec<usize>,
    index_to_node: Vec<usize>,
    node_to_index: Vec<Option<usize>>,
    num_visitable: usize,
}

impl RoutingIndexManager {
    /// Creates a manager for a fleet sharing a single depot node.
    pub fn new_single_depot(num_nodes: usize, num_vehicles: usize, depot: usize) -> GenericResult<Self> {
        Self::new(num_nodes, num_vehicles, vec![depot; num_vehicles], vec![depot; num_vehicles])
    }

    /// Creates a manager with per-vehicle start and end nodes.
    pub fn new(num_nodes: usize, num_vehicles: usize, starts: Vec<usize>, ends: Vec<usize>) -> GenericResult<Self> {
        if num_vehicles == 0 {
            return Err("cannot create index manager without vehicles".into());
        }

        if starts.len() != num_vehicles || ends.len() != num_vehicles {
            return Err(format!(
                "expected {} start and end nodes, got {} and {}",
                num_vehicles,
                starts.len(),
                ends.len()
            )
            .into());
        }

        if let Some(node) = starts.iter().chain(ends.iter()).find(|&&node| node >= num_nodes) {
            return Err(GenericError::from(format!("terminal node {node} is out of bounds: [0, {num_nodes})")));
        }

        let terminals = starts.iter().chain(ends.iter()).copied().collect::<HashSet<_>>();

        let mut index_to_node = Vec::with_capacity(num_nodes - terminals.len() + 2 * num_vehicles);
        let mut node_to_index = vec![None; num_nodes];

        (0..num_nodes).filter(|node| !terminals.contains(node)).for_each(|node| {
            node_to_index[node] = Some(index_to_node.len());
            index_to_node.push(node);
        });
        let num_visitable = index_to_node.len();

        index_to_node.extend(starts.iter().copied());
        index_to_node.extend(ends.iter().copied());

        Ok(Self { num_nodes, num_vehicles, starts, ends, index_to_node, node_to_index, num_visitable })
    }

    /// Returns the total amount of variable indices.
    pub fn num_indices(&self) -> usize {
        self.num_visitable + 2 * self.num_vehicles
    }

    /// Returns the amount of indices which own a successor variable. Vehicle
    /// end indices are the `num_vehicles` indices above this value.
    pub fn size(&self) -> usize {
        self.num_visitable + self.num_vehicles
    }

    /// Returns the amount of problem nodes.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Returns the amount of vehicles.
    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    /// Returns the amount of indices which are not vehicle terminals.
    pub fn num_visitable(&self) -> usize {
        self.num_visitable
    }

    /// Returns the start index of the given vehicle.
    pub fn start(&self, vehicle: usize) -> usize {
        debug_assert!(vehicle < self.num_vehicles);
        self.num_visitable + vehicle
    }

    /// Returns the end index of the given vehicle.
    pub fn end(&self, vehicle: usize) -> usize {
        debug_assert!(vehicle < self.num_vehicles);
        self.num_visitable + self.num_vehicles + vehicle
    }

    /// Returns true if the index is a vehicle start.
    pub fn is_start(&self, index: usize) -> bool {
        index >= self.num_visitable && index < self.size()
    }

    /// Returns true if the index is a vehicle end.
    pub fn is_end(&self, index: usize) -> bool {
        index >= self.size()
    }

    /// Returns the vehicle owning the given terminal index, or `None` for a
    /// visitable index.
    pub fn terminal_vehicle(&self, index: usize) -> Option<usize> {
        if self.is_start(index) {
            Some(index - self.num_visitable)
        } else if self.is_end(index) {
            Some(index - self.size())
        } else {
            None
        }
    }

    /// Returns the problem node behind the given index.
    pub fn index_to_node(&self, index: usize) -> usize {
        self.index_to_node[index]
    }

    /// Returns the variable index of the given node, or `None` when the node
    /// is used as a vehicle terminal and hence has no unique index.
    pub fn node_to_index(&self, node: usize) -> Option<usize> {
        self.node_to_index.get(node).copied().flatten()
    }

    /// Returns start nodes of all vehicles.
    pub fn vehicle_starts(&self) -> &[usize] {
        &self.starts
    }

    /// Returns end nodes of all vehicles.
    pub fn vehicle_ends(&self) -> &[usize] {
        &self.ends
    }
}
