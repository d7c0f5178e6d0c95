use super::*;

#[test]
fn can_lay_out_single_depot_indices() {
    let manager = RoutingIndexManager::new_single_depot(4, 1, 0).unwrap();

    assert_eq!(manager.num_indices(), 5);
    assert_eq!(manager.size(), 4);
    assert_eq!(manager.num_visitable(), 3);
    assert_eq!(manager.start(0), 3);
    assert_eq!(manager.end(0), 4);
    assert!(manager.is_start(3));
    assert!(manager.is_end(4));
    assert!(!manager.is_end(3));

    // nodes 1..3 keep their own indices, the depot has none
    assert_eq!(manager.node_to_index(0), None);
    assert_eq!(manager.node_to_index(1), Some(0));
    assert_eq!(manager.node_to_index(3), Some(2));
    assert_eq!(manager.index_to_node(3), 0);
    assert_eq!(manager.index_to_node(4), 0);
}

#[test]
fn can_lay_out_multi_depot_indices() {
    let manager = RoutingIndexManager::new(6, 2, vec![0, 1], vec![1, 0]).unwrap();

    assert_eq!(manager.num_visitable(), 4);
    assert_eq!(manager.num_indices(), 8);
    assert_eq!(manager.size(), 6);
    assert_eq!(manager.terminal_vehicle(manager.start(1)), Some(1));
    assert_eq!(manager.terminal_vehicle(manager.end(0)), Some(0));
    assert_eq!(manager.terminal_vehicle(0), None);
    assert_eq!(manager.index_to_node(manager.start(1)), 1);
    assert_eq!(manager.index_to_node(manager.end(1)), 0);
}

#[test]
fn can_reject_invalid_configurations() {
    assert!(RoutingIndexManager::new_single_depot(4, 0, 0).is_err());
    assert!(RoutingIndexManager::new_single_depot(4, 1, 4).is_err());
    assert!(RoutingIndexManager::new(4, 2, vec![0], vec![0, 0]).is_err());
}
