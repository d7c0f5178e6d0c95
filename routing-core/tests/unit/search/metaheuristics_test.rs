use super::*;
use crate::helpers::create_cvrp_model;
use rand::SeedableRng;

fn policy(kind: Metaheuristic) -> (crate::model::RoutingModel, MetaheuristicPolicy, StdRng) {
    let mut model = create_cvrp_model();
    model.close_model().unwrap();

    let parameters = SearchParameters { metaheuristic: kind, ..SearchParameters::default() };
    let policy = MetaheuristicPolicy::new(&parameters, &model);
    (model, policy, StdRng::seed_from_u64(1))
}

#[test]
fn can_descend_greedily() {
    let (model, mut policy, mut rng) = policy(Metaheuristic::GreedyDescent);
    let plan = vec![vec![0, 1], vec![2, 3]];

    assert!(policy.accept(&model, &plan, 10, 20, 20, &mut rng));
    assert!(!policy.accept(&model, &plan, 20, 20, 10, &mut rng));
    assert!(!policy.escape_local_minimum(&model, &plan, 20));
}

#[test]
fn can_penalize_arcs_in_guided_local_search() {
    let (model, mut policy, mut rng) = policy(Metaheuristic::GuidedLocalSearch);
    let plan = vec![vec![0, 1], vec![2, 3]];

    // the search continues after a local minimum and the penalized plan now
    // looks worse than its raw cost
    assert!(policy.escape_local_minimum(&model, &plan, 20));
    assert!(!policy.accept(&model, &plan, 20, 20, 10, &mut rng));

    // a new global best is always taken
    assert!(policy.accept(&model, &plan, 5, 20, 10, &mut rng));
}

#[test]
fn can_escape_with_simulated_annealing() {
    let (model, mut policy, mut rng) = policy(Metaheuristic::SimulatedAnnealing);
    let plan = vec![vec![0, 1], vec![2, 3]];

    assert!(policy.accept(&model, &plan, 10, 20, 20, &mut rng));

    // worsening moves are sometimes accepted while the temperature is high
    let accepted = (0..100).filter(|_| policy.accept(&model, &plan, 21, 20, 10, &mut rng)).count();
    assert!(accepted > 0);

    // the search freezes eventually
    let mut alive = true;
    for _ in 0..1000 {
        alive = policy.escape_local_minimum(&model, &plan, 20);
        if !alive {
            break;
        }
    }
    assert!(!alive);
}

#[test]
fn can_refuse_recently_visited_solutions_in_tabu_search() {
    let (model, mut policy, mut rng) = policy(Metaheuristic::TabuSearch);
    let plan = vec![vec![0, 1], vec![2, 3]];

    // accepting a plan makes it tabu for a while
    assert!(policy.accept(&model, &plan, 10, 20, 20, &mut rng));
    assert!(!policy.accept(&model, &plan, 15, 10, 5, &mut rng));

    // after a stall, a different worsening plan is taken
    let other = vec![vec![1, 0], vec![2, 3]];
    assert!(!policy.accept(&model, &other, 15, 10, 5, &mut rng));
    assert!(policy.escape_local_minimum(&model, &plan, 10));
    assert!(policy.accept(&model, &other, 15, 10, 5, &mut rng));
}

#[test]
fn can_refuse_recent_objective_values() {
    let (model, mut policy, mut rng) = policy(Metaheuristic::ObjectiveTabu);
    let plan = vec![vec![0, 1], vec![2, 3]];

    assert!(policy.accept(&model, &plan, 10, 20, 20, &mut rng));
    assert!(policy.escape_local_minimum(&model, &plan, 10));
    // the objective 10 is tabu, 11 is not
    assert!(!policy.accept(&model, &plan, 10, 12, 5, &mut rng));
    assert!(policy.accept(&model, &plan, 11, 10, 5, &mut rng));
}
