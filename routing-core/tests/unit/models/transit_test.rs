use super::*;

#[test]
fn can_register_and_memoize_callbacks() {
    let mut registry = TransitCallbackRegistry::default();

    let first = registry.register_transit_callback(Arc::new(|from, to| (from * 10 + to) as Value));
    let second = registry.register_unary_transit_callback(Arc::new(|from| from as Value));
    assert_eq!((first, second), (0, 1));

    assert_eq!(registry.transit(first, 2, 3), 23);
    assert_eq!(registry.transit(second, 2, 3), 2);
    assert!(registry.unary_transit_or_none(first).is_none());
    assert!(registry.unary_transit_or_none(second).is_some());

    registry.close(4);
    assert_eq!(registry.transit(first, 2, 3), 23);
    assert_eq!(registry.transit(second, 3, 0), 3);
}

#[test]
fn can_cache_state_dependent_callbacks() {
    let mut registry = TransitCallbackRegistry::default();
    let callback = registry.register_state_dependent_transit_callback(Arc::new(|from, to| {
        make_state_dependent_transit(move |x| x / 2 + (from + to) as Value, 0, 100)
    }));

    let transit = registry.state_dependent_transit(callback, 1, 2);
    assert_eq!(transit.transit.value(10), 8);
    assert_eq!(transit.transit_plus_identity.value(10), 18);

    // a second query is served from the cache
    let again = registry.state_dependent_transit(callback, 1, 2);
    assert_eq!(again.transit.value(10), 8);
}

#[test]
fn can_query_range_extrema() {
    let function = RangeIntToIntFunction::new(|x| (x - 5) * (x - 5), 0, 10);

    assert_eq!(function.value(5), 0);
    assert_eq!(function.value(0), 25);
    assert_eq!(function.value(-3), 25);
    assert_eq!(function.value(42), 25);

    assert_eq!(function.range_min(0, 10), 0);
    assert_eq!(function.range_min(6, 8), 1);
    assert_eq!(function.range_max(0, 10), 25);
    assert_eq!(function.range_max(4, 6), 1);
    assert_eq!(function.range_max(7, 7), 4);
}
