use crucible_di::{DiError, ParameterDescriptor, TargetCollection, TypeGraph};

mod common;
use common::make;

#[test]
fn test_mutual_constructor_cycle_reports_full_path() {
    struct A;
    struct B;

    let mut graph = TypeGraph::new();
    let a = graph.define("A", 0);
    let b = graph.define("B", 0);
    graph
        .describe(&a)
        .constructor(
            vec![ParameterDescriptor::required("b", b.plain())],
            make(|_| Ok(A)),
        )
        .finish();
    graph
        .describe(&b)
        .constructor(
            vec![ParameterDescriptor::required("a", a.plain())],
            make(|_| Ok(B)),
        )
        .finish();

    let mut targets = TargetCollection::new(graph);
    targets.register_type(a.plain());
    targets.register_type(b.plain());
    let container = targets.build().unwrap();

    match container.resolve(&a.plain(), None) {
        Err(DiError::Circular(path)) => {
            assert_eq!(path, vec!["A", "B", "A"]);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("cycle resolved"),
    }
}

#[test]
fn test_self_cycle_detected() {
    struct Selfish;

    let mut graph = TypeGraph::new();
    let selfish = graph.define("Selfish", 0);
    graph
        .describe(&selfish)
        .constructor(
            vec![ParameterDescriptor::required("me", selfish.plain())],
            make(|_| Ok(Selfish)),
        )
        .finish();

    let mut targets = TargetCollection::new(graph);
    targets.register_type(selfish.plain());
    let container = targets.build().unwrap();

    assert!(matches!(
        container.resolve(&selfish.plain(), None),
        Err(DiError::Circular(_))
    ));
}

#[test]
fn test_failed_compilation_leaves_container_usable() {
    struct A;
    struct Free;

    let mut graph = TypeGraph::new();
    let a = graph.define("A", 0);
    graph
        .describe(&a)
        .constructor(
            vec![ParameterDescriptor::required("a", a.plain())],
            make(|_| Ok(A)),
        )
        .finish();
    let free = graph.define("Free", 0);
    graph
        .describe(&free)
        .constructor(Vec::new(), make(|_| Ok(Free)))
        .finish();

    let mut targets = TargetCollection::new(graph);
    targets.register_type(a.plain());
    targets.register_type(free.plain());
    let container = targets.build().unwrap();

    assert!(container.resolve(&a.plain(), None).is_err());
    // The cycle stack unwound; unrelated requests still compile.
    assert!(container.resolve(&free.plain(), None).is_ok());
    // And the failing request reports the same error again.
    assert!(matches!(
        container.resolve(&a.plain(), None),
        Err(DiError::Circular(_))
    ));
}

#[test]
fn test_generic_closing_over_other_arguments_is_not_a_cycle() {
    // Wrap<T> : IWrap<T>, and Wrap<Int> needs IWrap<Text>. The same open
    // target appears twice on the compile path with different closed types,
    // which is legitimate recursion, not a cycle.
    struct Wrap;
    struct Leaf;

    let mut graph = TypeGraph::new();
    let int = graph.define("Int", 0);
    let text = graph.define("Text", 0);
    let iwrap = graph.define("IWrap", 1);
    let wrap = graph.define("Wrap", 1);
    graph
        .describe(&wrap)
        .implements(iwrap.close(vec![crucible_di::TypeRef::Param(0)]))
        .constructor(Vec::new(), make(|_| Ok(Wrap)))
        .finish();
    let consumer = graph.define("Consumer", 0);
    graph
        .describe(&consumer)
        .constructor(
            vec![
                ParameterDescriptor::required("a", iwrap.close(vec![int.plain()])),
                ParameterDescriptor::required("b", iwrap.close(vec![text.plain()])),
            ],
            make(|_| Ok(Leaf)),
        )
        .finish();

    let mut targets = TargetCollection::new(graph);
    targets.register_impl(iwrap.open(), wrap.open());
    targets.register_type(consumer.plain());
    let container = targets.build().unwrap();

    assert!(container.resolve(&consumer.plain(), None).is_ok());
}
