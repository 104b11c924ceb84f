use std::sync::Arc;

use crucible_di::{
    downcast, DiError, ParameterDescriptor, Target, TargetCollection, TypeGraph, TypeRef,
};

mod common;
use common::{make, value};

struct Int(i64);
struct Text(String);

/// `Box<T>` implementing `IBox<T>`, holding a resolved `T`.
struct Boxed {
    inner: crucible_di::Instance,
}

fn graph_with_box() -> (
    TypeGraph,
    crucible_di::TypeDef, // IBox
    crucible_di::TypeDef, // Box
    crucible_di::TypeDef, // Int
    crucible_di::TypeDef, // Text
) {
    let mut graph = TypeGraph::new();
    let int = graph.define("Int", 0);
    let text = graph.define("Text", 0);
    graph
        .describe(&int)
        .constructor(Vec::new(), value(|| Int(7)))
        .finish();
    graph
        .describe(&text)
        .constructor(Vec::new(), value(|| Text("t".to_string())))
        .finish();

    let ibox = graph.define("IBox", 1);
    let boxed = graph.define("Box", 1);
    graph
        .describe(&boxed)
        .implements(ibox.close(vec![TypeRef::Param(0)]))
        .constructor(
            vec![ParameterDescriptor::required("inner", TypeRef::Param(0))],
            make(|inv| {
                Ok(Boxed {
                    inner: inv.args[0].clone(),
                })
            }),
        )
        .finish();
    (graph, ibox, boxed, int, text)
}

#[test]
fn test_open_generic_closes_per_request() {
    let (graph, ibox, boxed, int, text) = graph_with_box();
    let mut targets = TargetCollection::new(graph);
    targets.register_type(int.plain());
    targets.register_type(text.plain());
    targets.register_impl(ibox.open(), boxed.open());
    let container = targets.build().unwrap();

    let for_int = container
        .resolve_as::<Boxed>(&ibox.close(vec![int.plain()]), None)
        .unwrap();
    assert_eq!(downcast::<Int>(&for_int.inner).unwrap().0, 7);

    let for_text = container
        .resolve_as::<Boxed>(&ibox.close(vec![text.plain()]), None)
        .unwrap();
    assert_eq!(downcast::<Text>(&for_text.inner).unwrap().0, "t");
}

#[test]
fn test_closed_registration_shadows_open_for_its_type() {
    let (graph, ibox, boxed, int, _) = graph_with_box();
    let mut targets = TargetCollection::new(graph);
    targets.register_type(int.plain());
    targets.register_impl(ibox.open(), boxed.open());
    // A closed registration for IBox<Int> specifically.
    let special = Arc::new(Boxed {
        inner: Arc::new(Int(99)),
    });
    targets.register_object(ibox.close(vec![int.plain()]), special.clone());
    let container = targets.build().unwrap();

    let resolved = container
        .resolve_as::<Boxed>(&ibox.close(vec![int.plain()]), None)
        .unwrap();
    assert!(Arc::ptr_eq(&resolved, &special));
}

#[test]
fn test_reordered_type_parameters_map_backward() {
    // Swapped<A, B> implements IPair<B, A>.
    struct Swapped;

    let mut graph = TypeGraph::new();
    let int = graph.define("Int", 0);
    let text = graph.define("Text", 0);
    graph
        .describe(&int)
        .constructor(Vec::new(), value(|| Int(1)))
        .finish();
    graph
        .describe(&text)
        .constructor(Vec::new(), value(|| Text("x".to_string())))
        .finish();
    let ipair = graph.define("IPair", 2);
    let swapped = graph.define("Swapped", 2);
    graph
        .describe(&swapped)
        .implements(ipair.close(vec![TypeRef::Param(1), TypeRef::Param(0)]))
        .constructor(Vec::new(), value(|| Swapped))
        .finish();

    let mut targets = TargetCollection::new(graph);
    targets.register_impl(ipair.open(), swapped.open());
    let container = targets.build().unwrap();

    // IPair<Int, Text> closes Swapped<Text, Int>; construction succeeds
    // because the mapping bound both parameters.
    assert!(container
        .resolve_as::<Swapped>(&ipair.close(vec![int.plain(), text.plain()]), None)
        .is_ok());
}

#[test]
fn test_nested_parameter_unifies() {
    // Batcher<T> implements IHandler<List<T>>.
    struct Batcher;

    let mut graph = TypeGraph::new();
    let list = graph.builtins().list.clone();
    let int = graph.define("Int", 0);
    graph
        .describe(&int)
        .constructor(Vec::new(), value(|| Int(1)))
        .finish();
    let ihandler = graph.define("IHandler", 1);
    let batcher = graph.define("Batcher", 1);
    graph
        .describe(&batcher)
        .implements(ihandler.close(vec![list.close(vec![TypeRef::Param(0)])]))
        .constructor(Vec::new(), value(|| Batcher))
        .finish();

    let mut targets = TargetCollection::new(graph);
    targets.register_impl(ihandler.open(), batcher.open());
    let container = targets.build().unwrap();

    // IHandler<List<Int>> unifies T = Int.
    assert!(container
        .resolve_as::<Batcher>(
            &ihandler.close(vec![list.close(vec![int.plain()])]),
            None
        )
        .is_ok());
    // IHandler<Int> has no List wrapper to unify against.
    assert!(matches!(
        container.resolve(&ihandler.close(vec![int.plain()]), None),
        Err(DiError::NotFound(_))
    ));
}

#[test]
fn test_generic_singleton_caches_per_closed_type() {
    let (graph, ibox, boxed, int, text) = graph_with_box();
    let mut targets = TargetCollection::new(graph);
    targets.register_type(int.plain());
    targets.register_type(text.plain());
    targets.register_singleton(ibox.open(), boxed.open());
    let container = targets.build().unwrap();

    let int_a = container
        .resolve_as::<Boxed>(&ibox.close(vec![int.plain()]), None)
        .unwrap();
    let int_b = container
        .resolve_as::<Boxed>(&ibox.close(vec![int.plain()]), None)
        .unwrap();
    let text_a = container
        .resolve_as::<Boxed>(&ibox.close(vec![text.plain()]), None)
        .unwrap();

    // One instance per closed type, not one per registration.
    assert!(Arc::ptr_eq(&int_a, &int_b));
    assert!(!Arc::ptr_eq(&int_a, &text_a));
}

#[test]
fn test_open_request_is_rejected() {
    let (graph, ibox, boxed, _, _) = graph_with_box();
    let mut targets = TargetCollection::new(graph);
    targets.register_impl(ibox.open(), boxed.open());
    let container = targets.build().unwrap();

    assert!(matches!(
        container.resolve(&ibox.open(), None),
        Err(DiError::UnboundTypeParams { .. })
    ));
}
