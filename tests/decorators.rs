use std::sync::Arc;

use crucible_di::{
    downcast, ParameterDescriptor, Target, TargetCollection, TypeDef, TypeGraph, TypeRef,
};

mod common;
use common::{make, value};

trait Greet: Send + Sync {
    fn greet(&self) -> String;
}

struct Plain;
impl Greet for Plain {
    fn greet(&self) -> String {
        "hello".to_string()
    }
}

struct Shouting {
    inner: Arc<dyn Greet>,
}
impl Greet for Shouting {
    fn greet(&self) -> String {
        self.inner.greet().to_uppercase()
    }
}

struct Bracketed {
    inner: Arc<dyn Greet>,
}
impl Greet for Bracketed {
    fn greet(&self) -> String {
        format!("[{}]", self.inner.greet())
    }
}

fn as_greeter(instance: &crucible_di::Instance) -> Arc<dyn Greet> {
    if let Ok(p) = downcast::<Plain>(instance) {
        return p;
    }
    if let Ok(s) = downcast::<Shouting>(instance) {
        return s;
    }
    downcast::<Bracketed>(instance).unwrap()
}

struct GreeterFixture {
    graph: TypeGraph,
    igreeter: TypeDef,
    plain: TypeDef,
    shouting: TypeDef,
    bracketed: TypeDef,
}

fn greeter_fixture() -> GreeterFixture {
    let mut graph = TypeGraph::new();
    let igreeter = graph.define("IGreeter", 0);
    let plain = graph.define("Plain", 0);
    graph
        .describe(&plain)
        .implements(igreeter.plain())
        .constructor(Vec::new(), value(|| Plain))
        .finish();
    let shouting = graph.define("Shouting", 0);
    graph
        .describe(&shouting)
        .implements(igreeter.plain())
        .constructor(
            vec![ParameterDescriptor::required("inner", igreeter.plain())],
            make(|inv| {
                Ok(Shouting {
                    inner: as_greeter(&inv.args[0]),
                })
            }),
        )
        .finish();
    let bracketed = graph.define("Bracketed", 0);
    graph
        .describe(&bracketed)
        .implements(igreeter.plain())
        .constructor(
            vec![ParameterDescriptor::required("inner", igreeter.plain())],
            make(|inv| {
                Ok(Bracketed {
                    inner: as_greeter(&inv.args[0]),
                })
            }),
        )
        .finish();
    GreeterFixture {
        graph,
        igreeter,
        plain,
        shouting,
        bracketed,
    }
}

#[test]
fn test_decorators_wrap_most_recent_outermost() {
    let fx = greeter_fixture();
    let contract = fx.igreeter.plain();
    let mut targets = TargetCollection::new(fx.graph);
    targets.register_impl(contract.clone(), fx.plain.plain());
    targets.register_decorator(contract.clone(), Target::constructor(fx.shouting.plain()));
    targets.register_decorator(contract.clone(), Target::constructor(fx.bracketed.plain()));
    let container = targets.build().unwrap();

    let resolved = container.resolve(&contract, None).unwrap();
    // Bracketed was registered last, so it is outermost.
    assert_eq!(as_greeter(&resolved).greet(), "[HELLO]");
}

#[test]
fn test_decorator_applies_to_every_resolution() {
    let fx = greeter_fixture();
    let contract = fx.igreeter.plain();
    let mut targets = TargetCollection::new(fx.graph);
    targets.register_impl(contract.clone(), fx.plain.plain());
    targets.register_decorator(contract.clone(), Target::constructor(fx.shouting.plain()));
    let container = targets.build().unwrap();

    let a = container.resolve(&contract, None).unwrap();
    let b = container.resolve(&contract, None).unwrap();
    assert_eq!(as_greeter(&a).greet(), "HELLO");
    assert_eq!(as_greeter(&b).greet(), "HELLO");
    // Transient all the way down: decorator and component are both fresh.
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_decorated_collection_items() {
    let fx = greeter_fixture();
    let enumerable = fx.graph.builtins().enumerable.clone();
    let contract = fx.igreeter.plain();
    let mut targets = TargetCollection::new(fx.graph);
    targets.register_impl(contract.clone(), fx.plain.plain());
    targets.register_decorator(contract.clone(), Target::constructor(fx.shouting.plain()));
    let container = targets.build().unwrap();

    let all = container
        .resolve_as::<crucible_di::ResolvedCollection>(
            &enumerable.close(vec![contract.clone()]),
            None,
        )
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(as_greeter(&all.items()[0]).greet(), "HELLO");
}

#[test]
fn test_closed_decorator_replaces_generic_for_exact_request_only() {
    // GenericWrap<T> decorates IBox<T>; IntWrap decorates IBox<Int> only.
    struct Base(&'static str);
    struct GenericWrap {
        inner: Arc<Base>,
    }
    struct IntWrap {
        inner: Arc<Base>,
    }

    let mut graph = TypeGraph::new();
    let int = graph.define("Int", 0);
    let text = graph.define("Text", 0);
    let ibox = graph.define("IBox", 1);

    let base = graph.define("Base", 1);
    graph
        .describe(&base)
        .implements(ibox.close(vec![TypeRef::Param(0)]))
        .constructor(Vec::new(), value(|| Base("base")))
        .finish();

    let generic_wrap = graph.define("GenericWrap", 1);
    graph
        .describe(&generic_wrap)
        .implements(ibox.close(vec![TypeRef::Param(0)]))
        .constructor(
            vec![ParameterDescriptor::required(
                "inner",
                ibox.close(vec![TypeRef::Param(0)]),
            )],
            make(|inv| {
                Ok(GenericWrap {
                    inner: downcast::<Base>(&inv.args[0])?,
                })
            }),
        )
        .finish();

    let int_wrap = graph.define("IntWrap", 0);
    let int_contract = ibox.close(vec![int.plain()]);
    graph
        .describe(&int_wrap)
        .implements(int_contract.clone())
        .constructor(
            vec![ParameterDescriptor::required("inner", int_contract.clone())],
            make(|inv| {
                Ok(IntWrap {
                    inner: downcast::<Base>(&inv.args[0])?,
                })
            }),
        )
        .finish();

    let mut targets = TargetCollection::new(graph);
    targets.register_impl(ibox.open(), base.open());
    targets.register_decorator(
        ibox.open(),
        Target::generic_constructor(generic_wrap.open()),
    );
    targets.register_decorator(int_contract.clone(), Target::constructor(int_wrap.plain()));
    let container = targets.build().unwrap();

    // The exact closed request gets only the closed decorator.
    let for_int = container.resolve(&int_contract, None).unwrap();
    let wrapped = downcast::<IntWrap>(&for_int).unwrap();
    assert_eq!(wrapped.inner.0, "base");

    // Other closings keep the generic decorator.
    let for_text = container
        .resolve(&ibox.close(vec![text.plain()]), None)
        .unwrap();
    assert!(downcast::<GenericWrap>(&for_text).is_ok());
}

#[test]
fn test_decorating_a_singleton_decorates_its_shared_instance() {
    let fx = greeter_fixture();
    let contract = fx.igreeter.plain();
    let mut targets = TargetCollection::new(fx.graph);
    targets.register_singleton(contract.clone(), fx.plain.plain());
    targets.register_decorator(contract.clone(), Target::constructor(fx.shouting.plain()));
    let container = targets.build().unwrap();

    let a = container.resolve(&contract, None).unwrap();
    let b = container.resolve(&contract, None).unwrap();
    let a = downcast::<Shouting>(&a).unwrap();
    let b = downcast::<Shouting>(&b).unwrap();
    // The decorator itself is transient, but wraps the one shared inner.
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a.greet(), "HELLO");

    let a_inner: *const dyn Greet = Arc::as_ptr(&a.inner);
    let b_inner: *const dyn Greet = Arc::as_ptr(&b.inner);
    assert_eq!(a_inner as *const (), b_inner as *const ());
}
