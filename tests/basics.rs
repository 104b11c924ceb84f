use std::sync::Arc;

use crucible_di::{
    downcast, DiError, ParameterDescriptor, Target, TargetCollection, TypeGraph,
};

mod common;
use common::{make, value};

struct Config {
    url: String,
}

struct Repo {
    config: Arc<Config>,
}

struct Service {
    repo: Arc<Repo>,
}

fn service_graph() -> (TypeGraph, crucible_di::TypeDef, crucible_di::TypeDef, crucible_di::TypeDef)
{
    let mut graph = TypeGraph::new();
    let config = graph.define("Config", 0);
    let repo = graph.define("Repo", 0);
    let service = graph.define("Service", 0);
    graph
        .describe(&repo)
        .constructor(
            vec![ParameterDescriptor::required("config", config.plain())],
            make(|inv| {
                Ok(Repo {
                    config: downcast::<Config>(&inv.args[0])?,
                })
            }),
        )
        .finish();
    graph
        .describe(&service)
        .constructor(
            vec![ParameterDescriptor::required("repo", repo.plain())],
            make(|inv| {
                Ok(Service {
                    repo: downcast::<Repo>(&inv.args[0])?,
                })
            }),
        )
        .finish();
    (graph, config, repo, service)
}

#[test]
fn test_transitive_constructor_injection() {
    let (graph, config, repo, service) = service_graph();
    let mut targets = TargetCollection::new(graph);
    targets.register_object(
        config.plain(),
        Arc::new(Config {
            url: "postgres://localhost".to_string(),
        }),
    );
    targets.register_type(repo.plain());
    targets.register_type(service.plain());
    let container = targets.build().unwrap();

    let svc = container
        .resolve_as::<Service>(&service.plain(), None)
        .unwrap();
    assert_eq!(svc.repo.config.url, "postgres://localhost");
}

#[test]
fn test_transient_produces_fresh_instances() {
    let (graph, config, repo, _) = service_graph();
    let mut targets = TargetCollection::new(graph);
    targets.register_object(
        config.plain(),
        Arc::new(Config {
            url: "x".to_string(),
        }),
    );
    targets.register_type(repo.plain());
    let container = targets.build().unwrap();

    let a = container.resolve_as::<Repo>(&repo.plain(), None).unwrap();
    let b = container.resolve_as::<Repo>(&repo.plain(), None).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    // Constants are shared.
    assert!(Arc::ptr_eq(&a.config, &b.config));
}

#[test]
fn test_most_recent_registration_wins() {
    let mut graph = TypeGraph::new();
    let config = graph.define("Config", 0);
    let mut targets = TargetCollection::new(graph);
    targets.register_object(
        config.plain(),
        Arc::new(Config {
            url: "first".to_string(),
        }),
    );
    targets.register_object(
        config.plain(),
        Arc::new(Config {
            url: "second".to_string(),
        }),
    );
    let container = targets.build().unwrap();

    let resolved = container
        .resolve_as::<Config>(&config.plain(), None)
        .unwrap();
    assert_eq!(resolved.url, "second");
}

#[test]
fn test_missing_registration_errors() {
    let mut graph = TypeGraph::new();
    let ghost = graph.define("Ghost", 0);
    let container = TargetCollection::new(graph).build().unwrap();

    match container.resolve(&ghost.plain(), None) {
        Err(DiError::NotFound(name)) => assert_eq!(name, "Ghost"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("resolved an unregistered contract"),
    }
    assert!(container.try_resolve(&ghost.plain(), None).unwrap().is_none());
}

#[test]
fn test_named_argument_override_beats_registration() {
    let (graph, config, repo, _) = service_graph();
    let mut targets = TargetCollection::new(graph);
    targets.register_object(
        config.plain(),
        Arc::new(Config {
            url: "default".to_string(),
        }),
    );
    let special = Target::constant(
        config.plain(),
        Arc::new(Config {
            url: "special".to_string(),
        }),
    );
    targets.register(
        repo.plain(),
        Target::constructor(repo.plain()).with_named_arg("config", special),
    );
    let container = targets.build().unwrap();

    let resolved = container.resolve_as::<Repo>(&repo.plain(), None).unwrap();
    assert_eq!(resolved.config.url, "special");
    // The plain registration is untouched.
    let plain = container
        .resolve_as::<Config>(&config.plain(), None)
        .unwrap();
    assert_eq!(plain.url, "default");
}

#[test]
fn test_optional_parameter_uses_default_when_unregistered() {
    struct Greeter {
        greeting: Arc<String>,
    }

    let mut graph = TypeGraph::new();
    let text = graph.define("Text", 0);
    let greeter = graph.define("Greeter", 0);
    graph
        .describe(&greeter)
        .constructor(
            vec![ParameterDescriptor::optional(
                "greeting",
                text.plain(),
                Arc::new("hello".to_string()),
            )],
            make(|inv| {
                Ok(Greeter {
                    greeting: downcast::<String>(&inv.args[0])?,
                })
            }),
        )
        .finish();

    let mut targets = TargetCollection::new(graph);
    targets.register_type(greeter.plain());
    let container = targets.build().unwrap();

    let resolved = container
        .resolve_as::<Greeter>(&greeter.plain(), None)
        .unwrap();
    assert_eq!(*resolved.greeting, "hello");
}

#[test]
fn test_delegate_sees_resolve_context() {
    let (graph, config, repo, _) = service_graph();
    let mut targets = TargetCollection::new(graph);
    targets.register_object(
        config.plain(),
        Arc::new(Config {
            url: "from-delegate".to_string(),
        }),
    );
    let config_contract = config.plain();
    targets.register_delegate(repo.plain(), move |ctx| {
        let config = ctx.resolve_as::<Config>(&config_contract)?;
        let built: crucible_di::Instance = Arc::new(Repo { config });
        Ok(built)
    });
    let container = targets.build().unwrap();

    let resolved = container.resolve_as::<Repo>(&repo.plain(), None).unwrap();
    assert_eq!(resolved.config.url, "from-delegate");
}

#[test]
fn test_incompatible_registration_aggregates_at_build() {
    let mut graph = TypeGraph::new();
    let iface = graph.define("IService", 0);
    let loner = graph.define("Loner", 0);
    graph
        .describe(&loner)
        .constructor(Vec::new(), value(|| 0u32))
        .finish();
    let undescribed = graph.define("Undescribed", 0);

    let mut targets = TargetCollection::new(graph);
    // Loner does not declare IService.
    targets.register_impl(iface.plain(), loner.plain());
    // Undescribed has no constructor descriptor.
    targets.register_type(undescribed.plain());

    match targets.build() {
        Err(DiError::Configuration(problems)) => assert_eq!(problems.len(), 2),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("build should fail"),
    }
}

#[test]
fn test_cyclic_base_declarations_are_a_configuration_error() {
    let mut graph = TypeGraph::new();
    let iface = graph.define("IService", 0);
    let a = graph.define("CycleA", 0);
    let b = graph.define("CycleB", 0);
    graph
        .describe(&a)
        .base(b.plain())
        .constructor(Vec::new(), value(|| 0u32))
        .finish();
    graph
        .describe(&b)
        .base(a.plain())
        .constructor(Vec::new(), value(|| 0u32))
        .finish();

    let mut targets = TargetCollection::new(graph);
    // The mutually recursive base declarations never reach IService, so
    // validation must reject the registration rather than walk forever.
    targets.register_impl(iface.plain(), a.plain());

    match targets.build() {
        Err(DiError::Configuration(problems)) => {
            assert_eq!(problems.len(), 1);
            assert!(problems[0].contains("IService"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("build should fail"),
    }
}

#[test]
fn test_interface_registration_resolves_implementation() {
    struct Impl;

    let mut graph = TypeGraph::new();
    let iface = graph.define("IService", 0);
    let imp = graph.define("Impl", 0);
    graph
        .describe(&imp)
        .implements(iface.plain())
        .constructor(Vec::new(), value(|| Impl))
        .finish();

    let mut targets = TargetCollection::new(graph);
    targets.register_impl(iface.plain(), imp.plain());
    let container = targets.build().unwrap();

    assert!(container.resolve_as::<Impl>(&iface.plain(), None).is_ok());
}

#[test]
fn test_deferred_registration_follows_its_contract_at_call_time() {
    struct Real(&'static str);

    let mut graph = TypeGraph::new();
    let alias = graph.define("Alias", 0);
    graph.describe(&alias).finish();
    let real = graph.define("Real", 0);
    graph.describe(&real).implements(alias.plain()).finish();

    // Alias defers to Real with a fallback for when Real is absent.
    let fallback = Target::constant(real.plain(), Arc::new(Real("fallback")));
    let mut targets = TargetCollection::new(graph);
    targets.register_deferred(alias.plain(), real.plain(), Some(fallback));
    let container = targets.build().unwrap();

    let got = container.resolve_as::<Real>(&alias.plain(), None).unwrap();
    assert_eq!(got.0, "fallback");

    // A child supplying Real takes over from the fallback.
    let mut child = TargetCollection::child_of(&container);
    child.register_object(real.plain(), Arc::new(Real("registered")));
    let child = child.build().unwrap();
    let got = child.resolve_as::<Real>(&alias.plain(), None).unwrap();
    assert_eq!(got.0, "registered");
}

#[test]
fn test_deferred_fallback_does_not_mask_missing_nested_dependency() {
    struct Real;

    let mut graph = TypeGraph::new();
    let alias = graph.define("Alias", 0);
    graph.describe(&alias).finish();
    let dep = graph.define("Dep", 0);
    let real = graph.define("Real", 0);
    graph
        .describe(&real)
        .implements(alias.plain())
        .constructor(
            vec![ParameterDescriptor::required("dep", dep.plain())],
            make(|_inv| Ok(Real)),
        )
        .finish();

    // Real is registered but its Dep is not. The fallback only covers an
    // absent Real registration; the nested failure surfaces as-is.
    let fallback = Target::constant(real.plain(), Arc::new(Real));
    let mut targets = TargetCollection::new(graph);
    targets.register_type(real.plain());
    targets.register_deferred(alias.plain(), real.plain(), Some(fallback));
    let container = targets.build().unwrap();

    match container.resolve(&alias.plain(), None) {
        Err(DiError::NotFound(missing)) => assert_eq!(missing, "Dep"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("fallback should not mask the missing dependency"),
    }
}
