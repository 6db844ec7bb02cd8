//! Class registration and per-engine resolution.

mod common;

use std::sync::Arc;

use classbridge::runtime::{MemoryEngine, MemoryHost, StaticBindings};
use classbridge::{
    BindingError, Bridge, BridgeConfig, BridgeError, Classification, ClassRegistration,
    EngineScope, GenericObject, NativeClass, RegistrationError, ScriptArray, ScriptEngine,
    ScriptFunction, ScriptValue,
};
use common::{Button, Fixture, ROOT, Shape, Widget};

fn names(descriptors: &[Arc<classbridge::ClassBindingDescriptor>]) -> Vec<&str> {
    descriptors.iter().map(|d| d.canonical_name()).collect()
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_builtin_classes_registered() {
    let fx = Fixture::new();
    let registry = fx.bridge.registry();

    let root = registry.get(ROOT).unwrap();
    assert_eq!(root.classification(), Classification::Abstract);
    assert!(root.base().is_none());
    assert!(root.factory().is_none());

    for name in [
        ScriptFunction::CANONICAL_NAME,
        ScriptArray::CANONICAL_NAME,
        GenericObject::CANONICAL_NAME,
    ] {
        let descriptor = registry.get(name).unwrap();
        assert_eq!(descriptor.classification(), Classification::Wrapper);
        assert_eq!(descriptor.base().unwrap().canonical_name(), ROOT);
    }
}

#[test]
fn test_registration_is_idempotent() {
    let fx = Fixture::new();
    let registry = fx.bridge.registry();
    let count = registry.len();
    let original = registry.get("app.Widget").unwrap();

    let again = fx
        .bridge
        .register_class(ClassRegistration::abstract_class("app.Widget").with_base(ROOT))
        .unwrap();

    assert!(!again.is_new());
    assert!(Arc::ptr_eq(again.descriptor(), &original));
    assert_eq!(original.classification(), Classification::Wrapper);
    assert_eq!(registry.len(), count);
}

#[test]
fn test_missing_base_refused() {
    let fx = Fixture::new();

    let err = fx
        .bridge
        .register_class(ClassRegistration::wrapper("app.Orphan").with_base("app.Missing"))
        .unwrap_err();

    assert_eq!(
        err,
        RegistrationError::MissingBase {
            class: "app.Orphan".into(),
            base: "app.Missing".into(),
        }
    );
    assert!(!fx.bridge.registry().contains("app.Orphan"));
}

#[test]
fn test_incompatible_classification_refused() {
    let fx = Fixture::new();
    let registry = fx.bridge.registry();

    let err = fx
        .bridge
        .register_class(ClassRegistration::wrapper("app.Circle").with_base("app.Shape"))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::IncompatibleClassification {
            classification: Classification::Wrapper,
            base_classification: Classification::Persistent,
            ..
        }
    ));
    assert!(!registry.contains("app.Circle"));

    let err = fx
        .bridge
        .register_class(
            ClassRegistration::new(Classification::Persistent, "app.Panel")
                .with_base("app.Widget"),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::IncompatibleClassification { .. }
    ));

    // The refused name can be registered again once corrected.
    let circle = fx
        .bridge
        .register_class(
            ClassRegistration::new(Classification::Persistent, "app.Circle")
                .with_base("app.Shape"),
        )
        .unwrap();
    assert!(circle.is_new());
}

#[test]
fn test_invalid_classification_code_refused() {
    let fx = Fixture::new();

    let err = fx
        .bridge
        .register_class(ClassRegistration::from_raw(7, "app.Weird").with_base(ROOT))
        .unwrap_err();

    assert_eq!(
        err,
        RegistrationError::InvalidClassification {
            class: "app.Weird".into(),
            code: 7,
        }
    );
    assert!(!fx.bridge.registry().contains("app.Weird"));
}

#[test]
#[should_panic(expected = "has no base class")]
fn test_rootless_class_is_fatal() {
    let fx = Fixture::new();
    let _ = fx
        .bridge
        .register_class(ClassRegistration::wrapper("app.Orphan"));
}

#[test]
fn test_try_register_reports_rootless_class() {
    let fx = Fixture::new();

    let err = fx
        .bridge
        .registry()
        .try_register(ClassRegistration::wrapper("app.Orphan"))
        .unwrap_err();

    assert_eq!(
        err,
        BridgeError::Binding(BindingError::RootlessClass("app.Orphan".into()))
    );
    assert!(err.is_fatal());
}

#[test]
fn test_custom_root_class() {
    let config = BridgeConfig::default().with_root_class("host.Object");
    let bridge = Bridge::with_config(Arc::new(MemoryHost::new()), config);

    assert!(bridge.registry().contains("host.Object"));
    assert!(!bridge.registry().contains(ROOT));
    assert!(
        bridge
            .registry()
            .is_subclass_of(ScriptArray::CANONICAL_NAME, "host.Object")
    );
}

// ============================================================================
// Hierarchy queries
// ============================================================================

#[test]
fn test_hierarchy_queries() {
    let fx = Fixture::new();
    let registry = fx.bridge.registry();

    assert!(registry.is_subclass_of("app.ui.Button", "app.Widget"));
    assert!(registry.is_subclass_of("app.ui.Button", ROOT));
    assert!(!registry.is_subclass_of("app.Widget", "app.ui.Button"));
    assert!(!registry.is_subclass_of("app.Shape", "app.Widget"));

    let lineage = registry.lineage("app.ui.Button").unwrap();
    assert_eq!(names(&lineage), [ROOT, "app.Widget", "app.ui.Button"]);

    let subclasses = registry.subclasses_of("app.Widget");
    assert_eq!(names(&subclasses), ["app.ui.Button"]);

    let descriptor = registry.get("app.ui.Button").unwrap();
    assert_eq!(descriptor.simple_name(), "Button");
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_resolution_is_stable_per_engine() {
    let fx = Fixture::new();
    let other = MemoryEngine::new();

    let (first, second) = {
        let mut scope = fx.engine.lock();
        let first = fx.bridge.resolve_for_engine("app.Widget", &mut scope);
        let second = fx.bridge.resolve_for_engine("app.Widget", &mut scope);
        (first, second)
    };
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.engine(), fx.engine.id());

    let elsewhere = {
        let mut scope = other.lock();
        fx.bridge.resolve_for_engine("app.Widget", &mut scope)
    };
    assert!(!Arc::ptr_eq(&first, &elsewhere));
    assert_eq!(elsewhere.engine(), other.id());

    let descriptor = fx.bridge.registry().get("app.Widget").unwrap();
    assert_eq!(descriptor.engine_bindings().len(), 2);
}

#[test]
fn test_base_bound_before_subclass() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();

    let button = fx.bridge.resolve_for_engine("app.ui.Button", &mut scope);

    let registry = fx.bridge.registry();
    let widget = registry
        .get("app.Widget")
        .unwrap()
        .binding_for(fx.engine.id())
        .unwrap();
    let root = registry.get(ROOT).unwrap().binding_for(fx.engine.id()).unwrap();

    assert_eq!(button.parent_template(), Some(widget.template()));
    assert_eq!(widget.parent_template(), Some(root.template()));
    assert_eq!(root.parent_template(), None);
    assert_eq!(scope.template_parent(button.template()), Some(widget.template()));
    assert_eq!(scope.template_slot_count(button.template()), 1);
    assert_eq!(
        scope.template_class_name(button.template()).as_deref(),
        Some("Button")
    );

    // Resolving the base afterwards returns the binding built on the way.
    let resolved = fx.bridge.resolve_for_engine("app.Widget", &mut scope);
    assert!(Arc::ptr_eq(&resolved, &widget));
}

#[test]
fn test_unknown_class_resolution() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();

    let err = fx
        .bridge
        .registry()
        .try_resolve_for_engine("app.Nope", &mut scope)
        .unwrap_err();
    assert_eq!(err, BindingError::UnknownClass("app.Nope".into()));
}

#[test]
#[should_panic(expected = "is not registered")]
fn test_unknown_class_resolution_is_fatal() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    fx.bridge.resolve_for_engine("app.Nope", &mut scope);
}

// ============================================================================
// Members
// ============================================================================

#[test]
fn test_reflective_members_are_wired() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine("app.Widget", &mut scope);

    assert!(binding.method("describe").is_some());
    assert!(binding.accessor("label").is_some());

    let object = scope
        .construct(binding.template(), vec![ScriptValue::String("hello".into())])
        .unwrap();
    scope.root(object);

    let described = scope.call_method(object, "describe", vec![]).unwrap();
    assert_eq!(described.as_str(), Some("Widget(hello)"));

    assert_eq!(
        scope.get_property(object, "label").unwrap().as_str(),
        Some("hello")
    );
    scope
        .set_property(object, "label", ScriptValue::String("renamed".into()))
        .unwrap();

    let widget = fx
        .bridge
        .unwrap::<Widget>(&scope, &ScriptValue::Object(object))
        .unwrap();
    assert_eq!(widget.label(), "renamed");
}

#[test]
fn test_explicit_members_and_inheritance() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine("app.ui.Button", &mut scope);
    assert!(binding.method("press").is_some());
    assert!(binding.method("describe").is_none());

    let button = scope.construct(binding.template(), vec![]).unwrap();
    scope.root(button);

    assert_eq!(
        scope.call_method(button, "press", vec![]).unwrap(),
        ScriptValue::Number(1.0)
    );
    assert_eq!(
        scope.call_method(button, "press", vec![]).unwrap(),
        ScriptValue::Number(2.0)
    );

    // Widget members reach the button's embedded widget.
    let described = scope.call_method(button, "describe", vec![]).unwrap();
    assert_eq!(described.as_str(), Some("Widget(button)"));
    scope
        .set_property(button, "label", ScriptValue::String("ok".into()))
        .unwrap();
    assert_eq!(
        scope.get_property(button, "label").unwrap().as_str(),
        Some("ok")
    );

    let native = fx
        .bridge
        .unwrap::<Button>(&scope, &ScriptValue::Object(button))
        .unwrap();
    assert_eq!(native.widget.label(), "ok");
}

#[test]
fn test_static_members() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine(Shape::CANONICAL_NAME, &mut scope);

    assert!(binding.static_method("kinds").is_some());
    assert!(binding.method("kinds").is_none());
    assert_eq!(
        scope.call_static(binding.template(), "kinds", vec![]).unwrap(),
        ScriptValue::Number(3.0)
    );
}

fn broken_bridge() -> Bridge {
    let host = MemoryHost::new();
    host.define_class(
        "app.Broken$Bindings",
        StaticBindings::new().function("run", "nativeRun", false),
    );
    let bridge = Bridge::new(Arc::new(host));
    bridge
        .register_class(ClassRegistration::wrapper("app.Broken").with_base(ROOT))
        .unwrap();
    bridge
}

#[test]
fn test_unresolved_callable_reported() {
    let bridge = broken_bridge();
    let engine = MemoryEngine::new();
    let mut scope = engine.lock();

    let err = bridge
        .registry()
        .try_resolve_for_engine("app.Broken", &mut scope)
        .unwrap_err();

    assert_eq!(
        err,
        BindingError::UnresolvedCallable {
            class: "app.Broken".into(),
            property: "run".into(),
            native: "nativeRun".into(),
        }
    );
    let descriptor = bridge.registry().get("app.Broken").unwrap();
    assert!(descriptor.binding_for(engine.id()).is_none());
}

#[test]
#[should_panic(expected = "unknown native callable 'nativeRun'")]
fn test_unresolved_callable_is_fatal() {
    let bridge = broken_bridge();
    let engine = MemoryEngine::new();
    let mut scope = engine.lock();
    bridge.resolve_for_engine("app.Broken", &mut scope);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_teardown_removes_only_that_engine() {
    let fx = Fixture::new();
    let other = MemoryEngine::new();

    let before = {
        let mut scope = fx.engine.lock();
        fx.bridge.resolve_for_engine("app.ui.Button", &mut scope)
    };
    {
        let mut scope = other.lock();
        fx.bridge.resolve_for_engine("app.ui.Button", &mut scope);
    }

    let removed = fx.bridge.teardown_engine(fx.engine.as_ref());
    assert_eq!(removed, 3);

    let registry = fx.bridge.registry();
    assert!(registry.bindings_for_engine(fx.engine.id()).is_empty());
    assert_eq!(registry.bindings_for_engine(other.id()).len(), 3);
    assert_eq!(fx.bridge.teardown_engine(fx.engine.as_ref()), 0);

    let after = {
        let mut scope = fx.engine.lock();
        fx.bridge.resolve_for_engine("app.ui.Button", &mut scope)
    };
    assert!(!Arc::ptr_eq(&before, &after));
}

// ============================================================================
// Process-wide bridge
// ============================================================================

#[test]
fn test_install_keeps_first_bridge() {
    let first = Bridge::install(Arc::new(MemoryHost::new()), BridgeConfig::default());
    let second = Bridge::install(
        Arc::new(MemoryHost::new()),
        BridgeConfig::default().with_root_class("other.Root"),
    );

    assert!(std::ptr::eq(first, second));
    assert!(std::ptr::eq(Bridge::global().unwrap(), first));
    assert!(first.registry().contains(ROOT));
    assert!(!first.registry().contains("other.Root"));
}
