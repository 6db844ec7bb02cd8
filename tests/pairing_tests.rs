//! Object pairing between native objects and script objects.

mod common;

use std::sync::Arc;

use classbridge::runtime::MemoryEngine;
use classbridge::{
    BindingError, BridgeConfig, ClassRegistration, EngineScope, ExceptionKind, FactoryContext,
    Linkage, NativeClass, NativeObject, Ownership, ProvisionalObject, ScriptEngine, ScriptValue,
    TypeHash,
};
use common::{Button, Fixture, ROOT, Shape, Token, Unregistered, Widget};

fn widget_cost() -> i64 {
    BridgeConfig::default().external_cost(Widget::FOOTPRINT) as i64
}

#[derive(NativeClass)]
#[bridge(name = "app.Loose")]
struct Loose {
    linkage: Linkage,
}

// ============================================================================
// Script-initiated construction
// ============================================================================

#[test]
fn test_script_construction_pairs_object() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine("app.Widget", &mut scope);

    let object = scope
        .construct(binding.template(), vec![ScriptValue::String("ok".into())])
        .unwrap();

    assert_eq!(fx.factory_calls(), 1);
    assert_eq!(fx.hook_calls(), 1);
    assert!(scope.instance_of(object, binding.template()));

    let widget = fx
        .bridge
        .unwrap::<Widget>(&scope, &ScriptValue::Object(object))
        .unwrap();
    assert_eq!(widget.label(), "ok");

    let record = widget.linkage().record().unwrap();
    assert_eq!(record.object, object);
    assert_eq!(record.engine, fx.engine.id());
    assert_eq!(record.ownership, Ownership::Script);
    assert!(record.persistent.is_none());
    assert_eq!(record.external_bytes as i64, widget_cost());
    assert_eq!(scope.external_memory(), widget_cost());
    assert_eq!(
        fx.bridge
            .pairing()
            .script_object_of(widget.as_ref(), fx.engine.id()),
        Some(object)
    );

    drop(scope);
    // The temporary handle held during construction is gone.
    assert_eq!(fx.engine.persistent_count(), 0);
}

#[test]
fn test_native_only_class_throws_type_error() {
    let fx = Fixture::new();
    let template = {
        let mut scope = fx.engine.lock();
        fx.bridge.resolve_for_engine(Token::CANONICAL_NAME, &mut scope).template()
    };
    let live = fx.engine.live_objects();

    let err = fx.engine.lock().construct(template, vec![]).unwrap_err();

    assert_eq!(err.kind, ExceptionKind::TypeError);
    assert_eq!(err.message, "Token can only be created from native code");
    assert_eq!(fx.factory_calls(), 0);
    assert_eq!(fx.engine.live_objects(), live);
    assert_eq!(fx.engine.external_memory(), 0);

    // Native code may still create and pair one.
    let token = Arc::new(Token::new());
    let object = fx
        .bridge
        .pair_existing_native_object(&token, fx.engine.as_ref(), None);
    let scope = fx.engine.lock();
    assert!(scope.is_alive(object));
}

#[test]
fn test_abstract_class_throws_type_error() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let root = fx.bridge.resolve_for_engine(ROOT, &mut scope);

    let err = scope.construct(root.template(), vec![]).unwrap_err();

    assert_eq!(err.kind, ExceptionKind::TypeError);
    assert_eq!(err.message, "NativeObject is abstract and cannot be constructed");
}

#[test]
fn test_factory_error_becomes_script_exception() {
    let fx = Fixture::new();
    let template = {
        let mut scope = fx.engine.lock();
        fx.bridge.resolve_for_engine(Shape::CANONICAL_NAME, &mut scope).template()
    };
    let live = fx.engine.live_objects();

    let err = fx
        .engine
        .lock()
        .construct(template, vec![ScriptValue::Number(2.0)])
        .unwrap_err();

    assert_eq!(err.kind, ExceptionKind::Error);
    assert_eq!(err.message, "a shape needs at least three sides");
    assert_eq!(fx.factory_calls(), 1);
    assert_eq!(fx.engine.live_objects(), live);
    assert_eq!(fx.engine.persistent_count(), 0);
    assert_eq!(fx.engine.external_memory(), 0);
}

#[test]
fn test_subclass_construction_uses_own_factory() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine("app.ui.Button", &mut scope);

    let object = scope.construct(binding.template(), vec![]).unwrap();
    let value = ScriptValue::Object(object);

    let button = fx.bridge.unwrap::<Button>(&scope, &value).unwrap();
    let widget = fx.bridge.unwrap::<Widget>(&scope, &value).unwrap();
    assert!(Arc::ptr_eq(&widget, &button.widget));
    assert_eq!(widget.label(), "button");
    // Hooks belong to the class that declares them.
    assert_eq!(fx.hook_calls(), 0);
}

#[test]
fn test_factory_must_produce_constructed_class() {
    let fx = Fixture::new();
    fx.bridge
        .register_class(
            ClassRegistration::wrapper("app.Gadget")
                .with_base(ROOT)
                .with_constructor(|_ctx: &FactoryContext<'_>| Ok(Shape::new(4))),
        )
        .unwrap();
    let template = {
        let mut scope = fx.engine.lock();
        fx.bridge.resolve_for_engine("app.Gadget", &mut scope).template()
    };
    let live = fx.engine.live_objects();

    let err = fx.engine.lock().construct(template, vec![]).unwrap_err();

    assert_eq!(err.kind, ExceptionKind::TypeError);
    assert_eq!(err.message, "factory of app.Gadget produced a app.Shape");
    assert_eq!(fx.engine.live_objects(), live);
    assert_eq!(fx.engine.persistent_count(), 0);
    assert_eq!(fx.engine.external_memory(), 0);
}

#[test]
fn test_factory_may_produce_a_subclass() {
    let fx = Fixture::new();
    fx.bridge
        .register_class(
            ClassRegistration::wrapper(Loose::CANONICAL_NAME)
                .with_base(ROOT)
                .with_constructor(|_ctx: &FactoryContext<'_>| {
                    Ok(Loose {
                        linkage: Linkage::new("app.Tight"),
                    })
                }),
        )
        .unwrap();
    fx.bridge
        .register_class(ClassRegistration::wrapper("app.Tight").with_base(Loose::CANONICAL_NAME))
        .unwrap();

    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine(Loose::CANONICAL_NAME, &mut scope);
    let object = scope.construct(binding.template(), vec![]).unwrap();

    let native = fx
        .bridge
        .pairing()
        .unwrap_as(&scope, &ScriptValue::Object(object), "app.Tight")
        .unwrap();
    assert_eq!(native.linkage().class(), Some(TypeHash::from_name("app.Tight")));
}

// ============================================================================
// Host-initiated pairing
// ============================================================================

#[test]
fn test_pair_existing_native_object() {
    let fx = Fixture::new();
    let widget = Arc::new(Widget::new("native"));

    let object = fx
        .bridge
        .pair_existing_native_object(&widget, fx.engine.as_ref(), None);

    let record = widget.linkage().record().unwrap();
    assert_eq!(record.object, object);
    assert_eq!(record.ownership, Ownership::Native);
    assert!(record.persistent.is_some());
    assert_eq!(fx.engine.persistent_count(), 1);
    assert_eq!(fx.engine.external_memory(), widget_cost());
    assert_eq!(fx.factory_calls(), 0);

    let mut scope = fx.engine.lock();
    let value = ScriptValue::Object(object);
    let unwrapped = fx.bridge.unwrap::<Widget>(&scope, &value).unwrap();
    assert!(Arc::ptr_eq(&unwrapped, &widget));

    let binding = fx.bridge.resolve_for_engine("app.Widget", &mut scope);
    assert!(scope.instance_of(object, binding.template()));
    assert_eq!(
        scope.call_method(object, "describe", vec![]).unwrap(),
        ScriptValue::String("Widget(native)".into())
    );
}

#[test]
fn test_pair_with_provisional_object() {
    let fx = Fixture::new();
    let widget = Arc::new(Widget::new("adopted"));

    let provisional = {
        let mut scope = fx.engine.lock();
        let binding = fx.bridge.resolve_for_engine("app.Widget", &mut scope);
        let object = scope.new_instance(binding.template());
        ProvisionalObject::hold(&mut scope, object, Ownership::Native)
    };
    assert_eq!(fx.engine.persistent_count(), 1);

    let object = fx.bridge.pair_existing_native_object(
        &widget,
        fx.engine.as_ref(),
        Some(provisional),
    );

    assert_eq!(object, provisional.object);
    // The provisional handle was swapped for the pairing's own.
    assert_eq!(fx.engine.persistent_count(), 1);
    let record = widget.linkage().record().unwrap();
    assert_ne!(record.persistent, Some(provisional.persistent));
}

#[test]
#[should_panic(expected = "already paired")]
fn test_repeated_pairing_is_fatal() {
    let fx = Fixture::new();
    let widget = Arc::new(Widget::new("twice"));

    fx.bridge
        .pair_existing_native_object(&widget, fx.engine.as_ref(), None);
    fx.bridge
        .pair_existing_native_object(&widget, fx.engine.as_ref(), None);
}

#[test]
#[should_panic(expected = "no class linkage")]
fn test_unlinked_native_is_fatal() {
    let fx = Fixture::new();
    let loose = Arc::new(Loose {
        linkage: Linkage::unset(),
    });
    fx.bridge
        .pair_existing_native_object(&loose, fx.engine.as_ref(), None);
}

#[test]
#[should_panic(expected = "is not registered")]
fn test_unregistered_native_is_fatal() {
    let fx = Fixture::new();
    let native = Arc::new(Unregistered::new());
    fx.bridge
        .pair_existing_native_object(&native, fx.engine.as_ref(), None);
}

#[test]
fn test_bound_class_after_unset_linkage() {
    let fx = Fixture::new();
    let loose = Arc::new(Loose {
        linkage: Linkage::unset(),
    });
    assert!(loose.linkage().bind_class(Widget::class_hash()));
    assert!(!loose.linkage().bind_class(Button::class_hash()));

    let native: Arc<dyn NativeObject> = loose;
    let mut scope = fx.engine.lock();
    let object = fx
        .bridge
        .pairing()
        .pair_in_scope(&mut scope, &native, None)
        .unwrap();

    let unwrapped = fx
        .bridge
        .unwrap_root(&scope, &ScriptValue::Object(object))
        .unwrap();
    assert!(Arc::ptr_eq(&unwrapped, &native));
}

#[test]
fn test_linked_object_cannot_be_adopted() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine("app.Widget", &mut scope);
    let object = scope.construct(binding.template(), vec![]).unwrap();
    scope.root(object);

    let intruder: Arc<dyn NativeObject> = Arc::new(Widget::new("intruder"));
    let provisional = ProvisionalObject::hold(&mut scope, object, Ownership::Native);
    let err = fx
        .bridge
        .pairing()
        .pair_in_scope(&mut scope, &intruder, Some(provisional))
        .unwrap_err();

    assert_eq!(err, BindingError::ObjectAlreadyLinked("app.Widget".into()));
    assert!(!intruder.linkage().is_paired());
    drop(scope);
    assert_eq!(fx.engine.persistent_count(), 0);
}

#[test]
fn test_refused_pairing_releases_provisional_handle() {
    let fx = Fixture::new();
    let paired = Arc::new(Widget::new("paired"));
    fx.bridge
        .pair_existing_native_object(&paired, fx.engine.as_ref(), None);
    assert_eq!(fx.engine.persistent_count(), 1);

    let refused: [(Arc<dyn NativeObject>, BindingError); 3] = [
        (
            Arc::clone(&paired) as Arc<dyn NativeObject>,
            BindingError::AlreadyPaired("app.Widget".into()),
        ),
        (
            Arc::new(Unregistered::new()),
            BindingError::UnknownClass(Unregistered::class_hash().to_string()),
        ),
        (
            Arc::new(Loose {
                linkage: Linkage::unset(),
            }),
            BindingError::UnlinkedHostObject,
        ),
    ];
    for (native, expected) in refused {
        let mut scope = fx.engine.lock();
        let object = scope.new_object();
        let provisional = ProvisionalObject::hold(&mut scope, object, Ownership::Native);
        let err = fx
            .bridge
            .pairing()
            .pair_in_scope(&mut scope, &native, Some(provisional))
            .unwrap_err();
        assert_eq!(err, expected);
        drop(scope);
        assert_eq!(fx.engine.persistent_count(), 1);
    }
}

#[test]
fn test_pairing_without_external_memory_accounting() {
    let fx = Fixture::with_config(BridgeConfig::default().with_external_memory(false));
    let widget = Arc::new(Widget::new("free"));

    fx.bridge
        .pair_existing_native_object(&widget, fx.engine.as_ref(), None);

    assert_eq!(widget.linkage().record().unwrap().external_bytes, 0);
    assert_eq!(fx.engine.external_memory(), 0);
}

// ============================================================================
// Lifetimes
// ============================================================================

#[test]
fn test_dropping_native_owner_releases_script_object() {
    let fx = Fixture::new();
    let widget = Arc::new(Widget::new("short-lived"));
    let object = fx
        .bridge
        .pair_existing_native_object(&widget, fx.engine.as_ref(), None);

    drop(widget);

    assert_eq!(fx.engine.persistent_count(), 0);
    assert_eq!(fx.engine.external_memory(), 0);

    let mut scope = fx.engine.lock();
    assert!(scope.linkage(object).is_none());
    assert!(scope.collect_garbage() >= 1);
    assert!(!scope.is_alive(object));
}

#[test]
fn test_native_owner_keeps_script_object_alive() {
    let fx = Fixture::new();
    let widget = Arc::new(Widget::new("kept"));
    let object = fx
        .bridge
        .pair_existing_native_object(&widget, fx.engine.as_ref(), None);

    let mut scope = fx.engine.lock();
    scope.collect_garbage();
    assert!(scope.is_alive(object));
    assert!(scope.linkage(object).unwrap().is_live());
}

#[test]
fn test_collected_script_object_drops_native() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine("app.Widget", &mut scope);
    let object = scope.construct(binding.template(), vec![]).unwrap();

    let weak = {
        let widget = fx
            .bridge
            .unwrap::<Widget>(&scope, &ScriptValue::Object(object))
            .unwrap();
        Arc::downgrade(&widget)
    };
    assert_eq!(scope.external_memory(), widget_cost());

    assert!(scope.collect_garbage() >= 1);

    assert!(!scope.is_alive(object));
    assert!(weak.upgrade().is_none());
    assert_eq!(scope.external_memory(), 0);
}

#[test]
fn test_script_owned_native_survives_while_referenced() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine("app.Widget", &mut scope);
    let rooted = scope.construct(binding.template(), vec![]).unwrap();
    let held = scope.construct(binding.template(), vec![]).unwrap();
    scope.root(rooted);

    let widget = fx
        .bridge
        .unwrap::<Widget>(&scope, &ScriptValue::Object(held))
        .unwrap();
    scope.collect_garbage();

    assert!(scope.is_alive(rooted));
    assert!(scope.is_alive(held));
    assert!(widget.linkage().is_paired());
}

// ============================================================================
// Unwrapping
// ============================================================================

#[test]
fn test_unwrap_unpaired_values() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let plain = scope.new_object();

    for value in [
        ScriptValue::Object(plain),
        ScriptValue::Number(1.0),
        ScriptValue::Null,
        ScriptValue::Undefined,
    ] {
        assert!(fx.bridge.unwrap_root(&scope, &value).is_none());
        assert!(fx.bridge.unwrap::<Widget>(&scope, &value).is_none());
    }
}

#[test]
fn test_unwrap_as_follows_hierarchy() {
    let fx = Fixture::new();
    let mut scope = fx.engine.lock();
    let binding = fx.bridge.resolve_for_engine("app.ui.Button", &mut scope);
    let value = ScriptValue::Object(scope.construct(binding.template(), vec![]).unwrap());
    let pairing = fx.bridge.pairing();

    assert!(pairing.unwrap_as(&scope, &value, "app.ui.Button").is_some());
    assert!(pairing.unwrap_as(&scope, &value, "app.Widget").is_some());
    assert!(pairing.unwrap_as(&scope, &value, ROOT).is_some());
    assert!(pairing.unwrap_as(&scope, &value, "app.Shape").is_none());
}

#[test]
fn test_script_object_of_other_engine() {
    let fx = Fixture::new();
    let other = MemoryEngine::new();
    let widget = Arc::new(Widget::new("here"));
    fx.bridge
        .pair_existing_native_object(&widget, fx.engine.as_ref(), None);

    let pairing = fx.bridge.pairing();
    assert!(pairing.script_object_of(widget.as_ref(), fx.engine.id()).is_some());
    assert!(pairing.script_object_of(widget.as_ref(), other.id()).is_none());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_pairing() {
    let fx = Fixture::new();

    let widgets: Vec<Vec<Arc<Widget>>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let fx = &fx;
                s.spawn(move || {
                    (0..25)
                        .map(|i| {
                            let widget = Arc::new(Widget::new(&format!("{t}-{i}")));
                            fx.bridge.pair_existing_native_object(
                                &widget,
                                fx.engine.as_ref(),
                                None,
                            );
                            widget
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let widgets: Vec<_> = widgets.into_iter().flatten().collect();
    assert_eq!(widgets.len(), 100);
    assert_eq!(fx.engine.persistent_count(), 100);
    assert_eq!(fx.engine.external_memory(), widget_cost() * 100);

    let descriptor = fx.bridge.registry().get("app.Widget").unwrap();
    assert_eq!(descriptor.engine_bindings().len(), 1);

    let scope = fx.engine.lock();
    for widget in &widgets {
        let object = widget.linkage().record().unwrap().object;
        let unwrapped = fx
            .bridge
            .unwrap::<Widget>(&scope, &ScriptValue::Object(object))
            .unwrap();
        assert!(Arc::ptr_eq(&unwrapped, widget));
    }
}
