//! Shared fixtures for the integration tests.
//!
//! Defines a small host application: `app.Widget` and its subclass
//! `app.ui.Button` (wrappers, a button embeds its widget), `app.Shape`
//! (persistent) and `app.Token` (constructible from native code only).

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use classbridge::runtime::{MemoryEngine, MemoryHost, StaticBindings};
use classbridge::{
    Bridge, BridgeConfig, Classification, ClassRegistration, FactoryContext, Linkage,
    NativeClass, NativeError, ScriptValue,
};

pub const ROOT: &str = "classbridge.NativeObject";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(NativeClass)]
#[bridge(name = "app.Widget")]
pub struct Widget {
    linkage: Linkage,
    label: Mutex<String>,
}

impl Widget {
    pub fn new(label: &str) -> Self {
        Self {
            linkage: Linkage::of::<Self>(),
            label: Mutex::new(label.to_owned()),
        }
    }

    pub fn label(&self) -> String {
        self.label
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_label(&self, label: String) {
        *self.label.lock().unwrap_or_else(PoisonError::into_inner) = label;
    }
}

#[derive(NativeClass)]
#[bridge(name = "app.ui.Button")]
pub struct Button {
    linkage: Linkage,
    #[bridge(base)]
    pub widget: Arc<Widget>,
    pub presses: AtomicUsize,
}

impl Button {
    pub fn new(label: &str) -> Self {
        Self {
            linkage: Linkage::of::<Self>(),
            widget: Arc::new(Widget::new(label)),
            presses: AtomicUsize::new(0),
        }
    }
}

#[derive(NativeClass)]
#[bridge(name = "app.Shape")]
pub struct Shape {
    #[bridge(linkage)]
    link: Linkage,
    pub sides: u32,
}

impl Shape {
    pub fn new(sides: u32) -> Self {
        Self {
            link: Linkage::of::<Self>(),
            sides,
        }
    }
}

#[derive(NativeClass)]
#[bridge(name = "app.Token")]
pub struct Token {
    linkage: Linkage,
}

impl Token {
    pub fn new() -> Self {
        Self {
            linkage: Linkage::of::<Self>(),
        }
    }
}

/// Native class that is never registered.
#[derive(NativeClass)]
#[bridge(name = "app.Unregistered")]
pub struct Unregistered {
    linkage: Linkage,
}

impl Unregistered {
    pub fn new() -> Self {
        Self {
            linkage: Linkage::of::<Self>(),
        }
    }
}

/// Host runtime with reflective bindings for `app.Widget` and `app.Shape`.
pub fn host() -> MemoryHost {
    let host = MemoryHost::new();
    host.define_method("app.Widget", "nativeDescribe", false, |ctx| {
        let widget = ctx.this_as::<Widget>()?;
        ctx.set_return(format!("Widget({})", widget.label()));
        Ok(())
    })
    .define_method("app.Widget", "getLabel", false, |ctx| {
        let widget = ctx.this_as::<Widget>()?;
        ctx.set_return(widget.label());
        Ok(())
    })
    .define_method("app.Widget", "setLabel", false, |ctx| {
        let label: String = ctx.arg(0)?;
        ctx.this_as::<Widget>()?.set_label(label);
        Ok(())
    })
    .define_method("app.Shape", "nativeKinds", true, |ctx| {
        ctx.set_return(3);
        Ok(())
    })
    .define_class(
        "app.Widget$Bindings",
        StaticBindings::new()
            .function("describe", "nativeDescribe", false)
            .accessor("label", Some("getLabel"), Some("setLabel"), false),
    )
    .define_class(
        "app.Shape$Bindings",
        StaticBindings::new().function("kinds", "nativeKinds", true),
    );
    host
}

/// A bridge with the application classes registered, and one engine.
pub struct Fixture {
    pub bridge: Bridge,
    pub engine: Arc<MemoryEngine>,
    pub factory_calls: Arc<AtomicUsize>,
    pub hook_calls: Arc<AtomicUsize>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        init_tracing();
        let bridge = Bridge::with_config(Arc::new(host()), config);
        let factory_calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = Arc::new(AtomicUsize::new(0));
        register_app_classes(&bridge, &factory_calls, &hook_calls);
        Self {
            bridge,
            engine: MemoryEngine::new(),
            factory_calls,
            hook_calls,
        }
    }

    pub fn factory_calls(&self) -> usize {
        self.factory_calls.load(Ordering::SeqCst)
    }

    pub fn hook_calls(&self) -> usize {
        self.hook_calls.load(Ordering::SeqCst)
    }
}

fn register_app_classes(
    bridge: &Bridge,
    factory_calls: &Arc<AtomicUsize>,
    hook_calls: &Arc<AtomicUsize>,
) {
    let widget_calls = Arc::clone(factory_calls);
    let hooks = Arc::clone(hook_calls);
    bridge
        .register_class(
            ClassRegistration::wrapper("app.Widget")
                .with_base(ROOT)
                .with_constructor(move |ctx: &FactoryContext<'_>| {
                    widget_calls.fetch_add(1, Ordering::SeqCst);
                    let label = ctx
                        .args
                        .first()
                        .and_then(ScriptValue::as_str)
                        .unwrap_or("untitled");
                    Ok(Widget::new(label))
                })
                .with_constructor_hook(move |_native, ctx| {
                    hooks.fetch_add(1, Ordering::SeqCst);
                    if ctx.this().is_none() {
                        return Err(NativeError::invalid_this("constructor hook without receiver"));
                    }
                    Ok(())
                })
                .with_footprint(Widget::FOOTPRINT),
        )
        .unwrap();

    let button_calls = Arc::clone(factory_calls);
    bridge
        .register_class(
            ClassRegistration::of::<Button>(Classification::Wrapper)
                .with_base("app.Widget")
                .with_constructor(move |ctx: &FactoryContext<'_>| {
                    button_calls.fetch_add(1, Ordering::SeqCst);
                    let label = ctx.args.first().and_then(ScriptValue::as_str).unwrap_or("button");
                    Ok(Button::new(label))
                })
                .with_initializer(|builder| {
                    builder.method("press", |ctx| {
                        let button = ctx.this_as::<Button>()?;
                        let presses = button.presses.fetch_add(1, Ordering::SeqCst) + 1;
                        ctx.set_return(presses);
                        Ok(())
                    });
                }),
        )
        .unwrap();

    let shape_calls = Arc::clone(factory_calls);
    bridge
        .register_class(
            ClassRegistration::of::<Shape>(Classification::Persistent)
                .with_base(ROOT)
                .with_constructor(move |ctx: &FactoryContext<'_>| {
                    shape_calls.fetch_add(1, Ordering::SeqCst);
                    match ctx.args.first() {
                        Some(ScriptValue::Number(sides)) if *sides >= 3.0 => {
                            Ok(Shape::new(*sides as u32))
                        }
                        _ => Err(NativeError::other("a shape needs at least three sides")),
                    }
                }),
        )
        .unwrap();

    let token_calls = Arc::clone(factory_calls);
    bridge
        .register_class(
            ClassRegistration::of::<Token>(Classification::Wrapper)
                .with_base(ROOT)
                .with_constructor(move |_ctx: &FactoryContext<'_>| {
                    token_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Token::new())
                })
                .with_initializer(|builder| {
                    builder.create_from_native_only(true);
                }),
        )
        .unwrap();
}
