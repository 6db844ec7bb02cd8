//! Reflective member wiring.
//!
//! A class exposes members to scripts through a companion binding class
//! named after it (see [`BridgeConfig::binding_class_name`]). The companion
//! lists functions and accessors by native name; each name is resolved with
//! [`HostRuntime::resolve_callable`] and added to the binding being built.

use classbridge_core::{BindingError, BridgeConfig, HostRuntime, NativeFn};

use crate::binding::BindingBuilder;

/// Add reflectively declared members of `class` to `builder`.
///
/// A class without a companion binding class is skipped.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn wire_members(
    host: &dyn HostRuntime,
    config: &BridgeConfig,
    class: &str,
    builder: &mut BindingBuilder,
) -> Result<(), BindingError> {
    let Some(provider) = host.find_class(&config.binding_class_name(class)) else {
        tracing::trace!(target: "classbridge::resolve", class, "no binding class");
        return Ok(());
    };

    for function in provider.functions() {
        let callable = resolve(
            host,
            class,
            &function.property,
            &function.native,
            function.is_static,
        )?;
        builder.insert_method(&function.property, callable, function.is_static);
    }

    for accessor in provider.accessors() {
        let getter = accessor
            .getter
            .as_deref()
            .map(|name| resolve(host, class, &accessor.property, name, accessor.is_static))
            .transpose()?;
        let setter = accessor
            .setter
            .as_deref()
            .map(|name| resolve(host, class, &accessor.property, name, accessor.is_static))
            .transpose()?;
        builder.insert_accessor(&accessor.property, getter, setter, accessor.is_static);
    }

    Ok(())
}

fn resolve(
    host: &dyn HostRuntime,
    class: &str,
    property: &str,
    native: &str,
    is_static: bool,
) -> Result<NativeFn, BindingError> {
    host.resolve_callable(class, native, is_static)
        .ok_or_else(|| BindingError::UnresolvedCallable {
            class: class.to_owned(),
            property: property.to_owned(),
            native: native.to_owned(),
        })
}
