//! Per-engine class bindings.
//!
//! An [`EngineClassBinding`] is what a [`ClassBindingDescriptor`] becomes on
//! one engine: a constructor template plus the method and accessor tables
//! installed on it. Bindings are built once through a [`BindingBuilder`] and
//! never change afterwards.
//!
//! [`ClassBindingDescriptor`]: crate::ClassBindingDescriptor

use std::fmt;
use std::sync::{Arc, Weak};

use classbridge_core::{
    CallContext, EngineId, MemberFlags, NativeError, NativeFn, TemplateId, TemplateMember,
    TypeHash,
};
use rustc_hash::FxHashMap;

use crate::ClassBindingDescriptor;

/// A method installed on a template.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    /// Script-visible name.
    pub name: String,
    /// The native implementation.
    pub function: NativeFn,
    /// Installed on the constructor instead of the prototype.
    pub is_static: bool,
}

/// An accessor installed on a template.
#[derive(Debug, Clone)]
pub struct BoundAccessor {
    /// Script-visible name.
    pub name: String,
    /// Getter, if readable.
    pub getter: Option<NativeFn>,
    /// Setter, if writable.
    pub setter: Option<NativeFn>,
    /// Installed on the constructor instead of the prototype.
    pub is_static: bool,
}

impl BoundMethod {
    fn to_member(&self) -> TemplateMember {
        TemplateMember::Method {
            function: self.function.clone(),
            flags: static_flag(self.is_static),
        }
    }
}

impl BoundAccessor {
    fn to_member(&self) -> TemplateMember {
        let mut flags = static_flag(self.is_static);
        if self.setter.is_none() {
            flags |= MemberFlags::READ_ONLY;
        }
        TemplateMember::Accessor {
            getter: self.getter.clone(),
            setter: self.setter.clone(),
            flags,
        }
    }
}

fn static_flag(is_static: bool) -> MemberFlags {
    if is_static {
        MemberFlags::STATIC
    } else {
        MemberFlags::empty()
    }
}

/// A class materialized on one engine.
pub struct EngineClassBinding {
    class: TypeHash,
    class_name: String,
    descriptor: Weak<ClassBindingDescriptor>,
    engine: EngineId,
    template: TemplateId,
    parent_template: Option<TemplateId>,
    create_from_native_only: bool,
    instance_methods: FxHashMap<String, BoundMethod>,
    static_methods: FxHashMap<String, BoundMethod>,
    instance_accessors: FxHashMap<String, BoundAccessor>,
    static_accessors: FxHashMap<String, BoundAccessor>,
}

impl EngineClassBinding {
    /// Hash of the class's canonical name.
    pub fn class(&self) -> TypeHash {
        self.class
    }

    /// Canonical class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The descriptor this binding was built from.
    pub fn descriptor(&self) -> Option<Arc<ClassBindingDescriptor>> {
        self.descriptor.upgrade()
    }

    /// The engine this binding belongs to.
    pub fn engine(&self) -> EngineId {
        self.engine
    }

    /// The class's constructor template.
    pub fn template(&self) -> TemplateId {
        self.template
    }

    /// The base class's template, absent for the root.
    pub fn parent_template(&self) -> Option<TemplateId> {
        self.parent_template
    }

    /// Whether script code is forbidden from constructing the class.
    pub fn create_from_native_only(&self) -> bool {
        self.create_from_native_only
    }

    /// Look up a prototype method.
    pub fn method(&self, name: &str) -> Option<&BoundMethod> {
        self.instance_methods.get(name)
    }

    /// Look up a constructor method.
    pub fn static_method(&self, name: &str) -> Option<&BoundMethod> {
        self.static_methods.get(name)
    }

    /// Look up a prototype accessor.
    pub fn accessor(&self, name: &str) -> Option<&BoundAccessor> {
        self.instance_accessors.get(name)
    }

    /// Look up a constructor accessor.
    pub fn static_accessor(&self, name: &str) -> Option<&BoundAccessor> {
        self.static_accessors.get(name)
    }

    /// Prototype methods.
    pub fn instance_methods(&self) -> impl Iterator<Item = &BoundMethod> {
        self.instance_methods.values()
    }

    /// Constructor methods.
    pub fn static_methods(&self) -> impl Iterator<Item = &BoundMethod> {
        self.static_methods.values()
    }

    /// Total number of installed members.
    pub fn member_count(&self) -> usize {
        self.instance_methods.len()
            + self.static_methods.len()
            + self.instance_accessors.len()
            + self.static_accessors.len()
    }
}

impl fmt::Debug for EngineClassBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineClassBinding")
            .field("class_name", &self.class_name)
            .field("engine", &self.engine)
            .field("template", &self.template)
            .field("parent_template", &self.parent_template)
            .field("create_from_native_only", &self.create_from_native_only)
            .field("members", &self.member_count())
            .finish()
    }
}

/// Collects the members of a binding while it is built.
///
/// Initializers receive one to register explicit methods and accessors;
/// reflective wiring adds to the same builder afterwards. A later entry for
/// the same name replaces an earlier one.
pub struct BindingBuilder {
    class: TypeHash,
    class_name: String,
    engine: EngineId,
    create_from_native_only: bool,
    instance_methods: FxHashMap<String, BoundMethod>,
    static_methods: FxHashMap<String, BoundMethod>,
    instance_accessors: FxHashMap<String, BoundAccessor>,
    static_accessors: FxHashMap<String, BoundAccessor>,
}

impl BindingBuilder {
    /// Start a binding for `class_name` on `engine`.
    pub fn new(class_name: &str, engine: EngineId) -> Self {
        Self {
            class: TypeHash::from_name(class_name),
            class_name: class_name.to_owned(),
            engine,
            create_from_native_only: false,
            instance_methods: FxHashMap::default(),
            static_methods: FxHashMap::default(),
            instance_accessors: FxHashMap::default(),
            static_accessors: FxHashMap::default(),
        }
    }

    /// Canonical name of the class being bound.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The engine being bound to.
    pub fn engine(&self) -> EngineId {
        self.engine
    }

    /// Forbid script code from constructing the class.
    pub fn create_from_native_only(&mut self, native_only: bool) -> &mut Self {
        self.create_from_native_only = native_only;
        self
    }

    /// Add a prototype method.
    pub fn method<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        let function = NativeFn::new(TypeHash::EMPTY, f);
        self.insert_method(name, function, false)
    }

    /// Add a constructor method.
    pub fn static_method<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        let function = NativeFn::new(TypeHash::EMPTY, f);
        self.insert_method(name, function, true)
    }

    /// Add a prototype accessor.
    pub fn accessor(
        &mut self,
        name: &str,
        getter: Option<NativeFn>,
        setter: Option<NativeFn>,
    ) -> &mut Self {
        self.insert_accessor(name, getter, setter, false)
    }

    /// Add a constructor accessor.
    pub fn static_accessor(
        &mut self,
        name: &str,
        getter: Option<NativeFn>,
        setter: Option<NativeFn>,
    ) -> &mut Self {
        self.insert_accessor(name, getter, setter, true)
    }

    /// Add a method from an existing native function.
    ///
    /// The function is re-identified by the member hash of this class.
    pub fn insert_method(&mut self, name: &str, function: NativeFn, is_static: bool) -> &mut Self {
        let id = TypeHash::from_member(self.class, name, is_static);
        let method = BoundMethod {
            name: name.to_owned(),
            function: function.with_id(id),
            is_static,
        };
        let table = if is_static {
            &mut self.static_methods
        } else {
            &mut self.instance_methods
        };
        table.insert(name.to_owned(), method);
        self
    }

    /// Add an accessor from existing native functions.
    pub fn insert_accessor(
        &mut self,
        name: &str,
        getter: Option<NativeFn>,
        setter: Option<NativeFn>,
        is_static: bool,
    ) -> &mut Self {
        let id = TypeHash::from_accessor(self.class, name, is_static);
        let accessor = BoundAccessor {
            name: name.to_owned(),
            getter: getter.map(|f| f.with_id(id)),
            setter: setter.map(|f| f.with_id(id)),
            is_static,
        };
        let table = if is_static {
            &mut self.static_accessors
        } else {
            &mut self.instance_accessors
        };
        table.insert(name.to_owned(), accessor);
        self
    }

    /// Members to install on the template.
    pub(crate) fn template_members(&self) -> Vec<(String, TemplateMember)> {
        let methods = self
            .instance_methods
            .values()
            .chain(self.static_methods.values())
            .map(|m| (m.name.clone(), m.to_member()));
        let accessors = self
            .instance_accessors
            .values()
            .chain(self.static_accessors.values())
            .map(|a| (a.name.clone(), a.to_member()));
        methods.chain(accessors).collect()
    }

    pub(crate) fn build(
        self,
        descriptor: Weak<ClassBindingDescriptor>,
        template: TemplateId,
        parent_template: Option<TemplateId>,
    ) -> EngineClassBinding {
        EngineClassBinding {
            class: self.class,
            class_name: self.class_name,
            descriptor,
            engine: self.engine,
            template,
            parent_template,
            create_from_native_only: self.create_from_native_only,
            instance_methods: self.instance_methods,
            static_methods: self.static_methods,
            instance_accessors: self.instance_accessors,
            static_accessors: self.static_accessors,
        }
    }
}
