//! In-memory reference script engine.
//!
//! [`MemoryEngine`] implements [`ScriptEngine`] with a generational object
//! heap, constructor templates with prototype chains, persistent handles and a
//! mark/sweep collector driven by explicit roots. It stands in for a real
//! embedded engine in tests and benchmarks.
//!
//! Besides the [`EngineScope`] operations the bridge needs, [`MemoryScope`]
//! offers what script code would do: `new` on a template, method calls,
//! rooting values on the "stack" and running the collector.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::engine::{
    ConstructorCall, ConstructorCallback, EngineScope, MemberFlags, PendingRelease,
    PersistentHandle, ScriptEngine, TemplateId, TemplateMember, TemplateSpec,
};
use crate::error::ScriptException;
use crate::native::InternalSlot;
use crate::{EngineId, ObjectKind, ObjectRef, ScriptValue, SymbolId};

use super::object_heap::{HeapHandle, ObjectHeap};
use super::{CallContext, NativeFn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reference script engine.
pub struct MemoryEngine {
    id: EngineId,
    self_ref: Weak<MemoryEngine>,
    state: Mutex<EngineState>,
    pending: Mutex<Vec<PendingRelease>>,
}

#[derive(Default)]
struct EngineState {
    objects: ObjectHeap<ScriptObject>,
    templates: Vec<Template>,
    roots: FxHashMap<ObjectRef, usize>,
    persistents: FxHashMap<u64, ObjectRef>,
    next_persistent: u64,
    next_symbol: u32,
    external_memory: i64,
}

enum ObjectData {
    Plain,
    Array(Vec<ScriptValue>),
    Function { name: String, function: NativeFn },
}

struct ScriptObject {
    data: ObjectData,
    template: Option<TemplateId>,
    properties: Vec<(String, ScriptValue)>,
    linkage: Option<InternalSlot>,
}

impl ScriptObject {
    fn new(data: ObjectData, template: Option<TemplateId>) -> Self {
        Self {
            data,
            template,
            properties: Vec::new(),
            linkage: None,
        }
    }

    fn property(&self, name: &str) -> Option<&ScriptValue> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    fn set_property(&mut self, name: &str, value: ScriptValue) {
        match self.properties.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((name.to_owned(), value)),
        }
    }

    fn references(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        let elements: &[ScriptValue] = match &self.data {
            ObjectData::Array(elements) => elements,
            _ => &[],
        };
        self.properties
            .iter()
            .map(|(_, value)| value)
            .chain(elements)
            .filter_map(ScriptValue::as_object)
    }
}

struct Template {
    class_name: String,
    callback: ConstructorCallback,
    data: Arc<dyn Any + Send + Sync>,
    parent: Option<TemplateId>,
    internal_slots: usize,
    members: FxHashMap<String, TemplateMember>,
    statics: FxHashMap<String, TemplateMember>,
    method_objects: FxHashMap<String, ObjectRef>,
}

impl MemoryEngine {
    /// Create a new engine.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            id: EngineId::next(),
            self_ref: self_ref.clone(),
            state: Mutex::new(EngineState::default()),
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Acquire the engine lock with the concrete scope type.
    ///
    /// Applies releases queued by dropped natives first.
    pub fn lock(&self) -> MemoryScope<'_> {
        let mut scope = MemoryScope {
            engine: self,
            state: lock(&self.state),
        };
        scope.apply_pending();
        scope
    }

    /// Current external memory total.
    pub fn external_memory(&self) -> i64 {
        self.lock().state.external_memory
    }

    /// Number of live objects.
    pub fn live_objects(&self) -> usize {
        self.lock().state.objects.len()
    }

    /// Number of outstanding persistent handles.
    pub fn persistent_count(&self) -> usize {
        self.lock().state.persistents.len()
    }
}

impl ScriptEngine for MemoryEngine {
    fn id(&self) -> EngineId {
        self.id
    }

    fn enter(&self) -> Box<dyn EngineScope + '_> {
        Box::new(self.lock())
    }

    fn schedule_release(&self, release: PendingRelease) {
        lock(&self.pending).push(release);
    }
}

/// Exclusive access to a [`MemoryEngine`].
pub struct MemoryScope<'e> {
    engine: &'e MemoryEngine,
    state: MutexGuard<'e, EngineState>,
}

impl MemoryScope<'_> {
    fn handle(&self, object: ObjectRef) -> Option<HeapHandle> {
        (object.engine() == self.engine.id).then_some(HeapHandle {
            index: object.index(),
            generation: object.generation(),
        })
    }

    fn object_ref(&self, handle: HeapHandle) -> ObjectRef {
        ObjectRef::new(self.engine.id, handle.index, handle.generation)
    }

    fn object(&self, object: ObjectRef) -> Option<&ScriptObject> {
        let handle = self.handle(object)?;
        self.state.objects.get(handle)
    }

    fn object_mut(&mut self, object: ObjectRef) -> Option<&mut ScriptObject> {
        let handle = self.handle(object)?;
        self.state.objects.get_mut(handle)
    }

    fn allocate(&mut self, object: ScriptObject) -> ObjectRef {
        let handle = self.state.objects.allocate(object);
        self.object_ref(handle)
    }

    fn template(&self, template: TemplateId) -> Option<&Template> {
        self.state.templates.get(template.0 as usize)
    }

    fn template_mut(&mut self, template: TemplateId) -> Option<&mut Template> {
        self.state.templates.get_mut(template.0 as usize)
    }

    fn stale() -> ScriptException {
        ScriptException::error("object has been collected")
    }

    /// Walk the prototype chain for a member, returning its owning template.
    fn find_member(
        &self,
        template: TemplateId,
        name: &str,
        is_static: bool,
    ) -> Option<(TemplateId, TemplateMember)> {
        let mut current = Some(template);
        while let Some(id) = current {
            let template = self.template(id)?;
            let members = if is_static {
                &template.statics
            } else {
                &template.members
            };
            if let Some(member) = members.get(name) {
                return Some((id, member.clone()));
            }
            current = template.parent;
        }
        None
    }

    fn invoke(
        &mut self,
        function: &NativeFn,
        this: Option<ObjectRef>,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, ScriptException> {
        let mut ctx = CallContext::new(self, this, &args);
        function.call(&mut ctx)?;
        Ok(ctx.into_return())
    }

    /// Function object for a prototype method, created on first access.
    fn method_object(&mut self, owner: TemplateId, name: &str, function: NativeFn) -> ObjectRef {
        let cached = self
            .template(owner)
            .and_then(|template| template.method_objects.get(name).copied());
        if let Some(object) = cached.filter(|object| self.is_alive(*object)) {
            return object;
        }
        let object = self.new_function(name, function);
        if let Some(template) = self.template_mut(owner) {
            template.method_objects.insert(name.to_owned(), object);
        }
        object
    }

    fn read_member(
        &mut self,
        owner: TemplateId,
        name: &str,
        member: TemplateMember,
        this: Option<ObjectRef>,
    ) -> Result<ScriptValue, ScriptException> {
        match member {
            TemplateMember::Method { function, .. } => Ok(ScriptValue::Object(
                self.method_object(owner, name, function),
            )),
            TemplateMember::Accessor {
                getter: Some(getter),
                ..
            } => self.invoke(&getter, this, Vec::new()),
            TemplateMember::Accessor { getter: None, .. } => Ok(ScriptValue::Undefined),
        }
    }

    fn apply_pending(&mut self) {
        let releases = std::mem::take(&mut *lock(&self.engine.pending));
        for release in releases {
            self.apply_release(release);
        }
    }

    fn apply_release(&mut self, release: PendingRelease) {
        if let Some(handle) = release.persistent {
            self.release(handle);
        }
        if let Some(object) = self.object_mut(release.object)
            && object.linkage.as_ref().is_some_and(|slot| !slot.is_live())
        {
            object.linkage = None;
        }
        self.state.external_memory -= release.external_bytes as i64;
    }

    fn free_object(&mut self, object: ObjectRef) {
        let freed = self
            .handle(object)
            .and_then(|handle| self.state.objects.free(handle));
        // Dropping the object may drop an owned native, which queues a release.
        drop(freed);
        self.apply_pending();
    }

    /// Run a template's constructor, as `new Class(...args)` would.
    ///
    /// A failed constructor frees the half-built instance.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn construct(
        &mut self,
        template: TemplateId,
        args: Vec<ScriptValue>,
    ) -> Result<ObjectRef, ScriptException> {
        let (callback, data) = {
            let template = self
                .template(template)
                .ok_or_else(|| ScriptException::type_error("not a constructor"))?;
            (Arc::clone(&template.callback), Arc::clone(&template.data))
        };
        let this = self.new_instance(template);
        let call = ConstructorCall { this, args, data };
        let result = {
            let scope: &mut dyn EngineScope = &mut *self;
            callback(scope, &call)
        };
        match result {
            Ok(()) => Ok(this),
            Err(err) => {
                self.free_object(this);
                Err(err)
            }
        }
    }

    /// Call a method by name, as `object.name(...args)` would.
    pub fn call_method(
        &mut self,
        object: ObjectRef,
        name: &str,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, ScriptException> {
        match self.get_property(object, name)? {
            ScriptValue::Object(function) => self.call_function(function, Some(object), args),
            _ => Err(ScriptException::type_error(format!("{name} is not a function"))),
        }
    }

    /// Call a static method on a template's constructor.
    pub fn call_static(
        &mut self,
        template: TemplateId,
        name: &str,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, ScriptException> {
        match self.find_member(template, name, true) {
            Some((_, TemplateMember::Method { function, .. })) => {
                self.invoke(&function, None, args)
            }
            _ => Err(ScriptException::type_error(format!("{name} is not a function"))),
        }
    }

    /// Read a static property from a template's constructor.
    pub fn get_static(
        &mut self,
        template: TemplateId,
        name: &str,
    ) -> Result<ScriptValue, ScriptException> {
        match self.find_member(template, name, true) {
            Some((owner, member)) => self.read_member(owner, name, member, None),
            None => Ok(ScriptValue::Undefined),
        }
    }

    /// Check if `object`'s prototype chain includes `template`.
    pub fn instance_of(&self, object: ObjectRef, template: TemplateId) -> bool {
        let mut current = self.object(object).and_then(|o| o.template);
        while let Some(id) = current {
            if id == template {
                return true;
            }
            current = self.template(id).and_then(|t| t.parent);
        }
        false
    }

    /// Keep an object alive, as a reference from the script stack would.
    pub fn root(&mut self, object: ObjectRef) {
        *self.state.roots.entry(object).or_insert(0) += 1;
    }

    /// Drop one root reference.
    pub fn unroot(&mut self, object: ObjectRef) {
        if let Some(count) = self.state.roots.get_mut(&object) {
            *count -= 1;
            if *count == 0 {
                self.state.roots.remove(&object);
            }
        }
    }

    /// Collect unreachable objects, returning how many were freed.
    ///
    /// Roots are explicit roots, persistent handles, cached method functions
    /// and objects owning a native that the host still references.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn collect_garbage(&mut self) -> usize {
        let mut stack: Vec<ObjectRef> = Vec::new();
        stack.extend(self.state.roots.keys().copied());
        stack.extend(self.state.persistents.values().copied());
        for template in &self.state.templates {
            stack.extend(template.method_objects.values().copied());
        }
        for handle in self.state.objects.handles() {
            if let Some(ScriptObject {
                linkage: Some(InternalSlot::Owned(native)),
                ..
            }) = self.state.objects.get(handle)
                && Arc::strong_count(native) > 1
            {
                stack.push(self.object_ref(handle));
            }
        }

        let mut marked: FxHashSet<HeapHandle> = FxHashSet::default();
        while let Some(object) = stack.pop() {
            let Some(handle) = self.handle(object) else {
                continue;
            };
            let Some(live) = self.state.objects.get(handle) else {
                continue;
            };
            if marked.insert(handle) {
                stack.extend(live.references());
            }
        }

        let mut garbage = Vec::new();
        for handle in self.state.objects.handles() {
            if !marked.contains(&handle)
                && let Some(object) = self.state.objects.free(handle)
            {
                garbage.push(object);
            }
        }
        let freed = garbage.len();
        drop(garbage);
        self.apply_pending();
        tracing::trace!(target: "classbridge::engine", engine = %self.engine.id, freed, "collected garbage");
        freed
    }

    /// Current external memory total.
    pub fn external_memory(&self) -> i64 {
        self.state.external_memory
    }
}

impl EngineScope for MemoryScope<'_> {
    fn engine_id(&self) -> EngineId {
        self.engine.id
    }

    fn engine_handle(&self) -> Weak<dyn ScriptEngine> {
        let handle: Weak<dyn ScriptEngine> = self.engine.self_ref.clone();
        handle
    }

    fn create_template(&mut self, spec: TemplateSpec) -> TemplateId {
        let id = TemplateId(self.state.templates.len() as u32);
        self.state.templates.push(Template {
            class_name: spec.class_name,
            callback: spec.callback,
            data: spec.data,
            parent: None,
            internal_slots: 0,
            members: FxHashMap::default(),
            statics: FxHashMap::default(),
            method_objects: FxHashMap::default(),
        });
        id
    }

    fn set_internal_slot_count(&mut self, template: TemplateId, count: usize) {
        if let Some(template) = self.template_mut(template) {
            template.internal_slots = count;
        }
    }

    fn inherit(&mut self, template: TemplateId, parent: TemplateId) {
        if let Some(template) = self.template_mut(template) {
            template.parent = Some(parent);
        }
    }

    fn set_template_member(&mut self, template: TemplateId, name: &str, member: TemplateMember) {
        if let Some(template) = self.template_mut(template) {
            let table = if member.flags().contains(MemberFlags::STATIC) {
                &mut template.statics
            } else {
                &mut template.members
            };
            table.insert(name.to_owned(), member);
        }
    }

    fn template_parent(&self, template: TemplateId) -> Option<TemplateId> {
        self.template(template)?.parent
    }

    fn template_class_name(&self, template: TemplateId) -> Option<String> {
        self.template(template).map(|t| t.class_name.clone())
    }

    fn template_slot_count(&self, template: TemplateId) -> usize {
        self.template(template).map_or(0, |t| t.internal_slots)
    }

    fn template_of(&self, object: ObjectRef) -> Option<TemplateId> {
        self.object(object)?.template
    }

    fn new_instance(&mut self, template: TemplateId) -> ObjectRef {
        self.allocate(ScriptObject::new(ObjectData::Plain, Some(template)))
    }

    fn new_object(&mut self) -> ObjectRef {
        self.allocate(ScriptObject::new(ObjectData::Plain, None))
    }

    fn new_array(&mut self, elements: Vec<ScriptValue>) -> ObjectRef {
        self.allocate(ScriptObject::new(ObjectData::Array(elements), None))
    }

    fn new_function(&mut self, name: &str, function: NativeFn) -> ObjectRef {
        let data = ObjectData::Function {
            name: name.to_owned(),
            function,
        };
        self.allocate(ScriptObject::new(data, None))
    }

    fn new_symbol(&mut self, _description: &str) -> SymbolId {
        let id = SymbolId(self.state.next_symbol);
        self.state.next_symbol += 1;
        id
    }

    fn object_kind(&self, object: ObjectRef) -> Option<ObjectKind> {
        Some(match self.object(object)?.data {
            ObjectData::Plain => ObjectKind::Plain,
            ObjectData::Array(_) => ObjectKind::Array,
            ObjectData::Function { .. } => ObjectKind::Function,
        })
    }

    fn get_property(
        &mut self,
        object: ObjectRef,
        name: &str,
    ) -> Result<ScriptValue, ScriptException> {
        let target = self.object(object).ok_or_else(Self::stale)?;
        if let Some(value) = target.property(name) {
            return Ok(value.clone());
        }
        match &target.data {
            ObjectData::Array(elements) if name == "length" => {
                return Ok(ScriptValue::Number(elements.len() as f64));
            }
            ObjectData::Function { name: fn_name, .. } if name == "name" => {
                return Ok(ScriptValue::String(fn_name.clone()));
            }
            _ => {}
        }
        let Some(template) = target.template else {
            return Ok(ScriptValue::Undefined);
        };
        match self.find_member(template, name, false) {
            Some((owner, member)) => self.read_member(owner, name, member, Some(object)),
            None => Ok(ScriptValue::Undefined),
        }
    }

    fn set_property(
        &mut self,
        object: ObjectRef,
        name: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptException> {
        let template = self.object(object).ok_or_else(Self::stale)?.template;
        let accessor = template.and_then(|t| self.find_member(t, name, false));
        match accessor {
            Some((_, TemplateMember::Accessor { setter: Some(setter), .. })) => {
                self.invoke(&setter, Some(object), vec![value]).map(|_| ())
            }
            Some((_, TemplateMember::Accessor { setter: None, .. })) => Err(
                ScriptException::type_error(format!("cannot assign to read-only property '{name}'")),
            ),
            _ => {
                self.object_mut(object)
                    .ok_or_else(Self::stale)?
                    .set_property(name, value);
                Ok(())
            }
        }
    }

    fn property_names(&self, object: ObjectRef) -> Vec<String> {
        self.object(object)
            .map(|o| o.properties.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    fn array_length(&self, array: ObjectRef) -> Option<usize> {
        match &self.object(array)?.data {
            ObjectData::Array(elements) => Some(elements.len()),
            _ => None,
        }
    }

    fn array_get(&self, array: ObjectRef, index: usize) -> Option<ScriptValue> {
        match &self.object(array)?.data {
            ObjectData::Array(elements) => elements.get(index).cloned(),
            _ => None,
        }
    }

    fn array_set(&mut self, array: ObjectRef, index: usize, value: ScriptValue) -> bool {
        match self.object_mut(array).map(|o| &mut o.data) {
            Some(ObjectData::Array(elements)) => {
                if index >= elements.len() {
                    elements.resize(index + 1, ScriptValue::Undefined);
                }
                elements[index] = value;
                true
            }
            _ => false,
        }
    }

    fn call_function(
        &mut self,
        function: ObjectRef,
        this: Option<ObjectRef>,
        args: Vec<ScriptValue>,
    ) -> Result<ScriptValue, ScriptException> {
        let callable = match &self.object(function).ok_or_else(Self::stale)?.data {
            ObjectData::Function { function, .. } => function.clone(),
            _ => return Err(ScriptException::type_error("object is not a function")),
        };
        self.invoke(&callable, this, args)
    }

    fn linkage(&self, object: ObjectRef) -> Option<InternalSlot> {
        self.object(object)?.linkage.clone()
    }

    fn set_linkage(&mut self, object: ObjectRef, slot: Option<InternalSlot>) -> bool {
        match self.object_mut(object) {
            Some(target) => {
                target.linkage = slot;
                true
            }
            None => false,
        }
    }

    fn persist(&mut self, object: ObjectRef) -> PersistentHandle {
        let id = self.state.next_persistent;
        self.state.next_persistent += 1;
        self.state.persistents.insert(id, object);
        PersistentHandle { object, id }
    }

    fn release(&mut self, handle: PersistentHandle) {
        self.state.persistents.remove(&handle.id);
    }

    fn adjust_external_memory(&mut self, delta: i64) -> i64 {
        self.state.external_memory += delta;
        self.state.external_memory
    }
}
