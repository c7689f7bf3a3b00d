//! 附着实例
//!
//! 宿主每使用一次描述符就创建一个附着实例（例如场景中每个实体一个）。
//! 附着实例持有宿主注入的上下文、初始化后自己的字段副本，
//! 以及对描述符共享方法表的引用（查找时先查自有字段，再查共享方法表）。

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use super::descriptor::BehaviorDescriptor;
use super::method::Callable;
use super::value::{Fields, Value};
use super::{MethodTable, EVENTS_FIELD};
use crate::core::error::{BehaviorError, BehaviorResult};
use crate::host::Entity;

/// 宿主上下文字段名，行为字段不能使用
pub const RESERVED_FIELDS: &[&str] = &["el", "id", "name", "data", "initialized", "system"];

pub fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// 宿主在调用 `init` 之前注入的上下文
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    /// 节点句柄
    pub el: Option<Entity>,
    /// 注册名
    pub name: String,
    /// 多实例标识，单实例时为空
    pub id: String,
    /// 已由宿主按 schema 处理过的原始数据
    pub data: Value,
}

impl HostContext {
    pub fn new(el: Option<Entity>, name: &str, id: &str) -> Self {
        Self {
            el,
            name: name.to_string(),
            id: id.to_string(),
            data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// 附着实例的状态
///
/// 宿主通过 `Attachment::state`/`state_mut` 短暂借用；方法拿到的是 `Attachment` 句柄。
pub struct AttachmentState {
    context: HostContext,
    initialized: bool,
    fields: Fields,
    prototype: Rc<MethodTable>,
    self_ref: Weak<RefCell<AttachmentState>>,
}

impl AttachmentState {
    pub fn el(&self) -> Option<&Entity> {
        self.context.el.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.context.name
    }

    pub fn id(&self) -> &str {
        &self.context.id
    }

    pub fn data(&self) -> &Value {
        &self.context.data
    }

    pub fn set_data(&mut self, data: Value) {
        self.context.data = data;
    }

    pub fn context(&self) -> &HostContext {
        &self.context
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    /// 自有字段
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// 写入自有字段，宿主上下文字段名被拒绝
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> BehaviorResult<()> {
        if is_reserved_field(name) {
            return Err(BehaviorError::ReservedField {
                behavior: self.context.name.clone(),
                field: name.to_string(),
            });
        }
        self.fields.insert(name.to_string(), value.into());
        Ok(())
    }

    /// 播种字段，由初始化流程调用，名称已经校验过
    pub(crate) fn seed(&mut self, fields: Fields) {
        self.fields.extend(fields);
    }

    pub(crate) fn seed_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    fn require(&self, name: &str) -> BehaviorResult<&Value> {
        self.fields
            .get(name)
            .ok_or_else(|| BehaviorError::UnknownField(name.to_string()))
    }

    pub fn int(&self, name: &str) -> BehaviorResult<i64> {
        self.require(name)?.expect_int(name)
    }

    pub fn float(&self, name: &str) -> BehaviorResult<f64> {
        self.require(name)?.expect_float(name)
    }

    pub fn bool(&self, name: &str) -> BehaviorResult<bool> {
        self.require(name)?.expect_bool(name)
    }

    pub fn vec3(&self, name: &str) -> BehaviorResult<glam::Vec3> {
        self.require(name)?.expect_vec3(name)
    }

    /// 事件表字段
    pub fn events(&self) -> Option<&Fields> {
        self.fields.get(EVENTS_FIELD).and_then(Value::as_object)
    }

    pub(crate) fn events_mut(&mut self) -> Option<&mut Fields> {
        self.fields
            .get_mut(EVENTS_FIELD)
            .and_then(Value::as_object_mut)
    }

    /// 解析可调用成员：自有字段优先，其次共享方法表
    pub fn resolve(&self, name: &str) -> Option<Callable> {
        match self.fields.get(name) {
            Some(Value::Function(callable)) => Some(callable.clone()),
            Some(_) => None,
            None => self.prototype.get(name).cloned().map(Callable::Method),
        }
    }

    /// 是否存在可调用成员
    pub fn responds_to(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// 共享方法表（描述符的方法表，只读）
    pub fn prototype(&self) -> &MethodTable {
        &self.prototype
    }

    pub(crate) fn weak_self(&self) -> Weak<RefCell<AttachmentState>> {
        self.self_ref.clone()
    }
}

impl std::fmt::Debug for AttachmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentState")
            .field("name", &self.context.name)
            .field("id", &self.context.id)
            .field("initialized", &self.initialized)
            .field("fields", &self.fields)
            .finish()
    }
}

/// 附着实例句柄，也是方法的接收者
///
/// 宿主独占附着实例的生命周期；绑定方法只持有弱引用。
/// 字段读写每次只短暂借用状态，不要在调用方法时持有 `state()` 的借用。
#[derive(Clone)]
pub struct Attachment {
    inner: Rc<RefCell<AttachmentState>>,
}

impl Attachment {
    /// 以描述符为原型创建未初始化的附着实例
    pub fn new(descriptor: &BehaviorDescriptor, context: HostContext) -> Self {
        let prototype = descriptor.method_table();
        let inner = Rc::new_cyclic(|self_ref| {
            RefCell::new(AttachmentState {
                context,
                initialized: false,
                fields: Fields::new(),
                prototype,
                self_ref: self_ref.clone(),
            })
        });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<AttachmentState>>) -> Self {
        Self { inner }
    }

    pub fn state(&self) -> BehaviorResult<Ref<'_, AttachmentState>> {
        self.inner
            .try_borrow()
            .map_err(|_| BehaviorError::Reentrant("<state>".to_string()))
    }

    pub fn state_mut(&self) -> BehaviorResult<RefMut<'_, AttachmentState>> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| BehaviorError::Reentrant("<state>".to_string()))
    }

    /// 读取成员（自有字段或共享方法）
    pub fn get(&self, name: &str) -> BehaviorResult<Option<Value>> {
        let state = self.state()?;
        Ok(match state.field(name) {
            Some(value) => Some(value.clone()),
            None => state
                .prototype
                .get(name)
                .map(|m| Value::Function(Callable::Method(m.clone()))),
        })
    }

    /// 解析可调用成员（自有字段优先）
    pub fn resolve(&self, name: &str) -> BehaviorResult<Option<Callable>> {
        Ok(self.state()?.resolve(name))
    }

    /// 以自身为接收者调用方法，调用期间不持有状态借用
    pub fn call(&self, name: &str, args: &[Value]) -> BehaviorResult<Value> {
        let callable = self
            .resolve(name)?
            .ok_or_else(|| BehaviorError::UnknownMethod(name.to_string()))?;
        callable.call(self, args)
    }

    pub fn el(&self) -> BehaviorResult<Option<Entity>> {
        Ok(self.state()?.el().cloned())
    }

    pub fn data(&self) -> BehaviorResult<Value> {
        Ok(self.state()?.data().clone())
    }

    pub fn field(&self, name: &str) -> BehaviorResult<Option<Value>> {
        Ok(self.state()?.field(name).cloned())
    }

    /// 写入自有字段，宿主上下文字段名被拒绝
    pub fn set(&self, name: &str, value: impl Into<Value>) -> BehaviorResult<()> {
        self.state_mut()?.set(name, value)
    }

    pub fn int(&self, name: &str) -> BehaviorResult<i64> {
        self.state()?.int(name)
    }

    pub fn float(&self, name: &str) -> BehaviorResult<f64> {
        self.state()?.float(name)
    }

    pub fn bool(&self, name: &str) -> BehaviorResult<bool> {
        self.state()?.bool(name)
    }

    pub fn vec3(&self, name: &str) -> BehaviorResult<glam::Vec3> {
        self.state()?.vec3(name)
    }

    /// 调用可选的生命周期入口，不存在时什么也不做
    pub fn call_optional(&self, name: &str, args: &[Value]) -> BehaviorResult<Option<Value>> {
        if !self.state()?.responds_to(name) {
            return Ok(None);
        }
        self.call(name, args).map(Some)
    }

    pub fn init(&self, data: Value) -> BehaviorResult<()> {
        self.call_optional("init", &[data]).map(|_| ())
    }

    pub fn update(&self, old_data: Value) -> BehaviorResult<()> {
        self.call_optional("update", &[old_data]).map(|_| ())
    }

    pub fn tick(&self, time: f64, delta: f64) -> BehaviorResult<()> {
        self.call_optional("tick", &[Value::Float(time), Value::Float(delta)])
            .map(|_| ())
    }

    pub fn tock(&self, time: f64, delta: f64) -> BehaviorResult<()> {
        self.call_optional("tock", &[Value::Float(time), Value::Float(delta)])
            .map(|_| ())
    }

    pub fn play(&self) -> BehaviorResult<()> {
        self.call_optional("play", &[]).map(|_| ())
    }

    pub fn pause(&self) -> BehaviorResult<()> {
        self.call_optional("pause", &[]).map(|_| ())
    }

    pub fn remove(&self) -> BehaviorResult<()> {
        self.call_optional("remove", &[]).map(|_| ())
    }

    pub fn ptr_eq(&self, other: &Attachment) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<AttachmentState>> {
        Rc::downgrade(&self.inner)
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_borrow() {
            Ok(state) => std::fmt::Debug::fmt(&*state, f),
            Err(_) => f.write_str("Attachment(<in use>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{build_component, BehaviorClass};

    fn counter() -> BehaviorDescriptor {
        let class = BehaviorClass::builder("counter")
            .field("count", 0)
            .method("increment", |this, _| {
                let count = this.int("count")?;
                this.set("count", count + 1)?;
                Ok(Value::Int(count + 1))
            })
            .build()
            .unwrap();
        build_component(&class)
    }

    #[test]
    fn test_lookup_falls_back_to_prototype() {
        let attachment = Attachment::new(&counter(), HostContext::new(None, "counter", ""));
        let state = attachment.state().unwrap();

        assert!(!state.has_own("increment"));
        assert!(state.responds_to("increment"));
        assert!(state.responds_to("init"));
        assert!(!state.responds_to("tick"));
    }

    #[test]
    fn test_missing_lifecycle_entries_are_noops() {
        let attachment = Attachment::new(&counter(), HostContext::new(None, "counter", ""));
        attachment.init(Value::object()).unwrap();

        assert!(attachment.tick(0.0, 16.0).is_ok());
        assert!(attachment.pause().is_ok());
        assert!(attachment.remove().is_ok());
        assert_eq!(
            attachment.call("missing", &[]),
            Err(BehaviorError::UnknownMethod("missing".to_string()))
        );
    }

    #[test]
    fn test_set_rejects_reserved_names() {
        let attachment = Attachment::new(&counter(), HostContext::new(None, "counter", "a"));
        let mut state = attachment.state_mut().unwrap();

        assert!(state.set("count", 5).is_ok());
        assert!(matches!(
            state.set("id", "other"),
            Err(BehaviorError::ReservedField { .. })
        ));
        assert_eq!(state.id(), "a");
    }

    #[test]
    fn test_bound_callback_reenters_running_method() {
        let class = BehaviorClass::builder("counter")
            .field("count", 0)
            .bound_method("increment", |this, _| {
                let count = this.int("count")?;
                this.set("count", count + 1)?;
                Ok(Value::Null)
            })
            .method("tick", |this, _| {
                // 把绑定方法当作回调交出去并立即调用
                let callback = this
                    .resolve("increment")?
                    .ok_or_else(|| BehaviorError::UnknownMethod("increment".to_string()))?;
                callback.invoke(&[])?;
                callback.invoke(&[])?;
                Ok(Value::Null)
            })
            .build()
            .unwrap();
        let attachment = build_component(&class).create_attachment(HostContext::default());
        attachment.init(Value::object()).unwrap();

        attachment.tick(0.0, 16.0).unwrap();
        assert_eq!(attachment.int("count").unwrap(), 2);
    }

    #[test]
    fn test_state_borrow_conflict_is_reported() {
        let attachment = Attachment::new(&counter(), HostContext::default());
        let _guard = attachment.state_mut().unwrap();
        assert!(matches!(
            attachment.state(),
            Err(BehaviorError::Reentrant(_))
        ));
    }
}
