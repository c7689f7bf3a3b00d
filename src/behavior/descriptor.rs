//! 描述符构建
//!
//! 把编写期的行为类转换为宿主可以直接使用的扁平描述符：
//! 共享方法表 + 包装后的 `init` + 静态元数据。
//!
//! 包装后的 `init` 在每个附着实例上运行一次初始化流程：
//!
//! 1. 构造一个一次性的模板实例，得到字段默认值快照
//! 2. 把模板实例的自有字段复制到附着实例上
//! 3. 把带绑定标记的方法重新绑定到该附着实例
//! 4. 以附着实例为接收者调用作者原本的 `init`
//! 5. 除非禁用了事件绑定，把事件表里的处理函数绑定到该附着实例
//!
//! 任何一步的错误都原样返回给宿主，不做回滚。

use std::rc::Rc;

use super::attachment::{is_reserved_field, Attachment, AttachmentState, HostContext};
use super::class::{BehaviorClass, FieldTemplate};
use super::method::{Callable, Method};
use super::schema::Schema;
use super::value::Value;
use super::{MethodTable, EVENTS_FIELD};
use crate::core::error::{BehaviorError, BehaviorResult};

/// 描述符种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorKind {
    /// 组件：每个实体可以附着，`init` 接收数据，绑定事件表
    Component,
    /// 系统：每个场景一个，`init` 不接收数据，不绑定事件表
    System,
}

/// 运行时描述符
#[derive(Clone)]
pub struct BehaviorDescriptor {
    kind: BehaviorKind,
    behavior: String,
    schema: Schema,
    multiple: bool,
    dependencies: Vec<String>,
    methods: Rc<MethodTable>,
}

impl BehaviorDescriptor {
    pub fn kind(&self) -> BehaviorKind {
        self.kind
    }

    /// 来源行为类的名称
    pub fn behavior_name(&self) -> &str {
        &self.behavior
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn multiple(&self) -> bool {
        self.multiple
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// 所有入口名称，包括包装后的 `init`
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// 共享方法表
    pub fn method_table(&self) -> Rc<MethodTable> {
        Rc::clone(&self.methods)
    }

    /// 创建未初始化的附着实例
    pub fn create_attachment(&self, context: HostContext) -> Attachment {
        Attachment::new(self, context)
    }
}

impl std::fmt::Debug for BehaviorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorDescriptor")
            .field("kind", &self.kind)
            .field("behavior", &self.behavior)
            .field("multiple", &self.multiple)
            .field("dependencies", &self.dependencies)
            .field("entries", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 构建组件描述符
pub fn build_component(class: &BehaviorClass) -> BehaviorDescriptor {
    build(class, BehaviorKind::Component)
}

/// 构建系统描述符
pub fn build_system(class: &BehaviorClass) -> BehaviorDescriptor {
    build(class, BehaviorKind::System)
}

/// 构建描述符，不实例化行为类
pub fn build(class: &BehaviorClass, kind: BehaviorKind) -> BehaviorDescriptor {
    let mut methods: MethodTable = class.methods().clone();
    let original_init = methods.remove("init");
    let method_names: Vec<String> = methods.keys().cloned().collect();

    let initializer = Initializer {
        behavior: class.name().to_string(),
        kind,
        template: class.template().clone(),
        method_names,
        original_init,
        bind_events: kind == BehaviorKind::Component && class.bind_events(),
    };
    methods.insert(
        "init".to_string(),
        Method::new("init", move |attachment, args| initializer.run(attachment, args)),
    );

    let (multiple, dependencies) = match kind {
        BehaviorKind::Component => (class.multiple(), class.dependencies().to_vec()),
        BehaviorKind::System => (false, Vec::new()),
    };

    tracing::debug!(
        target: "behavior",
        "Built {:?} descriptor for {} with {} entries",
        kind,
        class.name(),
        methods.len()
    );

    BehaviorDescriptor {
        kind,
        behavior: class.name().to_string(),
        schema: class.schema().clone(),
        multiple,
        dependencies,
        methods: Rc::new(methods),
    }
}

/// 包装 `init` 捕获的初始化流程
struct Initializer {
    behavior: String,
    kind: BehaviorKind,
    template: FieldTemplate,
    method_names: Vec<String>,
    original_init: Option<Method>,
    bind_events: bool,
}

impl Initializer {
    /// 每一步只短暂借用状态，作者的 `init` 运行期间不持有借用
    fn run(&self, attachment: &Attachment, args: &[Value]) -> BehaviorResult<Value> {
        let instance = self.template.instantiate().map_err(|err| {
            tracing::error!(
                target: "behavior",
                "Failed to construct {} for attachment {:?}: {}",
                self.behavior,
                attachment,
                err
            );
            err
        })?;

        if let Some(field) = instance.keys().find(|name| is_reserved_field(name)) {
            return Err(BehaviorError::ReservedField {
                behavior: self.behavior.clone(),
                field: field.clone(),
            });
        }
        attachment.state_mut()?.seed(instance);

        self.bind_marked_methods(&mut *attachment.state_mut()?);

        if let Some(init) = &self.original_init {
            match self.kind {
                BehaviorKind::Component => {
                    let data = args.first().cloned().unwrap_or_default();
                    init.call(attachment, &[data])?;
                }
                BehaviorKind::System => {
                    init.call(attachment, &[])?;
                }
            }
        }

        if self.bind_events {
            bind_event_map(&mut *attachment.state_mut()?)?;
        }

        tracing::trace!(
            target: "behavior",
            "Initialized attachment {} of {}",
            attachment.state()?.name(),
            self.behavior
        );
        Ok(Value::Null)
    }

    fn bind_marked_methods(&self, state: &mut AttachmentState) {
        let receiver = state.weak_self();
        for name in &self.method_names {
            // 重复初始化时字段里已经是绑定过的方法，取回原方法重新绑定
            let method = match state.resolve(name) {
                Some(Callable::Method(method)) => method,
                Some(Callable::Bound(bound)) => bound.method().clone(),
                None => continue,
            };
            if method.is_bindable() {
                let bound = method.bind_weak(receiver.clone());
                state.seed_field(name, Value::Function(bound.into()));
            }
        }
    }
}

/// 把事件表中的处理函数绑定到附着实例
///
/// 已经绑定的处理函数保留原接收者；非函数条目返回 `NotAFunction`。
fn bind_event_map(state: &mut AttachmentState) -> BehaviorResult<()> {
    let receiver = state.weak_self();
    let Some(events) = state.events_mut() else {
        return Ok(());
    };
    for (event, handler) in events.iter_mut() {
        match handler {
            Value::Function(Callable::Method(method)) => {
                *handler = Value::Function(method.bind_weak(receiver.clone()).into());
            }
            Value::Function(Callable::Bound(_)) => {}
            _ => {
                return Err(BehaviorError::NotAFunction(format!(
                    "{EVENTS_FIELD}.{event}"
                )))
            }
        }
    }
    Ok(())
}
