//! 行为类
//!
//! 编写期的行为定义：字段初始化器、构造逻辑、方法表、事件表和静态元数据。
//! 通过 [`BehaviorClass::builder`] 声明，`build()` 之后不可变。
//!
//! ```ignore
//! let class = BehaviorClass::builder("counter")
//!     .field("count", 0)
//!     .bound_method("increment", |this, _| {
//!         let count = this.int("count")?;
//!         this.set("count", count + 1)?;
//!         Ok(Value::Null)
//!     })
//!     .build()?;
//! ```

use std::rc::Rc;

use super::attachment::{is_reserved_field, Attachment};
use super::binding::{self, Member};
use super::method::{Callable, Method};
use super::schema::{PropertySchema, PropertyType, Schema};
use super::value::{Fields, Value};
use super::{MethodTable, EVENTS_FIELD};
use crate::core::error::{BehaviorError, BehaviorResult};

/// 构造函数签名：在字段初始化器之后运行，可修改刚初始化的字段
pub type ConstructorFn = dyn Fn(&mut Fields) -> BehaviorResult<()>;

/// 字段模板：零参数构造所需的全部信息
#[derive(Clone, Default)]
pub struct FieldTemplate {
    fields: Fields,
    constructor: Option<Rc<ConstructorFn>>,
}

impl FieldTemplate {
    /// 构造一个新的实例字段表
    ///
    /// 每次调用都产生全新的副本，构造函数的错误原样返回。
    pub fn instantiate(&self) -> BehaviorResult<Fields> {
        let mut fields = self.fields.clone();
        if let Some(constructor) = &self.constructor {
            constructor(&mut fields)?;
        }
        Ok(fields)
    }
}

/// 行为类
#[derive(Clone)]
pub struct BehaviorClass {
    name: String,
    schema: Schema,
    multiple: bool,
    dependencies: Vec<String>,
    bind_events: bool,
    methods: MethodTable,
    template: FieldTemplate,
}

impl BehaviorClass {
    pub fn builder(name: &str) -> BehaviorClassBuilder {
        BehaviorClassBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
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

    pub fn bind_events(&self) -> bool {
        self.bind_events
    }

    /// 共享方法表，不含构造函数
    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn template(&self) -> &FieldTemplate {
        &self.template
    }

    /// 零参数构造
    pub fn instantiate(&self) -> BehaviorResult<Fields> {
        self.template.instantiate()
    }
}

impl std::fmt::Debug for BehaviorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorClass")
            .field("name", &self.name)
            .field("multiple", &self.multiple)
            .field("dependencies", &self.dependencies)
            .field("bind_events", &self.bind_events)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// 行为类构建器
///
/// 编写期错误（标记非方法成员、保留字段名等）会被记录下来，在 `build()` 时返回第一个。
pub struct BehaviorClassBuilder {
    name: String,
    schema: Schema,
    multiple: bool,
    dependencies: Vec<String>,
    bind_events: bool,
    methods: MethodTable,
    fields: Fields,
    constructor: Option<Rc<ConstructorFn>>,
    error: Option<BehaviorError>,
}

impl BehaviorClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            schema: Schema::default(),
            multiple: false,
            dependencies: Vec::new(),
            bind_events: true,
            methods: MethodTable::new(),
            fields: Fields::new(),
            constructor: None,
            error: None,
        }
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// 添加单个 schema 属性
    pub fn property(
        mut self,
        name: &str,
        kind: PropertyType,
        default: impl Into<serde_json::Value>,
    ) -> Self {
        self.schema.insert(name, PropertySchema::new(kind, default));
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn dependency(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    /// 为 false 时不绑定事件表
    pub fn bind_events(mut self, bind_events: bool) -> Self {
        self.bind_events = bind_events;
        self
    }

    /// 声明实例字段及其初始值
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        if is_reserved_field(name) {
            self.fail(BehaviorError::ReservedField {
                behavior: self.name.clone(),
                field: name.to_string(),
            });
        }
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// 构造逻辑，在字段初始化器之后运行
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&mut Fields) -> BehaviorResult<()> + 'static,
    {
        self.constructor = Some(Rc::new(constructor));
        self
    }

    /// 声明方法
    pub fn method<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(&Attachment, &[Value]) -> BehaviorResult<Value> + 'static,
    {
        if name == "constructor" {
            self.fail(BehaviorError::InvalidMember {
                behavior: self.name.clone(),
                member: name.to_string(),
                reason: "the constructor cannot be declared as a method".to_string(),
            });
            return self;
        }
        self.methods.insert(name.to_string(), Method::new(name, func));
        self
    }

    /// 声明方法并标记为按附着实例绑定
    pub fn bound_method<F>(self, name: &str, func: F) -> Self
    where
        F: Fn(&Attachment, &[Value]) -> BehaviorResult<Value> + 'static,
    {
        self.method(name, func).bind(name)
    }

    /// 标记已声明的方法
    pub fn bind(mut self, name: &str) -> Self {
        let member = match (self.methods.get(name), self.fields.get(name)) {
            (Some(method), _) => Member::Method(method),
            (None, Some(field)) => Member::Field(field),
            (None, None) => Member::Missing,
        };
        match binding::mark(name, member) {
            Ok(marked) => {
                self.methods.insert(name.to_string(), marked);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    /// 在事件表字段中添加处理函数
    pub fn event<F>(mut self, event: &str, handler: F) -> Self
    where
        F: Fn(&Attachment, &[Value]) -> BehaviorResult<Value> + 'static,
    {
        let events = self
            .fields
            .entry(EVENTS_FIELD.to_string())
            .or_insert_with(Value::object);
        match events.as_object_mut() {
            Some(map) => {
                map.insert(
                    event.to_string(),
                    Value::Function(Callable::Method(Method::new(event, handler))),
                );
            }
            None => {
                let err = BehaviorError::InvalidMember {
                    behavior: self.name.clone(),
                    member: EVENTS_FIELD.to_string(),
                    reason: "the events field must be an object".to_string(),
                };
                self.fail(err);
            }
        }
        self
    }

    fn fail(&mut self, err: BehaviorError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub fn build(self) -> BehaviorResult<BehaviorClass> {
        if let Some(err) = self.error {
            tracing::error!(target: "behavior", "Invalid behavior class {}: {}", self.name, err);
            return Err(err);
        }
        Ok(BehaviorClass {
            name: self.name,
            schema: self.schema,
            multiple: self.multiple,
            dependencies: self.dependencies,
            bind_events: self.bind_events,
            methods: self.methods,
            template: FieldTemplate {
                fields: self.fields,
                constructor: self.constructor,
            },
        })
    }
}
