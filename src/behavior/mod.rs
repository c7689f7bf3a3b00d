//! 行为系统核心
//!
//! 作者用类风格声明行为（字段、构造逻辑、方法、事件表），宿主运行时只认识
//! 扁平的函数表加上每个附着实例一份数据。本模块负责两种对象模型之间的转换：
//!
//! - `class` - 编写期的行为类及构建器
//! - `binding` - 绑定标记
//! - `descriptor` - 描述符构建和附着初始化流程
//! - `attachment` - 附着实例及宿主上下文
//! - `method` / `value` / `schema` - 方法、动态值和 schema 元数据

use std::collections::BTreeMap;

pub mod attachment;
pub mod binding;
pub mod class;
pub mod descriptor;
pub mod method;
pub mod schema;
pub mod value;

/// 方法表：方法名 → 共享方法引用
pub type MethodTable = BTreeMap<String, Method>;

/// 事件表字段名
pub const EVENTS_FIELD: &str = "events";

pub use attachment::{is_reserved_field, Attachment, AttachmentState, HostContext, RESERVED_FIELDS};
pub use binding::{mark, Member};
pub use class::{BehaviorClass, BehaviorClassBuilder, FieldTemplate};
pub use descriptor::{build, build_component, build_system, BehaviorDescriptor, BehaviorKind};
pub use method::{BoundMethod, Callable, Method};
pub use schema::{PropertySchema, PropertyType, Schema};
pub use value::{Fields, Value};
