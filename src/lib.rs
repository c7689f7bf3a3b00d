//! # Game Engine Behavior
//!
//! 把类风格的行为定义（字段模板、方法、事件表）转换为宿主可注册的扁平描述符。
//!
//! ## Features
//!
//! - **Binding Marker**: 标记需要在每个附着实例上自动绑定的方法
//! - **Descriptor Builder**: 从行为类生成组件/系统描述符，方法按引用共享
//! - **Attachment Initializer**: 包装后的 `init` 为每个附着实例复制字段、绑定方法和事件
//! - **Registration Adapter**: 通过 `HostRegistry` 把描述符交给宿主注册表
//!
//! ### Example
//!
//! ```
//! use game_engine_behavior::behavior::BehaviorClass;
//! use game_engine_behavior::host::initialize_test_component;
//! use game_engine_behavior::Value;
//!
//! let counter = BehaviorClass::builder("Counter")
//!     .field("count", 0)
//!     .bound_method("increment", |this, _| {
//!         let count = this.int("count")?;
//!         this.set("count", count + 1)?;
//!         Ok(Value::Null)
//!     })
//!     .build()
//!     .unwrap();
//!
//! let attachment = initialize_test_component(&counter, Value::object()).unwrap();
//! let increment = attachment.get("increment").unwrap().unwrap();
//! increment.as_callable().unwrap().invoke(&[]).unwrap();
//! assert_eq!(attachment.state().unwrap().int("count").unwrap(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: 错误类型、日志初始化和通用宏
//! - [`behavior`]: 行为类、描述符和附着实例
//! - [`registry`]: 注册适配器和内存注册表
//! - [`config`]: 配置加载
//! - [`host`]: 参考宿主（节点、场景）

/// Core functionality: errors, logging and macros
#[macro_use]
pub mod core;
/// Behavior classes, descriptors and attachments
pub mod behavior;
/// Configuration loading
pub mod config;
/// Registration adapter and in-memory registry
pub mod registry;
/// Reference host used to drive descriptors end to end
pub mod host;

pub use behavior::{
    build_component, build_system, mark, Attachment, AttachmentState, BehaviorClass,
    BehaviorDescriptor, BehaviorKind, Callable, Fields, Member, Method, Value,
};
pub use config::BehaviorConfig;
pub use core::{init_logging, BehaviorError, BehaviorResult};
pub use registry::{register_component, register_system, BehaviorRegistry, HostRegistry};
