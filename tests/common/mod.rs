//! 集成测试共用的示例行为

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use game_engine_behavior::behavior::{BehaviorClass, PropertyType};
use game_engine_behavior::{BehaviorError, Value};
use glam::Vec3;

/// 示例组件：点击时节点沿 -z 方向前进一格
pub fn sample_component() -> BehaviorClass {
    BehaviorClass::builder("SampleComponent")
        .property("enabled", PropertyType::Boolean, true)
        .property("name", PropertyType::String, "world")
        .field("someProperty", true)
        .field("someObject", Value::object())
        .field("ready", false)
        .field("greeting", "")
        .method("init", |this, args| {
            let name = args
                .first()
                .and_then(|data| data.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("world")
                .to_string();
            this.set("greeting", format!("hello {name}"))?;
            this.set("ready", true)?;
            Ok(Value::Null)
        })
        .method("tick", |_, _| Ok(Value::Null))
        .method("getSomeProperty", |this, _| {
            Ok(Value::Bool(this.bool("someProperty")?))
        })
        .event("click", |this, _| {
            if let Some(el) = this.el()? {
                el.set_position(el.position() - Vec3::Z);
            }
            Ok(Value::Null)
        })
        .build()
        .expect("sample component is valid")
}

/// 示例系统：初始化时监听场景节点上的 `some-event`
pub fn sample_system() -> BehaviorClass {
    BehaviorClass::builder("SampleSystem")
        .property("enabled", PropertyType::Boolean, true)
        .field("vector", Vec3::ZERO)
        .method("init", |this, _| {
            let handler = this
                .resolve("onSceneEvent")?
                .ok_or_else(|| BehaviorError::UnknownMethod("onSceneEvent".to_string()))?;
            if let Some(el) = this.el()? {
                el.add_event_listener("some-event", handler);
            }
            Ok(Value::Null)
        })
        .bound_method("onSceneEvent", |this, _| {
            let vector = this.vec3("vector")?;
            this.set("vector", vector + Vec3::X)?;
            Ok(Value::Null)
        })
        .build()
        .expect("sample system is valid")
}

/// 计数器：`increment` 被标记为绑定，`peek` 没有
pub fn counter() -> BehaviorClass {
    BehaviorClass::builder("Counter")
        .field("count", 0)
        .bound_method("increment", |this, _| {
            let count = this.int("count")?;
            this.set("count", count + 1)?;
            Ok(Value::Int(count + 1))
        })
        .method("peek", |this, _| Ok(Value::Int(this.int("count")?)))
        .build()
        .expect("counter is valid")
}

/// 构造函数调用次数可观察的行为类
pub fn constructed(calls: &Rc<Cell<usize>>, fail: bool) -> BehaviorClass {
    let calls = Rc::clone(calls);
    BehaviorClass::builder("Constructed")
        .field("value", 1)
        .constructor(move |fields| {
            calls.set(calls.get() + 1);
            if fail {
                return Err(BehaviorError::init("constructor failed"));
            }
            fields.insert("value".to_string(), Value::Int(2));
            Ok(())
        })
        .build()
        .expect("constructed class is valid")
}
