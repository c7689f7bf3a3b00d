//! 参考宿主
//!
//! 一个最小的宿主实现，用于端到端地驱动行为描述符：
//! - `entity` - 节点句柄和事件订阅
//! - `scene` - 持有注册表、系统实例和实体上的组件实例
//!
//! 以及模拟宿主初始化流程的辅助函数（测试中大量使用）。

pub mod entity;
pub mod scene;

pub use entity::{Entity, ListenerId};
pub use scene::Scene;

use crate::behavior::{build_component, build_system, Attachment, BehaviorClass, HostContext, Value};
use crate::core::error::BehaviorResult;

/// 已订阅的事件监听器
pub type Subscriptions = Vec<(String, ListenerId)>;

/// 把附着实例事件表中的处理函数订阅到它的节点上，和宿主开始播放时的行为一致
pub fn attach_events(attachment: &Attachment) -> BehaviorResult<Subscriptions> {
    let state = attachment.state()?;
    let (Some(el), Some(events)) = (state.el(), state.events()) else {
        return Ok(Vec::new());
    };

    let subscriptions = events
        .iter()
        .filter_map(|(event, handler)| {
            handler
                .as_callable()
                .map(|callable| (event.clone(), el.add_event_listener(event, callable.clone())))
        })
        .collect();
    Ok(subscriptions)
}

/// 取消订阅
pub fn detach_events(el: &Entity, subscriptions: &Subscriptions) {
    for (event, id) in subscriptions {
        el.remove_event_listener(event, *id);
    }
}

/// 注入数据、调用 `init`、订阅事件并标记为已初始化
pub fn initialize_attachment(
    attachment: &Attachment,
    data: Value,
) -> BehaviorResult<Subscriptions> {
    attachment.state_mut()?.set_data(data.clone());
    attachment.init(data)?;
    let subscriptions = attach_events(attachment)?;
    attachment.state_mut()?.set_initialized(true);
    Ok(subscriptions)
}

/// 在新节点上创建并初始化一个组件实例
pub fn initialize_test_component(class: &BehaviorClass, data: Value) -> BehaviorResult<Attachment> {
    let descriptor = build_component(class);
    let el = Entity::new("test-entity");
    let attachment = descriptor.create_attachment(HostContext::new(Some(el), class.name(), ""));
    initialize_attachment(&attachment, data)?;
    Ok(attachment)
}

/// 在新场景节点上创建并初始化一个系统实例
pub fn initialize_test_system(
    class: &BehaviorClass,
    data: Option<Value>,
) -> BehaviorResult<Attachment> {
    let descriptor = build_system(class);
    let el = Entity::new("test-scene");
    let attachment = descriptor.create_attachment(HostContext::new(Some(el), class.name(), ""));
    if let Some(data) = data {
        attachment.state_mut()?.set_data(data);
    }
    attachment.init(Value::Null)?;
    attachment.state_mut()?.set_initialized(true);
    Ok(attachment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Method, Value};

    fn clicker(bind_events: bool) -> BehaviorClass {
        BehaviorClass::builder("clicker")
            .bind_events(bind_events)
            .field("clicks", 0)
            .event("click", |this, _| {
                let clicks = this.int("clicks")?;
                this.set("clicks", clicks + 1)?;
                Ok(Value::Null)
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_initialize_attachment_subscribes_events() {
        let attachment = initialize_test_component(&clicker(true), Value::object()).unwrap();
        let el = attachment.state().unwrap().el().cloned().unwrap();

        assert!(attachment.state().unwrap().is_initialized());
        assert_eq!(el.listener_count("click"), 1);

        el.emit("click", &[]).unwrap();
        assert_eq!(attachment.state().unwrap().int("clicks").unwrap(), 1);
    }

    #[test]
    fn test_detach_events() {
        let el = Entity::new("button");
        // 另一个监听器不受影响
        el.add_event_listener(
            "click",
            Method::new("other", |_, _| Ok(Value::Null)).into(),
        );
        let attachment = build_component(&clicker(true))
            .create_attachment(HostContext::new(Some(el.clone()), "clicker", ""));
        let subscriptions = initialize_attachment(&attachment, Value::object()).unwrap();
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(el.listener_count("click"), 2);

        detach_events(&el, &subscriptions);
        assert_eq!(el.listener_count("click"), 1);
    }

    #[test]
    fn test_event_handler_reenters_running_method() {
        let class = BehaviorClass::builder("pinger")
            .field("pings", 0)
            .event("ping", |this, _| {
                let pings = this.int("pings")?;
                this.set("pings", pings + 1)?;
                Ok(Value::Null)
            })
            .method("tick", |this, _| {
                if let Some(el) = this.el()? {
                    el.emit("ping", &[])?;
                }
                Ok(Value::Null)
            })
            .build()
            .unwrap();
        let attachment = initialize_test_component(&class, Value::object()).unwrap();

        attachment.tick(0.0, 16.0).unwrap();
        attachment.tick(16.0, 16.0).unwrap();
        assert_eq!(attachment.int("pings").unwrap(), 2);
    }

    #[test]
    fn test_unbound_events_fail_on_dispatch() {
        let attachment = initialize_test_component(&clicker(false), Value::object()).unwrap();
        let el = attachment.state().unwrap().el().cloned().unwrap();

        assert!(el.emit("click", &[]).is_err());
        assert_eq!(attachment.state().unwrap().int("clicks").unwrap(), 0);
    }

    #[test]
    fn test_initialize_test_system_keeps_data() {
        let class = BehaviorClass::builder("sample-system")
            .field("ready", false)
            .method("init", |this, args| {
                assert!(args.is_empty());
                this.set("ready", true)?;
                Ok(Value::Null)
            })
            .build()
            .unwrap();

        let data = Value::from_json(&serde_json::json!({ "enabled": false }));
        let system = initialize_test_system(&class, Some(data)).unwrap();
        let state = system.state().unwrap();
        assert!(state.bool("ready").unwrap());
        assert_eq!(state.data().get("enabled"), Some(&Value::Bool(false)));
    }
}
