//! 场景节点
//!
//! 参考宿主的节点句柄：标识、位置以及按名称的事件订阅。
//! 事件处理函数以无接收者的方式调用，因此只有绑定过的处理函数能访问附着实例状态。

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec3;

use crate::behavior::{Callable, Value};
use crate::core::error::BehaviorResult;

/// 监听器标识
pub type ListenerId = u64;

#[derive(Debug)]
struct EntityInner {
    id: String,
    position: Vec3,
    listeners: BTreeMap<String, Vec<(ListenerId, Callable)>>,
    next_listener: ListenerId,
}

/// 节点句柄，克隆共享同一个节点
#[derive(Debug, Clone)]
pub struct Entity {
    inner: Rc<RefCell<EntityInner>>,
}

impl Entity {
    pub fn new(id: &str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EntityInner {
                id: id.to_string(),
                position: Vec3::ZERO,
                listeners: BTreeMap::new(),
                next_listener: 0,
            })),
        }
    }

    pub fn id(&self) -> String {
        self.inner.borrow().id.clone()
    }

    pub fn position(&self) -> Vec3 {
        self.inner.borrow().position
    }

    pub fn set_position(&self, position: Vec3) {
        self.inner.borrow_mut().position = position;
    }

    /// 添加事件监听器
    pub fn add_event_listener(&self, event: &str, handler: Callable) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener;
        inner.next_listener += 1;
        inner
            .listeners
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// 移除事件监听器，返回是否找到
    pub fn remove_event_listener(&self, event: &str, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(handlers) = inner.listeners.get_mut(event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(listener, _)| *listener != id);
        before != handlers.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(event)
            .map_or(0, Vec::len)
    }

    /// 分发事件
    ///
    /// 处理函数在节点未被借用时调用，可以读写节点本身；第一个错误会中止分发。
    pub fn emit(&self, event: &str, args: &[Value]) -> BehaviorResult<()> {
        let handlers: Vec<Callable> = self
            .inner
            .borrow()
            .listeners
            .get(event)
            .map(|list| list.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default();

        tracing::trace!(target: "host", "Emitting {} to {} listener(s)", event, handlers.len());
        for handler in handlers {
            handler.invoke(args)?;
        }
        Ok(())
    }

    pub fn ptr_eq(&self, other: &Entity) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
