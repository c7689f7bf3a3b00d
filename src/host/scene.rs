//! 参考场景
//!
//! 持有注册表、每个已注册系统的一个实例，以及每个实体上的组件实例。
//! 组件按 `name` 或 `name__id`（多实例组件）附着，依赖组件先于自身附着。

use std::collections::BTreeMap;

use super::entity::Entity;
use super::{attach_events, detach_events, initialize_attachment, Subscriptions};
use crate::behavior::{Attachment, HostContext, Value};
use crate::core::error::{BehaviorError, BehaviorResult};
use crate::registry::BehaviorRegistry;

/// 多实例组件名称分隔符
pub const MULTIPLE_SEPARATOR: &str = "__";

struct Attached {
    attachment: Attachment,
    subscriptions: Subscriptions,
}

struct EntityRecord {
    entity: Entity,
    attached: BTreeMap<String, Attached>,
}

/// 参考场景
pub struct Scene {
    registry: BehaviorRegistry,
    el: Entity,
    systems: BTreeMap<String, Attachment>,
    entities: Vec<EntityRecord>,
    playing: bool,
}

impl Scene {
    /// 创建场景并初始化所有已注册的系统
    pub fn new(registry: BehaviorRegistry) -> BehaviorResult<Self> {
        let el = Entity::new("scene");
        let mut systems = BTreeMap::new();
        for name in registry.system_names() {
            let Some(descriptor) = registry.system(name) else {
                continue;
            };
            let data = descriptor.schema().default_data();
            let system = descriptor.create_attachment(
                HostContext::new(Some(el.clone()), name, "").with_data(data),
            );
            system.init(Value::Null)?;
            system.state_mut()?.set_initialized(true);
            tracing::debug!(target: "host", "Initialized system: {}", name);
            systems.insert(name.to_string(), system);
        }

        Ok(Self {
            registry,
            el,
            systems,
            entities: Vec::new(),
            playing: true,
        })
    }

    pub fn el(&self) -> &Entity {
        &self.el
    }

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    pub fn system(&self, name: &str) -> Option<&Attachment> {
        self.systems.get(name)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// 创建实体
    pub fn spawn(&mut self, id: &str) -> Entity {
        let entity = Entity::new(id);
        self.entities.push(EntityRecord {
            entity: entity.clone(),
            attached: BTreeMap::new(),
        });
        entity
    }

    fn record_mut(&mut self, entity: &Entity) -> BehaviorResult<&mut EntityRecord> {
        self.entities
            .iter_mut()
            .find(|record| record.entity.ptr_eq(entity))
            .ok_or_else(|| BehaviorError::UnknownEntity(entity.id()))
    }

    fn record(&self, entity: &Entity) -> Option<&EntityRecord> {
        self.entities
            .iter()
            .find(|record| record.entity.ptr_eq(entity))
    }

    /// 获取实体上的组件实例
    pub fn attachment(&self, entity: &Entity, attr_name: &str) -> Option<Attachment> {
        self.record(entity)
            .and_then(|record| record.attached.get(attr_name))
            .map(|attached| attached.attachment.clone())
    }

    /// 附着组件
    ///
    /// `data` 覆盖 schema 默认值；未附着的依赖组件先以默认数据附着。
    pub fn attach(
        &mut self,
        entity: &Entity,
        attr_name: &str,
        data: Option<Value>,
    ) -> BehaviorResult<Attachment> {
        let (name, _) = split_attr_name(attr_name);
        self.check_attachable(entity, attr_name)?;

        // 依赖顺序已展开，逐个附着即可，循环依赖不会递归
        for dep in self.registry.dependency_order(name)? {
            if dep != name && self.attachment(entity, &dep).is_none() {
                self.attach_one(entity, &dep, None)?;
            }
        }
        self.attach_one(entity, attr_name, data)
    }

    fn check_attachable(&mut self, entity: &Entity, attr_name: &str) -> BehaviorResult<()> {
        let (name, id) = split_attr_name(attr_name);
        let descriptor = self
            .registry
            .component(name)
            .ok_or_else(|| BehaviorError::UnknownBehavior(name.to_string()))?;

        if !id.is_empty() && !descriptor.multiple() {
            return Err(BehaviorError::InvalidMember {
                behavior: name.to_string(),
                member: attr_name.to_string(),
                reason: "component does not allow multiple instances".to_string(),
            });
        }
        if self.record_mut(entity)?.attached.contains_key(attr_name) {
            return Err(BehaviorError::DuplicateAttachment(attr_name.to_string()));
        }
        Ok(())
    }

    fn attach_one(
        &mut self,
        entity: &Entity,
        attr_name: &str,
        data: Option<Value>,
    ) -> BehaviorResult<Attachment> {
        let (name, id) = split_attr_name(attr_name);
        let descriptor = self
            .registry
            .component(name)
            .ok_or_else(|| BehaviorError::UnknownBehavior(name.to_string()))?;

        let data = merge_data(descriptor.schema().default_data(), data);
        let attachment =
            descriptor.create_attachment(HostContext::new(Some(entity.clone()), name, id));
        let mut subscriptions = initialize_attachment(&attachment, data)?;
        attachment.update(Value::object())?;
        if self.playing {
            attachment.play()?;
        } else {
            // 暂停中附着的组件在恢复播放时才订阅事件
            detach_events(entity, &subscriptions);
            subscriptions.clear();
        }

        tracing::debug!(target: "host", "Attached {} to {}", attr_name, entity.id());
        self.record_mut(entity)?.attached.insert(
            attr_name.to_string(),
            Attached {
                attachment: attachment.clone(),
                subscriptions,
            },
        );
        Ok(attachment)
    }

    /// 移除组件：取消事件订阅并调用 `remove`
    pub fn detach(&mut self, entity: &Entity, attr_name: &str) -> BehaviorResult<()> {
        let attached = self
            .record_mut(entity)?
            .attached
            .remove(attr_name)
            .ok_or_else(|| BehaviorError::UnknownBehavior(attr_name.to_string()))?;
        detach_events(entity, &attached.subscriptions);
        attached.attachment.remove()
    }

    /// 每帧调用：先系统，后组件
    pub fn tick(&self, time: f64, delta: f64) -> BehaviorResult<()> {
        if !self.playing {
            return Ok(());
        }
        for system in self.systems.values() {
            system.tick(time, delta)?;
        }
        for attachment in self.attachments() {
            attachment.tick(time, delta)?;
        }
        for attachment in self.attachments() {
            attachment.tock(time, delta)?;
        }
        Ok(())
    }

    /// 暂停：调用 `pause` 并取消组件的事件订阅
    pub fn pause(&mut self) -> BehaviorResult<()> {
        if !self.playing {
            return Ok(());
        }
        self.playing = false;
        for system in self.systems.values() {
            system.pause()?;
        }
        for record in &mut self.entities {
            for attached in record.attached.values_mut() {
                detach_events(&record.entity, &attached.subscriptions);
                attached.subscriptions.clear();
                attached.attachment.pause()?;
            }
        }
        Ok(())
    }

    /// 恢复播放：重新订阅组件的事件并调用 `play`
    pub fn play(&mut self) -> BehaviorResult<()> {
        if self.playing {
            return Ok(());
        }
        self.playing = true;
        for system in self.systems.values() {
            system.play()?;
        }
        for record in &mut self.entities {
            for attached in record.attached.values_mut() {
                attached.subscriptions = attach_events(&attached.attachment)?;
                attached.attachment.play()?;
            }
        }
        Ok(())
    }

    fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.entities
            .iter()
            .flat_map(|record| record.attached.values().map(|attached| &attached.attachment))
    }
}

/// 拆分 `name__id`
pub fn split_attr_name(attr_name: &str) -> (&str, &str) {
    attr_name
        .split_once(MULTIPLE_SEPARATOR)
        .unwrap_or((attr_name, ""))
}

/// 用传入的数据覆盖默认数据（只合并顶层对象）
fn merge_data(defaults: Value, data: Option<Value>) -> Value {
    match (defaults, data) {
        (Value::Object(mut base), Some(Value::Object(overrides))) => {
            base.extend(overrides);
            Value::Object(base)
        }
        (_, Some(data)) => data,
        (defaults, None) => defaults,
    }
}
