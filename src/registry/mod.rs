//! 行为注册
//!
//! 注册适配器把行为类转换为描述符并交给宿主的按名注册表。
//! `HostRegistry` 是宿主注册表的边界；`BehaviorRegistry` 是内置的内存实现。

use std::collections::{HashMap, HashSet};

use crate::behavior::{build_component, build_system, BehaviorClass, BehaviorDescriptor};
use crate::config::{BehaviorConfig, RegistryConfig};
use crate::core::error::{BehaviorError, BehaviorResult};
use crate::core::logging::init_logging;

/// 宿主的按名注册表
pub trait HostRegistry {
    /// 注册组件描述符
    fn register_component(
        &mut self,
        name: &str,
        descriptor: BehaviorDescriptor,
    ) -> BehaviorResult<()>;

    /// 注册系统描述符
    fn register_system(
        &mut self,
        name: &str,
        descriptor: BehaviorDescriptor,
    ) -> BehaviorResult<()>;
}

/// 构建组件描述符并注册
pub fn register_component<R: HostRegistry + ?Sized>(
    registry: &mut R,
    name: &str,
    class: &BehaviorClass,
) -> BehaviorResult<()> {
    registry.register_component(name, build_component(class))
}

/// 构建系统描述符并注册
pub fn register_system<R: HostRegistry + ?Sized>(
    registry: &mut R,
    name: &str,
    class: &BehaviorClass,
) -> BehaviorResult<()> {
    registry.register_system(name, build_system(class))
}

/// 内存注册表
#[derive(Debug, Default)]
pub struct BehaviorRegistry {
    components: HashMap<String, BehaviorDescriptor>,
    systems: HashMap<String, BehaviorDescriptor>,
    config: RegistryConfig,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 按主配置创建注册表，同时初始化日志
    pub fn from_config(config: &BehaviorConfig) -> Self {
        init_logging(&config.logging);
        tracing::debug!(
            target: "registry",
            "Registry created (allow_overwrite = {})",
            config.registry.allow_overwrite
        );
        Self::with_config(config.registry.clone())
    }

    pub fn component(&self, name: &str) -> Option<&BehaviorDescriptor> {
        self.components.get(name)
    }

    pub fn system(&self, name: &str) -> Option<&BehaviorDescriptor> {
        self.systems.get(name)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn has_system(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }

    /// 按名称排序的组件列表
    pub fn component_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 按名称排序的系统列表
    pub fn system_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.systems.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 移除组件（用于热重载）
    pub fn unregister_component(&mut self, name: &str) -> BehaviorResult<BehaviorDescriptor> {
        self.components
            .remove(name)
            .ok_or_else(|| BehaviorError::UnknownBehavior(name.to_string()))
    }

    /// 组件及其依赖的初始化顺序，依赖在前
    ///
    /// 依赖未注册时返回 `MissingDependency`；循环依赖只访问一次。
    pub fn dependency_order(&self, name: &str) -> BehaviorResult<Vec<String>> {
        if !self.components.contains_key(name) {
            return Err(BehaviorError::UnknownBehavior(name.to_string()));
        }

        fn visit(
            node: &str,
            components: &HashMap<String, BehaviorDescriptor>,
            visited: &mut HashSet<String>,
            order: &mut Vec<String>,
        ) -> BehaviorResult<()> {
            if !visited.insert(node.to_string()) {
                return Ok(());
            }
            if let Some(descriptor) = components.get(node) {
                for dep in descriptor.dependencies() {
                    if !components.contains_key(dep) {
                        return Err(BehaviorError::MissingDependency(
                            node.to_string(),
                            dep.clone(),
                        ));
                    }
                    visit(dep, components, visited, order)?;
                }
            }
            order.push(node.to_string());
            Ok(())
        }

        let mut visited = HashSet::new();
        let mut order = Vec::new();
        visit(name, &self.components, &mut visited, &mut order)?;
        Ok(order)
    }

    fn insert(
        map: &mut HashMap<String, BehaviorDescriptor>,
        allow_overwrite: bool,
        name: &str,
        descriptor: BehaviorDescriptor,
    ) -> BehaviorResult<()> {
        if map.contains_key(name) {
            if !allow_overwrite {
                return Err(BehaviorError::AlreadyRegistered(name.to_string()));
            }
            tracing::warn!(target: "registry", "Overwriting registered behavior: {}", name);
        }
        map.insert(name.to_string(), descriptor);
        Ok(())
    }
}

impl HostRegistry for BehaviorRegistry {
    fn register_component(
        &mut self,
        name: &str,
        descriptor: BehaviorDescriptor,
    ) -> BehaviorResult<()> {
        Self::insert(
            &mut self.components,
            self.config.allow_overwrite,
            name,
            descriptor,
        )?;
        tracing::debug!(target: "registry", "Registered component: {}", name);
        Ok(())
    }

    fn register_system(
        &mut self,
        name: &str,
        descriptor: BehaviorDescriptor,
    ) -> BehaviorResult<()> {
        Self::insert(
            &mut self.systems,
            self.config.allow_overwrite,
            name,
            descriptor,
        )?;
        tracing::debug!(target: "registry", "Registered system: {}", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{BehaviorKind, Value};

    fn class(name: &str, deps: &[&str]) -> BehaviorClass {
        deps.iter()
            .fold(BehaviorClass::builder(name), |builder, dep| builder.dependency(dep))
            .method("tick", |_, _| Ok(Value::Null))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_component_builds_descriptor() {
        let mut registry = BehaviorRegistry::new();
        register_component(&mut registry, "sample", &class("SampleComponent", &[])).unwrap();

        let descriptor = registry.component("sample").unwrap();
        assert_eq!(descriptor.kind(), BehaviorKind::Component);
        assert_eq!(descriptor.behavior_name(), "SampleComponent");
        assert!(descriptor.has_entry("init"));
        assert!(!registry.has_system("sample"));
    }

    #[test]
    fn test_register_system() {
        let mut registry = BehaviorRegistry::new();
        register_system(&mut registry, "sample", &class("SampleSystem", &[])).unwrap();

        assert_eq!(registry.system("sample").unwrap().kind(), BehaviorKind::System);
        assert_eq!(registry.system_names(), vec!["sample"]);
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = BehaviorRegistry::new();
        register_component(&mut registry, "a", &class("A", &[])).unwrap();

        assert_eq!(
            register_component(&mut registry, "a", &class("A", &[])),
            Err(BehaviorError::AlreadyRegistered("a".to_string()))
        );

        let mut lenient = BehaviorRegistry::with_config(RegistryConfig {
            allow_overwrite: true,
        });
        register_component(&mut lenient, "a", &class("A", &[])).unwrap();
        register_component(&mut lenient, "a", &class("A2", &[])).unwrap();
        assert_eq!(lenient.component("a").unwrap().behavior_name(), "A2");
    }

    #[test]
    fn test_from_config_applies_registry_settings() {
        let mut config = BehaviorConfig::default();
        config.logging.log_to_console = false;
        config.registry.allow_overwrite = true;

        let mut registry = BehaviorRegistry::from_config(&config);
        register_component(&mut registry, "a", &class("A", &[])).unwrap();
        register_component(&mut registry, "a", &class("A2", &[])).unwrap();
        assert_eq!(registry.component("a").unwrap().behavior_name(), "A2");
    }

    #[test]
    fn test_dependency_order() {
        let mut registry = BehaviorRegistry::new();
        register_component(&mut registry, "position", &class("Position", &[])).unwrap();
        register_component(&mut registry, "physics", &class("Physics", &["position"])).unwrap();
        register_component(&mut registry, "player", &class("Player", &["physics", "position"]))
            .unwrap();

        assert_eq!(
            registry.dependency_order("player").unwrap(),
            vec!["position", "physics", "player"]
        );
    }

    #[test]
    fn test_missing_dependency() {
        let mut registry = BehaviorRegistry::new();
        register_component(&mut registry, "player", &class("Player", &["physics"])).unwrap();

        assert_eq!(
            registry.dependency_order("player"),
            Err(BehaviorError::MissingDependency(
                "player".to_string(),
                "physics".to_string()
            ))
        );
        assert!(matches!(
            registry.dependency_order("ghost"),
            Err(BehaviorError::UnknownBehavior(_))
        ));
    }

    #[test]
    fn test_cyclic_dependencies_terminate() {
        let mut registry = BehaviorRegistry::new();
        register_component(&mut registry, "a", &class("A", &["b"])).unwrap();
        register_component(&mut registry, "b", &class("B", &["a"])).unwrap();

        assert_eq!(registry.dependency_order("a").unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_unregister() {
        let mut registry = BehaviorRegistry::new();
        register_component(&mut registry, "a", &class("A", &[])).unwrap();

        assert!(registry.unregister_component("a").is_ok());
        assert!(!registry.has_component("a"));
        assert!(registry.unregister_component("a").is_err());
    }
}
