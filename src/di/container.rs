use crate::error::{Result, StarterError};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Casts an implementation instance to an `Arc<dyn Trait>`, boxed again as `Arc<dyn Any>`.
type CasterFn =
    Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync>;

/// Thread-safe service container
///
/// Holds the handler, its configuration and its status registry, and lets the
/// application bind its own [`ExceptionFilter`](crate::ExceptionFilter)
/// before the defaults are installed.
pub struct Container {
    services: DashMap<TypeId, ServiceEntry>,
    trait_mappings: DashMap<TypeId, TypeId>,
    casters: DashMap<TypeId, CasterFn>,
}

impl Clone for Container {
    fn clone(&self) -> Self {
        Self {
            services: self.services.clone(),
            trait_mappings: self.trait_mappings.clone(),
            casters: self.casters.clone(),
        }
    }
}

#[derive(Clone)]
struct ServiceEntry {
    instance: Arc<dyn Any + Send + Sync>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            trait_mappings: DashMap::new(),
            casters: DashMap::new(),
        }
    }

    pub fn register<T: 'static + Send + Sync>(&mut self, instance: T) -> &mut Self {
        let type_id = TypeId::of::<T>();
        let entry = ServiceEntry {
            instance: Arc::new(instance),
        };
        self.services.insert(type_id, entry);
        self
    }

    pub fn register_trait<Trait, Impl, F>(&mut self, caster_fn: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        Impl: 'static + Send + Sync,
        F: Fn(Arc<Impl>) -> Arc<Trait> + 'static + Send + Sync,
    {
        let trait_id = TypeId::of::<Trait>();
        let impl_id = TypeId::of::<Impl>();

        self.trait_mappings.insert(trait_id, impl_id);

        let caster: CasterFn = Arc::new(
            move |instance: Arc<dyn Any + Send + Sync>| -> Option<Arc<dyn Any + Send + Sync>> {
                let concrete = instance.downcast::<Impl>().ok()?;
                let trait_obj: Arc<Trait> = caster_fn(concrete);
                let wrapped: Arc<dyn Any + Send + Sync> = Arc::new(trait_obj);
                Some(wrapped)
            },
        );

        self.casters.insert(trait_id, caster);
        self
    }

    pub fn resolve<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        let requested_type_id = TypeId::of::<T>();
        let entry = self.services.get(&requested_type_id).ok_or_else(|| {
            StarterError::DependencyNotFound {
                type_name: std::any::type_name::<T>().to_string(),
            }
        })?;
        entry
            .instance
            .clone()
            .downcast::<T>()
            .map_err(|_| StarterError::DowncastFailed {
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    pub fn resolve_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        let requested_type_id = TypeId::of::<T>();

        let caster = self.casters.get(&requested_type_id).ok_or_else(|| {
            StarterError::DependencyNotFound {
                type_name: std::any::type_name::<T>().to_string(),
            }
        })?;

        let impl_type_id = *self.trait_mappings.get(&requested_type_id).ok_or_else(|| {
            StarterError::DependencyNotFound {
                type_name: format!(
                    "No implementation mapping found for trait '{}'",
                    std::any::type_name::<T>()
                ),
            }
        })?;

        let entry =
            self.services
                .get(&impl_type_id)
                .ok_or_else(|| StarterError::DependencyNotFound {
                    type_name: format!(
                        "Implementation for trait '{}' not registered",
                        std::any::type_name::<T>()
                    ),
                })?;

        let downcast_failed = || StarterError::DowncastFailed {
            type_name: std::any::type_name::<T>().to_string(),
        };

        // The caster hands back an Arc<Arc<T>> behind `dyn Any`.
        let wrapper = (caster.value())(entry.instance.clone())
            .ok_or_else(downcast_failed)?
            .downcast::<Arc<T>>()
            .map_err(|_| downcast_failed())?;
        Ok(wrapper.as_ref().clone())
    }

    /// Whether `T`, a service or a bound trait, is registered
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.services.contains_key(&type_id) || self.trait_mappings.contains_key(&type_id)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Settings {
        value: i32,
    }

    trait Renderer: Send + Sync {
        fn render(&self) -> i32;
    }

    struct PlainRenderer {
        value: i32,
    }

    impl Renderer for PlainRenderer {
        fn render(&self) -> i32 {
            self.value
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut container = Container::new();
        container.register(Settings { value: 42 });
        let settings = container.resolve::<Settings>().unwrap();
        assert_eq!(settings.value, 42);
    }

    #[test]
    fn test_register_and_resolve_trait() {
        let mut container = Container::new();
        container.register(PlainRenderer { value: 99 });
        container.register_trait::<dyn Renderer, PlainRenderer, _>(|i| i as Arc<dyn Renderer>);

        assert!(container.contains::<dyn Renderer>());
        let renderer = container.resolve_trait::<dyn Renderer>().unwrap();
        assert_eq!(renderer.render(), 99);
    }

    #[test]
    fn test_missing_dependency() {
        let container = Container::new();
        assert!(!container.contains::<Settings>());
        assert!(!container.contains::<dyn Renderer>());
        assert!(matches!(
            container.resolve::<Settings>(),
            Err(StarterError::DependencyNotFound { .. })
        ));
        assert!(matches!(
            container.resolve_trait::<dyn Renderer>(),
            Err(StarterError::DependencyNotFound { .. })
        ));
    }

    #[test]
    fn test_trait_bound_before_implementation() {
        let mut container = Container::new();
        container.register_trait::<dyn Renderer, PlainRenderer, _>(|i| i as Arc<dyn Renderer>);
        assert!(container.resolve_trait::<dyn Renderer>().is_err());

        container.register(PlainRenderer { value: 1 });
        assert_eq!(container.resolve_trait::<dyn Renderer>().unwrap().render(), 1);
    }
}
