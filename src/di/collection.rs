use super::provider::{ServiceProvider, ServiceScope};
use super::Lifetime;
use crate::error::Result;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub(crate) type AnyService = Arc<dyn Any + Send + Sync>;
pub(crate) type Factory = Arc<dyn Fn(&ServiceScope) -> Result<AnyService> + Send + Sync>;

/// A registered service: its lifetime and how to build it
#[derive(Clone)]
pub struct ServiceDescriptor {
    pub(crate) type_name: &'static str,
    pub(crate) lifetime: Lifetime,
    pub(crate) factory: Factory,
}

impl ServiceDescriptor {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("type_name", &self.type_name)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

/// Mutable registration list, frozen by `build`
///
/// Registering the same type twice replaces the earlier registration.
#[derive(Default, Clone, Debug)]
pub struct ServiceCollection {
    descriptors: HashMap<TypeId, ServiceDescriptor>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Result<T> + Send + Sync + 'static,
    {
        self.add::<T, F>(Lifetime::Singleton, factory)
    }

    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Result<T> + Send + Sync + 'static,
    {
        self.add::<T, F>(Lifetime::Scoped, factory)
    }

    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Result<T> + Send + Sync + 'static,
    {
        self.add::<T, F>(Lifetime::Transient, factory)
    }

    /// Register an already-built singleton
    pub fn add_instance<T>(&mut self, instance: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        let instance: AnyService = Arc::new(instance);
        self.register::<T>(ServiceDescriptor {
            type_name: type_name::<T>(),
            lifetime: Lifetime::Singleton,
            factory: Arc::new(move |_: &ServiceScope| Ok(instance.clone())),
        })
    }

    pub fn add<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Result<T> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |scope: &ServiceScope| {
            let service = factory(scope)?;
            Ok(Arc::new(service) as AnyService)
        });

        self.register::<T>(ServiceDescriptor {
            type_name: type_name::<T>(),
            lifetime,
            factory,
        })
    }

    fn register<T: 'static>(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        let name = descriptor.type_name;
        let lifetime = descriptor.lifetime;
        if self
            .descriptors
            .insert(TypeId::of::<T>(), descriptor)
            .is_some()
        {
            debug!(service = name, %lifetime, "Replacing existing service registration");
        }
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.descriptors.contains_key(&TypeId::of::<T>())
    }

    pub fn lifetime_of<T: 'static>(&self) -> Option<Lifetime> {
        self.descriptors
            .get(&TypeId::of::<T>())
            .map(ServiceDescriptor::lifetime)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Freeze the registrations into a provider
    pub fn build(self) -> ServiceProvider {
        debug!(services = self.descriptors.len(), "Building service provider");
        ServiceProvider::new(self.descriptors)
    }
}
