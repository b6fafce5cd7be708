use super::collection::{AnyService, Factory, ServiceDescriptor};
use super::Lifetime;
use crate::error::{AuthError, Result};
use dashmap::DashMap;
use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

thread_local! {
    // Factories are synchronous, so nested resolves on one thread form a stack.
    static RESOLVING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Identifier of a service scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(Uuid);

impl ScopeId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct ProviderInner {
    descriptors: HashMap<TypeId, ServiceDescriptor>,
    singletons: DashMap<TypeId, AnyService>,
}

/// Root of a frozen service registration
///
/// Cheap to clone; clones share registrations and singleton instances.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    pub(crate) fn new(descriptors: HashMap<TypeId, ServiceDescriptor>) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                descriptors,
                singletons: DashMap::new(),
            }),
        }
    }

    /// Open a new scope; scoped services are cached per scope
    pub fn create_scope(&self) -> ServiceScope {
        let scope = ServiceScope {
            id: ScopeId::new(),
            inner: self.inner.clone(),
            instances: DashMap::new(),
            is_root: false,
        };
        trace!(scope_id = %scope.id, "Created service scope");
        scope
    }

    /// Resolve a singleton or transient service without a scope
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.root_scope().resolve::<T>()
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.inner.descriptors.contains_key(&TypeId::of::<T>())
    }

    fn root_scope(&self) -> ServiceScope {
        ServiceScope {
            id: ScopeId::new(),
            inner: self.inner.clone(),
            instances: DashMap::new(),
            is_root: true,
        }
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("services", &self.inner.descriptors.len())
            .field("singletons", &self.inner.singletons.len())
            .finish()
    }
}

/// A resolution scope, typically one per request
pub struct ServiceScope {
    id: ScopeId,
    inner: Arc<ProviderInner>,
    instances: DashMap<TypeId, AnyService>,
    is_root: bool,
}

impl ServiceScope {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Number of scoped instances created so far
    pub fn scoped_count(&self) -> usize {
        self.instances.len()
    }

    /// Resolve a registered service
    ///
    /// Scoped services are built once per scope, singletons once per
    /// provider, transients on every call. Factories may resolve further
    /// services from the scope they are handed.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let name = type_name::<T>();
        let service = self.resolve_any(TypeId::of::<T>(), name)?;
        service
            .downcast::<T>()
            .map_err(|_| AuthError::Internal(format!("Service type mismatch for {}", name)))
    }

    /// Resolve a service if it is registered
    pub fn try_resolve<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>> {
        if !self.inner.descriptors.contains_key(&TypeId::of::<T>()) {
            return Ok(None);
        }
        self.resolve::<T>().map(Some)
    }

    fn resolve_any(&self, id: TypeId, name: &'static str) -> Result<AnyService> {
        let descriptor = self
            .inner
            .descriptors
            .get(&id)
            .ok_or(AuthError::ServiceNotRegistered(name))?;

        let _guard = ResolutionGuard::enter(id, name)?;

        match descriptor.lifetime {
            Lifetime::Transient => self.build(&descriptor.factory, name),
            Lifetime::Scoped => {
                if self.is_root {
                    return Err(AuthError::ScopedFromRoot(name));
                }
                self.cached(&self.instances, id, &descriptor.factory, name)
            }
            Lifetime::Singleton => {
                // Singletons only see the root, so they cannot capture scoped services.
                let root = ServiceScope {
                    id: self.id,
                    inner: self.inner.clone(),
                    instances: DashMap::new(),
                    is_root: true,
                };
                root.cached(&self.inner.singletons, id, &descriptor.factory, name)
            }
        }
    }

    fn cached(
        &self,
        cache: &DashMap<TypeId, AnyService>,
        id: TypeId,
        factory: &Factory,
        name: &'static str,
    ) -> Result<AnyService> {
        if let Some(existing) = cache.get(&id) {
            return Ok(existing.value().clone());
        }

        // Built outside the map lock so the factory can resolve other services.
        let created = self.build(factory, name)?;
        let stored = cache.entry(id).or_insert(created).value().clone();
        Ok(stored)
    }

    fn build(&self, factory: &Factory, name: &'static str) -> Result<AnyService> {
        trace!(scope_id = %self.id, service = name, "Constructing service");
        factory(self).map_err(|e| match e {
            AuthError::Factory { .. }
            | AuthError::CircularDependency(_)
            | AuthError::ScopedFromRoot(_)
            | AuthError::ServiceNotRegistered(_) => e,
            other => AuthError::Factory {
                service: name,
                message: other.to_string(),
            },
        })
    }
}

impl fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceScope")
            .field("id", &self.id)
            .field("scoped", &self.instances.len())
            .field("is_root", &self.is_root)
            .finish()
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        if !self.is_root && !self.instances.is_empty() {
            debug!(
                scope_id = %self.id,
                services = self.instances.len(),
                "Disposing service scope"
            );
        }
    }
}

struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(id: TypeId, name: &'static str) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&id) {
                return Err(AuthError::CircularDependency(name));
            }
            stack.push(id);
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
