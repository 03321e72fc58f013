//! Per-domain cache façades.
//!
//! Each façade fixes its [`Domain`] and names the resources it caches, so
//! call sites cannot mix up `"post"` and `"posts"` or file a profile entry
//! under another domain.

use std::future::Future;
use std::marker::PhantomData;

use serde_json::Value;
use vigil_core::{CallerIdentity, Domain, Mutation, Result};

use super::fingerprint::QueryFingerprint;
use super::invalidation::InvalidationResult;
use super::keys::RESPONSE_RESOURCE;
use super::resource::{Fetched, ResourceCache};

/// A named resource inside one domain.
pub trait CacheResource: Copy + Send + Sync + 'static {
    const DOMAIN: Domain;

    /// Key segment for the resource.
    fn as_str(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminResource {
    Users,
    Roles,
}

impl CacheResource for AdminResource {
    const DOMAIN: Domain = Domain::Admin;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Roles => "roles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlogResource {
    Post,
    Category,
    Tag,
}

impl CacheResource for BlogResource {
    const DOMAIN: Domain = Domain::Blog;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceResource {
    Folder,
}

impl CacheResource for WorkspaceResource {
    const DOMAIN: Domain = Domain::Workspace;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
        }
    }
}

/// Cache of one domain's lists, counts and details.
#[derive(Clone)]
pub struct DomainCache<R> {
    cache: ResourceCache,
    _resource: PhantomData<fn() -> R>,
}

pub type AdminCache = DomainCache<AdminResource>;
pub type BlogCache = DomainCache<BlogResource>;
pub type WorkspaceCache = DomainCache<WorkspaceResource>;

impl<R: CacheResource> DomainCache<R> {
    pub fn new(cache: ResourceCache) -> Self {
        Self {
            cache,
            _resource: PhantomData,
        }
    }

    pub fn domain(&self) -> Domain {
        R::DOMAIN
    }

    pub async fn list<F, Fut>(
        &self,
        resource: R,
        fingerprint: &QueryFingerprint,
        loader: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        self.cache
            .fetch_list(R::DOMAIN, resource.as_str(), fingerprint, loader)
            .await
    }

    pub async fn count<F, Fut>(&self, resource: R, loader: F) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        self.cache
            .fetch_count(R::DOMAIN, resource.as_str(), loader)
            .await
    }

    pub async fn detail<F, Fut>(&self, resource: R, id: &str, loader: F) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        self.cache
            .fetch_detail(R::DOMAIN, resource.as_str(), id, loader)
            .await
    }

    pub async fn invalidate(&self, resource: R) -> InvalidationResult {
        self.cache
            .invalidate_collection(R::DOMAIN, resource.as_str())
            .await
    }

    pub async fn after_mutation(
        &self,
        resource: R,
        mutation: Mutation,
        id: Option<&str>,
    ) -> InvalidationResult {
        self.cache
            .after_mutation(R::DOMAIN, resource.as_str(), mutation, id)
            .await
    }
}

impl WorkspaceCache {
    /// Folder list of one workspace. Every workspace gets its own list
    /// variants; all of them live in the same index so a folder write
    /// invalidates them together.
    pub async fn folders_in<F, Fut>(
        &self,
        workspace_id: &str,
        fingerprint: &QueryFingerprint,
        loader: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        self.list(
            WorkspaceResource::Folder,
            &fingerprint.scoped(workspace_id),
            loader,
        )
        .await
    }
}

/// Secciones del perfil del usuario autenticado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSection {
    Account,
    Addresses,
    Preferences,
}

impl ProfileSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Addresses => "addresses",
            Self::Preferences => "preferences",
        }
    }
}

/// Cache del perfil. Cada entrada es el detalle de una sección cuyo id es el
/// subject del llamador, por lo que nunca se comparte entre usuarios.
#[derive(Clone)]
pub struct ProfileCache {
    cache: ResourceCache,
}

impl ProfileCache {
    pub fn new(cache: ResourceCache) -> Self {
        Self { cache }
    }

    /// Falla con `AuthenticationRequired` antes de tocar el store o el loader
    /// si no hay subject.
    pub async fn fetch<F, Fut>(
        &self,
        identity: &CallerIdentity,
        section: ProfileSection,
        loader: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        let subject = identity.require_subject()?;
        self.cache
            .fetch_detail(Domain::Profile, section.as_str(), subject, loader)
            .await
    }

    pub async fn invalidate(
        &self,
        identity: &CallerIdentity,
        section: ProfileSection,
    ) -> Result<InvalidationResult> {
        let subject = identity.require_subject()?;
        Ok(self
            .cache
            .invalidate_detail(Domain::Profile, section.as_str(), subject)
            .await)
    }
}

/// Recurso de pedidos en ecommerce.
pub const ORDER_RESOURCE: &str = "order";

/// Cache de ecommerce: respuestas completas del upstream.
#[derive(Clone)]
pub struct EcommerceCache {
    cache: ResourceCache,
}

impl EcommerceCache {
    pub fn new(cache: ResourceCache) -> Self {
        Self { cache }
    }

    pub async fn fetch_response<F, Fut>(
        &self,
        path: &str,
        query: &str,
        accept_language: Option<&str>,
        identity: &CallerIdentity,
        loader: F,
    ) -> Result<Fetched<Value>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        self.cache
            .fetch_response(path, query, accept_language, identity, loader)
            .await
    }

    /// Borra todas las respuestas cacheadas.
    pub async fn invalidate_responses(&self) -> InvalidationResult {
        self.cache
            .invalidate_collection(Domain::Ecommerce, RESPONSE_RESOURCE)
            .await
    }

    /// Un pedido nuevo o modificado deja obsoletas sus listas, su detalle y
    /// cualquier respuesta que lo incluya.
    pub async fn after_order_mutation(
        &self,
        mutation: Mutation,
        order_id: Option<&str>,
    ) -> InvalidationResult {
        let orders = self
            .cache
            .after_mutation(Domain::Ecommerce, ORDER_RESOURCE, mutation, order_id)
            .await;
        orders.merge(self.invalidate_responses().await)
    }
}

impl ResourceCache {
    pub fn admin(&self) -> AdminCache {
        DomainCache::new(self.clone())
    }

    pub fn blog(&self) -> BlogCache {
        DomainCache::new(self.clone())
    }

    pub fn workspace(&self) -> WorkspaceCache {
        DomainCache::new(self.clone())
    }

    pub fn profile(&self) -> ProfileCache {
        ProfileCache::new(self.clone())
    }

    pub fn ecommerce(&self) -> EcommerceCache {
        EcommerceCache::new(self.clone())
    }
}
