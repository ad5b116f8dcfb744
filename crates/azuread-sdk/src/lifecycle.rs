//! Lifecycle contract for relationship resources.
//!
//! A relationship resource is a child reference attached to a parent
//! directory object: an owner of an application, a member of a group or
//! directory role, an app role assignment, an API access grant. Every such
//! resource implements the remote half of the contract ([`Resource`]) and
//! [`Lifecycle`] supplies the other half, identical for all of them:
//!
//! - validation happens before any lock is taken,
//! - every operation except [`Lifecycle::exists`] runs under the parent's
//!   named lock and a per-operation deadline,
//! - a 404 is never an error: it means "gone" on read, "done" on delete and
//!   `false` on exists,
//! - creating something that already exists fails with
//!   [`ResourceError::AlreadyExists`] without mutating anything.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{RemoteFailure, ResourceError, ResourceResult};
use crate::ids::{DirectoryObjectId, IdError, RelationshipId};
use crate::locks::LockManager;
use crate::schema::{Attributes, Schema};
use crate::types::{ApiSurface, Operation, SurfaceRoutes, Timeouts};

/// What a remote lookup found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence<T> {
    /// The relationship exists.
    Present(T),
    /// The parent exists but does not carry the child reference.
    Absent,
    /// The parent object itself is gone.
    ParentGone,
}

impl<T> Presence<T> {
    /// Returns true for [`Presence::Present`].
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

/// Why a read found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoneReason {
    ParentDeleted,
    ReferenceAbsent,
}

/// Result of a read. `Gone` tells the host to drop the resource from state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    Present(T),
    Gone(GoneReason),
}

/// Per-call information handed to resource hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationContext {
    pub operation: Operation,
    pub surface: ApiSurface,
}

/// Remote half of the lifecycle contract.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Decoded resource state.
    type Model: Clone + fmt::Debug + Send + Sync;
    /// Error type of the remote client.
    type Error: RemoteFailure;

    /// Terraform type name, e.g. `azuread_application_owner`.
    fn resource_type(&self) -> &'static str;

    /// Resource type of the parent object, used to name the parent lock.
    fn lock_scope(&self) -> &'static str;

    /// Attribute table.
    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Builds a model from validated attributes.
    fn decode(&self, attrs: &Attributes) -> Result<Self::Model, String>;

    /// Produces host attributes from a model.
    fn encode(&self, model: &Self::Model) -> Attributes;

    /// Cross-field checks (mutually exclusive fields and the like).
    fn validate(&self, _model: &Self::Model) -> Result<(), String> {
        Ok(())
    }

    /// The parent object a model attaches to.
    fn parent_of(&self, model: &Self::Model) -> Result<DirectoryObjectId, String>;

    /// The ID a model will get, when it can be computed locally.
    fn planned_id(&self, _model: &Self::Model) -> Option<RelationshipId> {
        None
    }

    /// Parses an ID handed over by the host.
    fn parse_id(&self, id: &str) -> Result<RelationshipId, IdError> {
        RelationshipId::parse(id)
    }

    /// Whether any attribute can change without replacement.
    fn supports_update(&self) -> bool {
        false
    }

    /// Looks for an existing relationship matching `model`.
    async fn find(
        &self,
        ctx: OperationContext,
        model: &Self::Model,
    ) -> Result<Option<RelationshipId>, Self::Error>;

    /// Issues the remote mutation that creates the relationship.
    async fn add(
        &self,
        ctx: OperationContext,
        model: &Self::Model,
    ) -> Result<RelationshipId, Self::Error>;

    /// Reads the relationship back from the remote.
    async fn fetch(
        &self,
        ctx: OperationContext,
        id: &RelationshipId,
    ) -> Result<Presence<Self::Model>, Self::Error>;

    /// Moves `current` towards `desired`, returning the number of mutating
    /// calls issued. Zero means nothing needed to change.
    async fn converge(
        &self,
        _ctx: OperationContext,
        _id: &RelationshipId,
        _current: &Self::Model,
        _desired: &Self::Model,
    ) -> Result<usize, Self::Error> {
        Ok(0)
    }

    /// Removes the relationship.
    async fn remove(&self, ctx: OperationContext, id: &RelationshipId) -> Result<(), Self::Error>;
}

/// Lifecycle driver shared by all resources.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    locks: LockManager,
    routes: Arc<SurfaceRoutes>,
}

impl Lifecycle {
    /// Creates a driver around a lock registry and a surface routing table.
    #[must_use]
    pub fn new(locks: LockManager, routes: SurfaceRoutes) -> Self {
        Self {
            locks,
            routes: Arc::new(routes),
        }
    }

    /// The lock registry used by this driver.
    #[must_use]
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// The surface routing table used by this driver.
    #[must_use]
    pub fn routes(&self) -> &SurfaceRoutes {
        &self.routes
    }

    fn context<R: Resource>(&self, resource: &R, operation: Operation) -> OperationContext {
        OperationContext {
            operation,
            surface: self
                .routes
                .surface_for(resource.resource_type(), operation),
        }
    }

    /// Runs `work` while holding the parent lock, under the operation
    /// deadline. The guard lives inside the timed future, so a timeout or a
    /// cancelled caller releases the lock.
    async fn locked<R, T, F>(
        &self,
        resource: &R,
        operation: Operation,
        parent: &DirectoryObjectId,
        label: &str,
        work: F,
    ) -> ResourceResult<T>
    where
        R: Resource,
        F: Future<Output = ResourceResult<T>>,
    {
        let deadline = resource.timeouts().for_operation(operation);
        let name = LockManager::lock_name(resource.lock_scope(), parent.as_str());

        let guarded = async {
            let _guard = self.locks.lock(name).await;
            work.await
        };

        tokio::time::timeout(deadline, guarded)
            .await
            .unwrap_or_else(|_| {
                Err(ResourceError::Timeout {
                    operation,
                    id: label.to_string(),
                    after: deadline,
                })
            })
    }

    /// Creates the relationship described by `model` and returns its ID.
    #[instrument(skip_all, fields(resource_type = resource.resource_type()))]
    pub async fn create<R: Resource>(
        &self,
        resource: &R,
        model: &R::Model,
    ) -> ResourceResult<RelationshipId> {
        let resource_type = resource.resource_type();
        resource
            .validate(model)
            .map_err(|m| ResourceError::validation(resource_type, m))?;
        let parent = resource
            .parent_of(model)
            .map_err(|m| ResourceError::validation(resource_type, m))?;

        let label = resource
            .planned_id(model)
            .map_or_else(|| parent.to_string(), |id| id.to_string());
        let ctx = self.context(resource, Operation::Create);

        self.locked(resource, Operation::Create, &parent, &label, async {
            let existing = resource
                .find(ctx, model)
                .await
                .map_err(|e| ResourceError::remote(Operation::Create, &label, e))?;

            if let Some(existing) = existing {
                return Err(ResourceError::AlreadyExists {
                    resource_type: resource_type.to_string(),
                    id: existing.to_string(),
                });
            }

            let id = resource
                .add(ctx, model)
                .await
                .map_err(|e| ResourceError::remote(Operation::Create, &label, e))?;

            info!(id = %id, "created {resource_type}");
            Ok(id)
        })
        .await
    }

    /// Reads the relationship back. A missing parent or reference yields
    /// [`ReadOutcome::Gone`], never an error.
    #[instrument(skip_all, fields(resource_type = resource.resource_type(), id = %id))]
    pub async fn read<R: Resource>(
        &self,
        resource: &R,
        id: &RelationshipId,
    ) -> ResourceResult<ReadOutcome<R::Model>> {
        let label = id.to_string();
        let ctx = self.context(resource, Operation::Read);

        self.locked(resource, Operation::Read, id.parent(), &label, async {
            let presence = match resource.fetch(ctx, id).await {
                Ok(presence) => presence,
                Err(e) if e.is_not_found() => Presence::ParentGone,
                Err(e) => return Err(ResourceError::remote(Operation::Read, &label, e)),
            };

            Ok(match presence {
                Presence::Present(model) => ReadOutcome::Present(model),
                Presence::Absent => {
                    debug!("reference was not found, removing from state");
                    ReadOutcome::Gone(GoneReason::ReferenceAbsent)
                }
                Presence::ParentGone => {
                    debug!("parent object was not found, removing from state");
                    ReadOutcome::Gone(GoneReason::ParentDeleted)
                }
            })
        })
        .await
    }

    /// Converges the mutable attributes of an existing relationship to
    /// `desired`. Returns the number of mutating remote calls issued.
    #[instrument(skip_all, fields(resource_type = resource.resource_type(), id = %id))]
    pub async fn update<R: Resource>(
        &self,
        resource: &R,
        id: &RelationshipId,
        desired: &R::Model,
    ) -> ResourceResult<usize> {
        let resource_type = resource.resource_type();
        if !resource.supports_update() {
            return Err(ResourceError::UpdateNotSupported {
                resource_type: resource_type.to_string(),
            });
        }

        resource
            .validate(desired)
            .map_err(|m| ResourceError::validation(resource_type, m))?;
        let parent = resource
            .parent_of(desired)
            .map_err(|m| ResourceError::validation(resource_type, m))?;
        if !id.parent().matches(parent.as_str()) {
            return Err(ResourceError::validation(
                resource_type,
                format!(
                    "the parent of {id} cannot change from {} to {parent} without replacement",
                    id.parent()
                ),
            ));
        }

        let label = id.to_string();
        let ctx = self.context(resource, Operation::Update);

        self.locked(resource, Operation::Update, id.parent(), &label, async {
            let gone = || ResourceError::Gone {
                operation: Operation::Update,
                id: label.clone(),
            };

            let current = match resource.fetch(ctx, id).await {
                Ok(Presence::Present(current)) => current,
                Ok(Presence::Absent | Presence::ParentGone) => return Err(gone()),
                Err(e) if e.is_not_found() => return Err(gone()),
                Err(e) => return Err(ResourceError::remote(Operation::Update, &label, e)),
            };

            let calls = resource
                .converge(ctx, id, &current, desired)
                .await
                .map_err(|e| ResourceError::remote(Operation::Update, &label, e))?;

            if calls == 0 {
                debug!("already converged");
            } else {
                info!(calls, "updated {resource_type}");
            }
            Ok(calls)
        })
        .await
    }

    /// Removes the relationship. Removing something that is already gone
    /// succeeds.
    #[instrument(skip_all, fields(resource_type = resource.resource_type(), id = %id))]
    pub async fn delete<R: Resource>(&self, resource: &R, id: &RelationshipId) -> ResourceResult<()> {
        let label = id.to_string();
        let ctx = self.context(resource, Operation::Delete);

        self.locked(resource, Operation::Delete, id.parent(), &label, async {
            match resource.remove(ctx, id).await {
                Ok(()) => {
                    info!("deleted {}", resource.resource_type());
                    Ok(())
                }
                Err(e) if e.is_not_found() => {
                    debug!("already absent");
                    Ok(())
                }
                Err(e) => Err(ResourceError::remote(Operation::Delete, &label, e)),
            }
        })
        .await
    }

    /// Returns whether the relationship exists. Missing parents and missing
    /// references are `false`; only transport and decoding failures error.
    #[instrument(skip_all, fields(resource_type = resource.resource_type(), id = %id))]
    pub async fn exists<R: Resource>(&self, resource: &R, id: &RelationshipId) -> ResourceResult<bool> {
        let deadline = resource.timeouts().for_operation(Operation::Exists);
        let ctx = self.context(resource, Operation::Exists);

        let check = async {
            match resource.fetch(ctx, id).await {
                Ok(presence) => Ok(presence.is_present()),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(ResourceError::remote(Operation::Exists, id, e)),
            }
        };

        tokio::time::timeout(deadline, check)
            .await
            .unwrap_or_else(|_| {
                Err(ResourceError::Timeout {
                    operation: Operation::Exists,
                    id: id.to_string(),
                    after: deadline,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use thiserror::Error;

    const PARENT: &str = "00000000-0000-0000-0000-00000000000a";
    const CHILD: &str = "00000000-0000-0000-0000-00000000000b";

    #[derive(Debug, Error)]
    enum FakeError {
        #[error("not found")]
        NotFound,
        #[error("boom")]
        Boom,
    }

    impl RemoteFailure for FakeError {
        fn is_not_found(&self) -> bool {
            matches!(self, Self::NotFound)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Link {
        parent: String,
        child: String,
        tags: Vec<String>,
    }

    fn link(parent: &str, child: &str) -> Link {
        Link {
            parent: parent.to_string(),
            child: child.to_string(),
            tags: Vec::new(),
        }
    }

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::string("parent", "Parent").required().force_new(),
        FieldSpec::string("child", "Child").required().force_new(),
        FieldSpec::string_set("tags", "Tags"),
    ];

    /// In-memory directory of parents and their child references.
    #[derive(Default)]
    struct FakeDirectory {
        parents: Mutex<HashMap<String, HashMap<String, Vec<String>>>>,
        mutations: AtomicUsize,
        fail: AtomicBool,
        slow: AtomicBool,
        updatable: bool,
        timeouts: Option<Timeouts>,
    }

    impl FakeDirectory {
        fn with_parent(parent: &str) -> Self {
            let dir = Self::default();
            dir.add_parent(parent);
            dir
        }

        fn add_parent(&self, parent: &str) {
            self.parents
                .lock()
                .unwrap()
                .insert(parent.to_string(), HashMap::new());
        }

        fn drop_parent(&self, parent: &str) {
            self.parents.lock().unwrap().remove(parent);
        }

        fn drop_child(&self, parent: &str, child: &str) {
            if let Some(children) = self.parents.lock().unwrap().get_mut(parent) {
                children.remove(child);
            }
        }

        fn children(&self, parent: &str) -> usize {
            self.parents
                .lock()
                .unwrap()
                .get(parent)
                .map_or(0, HashMap::len)
        }

        fn mutations(&self) -> usize {
            self.mutations.load(Ordering::SeqCst)
        }

        fn id(parent: &str, child: &str) -> RelationshipId {
            RelationshipId::new(
                DirectoryObjectId::parse(parent).unwrap(),
                DirectoryObjectId::parse(child).unwrap(),
            )
        }
    }

    #[async_trait]
    impl Resource for FakeDirectory {
        type Model = Link;
        type Error = FakeError;

        fn resource_type(&self) -> &'static str {
            "test_link"
        }

        fn lock_scope(&self) -> &'static str {
            "test_parent"
        }

        fn schema(&self) -> Schema {
            Schema::new(FIELDS)
        }

        fn timeouts(&self) -> Timeouts {
            self.timeouts.unwrap_or_default()
        }

        fn decode(&self, attrs: &Attributes) -> Result<Link, String> {
            Ok(Link {
                parent: attrs.required_string("parent").map_err(|e| e.to_string())?.to_string(),
                child: attrs.required_string("child").map_err(|e| e.to_string())?.to_string(),
                tags: attrs.string_set("tags"),
            })
        }

        fn encode(&self, model: &Link) -> Attributes {
            Attributes::new()
                .with_string("parent", &model.parent)
                .with_string("child", &model.child)
                .with_string_set("tags", model.tags.clone())
        }

        fn validate(&self, model: &Link) -> Result<(), String> {
            DirectoryObjectId::parse(&model.child).map_err(|e| e.to_string())?;
            if model.parent == model.child {
                return Err("an object cannot reference itself".to_string());
            }
            Ok(())
        }

        fn parent_of(&self, model: &Link) -> Result<DirectoryObjectId, String> {
            DirectoryObjectId::parse(&model.parent).map_err(|e| e.to_string())
        }

        fn supports_update(&self) -> bool {
            self.updatable
        }

        async fn find(
            &self,
            _ctx: OperationContext,
            model: &Link,
        ) -> Result<Option<RelationshipId>, FakeError> {
            let parents = self.parents.lock().unwrap();
            let children = parents.get(&model.parent).ok_or(FakeError::NotFound)?;
            Ok(children
                .contains_key(&model.child)
                .then(|| Self::id(&model.parent, &model.child)))
        }

        async fn add(&self, _ctx: OperationContext, model: &Link) -> Result<RelationshipId, FakeError> {
            self.mutations.fetch_add(1, Ordering::SeqCst);

            // Read-modify-write with a suspension point in between, so
            // concurrent unsynchronised callers would lose updates.
            let mut snapshot = {
                let parents = self.parents.lock().unwrap();
                parents.get(&model.parent).cloned().ok_or(FakeError::NotFound)?
            };
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
            snapshot.insert(model.child.clone(), model.tags.clone());
            self.parents
                .lock()
                .unwrap()
                .insert(model.parent.clone(), snapshot);

            Ok(Self::id(&model.parent, &model.child))
        }

        async fn fetch(
            &self,
            _ctx: OperationContext,
            id: &RelationshipId,
        ) -> Result<Presence<Link>, FakeError> {
            if self.slow.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(FakeError::Boom);
            }

            let parents = self.parents.lock().unwrap();
            let children = parents.get(id.parent().as_str()).ok_or(FakeError::NotFound)?;
            Ok(match children.get(id.child().as_str()) {
                Some(tags) => Presence::Present(Link {
                    parent: id.parent().to_string(),
                    child: id.child().to_string(),
                    tags: tags.clone(),
                }),
                None => Presence::Absent,
            })
        }

        async fn converge(
            &self,
            _ctx: OperationContext,
            id: &RelationshipId,
            current: &Link,
            desired: &Link,
        ) -> Result<usize, FakeError> {
            if current.tags == desired.tags {
                return Ok(0);
            }
            let mut parents = self.parents.lock().unwrap();
            let children = parents
                .get_mut(id.parent().as_str())
                .ok_or(FakeError::NotFound)?;
            children.insert(id.child().to_string(), desired.tags.clone());
            self.mutations.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        }

        async fn remove(&self, _ctx: OperationContext, id: &RelationshipId) -> Result<(), FakeError> {
            let mut parents = self.parents.lock().unwrap();
            let children = parents
                .get_mut(id.parent().as_str())
                .ok_or(FakeError::NotFound)?;
            children
                .remove(id.child().as_str())
                .ok_or(FakeError::NotFound)?;
            self.mutations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let dir = FakeDirectory::with_parent(PARENT);
        let lifecycle = Lifecycle::default();

        let id = lifecycle.create(&dir, &link(PARENT, CHILD)).await.unwrap();
        assert_eq!(id.to_string(), format!("{PARENT}/{CHILD}"));

        let outcome = lifecycle.read(&dir, &id).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Present(link(PARENT, CHILD)));
        assert!(lifecycle.locks().held_names().is_empty());
    }

    #[tokio::test]
    async fn test_create_existing_fails_without_mutation() {
        let dir = FakeDirectory::with_parent(PARENT);
        let lifecycle = Lifecycle::default();

        lifecycle.create(&dir, &link(PARENT, CHILD)).await.unwrap();
        assert_eq!(dir.mutations(), 1);

        let err = lifecycle.create(&dir, &link(PARENT, CHILD)).await.unwrap_err();
        assert!(err.requires_import());
        assert!(err.to_string().contains(&format!("{PARENT}/{CHILD}")));
        assert_eq!(dir.mutations(), 1);
    }

    #[tokio::test]
    async fn test_read_reports_gone_reasons() {
        let dir = FakeDirectory::with_parent(PARENT);
        let lifecycle = Lifecycle::default();
        let id = lifecycle.create(&dir, &link(PARENT, CHILD)).await.unwrap();

        dir.drop_child(PARENT, CHILD);
        assert_eq!(
            lifecycle.read(&dir, &id).await.unwrap(),
            ReadOutcome::Gone(GoneReason::ReferenceAbsent)
        );

        dir.drop_parent(PARENT);
        assert_eq!(
            lifecycle.read(&dir, &id).await.unwrap(),
            ReadOutcome::Gone(GoneReason::ParentDeleted)
        );
    }

    #[tokio::test]
    async fn test_read_propagates_other_failures() {
        let dir = FakeDirectory::with_parent(PARENT);
        dir.fail.store(true, Ordering::SeqCst);
        let lifecycle = Lifecycle::default();

        let err = lifecycle
            .read(&dir, &FakeDirectory::id(PARENT, CHILD))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Remote { operation: Operation::Read, .. }));
        assert!(err.to_string().starts_with(&format!("retrieving {PARENT}/{CHILD}")));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = FakeDirectory::with_parent(PARENT);
        let lifecycle = Lifecycle::default();
        let id = lifecycle.create(&dir, &link(PARENT, CHILD)).await.unwrap();

        lifecycle.delete(&dir, &id).await.unwrap();
        assert_eq!(dir.children(PARENT), 0);

        lifecycle.delete(&dir, &id).await.unwrap();
        dir.drop_parent(PARENT);
        lifecycle.delete(&dir, &id).await.unwrap();
    }

    #[tokio::test]
    async fn test_exists() {
        let dir = FakeDirectory::with_parent(PARENT);
        let lifecycle = Lifecycle::default();
        let id = FakeDirectory::id(PARENT, CHILD);

        assert!(!lifecycle.exists(&dir, &id).await.unwrap());
        lifecycle.create(&dir, &link(PARENT, CHILD)).await.unwrap();
        assert!(lifecycle.exists(&dir, &id).await.unwrap());

        dir.drop_parent(PARENT);
        assert!(!lifecycle.exists(&dir, &id).await.unwrap());

        dir.fail.store(true, Ordering::SeqCst);
        assert!(lifecycle.exists(&dir, &id).await.is_err());
    }

    #[tokio::test]
    async fn test_exists_does_not_wait_for_lock() {
        let dir = FakeDirectory::with_parent(PARENT);
        let lifecycle = Lifecycle::default();
        let _held = lifecycle.locks().lock_by_name("test_parent", PARENT).await;

        let checked = tokio::time::timeout(
            Duration::from_millis(200),
            lifecycle.exists(&dir, &FakeDirectory::id(PARENT, CHILD)),
        )
        .await;
        assert!(checked.is_ok());
    }

    #[tokio::test]
    async fn test_validation_happens_before_lock() {
        let dir = FakeDirectory::with_parent(PARENT);
        let lifecycle = Lifecycle::default();
        let _held = lifecycle.locks().lock_by_name("test_parent", PARENT).await;

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            lifecycle.create(&dir, &link(PARENT, PARENT)),
        )
        .await
        .expect("validation must not wait for the lock");

        assert!(result.unwrap_err().is_validation());
        assert_eq!(dir.mutations(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_creates_on_one_parent_are_serialised() {
        let dir = Arc::new(FakeDirectory::with_parent(PARENT));
        let lifecycle = Lifecycle::default();

        let mut handles = Vec::new();
        for i in 0..8 {
            let dir = Arc::clone(&dir);
            let lifecycle = lifecycle.clone();
            handles.push(tokio::spawn(async move {
                let child = format!("00000000-0000-0000-0000-00000000010{i}");
                lifecycle.create(dir.as_ref(), &link(PARENT, &child)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(dir.children(PARENT), 8);
        assert!(lifecycle.locks().held_names().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_while_waiting_for_lock() {
        let dir = FakeDirectory {
            timeouts: Some(Timeouts::uniform(Duration::from_millis(50))),
            ..FakeDirectory::with_parent(PARENT)
        };
        let lifecycle = Lifecycle::default();
        let held = lifecycle.locks().lock_by_name("test_parent", PARENT).await;

        let err = lifecycle
            .delete(&dir, &FakeDirectory::id(PARENT, CHILD))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Timeout { operation: Operation::Delete, .. }));

        drop(held);
        assert!(lifecycle.locks().held_names().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_releases_lock() {
        let dir = FakeDirectory {
            timeouts: Some(Timeouts::uniform(Duration::from_millis(50))),
            ..FakeDirectory::with_parent(PARENT)
        };
        dir.slow.store(true, Ordering::SeqCst);
        let lifecycle = Lifecycle::default();

        let err = lifecycle
            .read(&dir, &FakeDirectory::id(PARENT, CHILD))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Timeout { .. }));
        assert!(!lifecycle
            .locks()
            .is_locked(&LockManager::lock_name("test_parent", PARENT)));
    }

    #[tokio::test]
    async fn test_update_converges_and_reports_calls() {
        let dir = FakeDirectory {
            updatable: true,
            ..FakeDirectory::with_parent(PARENT)
        };
        let lifecycle = Lifecycle::default();
        let id = lifecycle.create(&dir, &link(PARENT, CHILD)).await.unwrap();

        let desired = Link {
            tags: vec!["a".to_string()],
            ..link(PARENT, CHILD)
        };
        assert_eq!(lifecycle.update(&dir, &id, &desired).await.unwrap(), 1);
        assert_eq!(lifecycle.update(&dir, &id, &desired).await.unwrap(), 0);
        assert_eq!(
            lifecycle.read(&dir, &id).await.unwrap(),
            ReadOutcome::Present(desired)
        );
    }

    #[tokio::test]
    async fn test_update_rules() {
        let dir = FakeDirectory::with_parent(PARENT);
        let lifecycle = Lifecycle::default();
        let id = FakeDirectory::id(PARENT, CHILD);

        let err = lifecycle.update(&dir, &id, &link(PARENT, CHILD)).await.unwrap_err();
        assert!(matches!(err, ResourceError::UpdateNotSupported { .. }));

        let dir = FakeDirectory {
            updatable: true,
            ..FakeDirectory::with_parent(PARENT)
        };
        let other = "00000000-0000-0000-0000-0000000000ff";
        let err = lifecycle.update(&dir, &id, &link(other, CHILD)).await.unwrap_err();
        assert!(err.is_validation());

        let err = lifecycle.update(&dir, &id, &link(PARENT, CHILD)).await.unwrap_err();
        assert!(matches!(err, ResourceError::Gone { .. }));
    }

    #[tokio::test]
    async fn test_routes_reach_resource_context() {
        let routes = SurfaceRoutes::new().route("test_link", Operation::Delete, ApiSurface::Beta);
        let lifecycle = Lifecycle::new(LockManager::new(), routes);
        let dir = FakeDirectory::default();

        assert_eq!(
            lifecycle.context(&dir, Operation::Delete).surface,
            ApiSurface::Beta
        );
        assert_eq!(
            lifecycle.context(&dir, Operation::Read).surface,
            ApiSurface::Stable
        );
    }
}
