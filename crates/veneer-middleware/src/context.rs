//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the pipeline.
//! The host creates exactly one per in-flight request and drops it when the
//! response has been produced.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;
use veneer_core::{CallerIdentity, RequestId};

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use veneer_middleware::context::MiddlewareContext;
/// use veneer_core::CallerIdentity;
///
/// let mut ctx = MiddlewareContext::new();
/// assert!(ctx.identity().is_anonymous());
///
/// let identity = CallerIdentity::parse("UserId", "6f1c2a4e-3b5d-4e7f-8a9b-0c1d2e3f4a5b").unwrap();
/// ctx.set_identity(identity);
/// assert!(ctx.user_id().is_some());
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// The identity of the caller.
    identity: CallerIdentity,

    /// When the request started processing.
    started_at: Instant,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a new middleware context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            identity: CallerIdentity::Anonymous,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the caller identity.
    #[must_use]
    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Sets the caller identity.
    pub fn set_identity(&mut self, identity: CallerIdentity) {
        self.identity = identity;
    }

    /// Returns the caller's user id, if one was supplied.
    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        self.identity.user_id()
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any earlier value of the
    /// same type.
    ///
    /// # Example
    ///
    /// ```
    /// use veneer_middleware::context::MiddlewareContext;
    ///
    /// struct TenantId(u32);
    ///
    /// let mut ctx = MiddlewareContext::new();
    /// ctx.set_extension(TenantId(7));
    /// assert_eq!(ctx.get_extension::<TenantId>().unwrap().0, 7);
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "6f1c2a4e-3b5d-4e7f-8a9b-0c1d2e3f4a5b";

    #[test]
    fn test_new_context_has_anonymous_identity() {
        let ctx = MiddlewareContext::new();
        assert!(ctx.identity().is_anonymous());
        assert!(ctx.user_id().is_none());
    }

    #[test]
    fn test_set_identity() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_identity(CallerIdentity::parse("UserId", ID).unwrap());
        assert_eq!(ctx.user_id().map(|u| u.to_string()).as_deref(), Some(ID));
    }

    #[test]
    fn test_contexts_are_independent() {
        let mut a = MiddlewareContext::new();
        let b = MiddlewareContext::new();
        a.set_identity(CallerIdentity::parse("UserId", ID).unwrap());

        assert_ne!(a.request_id(), b.request_id());
        assert!(b.identity().is_anonymous());
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, Clone, PartialEq)]
        struct MyExtension {
            value: i32,
        }

        let mut ctx = MiddlewareContext::new();

        assert!(!ctx.has_extension::<MyExtension>());
        assert!(ctx.get_extension::<MyExtension>().is_none());

        ctx.set_extension(MyExtension { value: 42 });
        assert!(ctx.has_extension::<MyExtension>());
        assert_eq!(
            ctx.get_extension::<MyExtension>(),
            Some(&MyExtension { value: 42 })
        );

        let removed = ctx.remove_extension::<MyExtension>();
        assert_eq!(removed, Some(MyExtension { value: 42 }));
        assert!(!ctx.has_extension::<MyExtension>());
    }

    #[test]
    fn test_elapsed_time() {
        let ctx = MiddlewareContext::new();
        std::thread::sleep(Duration::from_millis(10));
        assert!(ctx.elapsed() >= Duration::from_millis(10));
    }
}
