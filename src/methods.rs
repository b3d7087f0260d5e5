//! Method registry (component H's handler table).
//!
//! Read-mostly: dispatch (`get`) vastly outnumbers registration
//! (`register`), so a `DashMap` gives fine-grained per-entry locking
//! without a writer starving readers across the whole map (§5: "a
//! snapshot-per-dispatch or fine-grained locking strategy is acceptable").

use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ApiError;

/// A request's params object plus the authenticated claims injected as
/// `_user`, when present (§4.7 step 7).
pub type Params = serde_json::Map<String, Value>;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send>>;

/// A registered RPC method handler. Boxed so methods of differing
/// concrete closure types can share one map.
pub trait Handler: Send + Sync {
    fn call(&self, params: Params) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
{
    fn call(&self, params: Params) -> HandlerFuture {
        Box::pin((self)(params))
    }
}

/// Holds every registered method's handler. Re-registration is a
/// last-write-wins map update with a warn log (§9: "prototype-chained
/// override warning... is a simple last-write-wins map update").
#[derive(Clone, Default)]
pub struct MethodRegistry {
    handlers: Arc<DashMap<String, Arc<dyn Handler>>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` to `handler`. `name` must be non-empty.
    pub fn register(&self, name: impl Into<String>, handler: impl Handler + 'static) {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            tracing::warn!(method = %name, "overriding an already-registered method");
        }
        self.handlers.insert(name, Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_method_then_methods_contains_it() {
        let registry = MethodRegistry::new();
        registry.register("echo", |params: Params| async move {
            Ok(Value::Object(params))
        });
        assert!(registry.contains("echo"));
        assert_eq!(registry.names(), vec!["echo".to_string()]);

        let handler = registry.get("echo").unwrap();
        let mut params = Params::new();
        params.insert("m".to_string(), Value::String("hi".to_string()));
        let result = handler.call(params.clone()).await.unwrap();
        assert_eq!(result, Value::Object(params));
    }

    #[tokio::test]
    async fn re_registration_replaces_the_handler() {
        let registry = MethodRegistry::new();
        registry.register("m", |_: Params| async { Ok(Value::from(1)) });
        registry.register("m", |_: Params| async { Ok(Value::from(2)) });
        let result = registry.get("m").unwrap().call(Params::new()).await.unwrap();
        assert_eq!(result, Value::from(2));
    }
}
