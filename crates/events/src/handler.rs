use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::DomainEvent;

/// Outcome of one handler invocation. Errors are logged by the bus and never
/// reach the publisher.
pub type HandlerResult = anyhow::Result<()>;

/// Reacts to domain events of the types it was subscribed to.
///
/// Handlers run on their own task; a failing or panicking handler affects
/// nobody but itself. Delivery is at-most-once: the bus never retries.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Name used in diagnostics when this handler fails.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, event: Arc<DomainEvent>) -> HandlerResult;
}

/// Adapts an async closure into an [`EventHandler`].
///
/// ```ignore
/// bus.subscribe_fn("team.member.joined", "chat.add-member", move |event| {
///     let channels = channels.clone();
///     async move { channels.add_member(&event) }
/// });
/// ```
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> core::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<DomainEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Arc<DomainEvent>) -> HandlerResult {
        (self.f)(event).await
    }
}
