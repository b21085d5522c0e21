use async_trait::async_trait;

use crate::ModuleDescriptor;

/// A business capability managed by the [`crate::ModuleRegistry`].
///
/// `R` is the routing handle type of the surrounding web layer (an
/// `axum::Router` in the server). The registry never inspects it; it only
/// hands it back so the web layer can mount it under
/// [`ModuleDescriptor::base_path`].
///
/// Modules talk to each other only through the event bus. A module's
/// `initialize` may rely on every module listed in its dependencies having
/// already run its own `initialize` (and so subscribed its handlers).
#[async_trait]
pub trait Module<R>: Send + Sync + 'static {
    fn descriptor(&self) -> &ModuleDescriptor;

    /// One-shot initialization hook, run by the registry in dependency order.
    ///
    /// The default implementation only registers event handlers. Modules
    /// overriding it are expected to call [`Module::register_event_handlers`]
    /// themselves, as the last fallible step: the bus has no unsubscribe, so
    /// handlers subscribed before an error stay live even though the module
    /// ends up `Failed` and its router is never mounted.
    async fn initialize(&self) -> anyhow::Result<()> {
        self.register_event_handlers();
        Ok(())
    }

    fn router(&self) -> R;

    /// Subscribe this module's handlers on the event bus.
    fn register_event_handlers(&self) {}
}
