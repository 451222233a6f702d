use crate::{McpError, Server, Transport};

/// A type that can build and start its server, so that servers declared in one crate can be
/// started from another. Implemented by [`global_server`](crate::global_server).
#[trait_variant::make(ServerProvider: Send)]
pub trait LocalServerProvider {
    /// Create the server, and start serving it over `transport`.
    async fn create_and_start_server<T: Transport + 'static>(
        &self,
        transport: T,
    ) -> Result<Server, McpError>;
}
