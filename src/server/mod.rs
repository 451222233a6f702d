mod capabilities;
mod message;
pub mod methods;

use std::{
    collections::HashMap,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use derive_more::Deref;
use futures::{FutureExt, future::BoxFuture};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use capabilities::*;
pub use message::{JSONRPC_VERSION, Request, Response};

use crate::{McpError, Resource, Tool, ToolHandler, Toolbox, Transport};

use self::methods::{
    CallTool, CallToolParams, CallToolResult, Initialize, InitializeParams, InitializeResult,
    ListParams, ListResources, ListResourcesResult, ListTools, ListToolsResult, Method,
    PROTOCOL_VERSION, Ping,
};

type Responder =
    Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, Result<Value, McpError>> + Send + Sync>;

type InitializeHook = Arc<
    dyn Fn(Implementation, ClientCapabilities) -> BoxFuture<'static, Result<(), McpError>>
        + Send
        + Sync,
>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deserialize request parameters. Absent parameters are read as an empty object.
fn params<P: DeserializeOwned>(params: Option<Value>) -> Result<P, McpError> {
    serde_json::from_value(params.unwrap_or_else(|| json!({})))
        .map_err(|e| McpError::InvalidParams(e.to_string()))
}

/// A registered tool, with the function executing it if one was provided.
#[derive(Clone, Debug)]
struct RegisteredTool {
    tool: Tool,
    handler: Option<ToolHandler>,
}

pub struct ServerInner {
    info: Implementation,
    capabilities: ServerCapabilities,
    configuration: Configuration,

    tools: Mutex<Vec<RegisteredTool>>,
    resources: Mutex<Vec<Resource>>,
    methods: Mutex<HashMap<&'static str, Responder>>,
    hook: Mutex<Option<InitializeHook>>,

    initialized: AtomicBool,
    shutdown: watch::Sender<bool>,

    started: AtomicBool,
    completed: watch::Sender<bool>,
    outcome: Mutex<Option<Result<(), McpError>>>,
}

impl ServerInner {
    pub fn info(&self) -> &Implementation {
        &self.info
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Whether a client has completed initialization.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

/// An MCP server. Tools, resources and method handlers are registered on it, and it is then
/// started on a [`Transport`], serving requests on a background task until the client goes away
/// or [`Server::stop`] is called.
///
/// Cloning is cheap, and every clone refers to the same server.
#[derive(Clone, Deref)]
pub struct Server {
    inner: Arc<ServerInner>,
}

impl Server {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        capabilities: ServerCapabilities,
        configuration: Configuration,
    ) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                info: Implementation::new(name, version),
                capabilities,
                configuration,
                tools: Mutex::default(),
                resources: Mutex::default(),
                methods: Mutex::default(),
                hook: Mutex::default(),
                initialized: AtomicBool::new(false),
                shutdown: watch::Sender::new(false),
                started: AtomicBool::new(false),
                completed: watch::Sender::new(false),
                outcome: Mutex::default(),
            }),
        }
    }

    /// Register a tool. Tools without a handler are listed, but fail when called. Registering a
    /// tool with the name of an existing one replaces it.
    pub fn register_tool(&self, tool: Tool, handler: Option<ToolHandler>) {
        let mut tools = lock(&self.tools);
        let registered = RegisteredTool { tool, handler };

        match tools
            .iter_mut()
            .find(|existing| existing.tool.name == registered.tool.name)
        {
            Some(existing) => *existing = registered,
            None => tools.push(registered),
        }
    }

    pub fn register_resource(&self, resource: Resource) {
        lock(&self.resources).push(resource);
    }

    /// Register every tool of a toolbox, each dispatching to
    /// [`handle_tool_call`](Toolbox::handle_tool_call).
    pub fn register_toolbox<T>(&self, toolbox: Arc<T>)
    where
        T: Toolbox + Send + Sync + 'static,
    {
        debug!(toolbox = %toolbox.get_toolbox_info().name, "registering toolbox");

        for tool in toolbox.get_tools() {
            let toolbox = Arc::clone(&toolbox);
            let name = tool.name.clone();

            self.register_tool(
                tool,
                Some(ToolHandler::from_fn(move |arguments| {
                    toolbox.handle_tool_call(&name, arguments)
                })),
            );
        }
    }

    /// Answer `M` with `handler`, in place of any built-in behaviour.
    pub fn with_method_handler<M, F, Fut>(&self, _method: M, handler: F)
    where
        M: Method,
        F: Fn(M::Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Result, McpError>> + Send + 'static,
    {
        let responder: Responder = Arc::new(move |raw: Option<Value>| {
            match params::<M::Params>(raw) {
                Ok(params) => handler(params)
                    .map(|result| -> Result<Value, McpError> {
                        Ok(serde_json::to_value(result?)?)
                    })
                    .boxed(),
                Err(e) => futures::future::ready(Err(e)).boxed(),
            }
        });

        lock(&self.methods).insert(M::NAME, responder);
    }

    pub fn tools(&self) -> Vec<Tool> {
        lock(&self.tools)
            .iter()
            .map(|registered| registered.tool.clone())
            .collect()
    }

    pub fn resources(&self) -> Vec<Resource> {
        lock(&self.resources).clone()
    }

    /// Start serving on `transport`.
    pub async fn start<T: Transport + 'static>(&self, transport: T) -> Result<(), McpError> {
        self.spawn(transport)
    }

    /// Start serving on `transport`, running `hook` whenever a client initializes. An error from
    /// the hook fails the initialization.
    pub async fn start_with_hook<T, F, Fut>(&self, transport: T, hook: F) -> Result<(), McpError>
    where
        T: Transport + 'static,
        F: Fn(Implementation, ClientCapabilities) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), McpError>> + Send + 'static,
    {
        let hook: InitializeHook =
            Arc::new(move |client: Implementation, capabilities: ClientCapabilities| {
                hook(client, capabilities).boxed()
            });
        *lock(&self.hook) = Some(hook);

        self.spawn(transport)
    }

    fn spawn<T: Transport + 'static>(&self, transport: T) -> Result<(), McpError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(McpError::InternalError(
                "server already started".to_string(),
            ));
        }

        let shutdown = self.shutdown.subscribe();
        let server = self.clone();
        tokio::spawn(async move {
            let result = AssertUnwindSafe(server.clone().run(transport, shutdown))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(McpError::InternalError(
                        "server task panicked".to_string(),
                    ))
                });

            *lock(&server.outcome) = Some(result);
            server.completed.send_replace(true);
        });

        Ok(())
    }

    /// Wait for the message loop to finish. Every clone of the server may wait, but the error that
    /// ended the loop is returned to only the first caller to see it. Returns immediately if the
    /// server was never started.
    pub async fn wait_until_completed(&self) -> Result<(), McpError> {
        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        // The server holds the sender, so the channel cannot close while waiting.
        let _ = self.completed.subscribe().wait_for(|completed| *completed).await;

        lock(&self.outcome).take().unwrap_or(Ok(()))
    }

    /// Ask the message loop to finish. Requests already being processed are completed.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    async fn run<T: Transport>(
        self,
        mut transport: T,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), McpError> {
        info!(server = %self.info.name, version = %self.info.version, "server started");

        let stopped = *shutdown.borrow_and_update();
        if stopped {
            return transport.close().await;
        }

        loop {
            let message = tokio::select! {
                message = transport.receive() => message?,
                _ = shutdown.changed() => break,
            };

            let Some(message) = message else {
                debug!("client disconnected");
                break;
            };

            if let Some(response) = self.handle_message(&message).await {
                transport.send(serde_json::to_string(&response)?).await?;
            }
        }

        transport.close().await?;
        info!(server = %self.info.name, "server stopped");

        Ok(())
    }

    /// Process a single message. Notifications produce no response.
    pub async fn handle_message(&self, message: &str) -> Option<Response> {
        let request = match serde_json::from_str::<Request>(message) {
            Ok(request) => request,
            Err(e) => {
                warn!("unreadable message: {e}");
                return Some(Response::failure(
                    Value::Null,
                    McpError::ParseError(e.to_string()),
                ));
            }
        };

        let Some(id) = request.id else {
            debug!(method = %request.method, "notification");
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(Response::failure(
                id,
                McpError::InvalidRequest(format!("unsupported version `{}`", request.jsonrpc)),
            ));
        }

        debug!(method = %request.method, "request");

        Some(match self.dispatch(&request.method, request.params).await {
            Ok(result) => Response::success(id, result),
            Err(e) => {
                warn!(method = %request.method, "request failed: {e}");
                Response::failure(id, e)
            }
        })
    }

    async fn dispatch(&self, method: &str, raw: Option<Value>) -> Result<Value, McpError> {
        if self.configuration.strict
            && !self.is_initialized()
            && method != Initialize::NAME
            && method != Ping::NAME
        {
            return Err(McpError::InvalidRequest(format!(
                "`{method}` received before initialization"
            )));
        }

        let responder = lock(&self.methods).get(method).cloned();
        if let Some(responder) = responder {
            let result = responder(raw).await;
            if method == Initialize::NAME && result.is_ok() {
                self.initialized.store(true, Ordering::SeqCst);
            }
            return result;
        }

        match method {
            Initialize::NAME => Ok(serde_json::to_value(self.initialize(params(raw)?).await?)?),
            Ping::NAME => Ok(json!({})),
            ListTools::NAME => {
                params::<ListParams>(raw)?;
                Ok(serde_json::to_value(ListToolsResult {
                    tools: self.tools(),
                })?)
            }
            CallTool::NAME => Ok(serde_json::to_value(self.call_tool(params(raw)?).await?)?),
            ListResources::NAME => {
                params::<ListParams>(raw)?;
                Ok(serde_json::to_value(ListResourcesResult {
                    resources: self.resources(),
                })?)
            }
            _ => Err(McpError::MethodNotFound(format!(
                "Method not found: {method}"
            ))),
        }
    }

    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult, McpError> {
        info!(
            client = %params.client_info.name,
            version = %params.client_info.version,
            protocol = %params.protocol_version,
            "client initializing"
        );

        let hook = lock(&self.hook).clone();
        if let Some(hook) = hook {
            hook(params.client_info, params.capabilities).await?;
        }

        self.initialized.store(true, Ordering::SeqCst);

        Ok(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            server_info: self.info.clone(),
        })
    }

    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, McpError> {
        let registered = lock(&self.tools)
            .iter()
            .find(|registered| registered.tool.name == params.name)
            .cloned();

        let Some(registered) = registered else {
            return Err(McpError::tool_not_found(&params.name));
        };
        let Some(handler) = registered.handler else {
            return Err(McpError::tool_implementation_required(&params.name));
        };

        match handler.call(params.arguments).await {
            Ok(content) => Ok(CallToolResult::success(content)),
            Err(e) => {
                warn!(tool = %params.name, "tool failed: {e}");
                Ok(CallToolResult::failure(e.to_string()))
            }
        }
    }
}
