//! A self-extending tree of callable API nodes.
//!
//! An [`ApiInterface`] is the root of a tree mirroring the remote namespace
//! (`Interface.Method.Version`). Looking up a name the tree doesn't know yet creates a
//! speculative [`ApiCall`] node. Once a call through a node succeeds, the node and all of its
//! ancestors are registered: attached to their parents for good, so later lookups of the same path
//! return the very same nodes.
//!
//! In strict mode (which requires the tree to be autopopulated from the API's own list of
//! supported methods) looking up an unknown name is an error instead.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, OnceLock, RwLock,
    },
};

use regex::Regex;
use serde::Deserialize;

use crate::{
    args::{ApiArgs, Method},
    config::InterfaceConfig,
    connection::{Payload, PreparedRequest},
    ApiConnection, ApiResponse, Error, Result,
};

const DISCOVERY_PATH: [&str; 3] = ["ISteamWebAPIUtil", "GetSupportedAPIList", "v0001"];

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern should compile")
    })
}

/// Node names must start with a letter and contain only letters, digits and `_`. Names starting
/// with `_` are reserved.
fn validate_identifier(name: &str) -> Result<()> {
    if identifier_pattern().is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier {
            name: name.to_owned(),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State shared by every node of one tree.
struct Tree {
    connection: Arc<ApiConnection>,
    strict: bool,
    roots: Mutex<HashMap<String, Arc<ApiCall>>>,
}

impl Tree {
    fn attach_root(&self, node: &Arc<ApiCall>) -> Result<()> {
        let mut roots = lock(&self.roots);
        match roots.get(&node.id) {
            Some(existing) if !Arc::ptr_eq(existing, node) => {
                return Err(Error::DuplicateNode {
                    name: node.id.clone(),
                })
            }
            Some(_) => {}
            None => {
                roots.insert(node.id.clone(), node.clone());
            }
        }
        drop(roots);

        node.mark_registered();
        Ok(())
    }
}

/// Root of a call tree.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use steamapi::{ApiArgs, ApiInterface, ConnectionConfig, InterfaceConfig};
/// let connection = Arc::new(ConnectionConfig::from_api_key("api-key").to_connection()?);
/// let api = ApiInterface::new(connection, InterfaceConfig::default())?;
///
/// let summaries = api
///     .path("ISteamUser.GetPlayerSummaries.v0002")?
///     .get(ApiArgs::new().arg("steamids", vec!["76561197960435530"]))?;
/// # Ok::<(), steamapi::Error>(())
/// ```
pub struct ApiInterface {
    tree: Arc<Tree>,
}

impl ApiInterface {
    /// Create a call tree. `strict` is only valid together with `autopopulate`.
    pub fn new(connection: Arc<ApiConnection>, config: InterfaceConfig) -> Result<Self> {
        if config.strict && !config.autopopulate {
            return Err(Error::Configuration(
                "strict is only applicable if autopopulate is enabled".to_owned(),
            ));
        }

        let interface = ApiInterface {
            tree: Arc::new(Tree {
                connection,
                strict: config.strict,
                roots: Mutex::new(HashMap::new()),
            }),
        };

        if config.autopopulate {
            interface.autopopulate()?;
        }

        Ok(interface)
    }

    /// Connection used by every node of the tree.
    pub fn connection(&self) -> &Arc<ApiConnection> {
        &self.tree.connection
    }

    /// Whether unknown names are rejected.
    pub fn is_strict(&self) -> bool {
        self.tree.strict
    }

    /// Look up a top-level (interface or service) node.
    ///
    /// Unlike deeper levels, a top-level node is remembered as soon as it is looked up, so
    /// repeated lookups return the same node even before any call succeeded.
    pub fn node(&self, name: &str) -> Result<Arc<ApiCall>> {
        self.resolve_root(name, !self.tree.strict)
    }

    /// Resolve a dotted path such as `"ISteamUser.GetPlayerSummaries.v0002"`.
    pub fn path(&self, path: &str) -> Result<Arc<ApiCall>> {
        let mut names = path.split('.');
        let first = names.next().unwrap_or_default();
        names.try_fold(self.node(first)?, |node, name| node.child(name))
    }

    /// All top-level nodes, ordered by name.
    pub fn nodes(&self) -> Vec<Arc<ApiCall>> {
        let mut nodes: Vec<_> = lock(&self.tree.roots).values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    fn resolve_root(&self, name: &str, allow_new: bool) -> Result<Arc<ApiCall>> {
        validate_identifier(name)?;

        let mut roots = lock(&self.tree.roots);
        if let Some(node) = roots.get(name) {
            return Ok(node.clone());
        }
        if !allow_new {
            return Err(Error::Strict {
                name: name.to_owned(),
            });
        }

        let node = Arc::new(ApiCall::new(name, None, None, self.tree.clone()));
        roots.insert(name.to_owned(), node.clone());
        Ok(node)
    }

    /// Build the tree from the API's list of supported interfaces, methods and versions.
    fn autopopulate(&self) -> Result<()> {
        let discovery = DISCOVERY_PATH
            .iter()
            .skip(1)
            .try_fold(self.resolve_root(DISCOVERY_PATH[0], true)?, |node, name| {
                node.resolve_child(name, true)
            })?;

        log::debug!(target: "steamapi", "fetching list of supported APIs");
        let response = discovery.call(Method::Get, ApiArgs::new())?.into_response()?;
        let list: SupportedApiList = response.object("apilist")?.deserialize()?;

        let mut registered = 0usize;
        for interface in &list.interfaces {
            if let Err(err) = validate_identifier(&interface.name) {
                log::warn!(target: "steamapi", "skipping interface: {}", err);
                continue;
            }
            let interface_node = self.resolve_root(&interface.name, true)?;

            for method in &interface.methods {
                let version = format!("v{}", method.version);
                if let Err(err) =
                    validate_identifier(&method.name).and_then(|()| validate_identifier(&version))
                {
                    log::warn!(target: "steamapi",
                               interface:display = interface.name;
                               "skipping method: {}", err);
                    continue;
                }

                let method_node = interface_node
                    .registered_child(&method.name)
                    .unwrap_or_else(|| interface_node.spawn_child(&method.name, method.httpmethod));
                let version_node = method_node
                    .registered_child(&version)
                    .unwrap_or_else(|| method_node.spawn_child(&version, method.httpmethod));

                version_node.set_documentation(method.documentation());
                version_node.register()?;
                registered += 1;
            }
        }

        log::debug!(target: "steamapi",
                    interfaces = list.interfaces.len(),
                    methods = registered;
                    "autopopulated call tree");
        Ok(())
    }
}

impl Drop for ApiInterface {
    fn drop(&mut self) {
        // Registered children and their parents point at each other; unlink them so the nodes
        // can be freed.
        let roots = std::mem::take(&mut *lock(&self.tree.roots));
        for root in roots.into_values() {
            root.detach_children();
        }
    }
}

impl std::fmt::Debug for ApiInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiInterface")
            .field("strict", &self.tree.strict)
            .field("nodes", &self.nodes())
            .finish()
    }
}

/// One segment of an API path.
pub struct ApiCall {
    id: String,
    parent: Option<Arc<ApiCall>>,
    method: Option<Method>,
    registered: AtomicBool,
    full_name: OnceLock<String>,
    url_path: OnceLock<String>,
    documentation: RwLock<String>,
    children: Mutex<HashMap<String, Arc<ApiCall>>>,
    tree: Arc<Tree>,
}

impl ApiCall {
    fn new(id: &str, parent: Option<Arc<ApiCall>>, method: Option<Method>, tree: Arc<Tree>) -> Self {
        ApiCall {
            id: id.to_owned(),
            parent,
            method,
            registered: AtomicBool::new(false),
            full_name: OnceLock::new(),
            url_path: OnceLock::new(),
            documentation: RwLock::new(String::new()),
            children: Mutex::new(HashMap::new()),
            tree,
        }
    }

    /// Name of this segment.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Node one level up, `None` for top-level nodes.
    pub fn parent(&self) -> Option<&Arc<ApiCall>> {
        self.parent.as_ref()
    }

    /// HTTP method this node is bound to. A bound method overrides the one passed to
    /// [`ApiCall::call`].
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// Whether a call through this node (or one of its descendants) has succeeded.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Dotted name from the root, e.g. `ISteamUser.GetPlayerSummaries.v0002`.
    pub fn full_name(&self) -> &str {
        self.full_name.get_or_init(|| match &self.parent {
            Some(parent) => format!("{}.{}", parent.full_name(), self.id),
            None => self.id.clone(),
        })
    }

    /// Path relative to the base URL, with a trailing slash.
    pub fn url_path(&self) -> &str {
        self.url_path.get_or_init(|| match &self.parent {
            Some(parent) => format!("{}{}/", parent.url_path(), self.id),
            None => format!("{}/", self.id),
        })
    }

    /// Parameter documentation, filled in by autopopulation.
    pub fn documentation(&self) -> String {
        self.documentation
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_documentation(&self, documentation: String) {
        *self
            .documentation
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = documentation;
    }

    /// Look up a child node.
    ///
    /// A registered child is returned as is. Otherwise a new, unregistered node is returned
    /// (a fresh one on every lookup) unless the tree is strict.
    pub fn child(self: &Arc<Self>, name: &str) -> Result<Arc<ApiCall>> {
        self.resolve_child(name, !self.tree.strict)
    }

    /// Registered children, ordered by name.
    pub fn children(&self) -> Vec<Arc<ApiCall>> {
        let mut children: Vec<_> = lock(&self.children).values().cloned().collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        children
    }

    fn registered_child(&self, name: &str) -> Option<Arc<ApiCall>> {
        lock(&self.children).get(name).cloned()
    }

    fn resolve_child(self: &Arc<Self>, name: &str, allow_new: bool) -> Result<Arc<ApiCall>> {
        validate_identifier(name)?;

        if let Some(child) = self.registered_child(name) {
            return Ok(child);
        }
        if !allow_new {
            return Err(Error::Strict {
                name: format!("{}.{}", self.full_name(), name),
            });
        }
        Ok(self.spawn_child(name, None))
    }

    fn spawn_child(self: &Arc<Self>, name: &str, method: Option<Method>) -> Arc<ApiCall> {
        Arc::new(ApiCall::new(
            name,
            Some(self.clone()),
            method,
            self.tree.clone(),
        ))
    }

    /// Mark this node and all of its ancestors as registered, attaching each one to its parent.
    ///
    /// Fails with [`Error::DuplicateNode`] if a different node is already registered under the
    /// same name at any level; in that case nothing below the conflict is attached.
    pub fn register(self: &Arc<Self>) -> Result<()> {
        match &self.parent {
            Some(parent) => parent.attach(self),
            None => self.tree.attach_root(self),
        }
    }

    fn attach(self: &Arc<Self>, child: &Arc<ApiCall>) -> Result<()> {
        let duplicate = || Error::DuplicateNode {
            name: child.full_name().to_owned(),
        };

        if self
            .registered_child(&child.id)
            .is_some_and(|existing| !Arc::ptr_eq(&existing, child))
        {
            return Err(duplicate());
        }

        self.register()?;

        let mut children = lock(&self.children);
        match children.get(&child.id) {
            Some(existing) if !Arc::ptr_eq(existing, child) => return Err(duplicate()),
            Some(_) => {}
            None => {
                children.insert(child.id.clone(), child.clone());
            }
        }
        drop(children);

        child.mark_registered();
        Ok(())
    }

    fn mark_registered(&self) {
        if !self.registered.swap(true, Ordering::AcqRel) {
            log::debug!(target: "steamapi", node = self.full_name(); "registered API");
        }
    }

    fn detach_children(&self) {
        let children = std::mem::take(&mut *lock(&self.children));
        for child in children.into_values() {
            child.detach_children();
        }
    }

    fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut node = Some(self);
        while let Some(current) = node {
            segments.push(current.id.as_str());
            node = current.parent.as_deref();
        }
        segments.reverse();
        segments
    }

    /// Build the request this node would send, without sending it.
    pub fn prepare(&self, method: Method, args: ApiArgs) -> Result<PreparedRequest> {
        let method = self.method.unwrap_or(method);
        self.tree.connection.prepare(&self.segments(), method, args)
    }

    /// Call the API at this node's path.
    ///
    /// The node is registered as soon as the response status is successful, even if the body
    /// then fails to decode.
    pub fn call(self: &Arc<Self>, method: Method, args: ApiArgs) -> Result<Payload> {
        let request = self.prepare(method, args)?;
        let connection = &self.tree.connection;
        let response = connection.send(&request)?;

        if !self.is_registered() {
            self.register()?;
        }

        connection.decode(&request, response)
    }

    /// GET call expecting a parsed response.
    pub fn get(self: &Arc<Self>, args: ApiArgs) -> Result<ApiResponse> {
        self.call(Method::Get, args)?.into_response()
    }

    /// POST call expecting a parsed response.
    pub fn post(self: &Arc<Self>, args: ApiArgs) -> Result<ApiResponse> {
        self.call(Method::Post, args)?.into_response()
    }
}

impl std::fmt::Debug for ApiCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCall")
            .field("name", &self.full_name())
            .field("method", &self.method)
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl std::fmt::Display for ApiCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let note = if self.is_registered() {
            "verified"
        } else {
            "unconfirmed"
        };
        write!(f, "{} ({})", self.full_name(), note)
    }
}

#[derive(Debug, Deserialize)]
struct SupportedApiList {
    #[serde(default)]
    interfaces: Vec<InterfaceDefinition>,
}

#[derive(Debug, Deserialize)]
struct InterfaceDefinition {
    name: String,
    #[serde(default)]
    methods: Vec<MethodDefinition>,
}

#[derive(Debug, Deserialize)]
struct MethodDefinition {
    name: String,
    version: u32,
    #[serde(default)]
    httpmethod: Option<Method>,
    #[serde(default)]
    parameters: Vec<ParameterDefinition>,
}

#[derive(Debug, Deserialize)]
struct ParameterDefinition {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    description: Option<String>,
}

impl MethodDefinition {
    fn documentation(&self) -> String {
        let parameters: Vec<String> = self
            .parameters
            .iter()
            .map(|parameter| {
                format!(
                    "\t{} {} {}:\t{}",
                    if parameter.optional { "OPTIONAL" } else { "REQUIRED" },
                    parameter.kind,
                    parameter.name,
                    parameter.description.as_deref().unwrap_or("(no description)"),
                )
            })
            .collect();
        format!("\n{}\n\nParameters:\n{}\n", self.name, parameters.join("\n"))
    }
}
