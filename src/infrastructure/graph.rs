//! In-memory business graph and the collaborators that go with it
//!
//! Objects are plain string ids. The graph can be mutated through a shared `Arc` while
//! grids display it, which is how external model changes are simulated.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Deserialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{
    BusinessModel, CreateError, CreateHandler, EditBuffer, EditToken, Transaction, UnitOfWork,
    UnitOfWorkError,
};
use crate::infrastructure::{InfraError, InfraResult};

/// File format of a graph.
///
/// ```toml
/// root = "root"
///
/// [[objects]]
/// id = "root"
/// children = ["a", "b"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSpec {
    pub root: String,
    /// Expanding everything would not terminate
    #[serde(default)]
    pub unbounded: bool,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectSpec {
    pub id: String,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Default)]
struct GraphState {
    root: String,
    children: BTreeMap<String, Vec<String>>,
    deleted: HashSet<String>,
    unbounded: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryGraph {
    state: RwLock<GraphState>,
}

impl InMemoryGraph {
    pub fn from_spec(spec: GraphSpec) -> Self {
        let mut state = GraphState {
            root: spec.root,
            unbounded: spec.unbounded,
            ..Default::default()
        };
        for object in spec.objects {
            if object.deleted {
                state.deleted.insert(object.id.clone());
            }
            state.children.entry(object.id).or_default().extend(object.children);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Graph with `root` and the given parent/child edges, in order.
    pub fn from_edges(root: &str, edges: &[(&str, &str)]) -> Self {
        let mut state = GraphState {
            root: root.to_string(),
            ..Default::default()
        };
        for (parent, child) in edges {
            state
                .children
                .entry(parent.to_string())
                .or_default()
                .push(child.to_string());
        }
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn parse(content: &str, origin: &str) -> InfraResult<Self> {
        let spec: GraphSpec = toml::from_str(content).map_err(|e| InfraError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::from_spec(spec))
    }

    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> InfraResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| InfraError::io(format!("read graph {}", path.display()), e))?;
        Self::parse(&content, &path.display().to_string())
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn root(&self) -> String {
        self.read().root.clone()
    }

    /// Every object mentioned in the graph, sorted.
    pub fn objects(&self) -> Vec<String> {
        let state = self.read();
        let mut objects: BTreeSet<String> = state.children.keys().cloned().collect();
        objects.extend(state.children.values().flatten().cloned());
        objects.insert(state.root.clone());
        objects.into_iter().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        let state = self.read();
        state.root == id
            || state.children.contains_key(id)
            || state.children.values().any(|c| c.iter().any(|x| x == id))
    }

    pub fn add_child(&self, parent: &str, child: &str) {
        debug!(parent, child, "add edge");
        self.write()
            .children
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
    }

    pub fn insert_child(&self, parent: &str, index: usize, child: &str) {
        let mut state = self.write();
        let children = state.children.entry(parent.to_string()).or_default();
        let index = index.min(children.len());
        children.insert(index, child.to_string());
    }

    pub fn remove_child(&self, parent: &str, child: &str) -> bool {
        debug!(parent, child, "remove edge");
        let mut state = self.write();
        let Some(children) = state.children.get_mut(parent) else {
            return false;
        };
        let before = children.len();
        children.retain(|c| c != child);
        children.len() != before
    }

    pub fn set_children(&self, parent: &str, children: &[&str]) {
        self.write().children.insert(
            parent.to_string(),
            children.iter().map(|c| c.to_string()).collect(),
        );
    }

    /// Marks `id` deleted and drops every edge leading to it.
    pub fn delete(&self, id: &str) {
        debug!(id, "delete object");
        let mut state = self.write();
        state.deleted.insert(id.to_string());
        for children in state.children.values_mut() {
            children.retain(|c| c != id);
        }
    }

    pub fn set_unbounded(&self, unbounded: bool) {
        self.write().unbounded = unbounded;
    }

    /// Takes over the content of `other`, as if the graph had been edited externally.
    pub fn replace_with(&self, other: &InMemoryGraph) {
        let content = other.read().clone();
        *self.write() = content;
    }
}

impl BusinessModel<String> for InMemoryGraph {
    fn parents_of(&self, row: &String) -> Vec<String> {
        let state = self.read();
        state
            .children
            .iter()
            .filter(|(parent, children)| !state.deleted.contains(*parent) && children.contains(row))
            .map(|(parent, _)| parent.clone())
            .collect()
    }

    fn children_of(&self, row: &String) -> Vec<String> {
        let state = self.read();
        state
            .children
            .get(row)
            .map(|children| {
                children
                    .iter()
                    .filter(|c| !state.deleted.contains(*c))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn can_expand_all(&self) -> bool {
        !self.read().unbounded
    }

    fn is_valid(&self, row: &String) -> bool {
        !self.read().deleted.contains(row)
    }

    fn types_to_observe(&self) -> Vec<String> {
        vec!["object".to_string()]
    }
}

/// Creates new objects as children of their container.
///
/// The id is taken from the `name` field of the edit buffer, or generated.
pub struct GraphCreateHandler {
    graph: Arc<InMemoryGraph>,
}

impl GraphCreateHandler {
    pub fn new(graph: Arc<InMemoryGraph>) -> Self {
        Self { graph }
    }
}

impl CreateHandler<String> for GraphCreateHandler {
    fn create(
        &self,
        container: Option<&String>,
        _create_context: Option<&String>,
        values: &EditBuffer,
    ) -> Result<String, CreateError> {
        let container = container.ok_or(CreateError::MissingContainer)?;
        let id = values
            .get("name")
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.graph.contains(&id) {
            return Err(CreateError::AlreadyExists(id));
        }
        self.graph.add_child(container, &id);
        Ok(id)
    }
}

#[derive(Debug, Default)]
struct TransactionLog {
    fail_commit: AtomicBool,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// Unit of work that only counts what happens, optionally failing every commit.
#[derive(Debug, Default)]
pub struct InMemoryUnitOfWork {
    log: Arc<TransactionLog>,
}

impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_commit(&self, fail: bool) {
        self.log.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn commits(&self) -> usize {
        self.log.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.log.rollbacks.load(Ordering::SeqCst)
    }
}

struct InMemoryTransaction {
    log: Arc<TransactionLog>,
}

impl Transaction for InMemoryTransaction {
    fn commit(self: Box<Self>) -> Result<(), UnitOfWorkError> {
        if self.log.fail_commit.load(Ordering::SeqCst) {
            return Err(UnitOfWorkError::Commit("commit rejected".to_string()));
        }
        self.log.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        self.log.rollbacks.fetch_add(1, Ordering::SeqCst);
    }
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn begin_transaction(&self) -> Result<Box<dyn Transaction>, UnitOfWorkError> {
        Ok(Box::new(InMemoryTransaction {
            log: Arc::clone(&self.log),
        }))
    }
}

/// Edit token with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticEditToken(pub bool);

impl EditToken for StaticEditToken {
    fn is_held(&self) -> bool {
        self.0
    }
}
