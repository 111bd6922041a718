//! Row payloads: persisted business objects and transient placeholders.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::model::CreateHandler;

/// Contract every business row object type has to satisfy.
///
/// Identity is `Eq + Hash`: two values denote the same business object iff they compare equal.
pub trait RowObject: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> RowObject for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Stand-in for an object that is being created but not yet persisted.
///
/// Immutable. Two placeholders are equal iff they stem from the same creation request.
pub struct Placeholder<R> {
    id: Uuid,
    type_name: String,
    structural_type: String,
    create_handler: Arc<dyn CreateHandler<R>>,
    container: Option<R>,
    create_context: Option<R>,
}

impl<R> Placeholder<R> {
    pub fn new(
        type_name: impl Into<String>,
        structural_type: impl Into<String>,
        create_handler: Arc<dyn CreateHandler<R>>,
        container: Option<R>,
        create_context: Option<R>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            type_name: type_name.into(),
            structural_type: structural_type.into(),
            create_handler,
            container,
            create_context,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn structural_type(&self) -> &str {
        &self.structural_type
    }

    pub fn create_handler(&self) -> &Arc<dyn CreateHandler<R>> {
        &self.create_handler
    }

    /// The object the new row will be created in, if any.
    pub fn container(&self) -> Option<&R> {
        self.container.as_ref()
    }

    pub fn create_context(&self) -> Option<&R> {
        self.create_context.as_ref()
    }
}

impl<R> PartialEq for Placeholder<R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<R> Eq for Placeholder<R> {}

impl<R> Hash for Placeholder<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<R: fmt::Debug> fmt::Debug for Placeholder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholder")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("structural_type", &self.structural_type)
            .field("container", &self.container)
            .field("create_context", &self.create_context)
            .finish_non_exhaustive()
    }
}

impl<R> fmt::Display for Placeholder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<new {}>", self.type_name)
    }
}

/// What a grid node displays: a persisted business object or a placeholder for one
/// that is still being created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowPayload<R> {
    Persisted(R),
    Transient(Arc<Placeholder<R>>),
}

impl<R> RowPayload<R> {
    pub fn persisted(&self) -> Option<&R> {
        match self {
            RowPayload::Persisted(row) => Some(row),
            RowPayload::Transient(_) => None,
        }
    }

    pub fn placeholder(&self) -> Option<&Arc<Placeholder<R>>> {
        match self {
            RowPayload::Persisted(_) => None,
            RowPayload::Transient(placeholder) => Some(placeholder),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, RowPayload::Transient(_))
    }
}

impl<R> From<R> for RowPayload<R> {
    fn from(row: R) -> Self {
        RowPayload::Persisted(row)
    }
}

impl<R: fmt::Display> fmt::Display for RowPayload<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowPayload::Persisted(row) => write!(f, "{}", row),
            RowPayload::Transient(placeholder) => write!(f, "{}", placeholder),
        }
    }
}
