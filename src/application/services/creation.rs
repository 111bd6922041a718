//! Creation of new rows through a transient placeholder
//!
//! A placeholder row is displayed and edited like any other row. On commit the business
//! object is created inside a unit of work and swapped into the placeholder's node.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::grid_handler::GridHandler;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    ContextPosition, CreateHandler, DomainError, EditBuffer, EditToken, FieldError, FieldWarning,
    Placeholder, RowObject, RowPayload, UnitOfWork, Validator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
    Requested,
    Displayed,
    Committed,
    Cancelled,
}

impl CreationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreationState::Requested => "requested",
            CreationState::Displayed => "displayed",
            CreationState::Committed => "committed",
            CreationState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CreationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user asked to create, and where.
pub struct CreationRequest<R> {
    pub type_name: String,
    pub structural_type: String,
    pub create_handler: Arc<dyn CreateHandler<R>>,
    /// Object the new row is displayed under; also the context of the row creation.
    pub container: Option<R>,
    pub create_context: Option<R>,
    pub position: ContextPosition<R>,
}

impl<R> CreationRequest<R> {
    pub fn new(type_name: impl Into<String>, create_handler: Arc<dyn CreateHandler<R>>) -> Self {
        let type_name = type_name.into();
        Self {
            structural_type: type_name.clone(),
            type_name,
            create_handler,
            container: None,
            create_context: None,
            position: ContextPosition::Auto,
        }
    }

    pub fn in_container(mut self, container: R) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_create_context(mut self, create_context: R) -> Self {
        self.create_context = Some(create_context);
        self
    }

    pub fn at(mut self, position: ContextPosition<R>) -> Self {
        self.position = position;
        self
    }
}

/// Collaborators a commit runs against.
pub struct CommitContext<'a, R> {
    pub validator: &'a dyn Validator<R>,
    pub unit_of_work: &'a dyn UnitOfWork,
    pub edit_token: &'a dyn EditToken,
    /// Warnings were confirmed by the user and no longer block the commit.
    pub warnings_disabled: bool,
}

/// Result of a commit attempt. Everything but `Committed` leaves the row editable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome<R> {
    Committed(R),
    ValidationFailed(Vec<FieldError>),
    WarningsPending(Vec<FieldWarning>),
    Failed(String),
    /// Nothing was edited; no object is created and the placeholder stays.
    Unchanged,
}

impl<R> CommitOutcome<R> {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed(_))
    }
}

/// One row being created, from request to commit or cancellation.
#[derive(Debug)]
pub struct TransientCreation<R> {
    placeholder: Arc<Placeholder<R>>,
    state: CreationState,
    buffer: EditBuffer,
}

impl<R: RowObject> TransientCreation<R> {
    /// Inserts a placeholder row and makes it the only selected row.
    #[instrument(level = "debug", skip_all, fields(type_name = %request.type_name))]
    pub fn start<H: GridHandler<R>>(handler: &mut H, request: CreationRequest<R>) -> ApplicationResult<Self> {
        let placeholder = Arc::new(Placeholder::new(
            request.type_name,
            request.structural_type,
            request.create_handler,
            request.container.clone(),
            request.create_context,
        ));
        let payload = RowPayload::Transient(Arc::clone(&placeholder));

        let node = handler.create_row(request.container.as_ref(), &request.position, payload)?;
        let path = handler.path_of(&node);
        handler.set_selection(vec![path])?;
        debug!(placeholder = %placeholder.id(), "placeholder row displayed");

        Ok(Self {
            placeholder,
            state: CreationState::Requested,
            buffer: EditBuffer::new(),
        })
    }

    pub fn state(&self) -> CreationState {
        self.state
    }

    pub fn placeholder(&self) -> &Arc<Placeholder<R>> {
        &self.placeholder
    }

    pub fn payload(&self) -> RowPayload<R> {
        RowPayload::Transient(Arc::clone(&self.placeholder))
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    /// Edits go to an isolated buffer until commit.
    pub fn buffer_mut(&mut self) -> &mut EditBuffer {
        &mut self.buffer
    }

    fn expect_state(&self, expected: CreationState) -> ApplicationResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ApplicationError::InvalidCreationState {
                state: self.state.as_str(),
                expected: expected.as_str(),
            })
        }
    }

    /// Editable fields are attached to the row.
    pub fn attach_fields(&mut self) -> ApplicationResult<()> {
        self.expect_state(CreationState::Requested)?;
        self.state = CreationState::Displayed;
        Ok(())
    }

    /// Validates, creates the object in one unit of work and swaps it into the row.
    ///
    /// An untouched buffer creates nothing and returns `Unchanged`.
    /// Validation and unit of work failures come back as outcomes and keep the row
    /// editable; a missing edit token or a wrong state is an error.
    #[instrument(level = "debug", skip_all, fields(placeholder = %self.placeholder.id()))]
    pub fn commit<H: GridHandler<R>>(
        &mut self,
        handler: &mut H,
        ctx: &CommitContext<'_, R>,
    ) -> ApplicationResult<CommitOutcome<R>> {
        self.expect_state(CreationState::Displayed)?;
        if !ctx.edit_token.is_held() {
            return Err(ApplicationError::EditTokenNotHeld(self.placeholder.to_string()));
        }
        if !self.buffer.is_changed() {
            debug!("edit buffer unchanged, nothing to create");
            return Ok(CommitOutcome::Unchanged);
        }

        let payload = self.payload();
        let report = ctx.validator.check(&payload, &self.buffer);
        if report.has_errors() {
            debug!(errors = report.errors.len(), "validation failed");
            return Ok(CommitOutcome::ValidationFailed(report.errors));
        }
        if report.has_warnings() && !ctx.warnings_disabled {
            return Ok(CommitOutcome::WarningsPending(report.warnings));
        }

        let transaction = match ctx.unit_of_work.begin_transaction() {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!(error = %e, "cannot start creation");
                return Ok(CommitOutcome::Failed(e.to_string()));
            }
        };
        let created = match self.placeholder.create_handler().create(
            self.placeholder.container(),
            self.placeholder.create_context(),
            &self.buffer,
        ) {
            Ok(created) => created,
            Err(e) => {
                warn!(error = %e, "creation failed, rolling back");
                transaction.rollback();
                return Ok(CommitOutcome::Failed(e.to_string()));
            }
        };
        if let Err(e) = transaction.commit() {
            warn!(error = %e, "commit failed");
            return Ok(CommitOutcome::Failed(e.to_string()));
        }

        handler.replace_row(&payload, RowPayload::Persisted(created.clone()))?;
        self.state = CreationState::Committed;
        self.buffer.clear();
        info!(created = ?created, "created object");
        Ok(CommitOutcome::Committed(created))
    }

    /// Drops the placeholder row. If it is the grid's root, the grid is invalidated instead.
    pub fn cancel<H: GridHandler<R>>(&mut self, handler: &mut H) -> ApplicationResult<()> {
        if !matches!(self.state, CreationState::Requested | CreationState::Displayed) {
            return Err(ApplicationError::InvalidCreationState {
                state: self.state.as_str(),
                expected: "requested or displayed",
            });
        }
        handler.remove_row(&self.payload())?;
        self.state = CreationState::Cancelled;
        debug!("creation cancelled");
        Ok(())
    }
}

/// Checks that `row` may be opened for editing.
///
/// Persisted rows must still exist and need the edit token; placeholders are always editable.
pub fn begin_edit<R: RowObject, H: GridHandler<R>>(
    handler: &H,
    row: &RowPayload<R>,
    edit_token: &dyn EditToken,
) -> ApplicationResult<()> {
    let RowPayload::Persisted(object) = row else {
        return Ok(());
    };
    if !handler.model().is_valid(object) {
        return Err(DomainError::ObjectDeleted(format!("{:?}", object)).into());
    }
    if !edit_token.is_held() {
        return Err(ApplicationError::EditTokenNotHeld(format!("{:?}", object)));
    }
    Ok(())
}
