//! Insert and update processing.
//!
//! Both operations follow the same sequence: validate the request, resolve
//! the target databases, then act on each database in turn. A backend error
//! on one database is logged and recorded as [`DatabaseAction::Failed`]; the
//! next database is still attempted. Validation errors are returned before
//! any backend call is made.

use log::{error, info, warn};
use serde_json::Value;

use crate::error_handling::{RequestKind, StoreError, ValidationError};
use crate::reconcile::outcome::{DatabaseAction, DatabaseOutcome, Outcome};
use crate::reconcile::request::{Filters, InsertRequest, UpdateRequest};
use crate::reconcile::session::{DatabaseHandle, SessionContext};
use crate::reconcile::target::TargetSelector;
use crate::storage::Payload;

/// Creates `request.data` on every target database, skipping databases where
/// the deduplication filter already holds the payload's values.
pub async fn process_insert(
    session: &SessionContext,
    request: &InsertRequest,
) -> Result<Outcome, ValidationError> {
    let kind = RequestKind::Insert;
    let handles = checked(kind, request.validate(), || {
        resolve_targets(session, kind, request.database, request.filters.as_ref())
    })?;
    let payload = describe_payload(&request.data);

    let mut databases = Vec::with_capacity(handles.len());
    for handle in handles {
        let action = match insert_one(session, handle, request).await {
            Ok(action) => action,
            Err(e) => failed(kind, handle, &payload, e),
        };
        log_action(kind, handle, &payload, &action);
        databases.push(DatabaseOutcome {
            database: handle.kind(),
            action,
        });
    }
    Ok(summarize(kind, &payload, databases))
}

/// Looks up `request.query` on every target database and creates, skips or
/// updates according to the request's policy flags.
pub async fn process_update(
    session: &SessionContext,
    request: &UpdateRequest,
) -> Result<Outcome, ValidationError> {
    let kind = RequestKind::Update;
    let handles = checked(kind, request.validate(), || {
        resolve_targets(session, kind, request.database, request.filters.as_ref())
    })?;
    let payload = describe_payload(&request.data);

    let mut databases = Vec::with_capacity(handles.len());
    for handle in handles {
        let action = match update_one(session, handle, request).await {
            Ok(action) => action,
            Err(e) => failed(kind, handle, &payload, e),
        };
        log_action(kind, handle, &payload, &action);
        databases.push(DatabaseOutcome {
            database: handle.kind(),
            action,
        });
    }
    Ok(summarize(kind, &payload, databases))
}

/// Validation first, target resolution second; either failure is logged
/// before being returned.
fn checked<'a>(
    kind: RequestKind,
    validation: Result<(), ValidationError>,
    resolve: impl FnOnce() -> Result<Vec<&'a DatabaseHandle>, ValidationError>,
) -> Result<Vec<&'a DatabaseHandle>, ValidationError> {
    validation.and_then(|()| resolve()).map_err(|e| {
        error!("Rejected {kind} request: {e}");
        e
    })
}

/// Resolves the target handles and checks that every filter field is a
/// column of each target table.
fn resolve_targets<'a>(
    session: &'a SessionContext,
    kind: RequestKind,
    selector: TargetSelector,
    filters: Option<&Filters>,
) -> Result<Vec<&'a DatabaseHandle>, ValidationError> {
    let handles = session.resolve(kind, selector)?;
    for handle in &handles {
        let schema = handle.store().schema();
        let unknown = filters
            .into_iter()
            .flat_map(|f| f.fields())
            .find(|field| schema.field_type(field).is_none());
        if let Some(field) = unknown {
            return Err(ValidationError::UnknownFilterField {
                kind,
                database: handle.kind().as_str(),
                field: field.clone(),
            });
        }
    }
    Ok(handles)
}

async fn insert_one(
    session: &SessionContext,
    handle: &DatabaseHandle,
    request: &InsertRequest,
) -> Result<DatabaseAction, StoreError> {
    if is_filtered(handle, request.filters.as_ref(), &request.data).await? {
        return Ok(DatabaseAction::Filtered);
    }
    create(session, handle, request.filters.as_ref(), &request.data).await?;
    Ok(DatabaseAction::Created)
}

async fn update_one(
    session: &SessionContext,
    handle: &DatabaseHandle,
    request: &UpdateRequest,
) -> Result<DatabaseAction, StoreError> {
    if is_filtered(handle, request.filters.as_ref(), &request.data).await? {
        return Ok(DatabaseAction::Filtered);
    }

    // Existence decides first; `not_update_when_exists` only applies to a hit.
    match handle.store().get(&request.query).await? {
        None if request.create_when_not_exists => {
            create(session, handle, request.filters.as_ref(), &request.data).await?;
            Ok(DatabaseAction::Created)
        }
        None => Ok(DatabaseAction::NotCreated),
        Some(_) if request.not_update_when_exists => Ok(DatabaseAction::NotUpdated),
        Some(mut record) => {
            record.merge(&request.data);
            handle
                .store()
                .update(&record, request.only.as_deref())
                .await?;
            Ok(DatabaseAction::Updated)
        }
    }
}

async fn is_filtered(
    handle: &DatabaseHandle,
    filters: Option<&Filters>,
    data: &Payload,
) -> Result<bool, StoreError> {
    match filters.filter(|f| !f.is_empty()) {
        Some(filters) => {
            handle
                .filters()
                .contains(handle.store(), filters.fields(), data)
                .await
        }
        None => Ok(false),
    }
}

async fn create(
    session: &SessionContext,
    handle: &DatabaseHandle,
    filters: Option<&Filters>,
    data: &Payload,
) -> Result<(), StoreError> {
    handle.store().create(data).await?;
    if session.options().track_inserted_filters {
        if let Some(filters) = filters {
            handle
                .filters()
                .remember(handle.store().schema(), filters.fields(), data);
        }
    }
    Ok(())
}

fn failed(
    kind: RequestKind,
    handle: &DatabaseHandle,
    payload: &str,
    err: StoreError,
) -> DatabaseAction {
    error!("<{}: {kind} error: {err}> payload: {payload}", handle.kind());
    DatabaseAction::Failed(err.to_string())
}

fn log_action(kind: RequestKind, handle: &DatabaseHandle, payload: &str, action: &DatabaseAction) {
    let database = handle.kind();
    match action {
        DatabaseAction::Created => info!("{database}: {kind} created {payload}"),
        DatabaseAction::Updated => info!("{database}: updated {payload}"),
        DatabaseAction::NotUpdated => info!("{database}: {payload} exists, not updated"),
        DatabaseAction::Filtered => warn!("{database}: {payload} was filtered"),
        DatabaseAction::NotCreated => warn!("{database}: {payload} not found, not created"),
        // Already logged with the error.
        DatabaseAction::Failed(_) => {}
    }
}

/// The caller-facing line for one database, if the action warrants one.
///
/// A plain insert-path create is the expected case and reports nothing, so
/// an all-created insert falls back to the summary line.
fn database_message(
    kind: RequestKind,
    outcome: &DatabaseOutcome,
    payload: &str,
) -> Option<String> {
    let database = outcome.database;
    let message = match &outcome.action {
        DatabaseAction::Created if kind == RequestKind::Insert => return None,
        DatabaseAction::Created => format!("{database}: {payload} was created"),
        DatabaseAction::Filtered => format!("{database}: {payload} was filtered"),
        DatabaseAction::Updated => format!("{database}: {payload} was updated"),
        DatabaseAction::NotUpdated => format!("{database}: {payload} exists, not updated"),
        DatabaseAction::NotCreated => format!("{database}: {payload} not found, not created"),
        DatabaseAction::Failed(err) => format!("{database}: {kind} error: {err}"),
    };
    Some(message)
}

fn summarize(kind: RequestKind, payload: &str, databases: Vec<DatabaseOutcome>) -> Outcome {
    let messages: Vec<String> = databases
        .iter()
        .filter_map(|outcome| database_message(kind, outcome, payload))
        .collect();
    let message = if messages.is_empty() {
        let names: Vec<&str> = databases.iter().map(|d| d.database.as_str()).collect();
        format!("{kind} {payload} into [{}] succeeded", names.join(", "))
    } else {
        messages.join("; ")
    };
    Outcome { message, databases }
}

fn describe_payload(data: &Payload) -> String {
    Value::Object(data.clone()).to_string()
}
