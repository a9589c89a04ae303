//! Callback result types handled by the engine.
//!
//! Requests can be built directly with the typed constructors, or parsed from
//! the loosely typed JSON objects a crawler callback yields. Parsing reports
//! every shape problem as a [`ValidationError`].

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error_handling::{RequestKind, ValidationError};
use crate::reconcile::target::TargetSelector;
use crate::storage::{Lookup, Operator, Payload, Predicate};

/// Deduplication filter fields. A single field name is a one-element list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters(Vec<String>);

impl Filters {
    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Filters {
    fn from(field: &str) -> Self {
        Filters(vec![field.to_string()])
    }
}

impl From<String> for Filters {
    fn from(field: String) -> Self {
        Filters(vec![field])
    }
}

impl From<Vec<String>> for Filters {
    fn from(fields: Vec<String>) -> Self {
        Filters(fields)
    }
}

impl From<&[&str]> for Filters {
    fn from(fields: &[&str]) -> Self {
        Filters(fields.iter().map(|f| f.to_string()).collect())
    }
}

/// Persist `data` as a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRequest {
    pub data: Payload,
    pub database: TargetSelector,
    pub filters: Option<Filters>,
}

impl InsertRequest {
    pub fn new(data: Payload) -> Self {
        InsertRequest {
            data,
            database: TargetSelector::default(),
            filters: None,
        }
    }

    pub fn database(mut self, database: TargetSelector) -> Self {
        self.database = database;
        self
    }

    pub fn filters(mut self, filters: impl Into<Filters>) -> Self {
        self.filters = Some(filters.into());
        self
    }

    /// Checks the request before any backend is touched.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.data.is_empty() {
            return Err(ValidationError::Empty {
                kind: RequestKind::Insert,
                field: "data",
            });
        }
        Ok(())
    }
}

impl TryFrom<Value> for InsertRequest {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let kind = RequestKind::Insert;
        let object = as_object(kind, value)?;
        let request = InsertRequest {
            data: parse_data(kind, &object)?,
            database: parse_database(kind, &object)?,
            filters: parse_filters(kind, &object)?,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Find a record by `query` and reconcile it with `data`.
///
/// When nothing matches, `create_when_not_exists` decides whether `data` is
/// created. When a record matches, `not_update_when_exists` decides whether
/// it is left alone; otherwise `data` is merged in and written back,
/// restricted to `only` when given.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub data: Payload,
    pub query: Lookup,
    pub database: TargetSelector,
    pub filters: Option<Filters>,
    pub create_when_not_exists: bool,
    pub not_update_when_exists: bool,
    pub only: Option<Vec<String>>,
}

impl UpdateRequest {
    pub fn new(data: Payload, query: impl Into<Lookup>) -> Self {
        UpdateRequest {
            data,
            query: query.into(),
            database: TargetSelector::default(),
            filters: None,
            create_when_not_exists: true,
            not_update_when_exists: true,
            only: None,
        }
    }

    pub fn database(mut self, database: TargetSelector) -> Self {
        self.database = database;
        self
    }

    pub fn filters(mut self, filters: impl Into<Filters>) -> Self {
        self.filters = Some(filters.into());
        self
    }

    pub fn create_when_not_exists(mut self, create: bool) -> Self {
        self.create_when_not_exists = create;
        self
    }

    pub fn not_update_when_exists(mut self, skip: bool) -> Self {
        self.not_update_when_exists = skip;
        self
    }

    pub fn only<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let kind = RequestKind::Update;
        if self.data.is_empty() {
            return Err(ValidationError::Empty { kind, field: "data" });
        }
        if self.query.is_empty() {
            return Err(ValidationError::Empty {
                kind,
                field: "query",
            });
        }
        Ok(())
    }
}

impl TryFrom<Value> for UpdateRequest {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let kind = RequestKind::Update;
        let object = as_object(kind, value)?;
        let request = UpdateRequest {
            data: parse_data(kind, &object)?,
            query: parse_query(&object)?,
            database: parse_database(kind, &object)?,
            filters: parse_filters(kind, &object)?,
            create_when_not_exists: parse_flag(&object, "create_when_not_exists", true)?,
            not_update_when_exists: parse_flag(&object, "not_update_when_exists", true)?,
            only: parse_only(&object)?,
        };
        request.validate()?;
        Ok(request)
    }
}

/// A callback result the engine knows how to process.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackResult {
    Insert(InsertRequest),
    Update(UpdateRequest),
}

impl CallbackResult {
    /// Parses a callback object, dispatching on its `kind` field.
    ///
    /// Without a `kind`, an object carrying a `query` is an update and
    /// anything else is an insert.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let kind = match value.get("kind") {
            None | Some(Value::Null) => {
                if value.get("query").is_some() {
                    RequestKind::Update
                } else {
                    RequestKind::Insert
                }
            }
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "insert" => RequestKind::Insert,
                "update" => RequestKind::Update,
                _ => return Err(ValidationError::UnknownKind(s.clone())),
            },
            Some(other) => return Err(ValidationError::UnknownKind(other.to_string())),
        };
        match kind {
            RequestKind::Insert => InsertRequest::try_from(value).map(CallbackResult::Insert),
            RequestKind::Update => UpdateRequest::try_from(value).map(CallbackResult::Update),
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            CallbackResult::Insert(_) => RequestKind::Insert,
            CallbackResult::Update(_) => RequestKind::Update,
        }
    }
}

impl From<InsertRequest> for CallbackResult {
    fn from(request: InsertRequest) -> Self {
        CallbackResult::Insert(request)
    }
}

impl From<UpdateRequest> for CallbackResult {
    fn from(request: UpdateRequest) -> Self {
        CallbackResult::Update(request)
    }
}

fn as_object(kind: RequestKind, value: Value) -> Result<Map<String, Value>, ValidationError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ValidationError::Missing { kind, field: "data" }),
    }
}

fn parse_data(kind: RequestKind, object: &Map<String, Value>) -> Result<Payload, ValidationError> {
    match object.get("data") {
        None | Some(Value::Null) => Err(ValidationError::Missing { kind, field: "data" }),
        Some(Value::Object(data)) => Ok(data.clone()),
        Some(_) => Err(ValidationError::WrongType {
            kind,
            field: "data",
            expected: "a mapping",
        }),
    }
}

fn parse_database(
    kind: RequestKind,
    object: &Map<String, Value>,
) -> Result<TargetSelector, ValidationError> {
    match object.get("database") {
        None | Some(Value::Null) => Ok(TargetSelector::default()),
        Some(Value::String(s)) => {
            TargetSelector::from_str(s.trim()).map_err(|_| ValidationError::UnknownTarget {
                kind,
                value: s.clone(),
            })
        }
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(TargetSelector::from_index)
            .ok_or_else(|| ValidationError::UnknownTarget {
                kind,
                value: n.to_string(),
            }),
        Some(_) => Err(ValidationError::WrongType {
            kind,
            field: "database",
            expected: "a TargetSelector",
        }),
    }
}

fn parse_filters(
    kind: RequestKind,
    object: &Map<String, Value>,
) -> Result<Option<Filters>, ValidationError> {
    let wrong_type = || ValidationError::WrongType {
        kind,
        field: "filters",
        expected: "a field name or a list of field names",
    };
    match object.get("filters") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(field)) => Ok(Some(Filters::from(field.as_str()))),
        Some(Value::Array(items)) => {
            let fields = items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(wrong_type))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(Filters::from(fields)))
        }
        Some(_) => Err(wrong_type()),
    }
}

/// A mapping is an equality lookup; a list of `{field, op, value}` objects is
/// a native query.
fn parse_query(object: &Map<String, Value>) -> Result<Lookup, ValidationError> {
    let kind = RequestKind::Update;
    let wrong_type = || ValidationError::WrongType {
        kind,
        field: "query",
        expected: "a mapping or a query",
    };
    match object.get("query") {
        None | Some(Value::Null) => Err(ValidationError::Missing {
            kind,
            field: "query",
        }),
        Some(Value::Object(fields)) => Ok(Lookup::Fields(fields.clone())),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| parse_predicate(item).ok_or_else(wrong_type))
            .collect::<Result<Vec<_>, _>>()
            .map(Lookup::Predicates),
        Some(_) => Err(wrong_type()),
    }
}

fn parse_predicate(item: &Value) -> Option<Predicate> {
    let field = item.get("field")?.as_str()?;
    let op = match item.get("op") {
        None => Operator::Eq,
        Some(op) => op.as_str()?.trim().parse().ok()?,
    };
    let value = item.get("value").cloned().unwrap_or(Value::Null);
    Some(Predicate::new(field, op, value))
}

fn parse_flag(
    object: &Map<String, Value>,
    field: &'static str,
    default: bool,
) -> Result<bool, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(ValidationError::WrongType {
            kind: RequestKind::Update,
            field,
            expected: "a bool",
        }),
    }
}

fn parse_only(object: &Map<String, Value>) -> Result<Option<Vec<String>>, ValidationError> {
    let wrong_type = || ValidationError::WrongType {
        kind: RequestKind::Update,
        field: "only",
        expected: "a list",
    };
    match object.get("only") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(wrong_type))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(wrong_type()),
    }
}
