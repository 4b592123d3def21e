//! Request descriptors for the data gateway.
//!
//! A [`Query`] is an immutable value built step by step with consuming
//! builder methods. Mutations are described by [`Request`] variants. Every
//! request goes through a single `DataGateway::execute` entry point.
//!
//! ```
//! use offsync::request::{Direction, Query, Request};
//!
//! let query = Query::table("tasks")
//!     .eq("project_id", "p1")
//!     .gte("priority", 2)
//!     .order("created_at", Direction::Desc)
//!     .limit(20);
//!
//! assert_eq!(query.filters.len(), 2);
//! let request = Request::Select(query);
//! assert_eq!(request.resource(), "tasks");
//! ```

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::models::Record;

/// Comparison applied by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eq" => Ok(FilterOp::Eq),
            "neq" => Ok(FilterOp::Neq),
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Gte),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Lte),
            _ => Err(format!(
                "Invalid filter operator '{}'. Valid options: eq, neq, gt, gte, lt, lte",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// A read against one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub resource: String,
    /// Column projection, `*` for all columns.
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn filter(mut self, column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn neq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Neq, value)
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Gt, value)
    }

    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Lt, value)
    }

    pub fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(Order {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Equality filter that locates the record an update or delete targets.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFilter {
    pub column: String,
    pub value: Value,
}

impl KeyFilter {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Filter on the conventional `id` column.
    pub fn id(value: impl Into<Value>) -> Self {
        Self::new("id", value)
    }
}

/// A call against the record store, online or offline.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Select(Query),
    Insert {
        resource: String,
        record: Record,
    },
    Update {
        resource: String,
        patch: Record,
        key: KeyFilter,
    },
    Delete {
        resource: String,
        key: KeyFilter,
    },
}

impl Request {
    pub fn insert(resource: impl Into<String>, record: Record) -> Self {
        Request::Insert {
            resource: resource.into(),
            record,
        }
    }

    pub fn update(resource: impl Into<String>, patch: Record, key: KeyFilter) -> Self {
        Request::Update {
            resource: resource.into(),
            patch,
            key,
        }
    }

    pub fn delete(resource: impl Into<String>, key: KeyFilter) -> Self {
        Request::Delete {
            resource: resource.into(),
            key,
        }
    }

    pub fn resource(&self) -> &str {
        match self {
            Request::Select(query) => &query.resource,
            Request::Insert { resource, .. }
            | Request::Update { resource, .. }
            | Request::Delete { resource, .. } => resource,
        }
    }
}

/// Result of an executed [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Rows(Vec<Record>),
    Empty,
}

impl Response {
    pub fn rows(&self) -> &[Record] {
        match self {
            Response::Rows(rows) => rows,
            Response::Empty => &[],
        }
    }

    pub fn into_rows(self) -> Vec<Record> {
        match self {
            Response::Rows(rows) => rows,
            Response::Empty => Vec::new(),
        }
    }
}
