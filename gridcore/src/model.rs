//! The data model interface consumed by the grid.
//!
//! The grid is stateless with respect to cell values; it pulls them from a
//! [`DataModel`] while painting and forgets them immediately. Models notify
//! the grid of structural changes through the [`ModelChange`] signal, which
//! the grid uses to keep its section lists in sync and to schedule repaints.
use std::{any::Any, fmt, rc::Rc};

use handlerlist::{HandlerList, Ticket};

/// One of the four quadrants of the grid, plus `Void` for the surface area
/// not covered by any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellRegion {
    Body,
    RowHeader,
    ColumnHeader,
    CornerHeader,
    Void,
}

/// The regions that own a row list: the body and the column header (whose
/// rows are the header rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowRegion {
    Body,
    ColumnHeader,
}

/// The regions that own a column list: the body and the row header (whose
/// columns are the header columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRegion {
    Body,
    RowHeader,
}

impl From<RowRegion> for CellRegion {
    fn from(r: RowRegion) -> Self {
        match r {
            RowRegion::Body => CellRegion::Body,
            RowRegion::ColumnHeader => CellRegion::ColumnHeader,
        }
    }
}

impl From<ColumnRegion> for CellRegion {
    fn from(r: ColumnRegion) -> Self {
        match r {
            ColumnRegion::Body => CellRegion::Body,
            ColumnRegion::RowHeader => CellRegion::RowHeader,
        }
    }
}

/// A cell value. The grid is opaque to its structure; it only recognizes
/// blanks (see [`CellValue::is_blank`]) to skip rendering them.
#[derive(Clone)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Other(Rc<dyn Any>),
}

impl CellValue {
    /// `true` if the cell should not be rendered: nulls, and numbers that
    /// are not finite.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(x) => !x.is_finite(),
            _ => false,
        }
    }
}

impl fmt::Debug for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "Null"),
            CellValue::Bool(x) => write!(f, "Bool({:?})", x),
            CellValue::Int(x) => write!(f, "Int({:?})", x),
            CellValue::Float(x) => write!(f, "Float({:?})", x),
            CellValue::Str(x) => write!(f, "Str({:?})", x),
            CellValue::Other(x) => write!(f, "Other({:p})", Rc::as_ptr(x)),
        }
    }
}

impl From<bool> for CellValue {
    fn from(x: bool) -> Self {
        CellValue::Bool(x)
    }
}

impl From<i64> for CellValue {
    fn from(x: i64) -> Self {
        CellValue::Int(x)
    }
}

impl From<f64> for CellValue {
    fn from(x: f64) -> Self {
        CellValue::Float(x)
    }
}

impl From<&str> for CellValue {
    fn from(x: &str) -> Self {
        CellValue::Str(x.into())
    }
}

/// The recognized cell data types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellType {
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Other(Rc<str>),
}

impl CellType {
    pub fn from_name(name: &str) -> CellType {
        match name {
            "string" => CellType::String,
            "number" => CellType::Number,
            "integer" => CellType::Integer,
            "boolean" => CellType::Boolean,
            "date" => CellType::Date,
            other => CellType::Other(other.into()),
        }
    }
}

/// The set of permitted values for an enumerated cell.
#[derive(Debug, Clone)]
pub enum EnumConstraint {
    Values(Rc<[Rc<str>]>),
    /// The permitted values are determined elsewhere at runtime.
    Dynamic,
}

/// Immutable metadata describing a cell. Models hand out shared references;
/// renderers use the metadata to pick a presentation.
#[derive(Debug, Clone)]
pub struct CellMetadata {
    pub ty: CellType,
    pub constraint_enum: Option<EnumConstraint>,
    /// Host-defined keys the grid does not interpret.
    pub extra: Vec<(Rc<str>, Rc<str>)>,
}

impl CellMetadata {
    pub fn of_type(ty: CellType) -> Rc<CellMetadata> {
        Rc::new(CellMetadata {
            ty,
            constraint_enum: None,
            extra: Vec::new(),
        })
    }

    pub fn none() -> Rc<CellMetadata> {
        Self::of_type(CellType::String)
    }
}

/// A structural change to a data model.
#[derive(Debug, Clone)]
pub enum ModelChange {
    RowsInserted {
        region: RowRegion,
        index: i64,
        span: i64,
    },
    RowsRemoved {
        region: RowRegion,
        index: i64,
        span: i64,
    },
    ColumnsInserted {
        region: ColumnRegion,
        index: i64,
        span: i64,
    },
    ColumnsRemoved {
        region: ColumnRegion,
        index: i64,
        span: i64,
    },
    RowsMoved {
        region: RowRegion,
        index: i64,
        span: i64,
        /// The index of the first moved row in the resulting arrangement.
        destination: i64,
    },
    ColumnsMoved {
        region: ColumnRegion,
        index: i64,
        span: i64,
        destination: i64,
    },
    CellsChanged {
        region: CellRegion,
        row: i64,
        column: i64,
        row_span: i64,
        column_span: i64,
    },
    ModelReset,
}

pub type ChangeHandler = Box<dyn Fn(&ModelChange)>;

/// A data source for the grid.
///
/// # Guidelines for implementors
///
/// - `data` is called for every visible cell on every repaint; it should
///   respond without a delay such as one caused by disk I/O. When the real
///   value is not available yet, return a placeholder and emit
///   [`ModelChange::CellsChanged`] once it is.
/// - Counts reported here are authoritative: after a `changed` emission the
///   grid resynchronizes against them.
pub trait DataModel {
    /// The number of rows in a region.
    fn row_count(&self, region: RowRegion) -> u64;

    /// The number of columns in a region.
    fn column_count(&self, region: ColumnRegion) -> u64;

    /// Get the value of a cell.
    fn data(&self, region: CellRegion, row: u64, column: u64) -> CellValue;

    /// Get the metadata of a cell.
    fn metadata(&self, _region: CellRegion, _row: u64, _column: u64) -> Rc<CellMetadata> {
        CellMetadata::none()
    }

    /// Register a change handler. Models that never change may keep the
    /// default implementation, which registers nothing.
    fn connect_changed(&self, _handler: ChangeHandler) -> Option<Ticket> {
        None
    }
}

/// Embeddable implementation of the `changed` signal for [`DataModel`]
/// implementors. Dispatch is synchronous and in registration order.
#[derive(Debug, Default)]
pub struct ModelChangeHub {
    handlers: HandlerList<ChangeHandler>,
}

impl ModelChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, handler: ChangeHandler) -> Ticket {
        self.handlers.insert(handler)
    }

    pub fn emit(&self, change: &ModelChange) {
        for handler in self.handlers.snapshot() {
            handler(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn blank_values() {
        assert!(CellValue::Null.is_blank());
        assert!(CellValue::Float(f64::NAN).is_blank());
        assert!(CellValue::Float(f64::INFINITY).is_blank());
        assert!(!CellValue::Float(0.0).is_blank());
        assert!(!CellValue::Int(0).is_blank());
        assert!(!CellValue::from("").is_blank());
    }

    #[test]
    fn cell_type_names() {
        assert_eq!(CellType::from_name("integer"), CellType::Integer);
        assert_eq!(CellType::from_name("date"), CellType::Date);
        assert_eq!(
            CellType::from_name("currency"),
            CellType::Other("currency".into())
        );
    }

    #[test]
    fn hub_dispatches_in_order() {
        let hub = ModelChangeHub::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for tag in &["a", "b"] {
            let log = Rc::clone(&log);
            let tag = tag.to_string();
            hub.connect(Box::new(move |change| {
                if let ModelChange::ModelReset = change {
                    log.borrow_mut().push(tag.clone());
                }
            }));
        }

        hub.emit(&ModelChange::ModelReset);
        assert_eq!(*log.borrow(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn hub_tickets_detach() {
        let hub = ModelChangeHub::new();
        let log = Rc::new(RefCell::new(0));

        let log2 = Rc::clone(&log);
        let ticket = hub.connect(Box::new(move |_| {
            *log2.borrow_mut() += 1;
        }));

        hub.emit(&ModelChange::ModelReset);
        assert!(ticket.detach());
        hub.emit(&ModelChange::ModelReset);
        assert_eq!(*log.borrow(), 1);
    }
}
