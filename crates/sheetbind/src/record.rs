//! Statically typed records.
//!
//! A [`RecordBinding`] pairs each column with a getter/setter resolved once
//! when the binding is built, so rows never look fields up by name.

use std::any::{Any, TypeId};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::ColumnConfiguration;
use crate::error::{BindingError, FieldError};
use crate::value::{CellEnum, TargetType, TypedValue};

/// A record field that holds one column's value.
///
/// Assigning `None` leaves a plain field untouched; `Option` fields are
/// cleared instead.
pub trait CellField {
    fn target_type() -> TargetType;
    fn to_typed(&self) -> Option<TypedValue>;
    fn assign(&mut self, value: Option<TypedValue>) -> Result<(), FieldError>;
}

fn mismatch(expected: &'static str, found: &TypedValue) -> FieldError {
    FieldError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

macro_rules! cell_field {
    ($ty:ty, $target:expr, $name:literal, $to:expr, { $($pat:pat => $val:expr),+ $(,)? }) => {
        impl CellField for $ty {
            fn target_type() -> TargetType {
                $target
            }

            fn to_typed(&self) -> Option<TypedValue> {
                let to: fn(&$ty) -> TypedValue = $to;
                Some(to(self))
            }

            fn assign(&mut self, value: Option<TypedValue>) -> Result<(), FieldError> {
                let Some(value) = value else {
                    return Ok(());
                };
                *self = match value {
                    $($pat => $val,)+
                    other => return Err(mismatch($name, &other)),
                };
                Ok(())
            }
        }
    };
}

cell_field!(String, TargetType::String, "string", |v| TypedValue::String(v.clone()), {
    TypedValue::String(s) => s,
    TypedValue::Enum(s) => s,
});
cell_field!(bool, TargetType::Boolean, "boolean", |v| TypedValue::Boolean(*v), {
    TypedValue::Boolean(b) => b,
});
cell_field!(i32, TargetType::Int, "int", |v| TypedValue::Int(*v), {
    TypedValue::Int(i) => i,
});
cell_field!(i64, TargetType::Long, "long", |v| TypedValue::Long(*v), {
    TypedValue::Long(l) => l,
    TypedValue::Int(i) => i as i64,
});
cell_field!(f32, TargetType::Float, "float", |v| TypedValue::Float(*v), {
    TypedValue::Float(f) => f,
});
cell_field!(f64, TargetType::Double, "double", |v| TypedValue::Double(*v), {
    TypedValue::Double(d) => d,
    TypedValue::Float(f) => f as f64,
    TypedValue::Int(i) => i as f64,
    TypedValue::Long(l) => l as f64,
});
cell_field!(Decimal, TargetType::Decimal, "decimal", |v| TypedValue::Decimal(*v), {
    TypedValue::Decimal(d) => d,
    TypedValue::Int(i) => Decimal::from(i),
    TypedValue::Long(l) => Decimal::from(l),
});
cell_field!(NaiveDate, TargetType::Date, "date", |v| TypedValue::Date(*v), {
    TypedValue::Date(d) => d,
    TypedValue::DateTime(dt) => dt.date(),
});
cell_field!(NaiveDateTime, TargetType::DateTime, "datetime", |v| TypedValue::DateTime(*v), {
    TypedValue::DateTime(dt) => dt,
    TypedValue::Date(d) => d.and_time(NaiveTime::MIN),
});
cell_field!(NaiveTime, TargetType::Time, "time", |v| TypedValue::Time(*v), {
    TypedValue::Time(t) => t,
});

impl<F: CellField + Default> CellField for Option<F> {
    fn target_type() -> TargetType {
        F::target_type()
    }

    fn to_typed(&self) -> Option<TypedValue> {
        self.as_ref().and_then(CellField::to_typed)
    }

    fn assign(&mut self, value: Option<TypedValue>) -> Result<(), FieldError> {
        match value {
            None => *self = None,
            Some(value) => {
                let mut inner = F::default();
                inner.assign(Some(value))?;
                *self = Some(inner);
            }
        }
        Ok(())
    }
}

type Getter<T> = Box<dyn Fn(&T) -> Option<TypedValue> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Option<TypedValue>) -> Result<(), FieldError> + Send + Sync>;
type Factory<T> = Box<dyn Fn() -> Result<T, FieldError> + Send + Sync>;

struct FieldAccess<T> {
    get: Getter<T>,
    set: Setter<T>,
}

/// Column configurations of a record type with their field accessors.
pub struct RecordBinding<T> {
    columns: Vec<ColumnConfiguration>,
    fields: Vec<FieldAccess<T>>,
    factory: Factory<T>,
}

impl<T> std::fmt::Debug for RecordBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordBinding")
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

impl<T: Default + 'static> RecordBinding<T> {
    pub fn builder() -> RecordBindingBuilder<T> {
        RecordBindingBuilder::new(Box::new(|| Ok(T::default())))
    }
}

impl<T: 'static> RecordBinding<T> {
    /// Builder for records without a `Default`; `factory` makes the empty
    /// record each row starts from.
    pub fn builder_with(
        factory: impl Fn() -> Result<T, FieldError> + Send + Sync + 'static,
    ) -> RecordBindingBuilder<T> {
        RecordBindingBuilder::new(Box::new(factory))
    }
}

impl<T> RecordBinding<T> {
    pub fn columns(&self) -> &[ColumnConfiguration] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&ColumnConfiguration> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Field values in column order.
    pub fn values(&self, record: &T) -> Vec<Option<TypedValue>> {
        self.fields.iter().map(|f| (f.get)(record)).collect()
    }

    pub fn construct(&self) -> Result<T, FieldError> {
        (self.factory)()
    }

    /// Set the field bound to `columns()[index]`.
    pub fn assign(
        &self,
        record: &mut T,
        index: usize,
        value: Option<TypedValue>,
    ) -> Result<(), FieldError> {
        match self.fields.get(index) {
            Some(field) => (field.set)(record, value),
            None => Err(FieldError::Construct(format!("no field bound at {index}"))),
        }
    }

    /// A fresh record with `values[i]` assigned to the i-th field.
    pub fn build_record(&self, values: Vec<Option<TypedValue>>) -> Result<T, FieldError> {
        let mut record = self.construct()?;
        for (field, value) in self.fields.iter().zip(values) {
            (field.set)(&mut record, value)?;
        }
        Ok(record)
    }
}

pub struct RecordBindingBuilder<T> {
    columns: Vec<ColumnConfiguration>,
    fields: Vec<FieldAccess<T>>,
    factory: Factory<T>,
}

impl<T: 'static> RecordBindingBuilder<T> {
    fn new(factory: Factory<T>) -> Self {
        Self {
            columns: Vec::new(),
            fields: Vec::new(),
            factory,
        }
    }

    /// Bind a column to a field. The column's target type defaults to the
    /// field's.
    pub fn field<F: CellField + 'static>(
        mut self,
        mut column: ColumnConfiguration,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut F + Send + Sync + 'static,
    ) -> Self {
        if column.target_type.is_none() {
            column.target_type = Some(F::target_type());
        }
        self.columns.push(column);
        self.fields.push(FieldAccess {
            get: Box::new(move |record: &T| get(record).to_typed()),
            set: Box::new(move |record: &mut T, value| get_mut(record).assign(value)),
        });
        self
    }

    /// Bind a column to an enum-valued field.
    pub fn enum_field<E: CellEnum>(
        mut self,
        mut column: ColumnConfiguration,
        get: impl Fn(&T) -> Option<E> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<E>) + Send + Sync + 'static,
    ) -> Self {
        if column.target_type.is_none() {
            column.target_type = Some(TargetType::of_enum::<E>());
        }
        self.columns.push(column);
        self.fields.push(FieldAccess {
            get: Box::new(move |record: &T| {
                get(record).map(|e| TypedValue::Enum(e.name().to_string()))
            }),
            set: Box::new(move |record: &mut T, value| {
                let constant = match value {
                    None => None,
                    Some(TypedValue::Enum(name)) => Some(
                        E::from_name(&name).ok_or(FieldError::UnknownConstant(name))?,
                    ),
                    Some(other) => return Err(mismatch("enum", &other)),
                };
                set(record, constant);
                Ok(())
            }),
        });
        self
    }

    pub fn build(self) -> Result<RecordBinding<T>, BindingError> {
        let mut keys = FxHashSet::default();
        for column in &self.columns {
            if !keys.insert(column.key.as_str()) {
                return Err(BindingError::DuplicateKey(column.key.clone()));
            }
        }
        Ok(RecordBinding {
            columns: self.columns,
            fields: self.fields,
            factory: self.factory,
        })
    }
}

/// Types that declare their own column binding.
pub trait SheetRecord: Sized + 'static {
    fn binding() -> Result<RecordBinding<Self>, BindingError>;
}

/// Bindings built once per record type and shared afterwards.
///
/// Owned by the caller; separate caches never share entries.
#[derive(Default)]
pub struct ConfigurationCache {
    entries: RwLock<FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ConfigurationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build<T: SheetRecord>(&self) -> Result<Arc<RecordBinding<T>>, BindingError> {
        let key = TypeId::of::<T>();
        let cached = self.entries.read().get(&key).cloned();
        if let Some(Ok(binding)) = cached.map(|entry| entry.downcast::<RecordBinding<T>>()) {
            return Ok(binding);
        }

        let binding = Arc::new(T::binding()?);
        self.entries.write().insert(key, binding.clone());
        Ok(binding)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
