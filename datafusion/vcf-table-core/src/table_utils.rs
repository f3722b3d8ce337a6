//! Arrow builder utilities for assembling variant record batches.
//!
//! VCF INFO and FORMAT columns are dynamically typed: the header decides
//! whether a column is a scalar or a list, and of which primitive type.
//! [`OptionalField`] wraps the corresponding Arrow builders behind one
//! appending interface so the record loop can stay type-agnostic.

use datafusion::arrow::array::{
    Array, ArrayRef, BooleanBuilder, Float32Builder, Float64Builder, Int32Builder, Int64Builder,
    ListBuilder, StringBuilder,
};
use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::error::ArrowError;
use std::sync::Arc;

/// Builder wrapper for dynamically typed columns in variant record batches.
#[derive(Debug)]
pub enum OptionalField {
    /// Builder for Int32 scalar values.
    Int32Builder(Int32Builder),
    /// Builder for Int32 list values.
    ArrayInt32Builder(ListBuilder<Int32Builder>),
    /// Builder for Int64 scalar values (POS).
    Int64Builder(Int64Builder),
    /// Builder for Float32 scalar values.
    Float32Builder(Float32Builder),
    /// Builder for Float32 list values.
    ArrayFloat32Builder(ListBuilder<Float32Builder>),
    /// Builder for Float64 scalar values (QUAL).
    Float64Builder(Float64Builder),
    /// Builder for Boolean scalar values (Flag fields).
    BooleanBuilder(BooleanBuilder),
    /// Builder for UTF8 string scalar values.
    Utf8Builder(StringBuilder),
    /// Builder for UTF8 string list values (ALT, FILTER, multi-valued
    /// string fields).
    ArrayUtf8Builder(ListBuilder<StringBuilder>),
}

impl OptionalField {
    /// Creates a builder for the given Arrow data type with `batch_size`
    /// initial capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the data type has no corresponding builder.
    pub fn new(data_type: &DataType, batch_size: usize) -> Result<OptionalField, ArrowError> {
        match data_type {
            DataType::Int32 => Ok(OptionalField::Int32Builder(Int32Builder::with_capacity(
                batch_size,
            ))),
            DataType::Int64 => Ok(OptionalField::Int64Builder(Int64Builder::with_capacity(
                batch_size,
            ))),
            DataType::Float32 => Ok(OptionalField::Float32Builder(
                Float32Builder::with_capacity(batch_size),
            )),
            DataType::Float64 => Ok(OptionalField::Float64Builder(
                Float64Builder::with_capacity(batch_size),
            )),
            DataType::Utf8 => Ok(OptionalField::Utf8Builder(StringBuilder::with_capacity(
                batch_size,
                batch_size * 10,
            ))),
            DataType::Boolean => Ok(OptionalField::BooleanBuilder(
                BooleanBuilder::with_capacity(batch_size),
            )),
            DataType::List(f) => match f.data_type() {
                DataType::Int32 => Ok(OptionalField::ArrayInt32Builder(
                    ListBuilder::with_capacity(Int32Builder::with_capacity(batch_size), batch_size),
                )),
                DataType::Float32 => Ok(OptionalField::ArrayFloat32Builder(
                    ListBuilder::with_capacity(
                        Float32Builder::with_capacity(batch_size),
                        batch_size,
                    ),
                )),
                DataType::Utf8 => Ok(OptionalField::ArrayUtf8Builder(ListBuilder::with_capacity(
                    StringBuilder::with_capacity(batch_size, batch_size * 10),
                    batch_size,
                ))),
                _ => Err(ArrowError::SchemaError(
                    "Unsupported list inner data type".into(),
                )),
            },
            _ => Err(ArrowError::SchemaError("Unsupported data type".into())),
        }
    }

    /// Appends an Int32 value (as a scalar, or a one-element list).
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not integer-typed.
    pub fn append_int(&mut self, value: i32) -> Result<(), ArrowError> {
        match self {
            OptionalField::Int32Builder(builder) => {
                builder.append_value(value);
                Ok(())
            }
            OptionalField::ArrayInt32Builder(builder) => {
                builder.values().append_value(value);
                builder.append(true);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected Int32Builder".into())),
        }
    }

    /// Appends an Int64 value.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not an Int64Builder.
    pub fn append_int64(&mut self, value: i64) -> Result<(), ArrowError> {
        match self {
            OptionalField::Int64Builder(builder) => {
                builder.append_value(value);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected Int64Builder".into())),
        }
    }

    /// Appends a boolean value.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not a BooleanBuilder.
    pub fn append_boolean(&mut self, value: bool) -> Result<(), ArrowError> {
        match self {
            OptionalField::BooleanBuilder(builder) => {
                builder.append_value(value);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected BooleanBuilder".into())),
        }
    }

    /// Appends a vector of integers as one list element.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not an ArrayInt32Builder.
    pub fn append_array_int(&mut self, value: Vec<i32>) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayInt32Builder(builder) => {
                builder.values().append_slice(&value);
                builder.append(true);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected ArrayInt32Builder".into())),
        }
    }

    /// Appends a vector of nullable integers as one list element, preserving
    /// inner nulls (e.g. `AD=10,.` becomes `[10, null]`).
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not an ArrayInt32Builder.
    pub fn append_array_int_nullable(&mut self, value: Vec<Option<i32>>) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayInt32Builder(builder) => {
                for v in value {
                    match v {
                        Some(i) => builder.values().append_value(i),
                        None => builder.values().append_null(),
                    }
                }
                builder.append(true);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected ArrayInt32Builder".into())),
        }
    }

    /// Appends a Float32 value (as a scalar, or a one-element list).
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not float-typed.
    pub fn append_float(&mut self, value: f32) -> Result<(), ArrowError> {
        match self {
            OptionalField::Float32Builder(builder) => {
                builder.append_value(value);
                Ok(())
            }
            OptionalField::ArrayFloat32Builder(builder) => {
                builder.values().append_value(value);
                builder.append(true);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected Float32Builder".into())),
        }
    }

    /// Appends an optional Float64 value (QUAL; missing stays null).
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not a Float64Builder.
    pub fn append_float64_option(&mut self, value: Option<f64>) -> Result<(), ArrowError> {
        match self {
            OptionalField::Float64Builder(builder) => {
                builder.append_option(value);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected Float64Builder".into())),
        }
    }

    /// Appends a vector of floats as one list element.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not an ArrayFloat32Builder.
    pub fn append_array_float(&mut self, value: Vec<f32>) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayFloat32Builder(builder) => {
                builder.values().append_slice(&value);
                builder.append(true);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError(
                "Expected ArrayFloat32Builder".into(),
            )),
        }
    }

    /// Appends a vector of nullable floats as one list element, preserving
    /// inner nulls.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not an ArrayFloat32Builder.
    pub fn append_array_float_nullable(
        &mut self,
        value: Vec<Option<f32>>,
    ) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayFloat32Builder(builder) => {
                for v in value {
                    match v {
                        Some(f) => builder.values().append_value(f),
                        None => builder.values().append_null(),
                    }
                }
                builder.append(true);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError(
                "Expected ArrayFloat32Builder".into(),
            )),
        }
    }

    /// Appends a string value (as a scalar, or a one-element list).
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not string-typed.
    pub fn append_string(&mut self, value: &str) -> Result<(), ArrowError> {
        match self {
            OptionalField::Utf8Builder(builder) => {
                builder.append_value(value);
                Ok(())
            }
            OptionalField::ArrayUtf8Builder(builder) => {
                builder.values().append_value(value);
                builder.append(true);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected Utf8Builder".into())),
        }
    }

    /// Appends a vector of strings as one list element.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not an ArrayUtf8Builder.
    pub fn append_array_string(&mut self, value: Vec<String>) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayUtf8Builder(builder) => {
                for v in value {
                    builder.values().append_value(&v);
                }
                builder.append(true);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected ArrayUtf8Builder".into())),
        }
    }

    /// Appends a vector of nullable strings as one list element, preserving
    /// inner nulls.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is not an ArrayUtf8Builder.
    pub fn append_array_string_nullable(
        &mut self,
        value: Vec<Option<String>>,
    ) -> Result<(), ArrowError> {
        match self {
            OptionalField::ArrayUtf8Builder(builder) => {
                for v in value {
                    match v {
                        Some(s) => builder.values().append_value(&s),
                        None => builder.values().append_null(),
                    }
                }
                builder.append(true);
                Ok(())
            }
            _ => Err(ArrowError::SchemaError("Expected ArrayUtf8Builder".into())),
        }
    }

    /// Appends a null value.
    ///
    /// # Errors
    ///
    /// This method does not return errors in practice.
    pub fn append_null(&mut self) -> Result<(), ArrowError> {
        match self {
            OptionalField::Int32Builder(builder) => builder.append_null(),
            OptionalField::ArrayInt32Builder(builder) => builder.append_null(),
            OptionalField::Int64Builder(builder) => builder.append_null(),
            OptionalField::Utf8Builder(builder) => builder.append_null(),
            OptionalField::ArrayUtf8Builder(builder) => builder.append_null(),
            OptionalField::Float32Builder(builder) => builder.append_null(),
            OptionalField::ArrayFloat32Builder(builder) => builder.append_null(),
            OptionalField::Float64Builder(builder) => builder.append_null(),
            OptionalField::BooleanBuilder(builder) => builder.append_null(),
        }
        Ok(())
    }

    /// Finalizes the builder and returns the built Arrow array.
    pub fn finish(&mut self) -> ArrayRef {
        match self {
            OptionalField::Int32Builder(builder) => Arc::new(builder.finish()),
            OptionalField::ArrayInt32Builder(builder) => Arc::new(builder.finish()),
            OptionalField::Int64Builder(builder) => Arc::new(builder.finish()),
            OptionalField::Utf8Builder(builder) => Arc::new(builder.finish()),
            OptionalField::ArrayUtf8Builder(builder) => Arc::new(builder.finish()),
            OptionalField::Float32Builder(builder) => Arc::new(builder.finish()),
            OptionalField::ArrayFloat32Builder(builder) => Arc::new(builder.finish()),
            OptionalField::Float64Builder(builder) => Arc::new(builder.finish()),
            OptionalField::BooleanBuilder(builder) => Arc::new(builder.finish()),
        }
    }
}

/// Finalizes a slice of builders into Arrow arrays, in order.
pub fn builders_to_arrays(builders: &mut [OptionalField]) -> Vec<Arc<dyn Array>> {
    builders.iter_mut().map(|f| f.finish()).collect()
}
