//! Schema Module
//!
//! Structural contract of a table and the rules for evolving it.
//!
//! ## Responsibilities
//! - Describe a table as an ordered set of named, typed fields
//! - Reject malformed schemas independent of history
//! - Decide whether a proposed schema is a legal successor of the current one
//!
//! ## Evolution Rules
//! Allowed:
//! - Adding a nullable field
//! - Widening a numeric or temporal type (see [`DataType::can_widen_to`])
//! - Relaxing a required field to nullable
//! - Renaming a field that carries an explicit `renamed_from` marker
//!
//! Rejected:
//! - Removing a field, or renaming one without a marker
//! - Narrowing or otherwise changing a type
//! - Tightening a nullable field to required
//! - Adding a required field

mod validator;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LakeTxError;

pub use validator::{CompatibilityValidator, SchemaValidator};

/// Identifier of a committed schema. Increments with every schema change.
pub type SchemaId = u32;

/// Logical field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Binary,
    Date,
    Timestamp,
}

impl DataType {
    /// Whether every value of `self` is representable as `target` without loss.
    ///
    /// Identity is a widening.
    pub fn can_widen_to(self, target: DataType) -> bool {
        use DataType::*;

        if self == target {
            return true;
        }

        matches!(
            (self, target),
            (Int8, Int16 | Int32 | Int64 | Float32 | Float64)
                | (Int16, Int32 | Int64 | Float32 | Float64)
                | (Int32, Int64 | Float64)
                | (Float32, Float64)
                | (Date, Timestamp)
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "boolean",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Utf8 => "utf8",
            DataType::Binary => "binary",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

impl FromStr for DataType {
    type Err = LakeTxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(DataType::Boolean),
            "int8" | "tinyint" => Ok(DataType::Int8),
            "int16" | "smallint" => Ok(DataType::Int16),
            "int32" | "int" => Ok(DataType::Int32),
            "int64" | "bigint" | "long" => Ok(DataType::Int64),
            "float32" | "float" => Ok(DataType::Float32),
            "float64" | "double" => Ok(DataType::Float64),
            "utf8" | "string" => Ok(DataType::Utf8),
            "binary" | "bytes" => Ok(DataType::Binary),
            "date" => Ok(DataType::Date),
            "timestamp" => Ok(DataType::Timestamp),
            other => Err(LakeTxError::Schema(format!("unknown data type `{}`", other))),
        }
    }
}

/// A single named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,

    /// Migration marker: the name this field had in the previous schema
    pub renamed_from: Option<String>,
}

impl Field {
    /// A field that must always hold a value
    pub fn required(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            renamed_from: None,
        }
    }

    /// A field that may be null
    pub fn optional(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            nullable: true,
            ..Self::required(name, data_type)
        }
    }

    /// Mark this field as the renamed successor of `previous`
    pub fn renamed_from(mut self, previous: impl Into<String>) -> Self {
        self.renamed_from = Some(previous.into());
        self
    }
}

/// Versioned structural contract of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Assigned at commit time; ignored when comparing for compatibility
    pub schema_id: SchemaId,
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create an uncommitted schema (id 0) from fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            schema_id: 0,
            fields,
        }
    }

    /// Same fields, different id
    pub fn with_id(mut self, schema_id: SchemaId) -> Self {
        self.schema_id = schema_id;
        self
    }

    /// Look up a field by exact name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Evolution rule a proposed schema violated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvolutionRule {
    /// A current field has no successor in the proposed schema
    FieldRemoved,

    /// The new type is strictly narrower than the old one
    TypeNarrowed { from: DataType, to: DataType },

    /// The types are unrelated
    TypeChanged { from: DataType, to: DataType },

    /// A nullable field became required
    NullabilityTightened,

    /// A new field was added without being nullable
    RequiredFieldAdded,

    /// A `renamed_from` marker names a field the current schema lacks
    RenameSourceMissing { source: String },

    /// A `renamed_from` marker names a field the proposed schema still keeps
    RenameSourceRetained { source: String },
}

/// One incompatibility found by [`SchemaValidator::evolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionViolation {
    pub field: String,
    pub rule: EvolutionRule,
}

impl fmt::Display for EvolutionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            EvolutionRule::FieldRemoved => {
                write!(f, "field `{}` removed (or renamed without a marker)", self.field)
            }
            EvolutionRule::TypeNarrowed { from, to } => {
                write!(f, "field `{}` narrowed from {} to {}", self.field, from, to)
            }
            EvolutionRule::TypeChanged { from, to } => {
                write!(f, "field `{}` changed type from {} to {}", self.field, from, to)
            }
            EvolutionRule::NullabilityTightened => {
                write!(f, "field `{}` changed from nullable to required", self.field)
            }
            EvolutionRule::RequiredFieldAdded => {
                write!(f, "new field `{}` must be nullable", self.field)
            }
            EvolutionRule::RenameSourceMissing { source } => write!(
                f,
                "field `{}` is marked as renamed from `{}`, which does not exist",
                self.field, source
            ),
            EvolutionRule::RenameSourceRetained { source } => write!(
                f,
                "field `{}` is marked as renamed from `{}`, which is still present",
                self.field, source
            ),
        }
    }
}
