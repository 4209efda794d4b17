//! Schema validation and evolution checks

use std::collections::HashSet;

use crate::error::{LakeTxError, Result};

use super::{EvolutionRule, EvolutionViolation, Field, Schema};

/// Checks schemas for well-formedness and compatible evolution.
///
/// Both operations must be pure and deterministic.
pub trait SchemaValidator: Send + Sync {
    /// Check a schema on its own, independent of table history.
    fn validate(&self, schema: &Schema) -> Result<()>;

    /// Check that `new` is a legal successor of `current`.
    fn evolve(&self, current: &Schema, new: &Schema) -> Result<()>;
}

/// Default validator: additive, non-destructive evolution only
#[derive(Debug, Default, Clone, Copy)]
pub struct CompatibilityValidator;

impl CompatibilityValidator {
    pub fn new() -> Self {
        Self
    }

    fn check_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(LakeTxError::Schema("field name must not be empty".to_string()));
        }
        if name.trim() != name {
            return Err(LakeTxError::Schema(format!(
                "field name `{}` has leading or trailing whitespace",
                name
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(LakeTxError::Schema(format!(
                "field name {:?} contains control characters",
                name
            )));
        }
        Ok(())
    }

    /// Compare one field against its successor
    fn compare(old: &Field, new: &Field, violations: &mut Vec<EvolutionViolation>) {
        if !old.data_type.can_widen_to(new.data_type) {
            let rule = if new.data_type.can_widen_to(old.data_type) {
                EvolutionRule::TypeNarrowed {
                    from: old.data_type,
                    to: new.data_type,
                }
            } else {
                EvolutionRule::TypeChanged {
                    from: old.data_type,
                    to: new.data_type,
                }
            };
            violations.push(EvolutionViolation {
                field: new.name.clone(),
                rule,
            });
        }

        if old.nullable && !new.nullable {
            violations.push(EvolutionViolation {
                field: new.name.clone(),
                rule: EvolutionRule::NullabilityTightened,
            });
        }
    }
}

impl SchemaValidator for CompatibilityValidator {
    fn validate(&self, schema: &Schema) -> Result<()> {
        if schema.fields.is_empty() {
            return Err(LakeTxError::Schema(
                "schema must declare at least one field".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut rename_sources = HashSet::new();

        for field in &schema.fields {
            Self::check_name(&field.name)?;

            // Engines resolve columns case-insensitively, so `id` and `ID` collide
            if !seen.insert(field.name.to_lowercase()) {
                return Err(LakeTxError::Schema(format!(
                    "duplicate field `{}`",
                    field.name
                )));
            }

            if let Some(source) = &field.renamed_from {
                Self::check_name(source)?;
                if source == &field.name {
                    return Err(LakeTxError::Schema(format!(
                        "field `{}` is marked as renamed from itself",
                        field.name
                    )));
                }
                if !rename_sources.insert(source.as_str()) {
                    return Err(LakeTxError::Schema(format!(
                        "more than one field is renamed from `{}`",
                        source
                    )));
                }
            }
        }

        Ok(())
    }

    fn evolve(&self, current: &Schema, new: &Schema) -> Result<()> {
        self.validate(new)?;

        let mut violations = Vec::new();
        let mut matched: HashSet<&str> = HashSet::new();

        // Markers only matter on fields new to the table; one left over from
        // an earlier rename is ignored
        for old in &current.fields {
            // A field keeps its name, or a marker claims it under a name that is
            // new to the table
            let successor = new.field(&old.name).or_else(|| {
                new.fields.iter().find(|f| {
                    f.renamed_from.as_deref() == Some(old.name.as_str())
                        && current.field(&f.name).is_none()
                })
            });

            match successor {
                Some(field) => {
                    matched.insert(field.name.as_str());
                    Self::compare(old, field, &mut violations);
                }
                None => violations.push(EvolutionViolation {
                    field: old.name.clone(),
                    rule: EvolutionRule::FieldRemoved,
                }),
            }
        }

        for field in new.fields.iter().filter(|f| !matched.contains(f.name.as_str())) {
            if let Some(source) = &field.renamed_from {
                if current.field(source).is_none() {
                    violations.push(EvolutionViolation {
                        field: field.name.clone(),
                        rule: EvolutionRule::RenameSourceMissing {
                            source: source.clone(),
                        },
                    });
                    continue;
                }
                if new.field(source).is_some() {
                    violations.push(EvolutionViolation {
                        field: field.name.clone(),
                        rule: EvolutionRule::RenameSourceRetained {
                            source: source.clone(),
                        },
                    });
                    continue;
                }
            }

            if !field.nullable {
                violations.push(EvolutionViolation {
                    field: field.name.clone(),
                    rule: EvolutionRule::RequiredFieldAdded,
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(LakeTxError::SchemaEvolution { violations })
        }
    }
}
