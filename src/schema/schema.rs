use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind, Result};
use crate::schema::field::{Field, FieldEntry, FieldOptions, FieldType};

/// Mutable schema under construction. Frozen by [`SchemaBuilder::build`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldEntry>,
    names: HashMap<String, u32>,
    permissive: bool,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        SchemaBuilder::default()
    }

    /// Drop unknown document fields at validation instead of rejecting them.
    pub fn permissive(mut self, permissive: bool) -> Self {
        self.permissive = permissive;
        self
    }

    pub fn add_field(
        &mut self,
        name: &str,
        field_type: FieldType,
        options: FieldOptions,
    ) -> Result<Field> {
        if name.is_empty() {
            return Err(Error::new(ErrorKind::InvalidOptions, "empty field name"));
        }
        if self.names.contains_key(name) {
            return Err(Error::new(
                ErrorKind::FieldExists,
                format!("field '{}' is already declared", name),
            ));
        }
        options.validate_for(field_type, name)?;
        let handle = self.fields.len() as u32;
        self.names.insert(name.to_string(), handle);
        self.fields.push(FieldEntry {
            name: name.to_string(),
            field_type,
            options,
        });
        Ok(Field(handle))
    }

    pub fn add_text_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::Text, options)
    }

    pub fn add_u64_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::U64, options)
    }

    pub fn add_i64_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::I64, options)
    }

    pub fn add_f64_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::F64, options)
    }

    pub fn add_bool_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::Bool, options)
    }

    pub fn add_date_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::Date, options)
    }

    pub fn add_bytes_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::Bytes, options)
    }

    pub fn add_json_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::Json, options)
    }

    pub fn add_ip_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::IpAddr, options)
    }

    pub fn add_facet_field(&mut self, name: &str, options: FieldOptions) -> Result<Field> {
        self.add_field(name, FieldType::Facet, options)
    }

    /// Freeze the schema. Handles are final after this point.
    pub fn build(self) -> Schema {
        Schema {
            inner: Arc::new(InnerSchema {
                fields: self.fields,
                names: self.names,
                permissive: self.permissive,
            }),
        }
    }
}

#[derive(Debug)]
struct InnerSchema {
    fields: Vec<FieldEntry>,
    names: HashMap<String, u32>,
    permissive: bool,
}

/// Immutable, cheaply clonable field catalog.
///
/// Once built, a schema never changes; adding a field requires a new
/// index. Shareable across threads without synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SchemaSerde", into = "SchemaSerde")]
pub struct Schema {
    inner: Arc<InnerSchema>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn field_by_name(&self, name: &str) -> Result<Field> {
        self.inner
            .names
            .get(name)
            .map(|&handle| Field(handle))
            .ok_or_else(|| Error::unknown_field(name))
    }

    pub fn field_entry(&self, field: Field) -> &FieldEntry {
        &self.inner.fields[field.0 as usize]
    }

    pub fn field_name(&self, field: Field) -> &str {
        &self.field_entry(field).name
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &FieldEntry)> {
        self.inner
            .fields
            .iter()
            .enumerate()
            .map(|(ord, entry)| (Field(ord as u32), entry))
    }

    pub fn len(&self) -> usize {
        self.inner.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.fields.is_empty()
    }

    pub fn is_permissive(&self) -> bool {
        self.inner.permissive
    }
}

#[derive(Serialize, Deserialize)]
struct SchemaSerde {
    fields: Vec<FieldEntry>,
    #[serde(default)]
    permissive: bool,
}

impl From<SchemaSerde> for Schema {
    fn from(serde: SchemaSerde) -> Self {
        let names = serde
            .fields
            .iter()
            .enumerate()
            .map(|(ord, entry)| (entry.name.clone(), ord as u32))
            .collect();
        Schema {
            inner: Arc::new(InnerSchema {
                fields: serde.fields,
                names,
                permissive: serde.permissive,
            }),
        }
    }
}

impl From<Schema> for SchemaSerde {
    fn from(schema: Schema) -> Self {
        SchemaSerde {
            fields: schema.inner.fields.clone(),
            permissive: schema.inner.permissive,
        }
    }
}
