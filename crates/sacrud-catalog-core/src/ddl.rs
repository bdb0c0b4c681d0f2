//! PostgreSQL DDL rendering.
//!
//! Renders `CREATE TABLE` statements for a schema bundle so the same tables
//! can be created in PostgreSQL. Tables come out in dependency order: every
//! table is created after the tables its foreign keys reference.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{
    fkey_name, pkey_name, DefaultValue, DeleteBehavior, EntityDef, FieldDef, ScalarType,
    SchemaBundle,
};
use crate::error::Error;

/// Render the `CREATE TABLE` statement of one entity, followed by its indexes.
pub fn create_table_sql(entity: &EntityDef, schema: &SchemaBundle) -> Result<String, Error> {
    let serial = entity.serial_field().map(|f| f.name.as_str());

    let mut lines: Vec<String> = entity
        .fields
        .iter()
        .map(|field| column_sql(field, serial == Some(field.name.as_str())))
        .collect();

    let pkey = schema
        .primary_key_name(&entity.name)
        .map(String::from)
        .unwrap_or_else(|| pkey_name(&entity.table));
    lines.push(format!(
        "    CONSTRAINT {} PRIMARY KEY ({})",
        pkey,
        entity.identity_fields.join(", ")
    ));

    for relation in schema.foreign_keys_from(&entity.name) {
        let target = schema.entity(&relation.to_entity)?;
        let name = schema
            .foreign_key_name(&entity.name, &relation.from_field)
            .map(String::from)
            .unwrap_or_else(|| fkey_name(&entity.table, &relation.from_field));
        let on_delete = match relation.on_delete {
            DeleteBehavior::Cascade => " ON DELETE CASCADE",
            DeleteBehavior::SetNull => " ON DELETE SET NULL",
            DeleteBehavior::Restrict => "",
        };
        lines.push(format!(
            "    CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}){}",
            name, relation.from_field, target.table, relation.to_field, on_delete
        ));
    }

    let mut sql = format!("CREATE TABLE {} (\n{}\n);\n", entity.table, lines.join(",\n"));
    for field in entity.indexed_fields() {
        sql.push_str(&format!(
            "CREATE INDEX ix_{table}_{column} ON {table} ({column});\n",
            table = entity.table,
            column = field.name
        ));
    }
    Ok(sql)
}

/// Render the whole schema, referenced tables first.
pub fn schema_sql(schema: &SchemaBundle) -> Result<String, Error> {
    let statements = creation_order(schema)?
        .into_iter()
        .map(|entity| create_table_sql(entity, schema))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(statements.join("\n"))
}

/// Entities sorted so that referenced entities precede the entities referencing them.
///
/// Ties are broken by table name. Self references are ignored; any other
/// cycle is a schema error.
pub fn creation_order(schema: &SchemaBundle) -> Result<Vec<&EntityDef>, Error> {
    let mut pending: BTreeMap<&str, BTreeSet<&str>> = schema
        .entities
        .values()
        .map(|entity| {
            let depends_on = schema
                .foreign_keys_from(&entity.name)
                .into_iter()
                .filter(|r| r.to_entity != entity.name)
                .filter_map(|r| schema.get_entity(&r.to_entity))
                .map(|target| target.table.as_str())
                .collect();
            (entity.table.as_str(), depends_on)
        })
        .collect();

    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending
            .iter()
            .find(|(_, deps)| deps.is_empty())
            .map(|(table, _)| *table)
            .ok_or_else(|| {
                Error::Schema(format!(
                    "foreign keys form a cycle among {}",
                    pending.keys().copied().collect::<Vec<_>>().join(", ")
                ))
            })?;

        pending.remove(ready);
        for deps in pending.values_mut() {
            deps.remove(ready);
        }
        if let Some(entity) = schema.entity_by_table(ready) {
            ordered.push(entity);
        }
    }
    Ok(ordered)
}

fn column_sql(field: &FieldDef, serial: bool) -> String {
    let sql_type = match field.field_type.scalar_type() {
        Some(ScalarType::Int64) if serial => "BIGSERIAL",
        _ if serial => "SERIAL",
        _ => field.field_type.sql_name(),
    };

    let mut sql = format!("    {} {}", field.name, sql_type);
    if field.required && !field.field_type.is_nullable() {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = field.default.as_ref().and_then(default_sql) {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default);
    }
    sql
}

fn default_sql(default: &DefaultValue) -> Option<String> {
    match default {
        DefaultValue::Null => Some("NULL".to_string()),
        DefaultValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        DefaultValue::Int(i) => Some(i.to_string()),
        DefaultValue::Float(f) => Some(f.to_string()),
        DefaultValue::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        DefaultValue::Sequence => None,
    }
}
