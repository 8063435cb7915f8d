use crate::schema::TableSchema;

/// Generate CREATE TABLE SQL for a table schema
pub fn generate_create_table(schema: &TableSchema) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", schema.name);
    let mut columns = Vec::new();

    for col in schema.columns {
        let null_constraint = if !col.nullable { " NOT NULL" } else { "" };
        let pk = if col.name == "id" { " PRIMARY KEY" } else { "" };

        columns.push(format!(
            "    {} {}{}{}",
            col.name,
            col.col_type.sql_type(),
            pk,
            null_constraint
        ));
    }

    for fk in schema.foreign_keys {
        let on_delete = if fk.cascade { " ON DELETE CASCADE" } else { "" };
        columns.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {}({}){}",
            fk.column, fk.references_table, fk.references_column, on_delete
        ));
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    sql
}

/// Generate CREATE INDEX statements for declared indexes
pub fn generate_indexes(schema: &TableSchema) -> Vec<String> {
    schema
        .indexes
        .iter()
        .map(|index| {
            let unique = if index.unique { "UNIQUE " } else { "" };
            format!(
                "CREATE {}INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
                unique,
                schema.name,
                index.columns.join("_"),
                schema.name,
                index.columns.join(", ")
            )
        })
        .collect()
}
