use clap::{Args, ValueEnum};
use serde_json::Value;

use offsync::{is_local_id, DataGateway, Direction, Filter, KeyFilter, Query, Record};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct SelectCommand {
    /// Resource (table) name
    resource: String,

    /// Columns to return
    #[arg(long, default_value = "*")]
    columns: String,

    /// Filter as column=op.value, e.g. priority=gte.2 (can be repeated)
    #[arg(long = "where", value_name = "FILTER", value_parser = parse_filter)]
    filters: Vec<Filter>,

    /// Order as column[.asc|.desc] (can be repeated)
    #[arg(long = "order", value_name = "ORDER")]
    order: Vec<String>,

    /// Maximum number of rows
    #[arg(long)]
    limit: Option<usize>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args)]
pub struct InsertCommand {
    /// Resource (table) name
    resource: String,

    /// Record as a JSON object
    #[arg(value_parser = parse_record)]
    record: Record,
}

#[derive(Args)]
pub struct UpdateCommand {
    /// Resource (table) name
    resource: String,

    /// Key value of the record to update
    key: String,

    /// Fields to change as a JSON object
    #[arg(value_parser = parse_record)]
    patch: Record,

    /// Key column
    #[arg(long, default_value = "id")]
    key_column: String,
}

#[derive(Args)]
pub struct DeleteCommand {
    /// Resource (table) name
    resource: String,

    /// Key value of the record to delete
    key: String,

    /// Key column
    #[arg(long, default_value = "id")]
    key_column: String,
}

impl SelectCommand {
    pub async fn run(&self, gateway: &DataGateway) -> Result<(), Box<dyn std::error::Error>> {
        let mut query = Query::table(&self.resource).columns(&self.columns);
        for filter in &self.filters {
            query = query.filter(&filter.column, filter.op, filter.value.clone());
        }
        for order in &self.order {
            let (column, direction) = parse_order(order);
            query = query.order(column, direction);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }

        let rows = gateway.select(&query).await;
        if !gateway.is_online() {
            eprintln!("(offline: showing cached {})", self.resource);
        }

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
            OutputFormat::Text => {
                if rows.is_empty() {
                    println!("No {} found.", self.resource);
                }
                for row in &rows {
                    println!("{}", Value::Object(row.clone()));
                }
            }
        }
        Ok(())
    }
}

impl InsertCommand {
    pub async fn run(&self, gateway: &DataGateway) -> Result<(), Box<dyn std::error::Error>> {
        let row = gateway.insert(&self.resource, self.record.clone()).await?;

        match row.get("id") {
            Some(id) if is_local_id(id) => {
                println!("Queued insert into {} (local id {})", self.resource, id)
            }
            Some(id) => println!("Inserted into {} (id {})", self.resource, id),
            None => println!("Inserted into {}", self.resource),
        }
        Ok(())
    }
}

impl UpdateCommand {
    pub async fn run(&self, gateway: &DataGateway) -> Result<(), Box<dyn std::error::Error>> {
        let key = KeyFilter::new(&self.key_column, parse_value(&self.key));
        let rows = gateway
            .update(&self.resource, self.patch.clone(), &key)
            .await?;

        if gateway.is_online() {
            println!("Updated {} row(s) in {}", rows.len(), self.resource);
        } else {
            println!("Queued update of {} {}={}", self.resource, key.column, key.value);
        }
        Ok(())
    }
}

impl DeleteCommand {
    pub async fn run(&self, gateway: &DataGateway) -> Result<(), Box<dyn std::error::Error>> {
        let key = KeyFilter::new(&self.key_column, parse_value(&self.key));
        gateway.delete(&self.resource, &key).await?;

        if gateway.is_online() {
            println!("Deleted from {} where {}={}", self.resource, key.column, key.value);
        } else {
            println!("Queued delete of {} {}={}", self.resource, key.column, key.value);
        }
        Ok(())
    }
}

/// Numbers, booleans and null are taken literally, anything else as text.
fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => value,
        _ => Value::String(raw.to_string()),
    }
}

fn parse_filter(raw: &str) -> Result<Filter, String> {
    let (column, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid filter '{}'. Expected column=op.value", raw))?;
    let (op, value) = rest
        .split_once('.')
        .ok_or_else(|| format!("Invalid filter '{}'. Expected column=op.value", raw))?;

    if column.is_empty() {
        return Err(format!("Invalid filter '{}'. Column is empty", raw));
    }

    Ok(Filter {
        column: column.to_string(),
        op: op.parse()?,
        value: parse_value(value),
    })
}

fn parse_order(raw: &str) -> (&str, Direction) {
    match raw.rsplit_once('.') {
        Some((column, "desc")) => (column, Direction::Desc),
        Some((column, "asc")) => (column, Direction::Asc),
        _ => (raw, Direction::Asc),
    }
}

fn parse_record(raw: &str) -> Result<Record, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err("Expected a JSON object".to_string()),
        Err(e) => Err(format!("Invalid JSON: {}", e)),
    }
}
