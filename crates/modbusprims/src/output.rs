use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CoilsOutput {
    pub destination: String,
    pub unit: u8,
    pub address: u16,
    pub values: Vec<bool>,
}

#[derive(Debug, Serialize)]
pub struct WriteOutput {
    pub destination: String,
    pub unit: u8,
    pub address: u16,
    pub value: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct ReplaySummary {
    pub destination: String,
    pub iterations: u64,
    pub completed: u64,
    pub requests: u64,
    pub failures: u64,
    pub device_exceptions: u64,
    pub timeouts: u64,
    pub interrupted: bool,
}

pub fn print_coils(out: &CoilsOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["UNIT", "ADDRESS", "VALUE"]);
            for (offset, value) in out.values.iter().enumerate() {
                table.add_row(vec![
                    out.unit.to_string(),
                    (out.address as usize + offset).to_string(),
                    on_off(*value).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let values: Vec<&str> = out.values.iter().map(|v| on_off(*v)).collect();
            println!(
                "unit={} address={} count={} values=[{}]",
                out.unit,
                out.address,
                out.values.len(),
                values.join(", ")
            );
        }
    }
}

pub fn print_write(out: &WriteOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["UNIT", "ADDRESS", "WRITTEN"]);
            table.add_row(vec![
                out.unit.to_string(),
                out.address.to_string(),
                on_off(out.value).to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "unit={} address={} written={}",
                out.unit,
                out.address,
                on_off(out.value)
            );
        }
    }
}

pub fn print_replay(out: &ReplaySummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (field, value) in [
                ("iterations", out.iterations.to_string()),
                ("completed", out.completed.to_string()),
                ("requests", out.requests.to_string()),
                ("failures", out.failures.to_string()),
                ("device_exceptions", out.device_exceptions.to_string()),
                ("timeouts", out.timeouts.to_string()),
                ("interrupted", out.interrupted.to_string()),
            ] {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let interrupted = if out.interrupted { ", interrupted" } else { "" };
            println!(
                "replay {}: {}/{} iterations, {} requests",
                out.destination, out.completed, out.iterations, out.requests
            );
            println!(
                "  {} failed ({} device exceptions, {} timeouts){interrupted}",
                out.failures, out.device_exceptions, out.timeouts
            );
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
