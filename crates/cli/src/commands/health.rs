//! Health command: show agent component health

use crate::client::{ApiClient, HealthResponse};
use crate::output::{color_status, format_timestamp, print_table, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

/// Row for the component health table
#[derive(Tabled, Serialize)]
struct HealthRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last check")]
    last_check: String,
}

pub async fn run(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthResponse = client.get_lenient("healthz").await?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    println!("Overall: {}", color_status(&health.status));

    let mut rows: Vec<HealthRow> = health
        .components
        .iter()
        .map(|(name, component)| HealthRow {
            component: name.clone(),
            status: color_status(&component.status),
            message: component.message.clone().unwrap_or_default(),
            last_check: format_timestamp(component.last_check_timestamp),
        })
        .collect();
    rows.sort_by(|a, b| a.component.cmp(&b.component));

    print_table(&rows, format);

    Ok(())
}
