//! Status command: show the current reading and predicted setpoint

use crate::client::{ApiClient, SensorSnapshot};
use crate::output::{print_table, print_warning, OutputFormat};
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

/// Row for the status table
#[derive(Tabled, Serialize)]
struct StatusRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(metric: &str, value: String) -> StatusRow {
    StatusRow {
        metric: metric.to_string(),
        value,
    }
}

pub async fn run(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let snapshot: SensorSnapshot = client.get("sensor_data").await?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let rows = vec![
        row("Temperature", format!("{:.2} °C", snapshot.temperature)),
        row("Humidity", format!("{:.2} %", snapshot.humidity)),
        row("CO2", format!("{} ppm", snapshot.co2_level)),
        row(
            "Occupancy",
            if snapshot.occupancy == 1 {
                "occupied".to_string()
            } else {
                "empty".to_string()
            },
        ),
        row("Energy rate", format!("${:.2}/kWh", snapshot.energy_cost)),
        row(
            "Predicted setpoint",
            match snapshot.predicted_temperature {
                Some(predicted) => format!("{:.2} °C", predicted),
                None => "-".to_string(),
            },
        ),
    ];
    print_table(&rows, format);

    if snapshot.predicted_temperature.is_none() {
        print_warning("No trained model yet; the agent is using its default setpoint");
    }

    Ok(())
}
