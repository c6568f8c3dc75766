//! Set command: submit a desired temperature override

use crate::client::{ApiClient, SetTemperatureRequest, SetTemperatureResponse};
use crate::output::print_success;
use anyhow::Result;

pub async fn run(client: &ApiClient, temperature: f64) -> Result<()> {
    let response: SetTemperatureResponse = client
        .post(
            "set_temperature",
            &SetTemperatureRequest { temperature },
        )
        .await?;

    print_success(&format!(
        "{}: desired temperature set to {:.2} °C",
        response.message, response.temperature
    ));

    Ok(())
}
