use std::sync::Arc;

use anyhow::{Result, bail};
use log::warn;
use presage_app::PhysiologyConfig;
use presage_core::Channel;
use presage_sensor::{NeulogClient, SensorClient, ServerStatus};

pub fn run(port: u16, channels: Vec<Channel>) -> Result<()> {
    let channels = if channels.is_empty() {
        PhysiologyConfig::default().channels
    } else {
        channels
    };
    let client = NeulogClient::new(port, &channels)?;
    let status = client.status();
    println!("Neulog on port {port}: {status:?}");
    if status != ServerStatus::Ready {
        return Ok(());
    }
    println!("  server version: {}", client.server_version()?);
    client.prepare_sensors()?;
    for (channel, value) in channels.iter().zip(client.sensor_values()?) {
        println!("  {:<18} {value}", channel.to_string());
    }
    Ok(())
}

/// Client for a session, refusing to record unless the server is idle.
///
/// A busy server has its experiment stopped so the operator can retry.
pub fn connect(physiology: &PhysiologyConfig) -> Result<Arc<NeulogClient>> {
    let client = NeulogClient::new(physiology.port, &physiology.channels)?;
    match client.status() {
        ServerStatus::Ready => {
            client.prepare_sensors()?;
            Ok(Arc::new(client))
        }
        ServerStatus::Busy => {
            if let Err(e) = client.stop_experiment() {
                warn!("could not stop the running sensor experiment: {e}");
            }
            bail!("sensor server was busy; its experiment has been stopped, start the session again")
        }
        ServerStatus::Unreachable => bail!(
            "sensor server unreachable on port {}; start Neulog or remove the physiology block",
            physiology.port
        ),
        ServerStatus::Other(status) => bail!("sensor server not ready: {status}"),
    }
}
