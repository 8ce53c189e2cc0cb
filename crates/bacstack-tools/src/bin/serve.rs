use bacstack_device::object::{AnalogInput, AnalogOutput};
use bacstack_device::{DeviceConfig, DeviceEvent, DeviceManager};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr};

#[derive(Parser, Debug)]
#[command(
    name = "bacstack-serve",
    about = "Run a BACnet/IP device with a few analog points"
)]
struct Args {
    /// Device instance to advertise.
    #[arg(long, default_value_t = 1234)]
    instance: u32,
    /// UDP port to listen on.
    #[arg(long, default_value_t = 47808)]
    port: u16,
    /// Vendor identifier to advertise.
    #[arg(long, default_value_t = 0)]
    vendor_id: u32,
    /// How many analog input/output pairs to serve.
    #[arg(long, default_value_t = 2)]
    points: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = DeviceConfig::new(args.instance)
        .with_bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.port)
        .with_vendor(args.vendor_id, "bacstack")
        .with_device_name(format!("bacstack-serve-{}", args.instance));
    let (manager, mut events) = DeviceManager::start(config).await?;

    for point in 1..=args.points {
        manager.add_object(
            AnalogInput::new(point, format!("ai-{point}"))
                .with_limits(0.0, 100.0)
                .with_present_value(20.0)
                .with_units("degrees-celsius"),
        )?;
        manager.add_object(
            AnalogOutput::new(point, format!("ao-{point}"))
                .with_limits(0.0, 100.0)
                .with_relinquish_default(20.0),
        )?;
    }

    manager.announce().await?;
    log::info!(
        "serving device {} on {}",
        args.instance,
        manager.local_addr()?
    );

    let watcher = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                DeviceEvent::Discovered(record) => {
                    log::info!("peer device {} at {}", record.instance, record.address)
                }
                DeviceEvent::Added(id) => log::info!("object added: {id}"),
                DeviceEvent::Removed(id) => log::info!("object removed: {id}"),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    watcher.abort();
    manager.shutdown();
    Ok(())
}
