use bacstack_device::{BroadcastMode, DeviceConfig, DeviceManager};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bacstack-whois", about = "Broadcast Who-Is and list the replies")]
struct Args {
    /// Seconds to collect I-Am replies.
    #[arg(long, default_value_t = 5)]
    wait: u64,
    /// Lowest device instance to ask for.
    #[arg(long)]
    low: Option<u32>,
    /// Highest device instance to ask for.
    #[arg(long)]
    high: Option<u32>,
    /// Subnet-directed broadcast address instead of 255.255.255.255.
    #[arg(long)]
    directed: Option<SocketAddr>,
    /// Local UDP port.
    #[arg(long, default_value_t = 47808)]
    port: u16,
    /// Local device instance to identify as.
    #[arg(long, default_value_t = 4_190_000)]
    instance: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = DeviceConfig::new(args.instance)
        .with_bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.port);
    if let Some(directed) = args.directed {
        config = config.with_broadcast(BroadcastMode::Directed(directed));
    }
    let (manager, _events) = DeviceManager::start(config).await?;

    let window = Duration::from_secs(args.wait);
    let found = match (args.low, args.high) {
        (Some(low), Some(high)) => manager.discover_devices_in_range(low, high, window).await?,
        (None, None) => manager.discover_devices(window).await?,
        _ => {
            eprintln!("--low and --high must be given together");
            std::process::exit(2);
        }
    };

    for record in &found {
        println!(
            "device {:>8}  vendor {:>5}  max-apdu {:>4}  {:?}  at {}",
            record.instance, record.vendor_id, record.max_apdu, record.segmentation, record.address
        );
    }
    println!("{} device(s) answered", found.len());
    Ok(())
}
