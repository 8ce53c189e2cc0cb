use bacstack_device::{DeviceConfig, DeviceManager, LinkAddress, ObjectId, ObjectType, PropertyId};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Parser, Debug)]
#[command(name = "bacstack-readprop", about = "Read one property from a device")]
struct Args {
    /// Target device address, e.g. 192.168.1.40:47808.
    #[arg(long)]
    target: SocketAddr,
    /// Numeric object type (analog-input=0, analog-output=1, device=8).
    #[arg(long)]
    object_type: u16,
    /// Object instance number.
    #[arg(long)]
    object_instance: u32,
    /// Numeric property identifier (present-value=85, object-name=77).
    #[arg(long, default_value_t = 85)]
    property: u32,
    /// Optional array index (0 reads the array length).
    #[arg(long)]
    index: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = DeviceConfig::new(4_190_001).with_bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
    let (manager, _events) = DeviceManager::start(config).await?;

    let object = ObjectId::new(
        ObjectType::from_u16(args.object_type),
        args.object_instance,
    );
    let result = manager
        .read_property(
            LinkAddress::Ip(args.target),
            object,
            PropertyId::from_u32(args.property),
            args.index,
        )
        .await;

    match result {
        Ok(value) => println!("{object} property {}: {value:?}", args.property),
        Err(err) => {
            eprintln!("read failed: {err}");
            std::process::exit(1);
        }
    }
    Ok(())
}
