use bacstack_device::{
    DeviceConfig, DeviceManager, LinkAddress, ObjectId, ObjectType, PropertyId, PropertyValue,
};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Parser, Debug)]
#[command(name = "bacstack-writeprop", about = "Write one property on a device")]
struct Args {
    /// Target device address, e.g. 192.168.1.40:47808.
    #[arg(long)]
    target: SocketAddr,
    /// Numeric object type (analog-output=1, analog-value=2).
    #[arg(long)]
    object_type: u16,
    /// Object instance number.
    #[arg(long)]
    object_instance: u32,
    /// Numeric property identifier.
    #[arg(long, default_value_t = 85)]
    property: u32,
    /// Value to write; `null` relinquishes a commanded slot.
    #[arg(long)]
    value: String,
    /// Command priority 1..=16.
    #[arg(long)]
    priority: Option<u8>,
    /// Optional array index.
    #[arg(long)]
    index: Option<u32>,
}

fn parse_value(raw: &str) -> PropertyValue {
    if raw.eq_ignore_ascii_case("null") {
        return PropertyValue::Null;
    }
    if let Ok(real) = raw.parse::<f32>() {
        return PropertyValue::Real(real);
    }
    if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
        return PropertyValue::Boolean(raw.eq_ignore_ascii_case("true"));
    }
    PropertyValue::CharacterString(raw.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = DeviceConfig::new(4_190_002).with_bind(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
    let (manager, _events) = DeviceManager::start(config).await?;

    let object = ObjectId::new(
        ObjectType::from_u16(args.object_type),
        args.object_instance,
    );
    let result = manager
        .write_property(
            LinkAddress::Ip(args.target),
            object,
            PropertyId::from_u32(args.property),
            &parse_value(&args.value),
            args.index,
            args.priority,
        )
        .await;

    match result {
        Ok(()) => println!("wrote {object} property {}", args.property),
        Err(err) => {
            eprintln!("write failed: {err}");
            std::process::exit(1);
        }
    }
    Ok(())
}
