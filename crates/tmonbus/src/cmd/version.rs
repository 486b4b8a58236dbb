use tmonbus_frame::{ADDRESS_MAX, ADDRESS_MIN, MAX_PAYLOAD};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("tmonbus {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: tmonbus");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("TMONBUS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("checksum: CRC-16/MODBUS");
    println!("addresses: {ADDRESS_MIN}-{ADDRESS_MAX}");
    println!("max_payload: {MAX_PAYLOAD}");
    println!(
        "features: node={}, controller={}, cli=true",
        cfg!(feature = "node"),
        cfg!(feature = "controller")
    );

    Ok(SUCCESS)
}
