use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("rawrepl {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: rawrepl");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("build_target: {}", env!("RAWREPL_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "transports: device=true, tcp=true, unix={}",
        cfg!(unix)
    );
    println!(
        "chunk_sizes: code={}, file={}",
        rawrepl_session::protocol::CODE_CHUNK_SIZE,
        rawrepl_session::protocol::FILE_CHUNK_SIZE
    );

    Ok(SUCCESS)
}
