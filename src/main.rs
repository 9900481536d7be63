use std::time::Instant;

use hdfile::logging::initialize_loggers;
use hdfile::*;

fn main() -> Result<()> {
    let conf = Configuration::try_get()?;
    initialize_loggers(conf.log_file.clone());

    let start = Instant::now();
    let fs = FileSystem::connect(conf)?;

    let path = "/tmp/t1";
    let mut f = fs.create(path)?;
    let written = f.write(b"hello world")?;
    f.close()?;
    log::info!("wrote {} bytes to {}", written, path);

    let mut f = fs.open(path)?;
    println!("available: {}", f.available()?);
    let word = f.pread(6, 5)?;
    println!("pread(6, 5): {}", String::from_utf8_lossy(&word));
    f.seek(0)?;
    println!("tell after seek(0): {}", f.tell()?);
    f.close()?;

    println!("{:?}", start.elapsed());
    Ok(())
}
