use heimwatt_core::ReadingLog;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args().nth(1);
    let reader: Box<dyn BufRead> = match path {
        Some(p) => Box::new(BufReader::new(File::open(p)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut log = ReadingLog::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match log.ingest(line.as_bytes()) {
            Ok(reading) => println!(
                "{:.3}\t{}",
                reading.energy_consumption, reading.device_id
            ),
            Err(e) => eprintln!("line {}: {e}", idx + 1),
        }
    }

    eprintln!("{} readings kept", log.len());
    Ok(())
}
