//! Write synthetic PRSA-shaped station files for trying the dashboard
//! without the real dataset.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike};
use clap::Parser;

use air_quality_dashboard::config::{prsa_file_name, PRSA_STATIONS};

const WIND_DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

#[derive(Parser, Debug)]
#[command(about = "Generate synthetic PRSA station CSV files")]
struct Args {
    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Days of hourly data per station, starting 2013-03-01
    #[arg(long, default_value_t = 1461)]
    days: u32,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Probability that a PM2.5 cell is written as NA
    #[arg(long, default_value_t = 0.02)]
    missing_rate: f64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn write_station(args: &Args, station: &str, rng: &mut SimpleRng) -> Result<PathBuf> {
    let path = args.out.join(prsa_file_name(station));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record([
        "No", "year", "month", "day", "hour", "PM2.5", "TEMP", "HUMI", "WSPM", "wd", "station",
    ])?;

    let start = NaiveDate::from_ymd_opt(2013, 3, 1)
        .context("invalid start date")?
        .and_time(NaiveTime::MIN);
    let hours = i64::from(args.days) * 24;

    for i in 0..hours {
        let ts = start + Duration::hours(i);
        let season = (f64::from(ts.ordinal()) / 365.25 * std::f64::consts::TAU).cos();
        let diurnal = (f64::from(ts.hour()) / 24.0 * std::f64::consts::TAU).sin();

        let temp = 13.0 - 15.0 * season + 4.0 * diurnal + rng.gauss(0.0, 2.0);
        let humi = (55.0 + 20.0 * season - 10.0 * diurnal + rng.gauss(0.0, 8.0)).clamp(5.0, 100.0);
        let wspm = rng.gauss(1.8, 1.0).abs();
        let pm25 = (80.0 + 40.0 * season - 12.0 * wspm + 0.3 * humi + rng.gauss(0.0, 25.0)).max(2.0);
        let wd = WIND_DIRECTIONS[(rng.next_u64() % WIND_DIRECTIONS.len() as u64) as usize];

        let pm_cell = if rng.next_f64() < args.missing_rate {
            "NA".to_string()
        } else {
            format!("{pm25:.0}")
        };

        writer.write_record([
            (i + 1).to_string(),
            ts.year().to_string(),
            ts.month().to_string(),
            ts.day().to_string(),
            ts.hour().to_string(),
            pm_cell,
            format!("{temp:.1}"),
            format!("{humi:.0}"),
            format!("{wspm:.1}"),
            wd.to_string(),
            station.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(path)
}

fn main() -> Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let mut rng = SimpleRng::new(args.seed);
    for station in PRSA_STATIONS {
        let path = write_station(&args, station, &mut rng)?;
        println!("Wrote {} hours for {station} to {}", args.days * 24, path.display());
    }
    Ok(())
}
