use std::f64::consts::PI;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + std_dev * z
}

/// Outdoor temperature: daily swing around a slow drift.
fn temperature(hour: usize, rng: &mut StdRng) -> f64 {
    let h = hour as f64;
    12.0 + 0.002 * h + 6.0 * (2.0 * PI * (h - 9.0) / 24.0).sin() + gauss(rng, 0.0, 0.8)
}

/// Load: base + daily + weekly cycles, trend, and a cooling term.
fn load(hour: usize, temp: f64, rng: &mut StdRng) -> f64 {
    let h = hour as f64;
    let daily = 15.0 * (2.0 * PI * h / 24.0).sin();
    let weekly = 8.0 * (2.0 * PI * h / 168.0).cos();
    let cooling = 1.5 * (temp - 15.0).max(0.0);
    100.0 + 0.01 * h + daily + weekly + cooling + gauss(rng, 0.0, 2.0)
}

fn main() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);

    // Four weeks of hourly rows.
    let hours = 24 * 28;
    let output_path = "sample_timeseries.csv";
    let mut writer = csv::Writer::from_path(output_path).context("creating output file")?;
    writer.write_record(["datetime", "temperature", "load"])?;

    for hour in 0..hours {
        let timestamp = format!("2025-01-{:02} {:02}:00", hour / 24 + 1, hour % 24);
        let temp = temperature(hour, &mut rng);
        let value = load(hour, temp, &mut rng);
        writer.write_record([timestamp, format!("{temp:.2}"), format!("{value:.2}")])?;
    }
    writer.flush().context("flushing output file")?;

    println!("Wrote {hours} hourly rows to {output_path}");
    Ok(())
}
