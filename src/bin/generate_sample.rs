//! Writes synthetic uploads for trying the dashboards by hand.
//!
//! ```text
//! generate_sample sensor   [sensor_export.csv]
//! generate_sample registry [registry.csv]
//! ```

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use encoding_rs::WINDOWS_1252;

const SENSORS: usize = 3;
const READINGS: usize = 7 * 24 * 4;

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
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
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

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn sensor_export(rng: &mut SimpleRng) -> Result<Vec<u8>> {
    let width = 1 + 2 * SENSORS;
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());

    let banner = |text: &str| {
        let mut row = vec![text.to_string()];
        row.resize(width, String::new());
        row
    };
    writer.write_record(banner("Logger export"))?;
    writer.write_record(banner("Device: HX-200"))?;

    let mut group = vec![String::new()];
    let mut sub = vec!["Date Time".to_string()];
    for n in 1..=SENSORS {
        group.extend([format!("Sensor {n}"), format!("Sensor {n}")]);
        sub.extend(["Humidity (%RH)".to_string(), "Temp \u{b0}C".to_string()]);
    }
    writer.write_record(&group)?;
    writer.write_record(banner("Interval: 15 min"))?;
    writer.write_record(banner("Site: Lab A"))?;
    writer.write_record(banner("Firmware: 2.1"))?;
    writer.write_record(&sub)?;

    let start = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid start timestamp")?;
    for i in 0..READINGS {
        let at = start + Duration::minutes(15 * i as i64);
        let phase = (i % 96) as f64 / 96.0 * 2.0 * std::f64::consts::PI;
        let mut row = vec![at.format("%Y-%m-%d %H:%M:%S").to_string()];
        for n in 0..SENSORS {
            let humidity = 55.0 + 5.0 * n as f64 - 8.0 * phase.sin() + rng.gauss(0.0, 1.5);
            let temp = 21.0 + 2.0 * phase.sin() + rng.gauss(0.0, 0.3);
            // Loggers occasionally drop a sample.
            if rng.next_f64() < 0.01 {
                row.push("---".to_string());
            } else {
                row.push(format!("{humidity:.1}"));
            }
            row.push(format!("{temp:.2}"));
        }
        writer.write_record(&row)?;
    }

    let text = String::from_utf8(writer.into_inner()?)?;
    let (bytes, _, unmappable) = WINDOWS_1252.encode(&text);
    if unmappable {
        bail!("sample text is not representable in Latin-1");
    }
    Ok(bytes.into_owned())
}

fn registry_export(rng: &mut SimpleRng) -> Result<Vec<u8>> {
    let materials = ["Cement", "Steel", "Glass", "Timber", "Concrete"];
    let standards = ["ISO 9001", "ISO 17025", "ASTM C150", "EN 197-1", "ASTM A615", "BS 8500"];
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["ID", "Lab Name", "Material_Product_Tested", "Standard"])?;
    for _ in 0..200 {
        let lab = rng.next_u64() % 40;
        writer.write_record([
            format!("LAB-{lab:03}"),
            format!("Laboratory {lab}"),
            rng.pick(&materials).to_string(),
            rng.pick(&standards).to_string(),
        ])?;
    }
    Ok(writer.into_inner()?)
}

fn main() -> Result<()> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let kind = args.next().unwrap_or_else(|| "sensor".to_string());
    let mut rng = SimpleRng::new(42);

    let (bytes, default_path) = match kind.as_str() {
        "sensor" => (sensor_export(&mut rng)?, "sensor_export.csv"),
        "registry" => (registry_export(&mut rng)?, "registry.csv"),
        other => bail!("unknown sample kind '{other}' (expected sensor or registry)"),
    };
    let output_path = args.next().unwrap_or_else(|| default_path.to_string());
    std::fs::write(&output_path, &bytes).with_context(|| format!("failed to write {output_path}"))?;

    println!("Wrote {} bytes of {kind} sample data to {output_path}", bytes.len());
    Ok(())
}
