//! Write a synthetic payments file and census cross-tab into the raw-data
//! directory so `preprocess` and the dashboard can run offline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use payment_lens::config::{CENSUS_FILE, DEFAULT_RAW_DIR, PAYMENTS_FILE};
use payment_lens::data::clean::{HOUSEHOLDS_LABEL, INCOME_LABEL, LABEL_COLUMN, PAYMENT_SOURCE_COLUMNS};
use payment_lens::data::lookup;

const SPECIALTIES: [&str; 8] = [
    "Allopathic & Osteopathic Physicians|Orthopaedic Surgery",
    "Allopathic & Osteopathic Physicians|Internal Medicine",
    "Allopathic & Osteopathic Physicians|Internal Medicine|Cardiovascular Disease",
    "Allopathic & Osteopathic Physicians|Dermatology",
    "Allopathic & Osteopathic Physicians|Psychiatry & Neurology|Neurology",
    "Dental Providers|Dentist|General Practice",
    "Physician Assistants & Advanced Practice Nursing Providers|Nurse Practitioner|",
    "",
];

const NATURES: [&str; 9] = [
    "Food and Beverage",
    "Food and Beverage",
    "Food and Beverage",
    "Travel and Lodging",
    "Consulting Fee",
    "Compensation for services other than consulting, including serving as faculty or as a \
     speaker at a venue other than a continuing education program",
    "Royalty or License",
    "Education",
    "Gift",
];

/// Postal codes used for payments; "PR" has no census column and "" is a
/// missing state.
const PAYMENT_STATES: [&str; 14] = [
    "CA", "TX", "NY", "FL", "IL", "PA", "OH", "MA", "WA", "MS", "WV", "DC", "PR", "",
];

#[derive(Parser, Debug)]
#[command(about = "Generate synthetic raw input files")]
struct Args {
    /// Output directory
    #[arg(long, default_value = DEFAULT_RAW_DIR)]
    out_dir: PathBuf,

    /// Number of payment rows
    #[arg(long, default_value_t = 20_000)]
    rows: usize,

    /// PRNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// splitmix64; enough for reproducible sample data.
struct SampleRng(u64);

impl SampleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in [0, 1).
    fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }

    /// Heavy-tailed positive amount (Pareto-like).
    fn amount(&mut self) -> f64 {
        let u = self.uniform().max(1e-9);
        (15.0 / u.powf(0.8) * 100.0).round() / 100.0
    }
}

fn write_payments(path: &Path, rows: usize, rng: &mut SampleRng) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(PAYMENT_SOURCE_COLUMNS)?;
    for i in 0..rows {
        let amount = match rng.next_u64() % 100 {
            0 => "0".to_string(),
            1 => "-25.00".to_string(),
            2 => String::new(),
            _ => format!("{:.2}", rng.amount()),
        };
        let day = 1 + rng.next_u64() % 28;
        let month = 1 + rng.next_u64() % 12;
        wtr.write_record([
            format!("{}", 100_000 + i % 4_000),
            rng.pick(&SPECIALTIES).to_string(),
            amount,
            format!("{month:02}/{day:02}/2023"),
            rng.pick(&NATURES).to_string(),
            rng.pick(&PAYMENT_STATES).to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn write_census(path: &Path, rng: &mut SampleRng) -> Result<()> {
    let mut names: Vec<&str> = lookup::all_states().iter().map(|(name, _, _)| *name).collect();
    names.push("Puerto Rico");

    let mut header = vec![LABEL_COLUMN.to_string()];
    let mut households = vec![format!("    {HOUSEHOLDS_LABEL}")];
    let mut income = vec![format!("        {INCOME_LABEL}")];
    let mut mean_income = vec!["        Mean household income (dollars)".to_string()];
    let mut section = vec!["INCOME AND BENEFITS (IN 2023 INFLATION-ADJUSTED DOLLARS)".to_string()];

    for name in names {
        header.push(format!("{name}!!Estimate"));
        header.push(format!("{name}!!Margin of Error"));

        let hh = 200_000 + rng.next_u64() % 12_000_000;
        let median = 45_000 + rng.next_u64() % 55_000;
        households.push(thousands(hh));
        households.push(format!("±{}", thousands(hh / 200)));
        income.push(thousands(median));
        income.push(format!("±{}", thousands(median / 100)));
        mean_income.push(thousands(median + median / 3));
        mean_income.push(format!("±{}", thousands(median / 80)));
        section.push(String::new());
        section.push(String::new());
    }

    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for record in [header, section, households, income, mean_income] {
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    fs::create_dir_all(&args.out_dir).with_context(|| format!("creating {}", args.out_dir.display()))?;

    let mut rng = SampleRng(args.seed);
    let payments = args.out_dir.join(PAYMENTS_FILE);
    let census = args.out_dir.join(CENSUS_FILE);

    write_payments(&payments, args.rows, &mut rng)?;
    write_census(&census, &mut rng)?;

    log::info!("Wrote {} payment rows to {}", args.rows, payments.display());
    log::info!("Wrote census indicators to {}", census.display());
    Ok(())
}
