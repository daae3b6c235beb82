use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};

use leadlens::{
    initialize_db,
    lead::{Lead, count_leads, insert_lead},
};

const UNITS: [&str; 3] = ["North", "South", "Online"];
const FUNNELS: [&str; 2] = ["Demo request", "Ebook download"];
const SOURCES: [&str; 4] = ["google", "meta", "linkedin", "newsletter"];
const MEDIUMS: [&str; 3] = ["cpc", "social", "email"];
const CAMPAIGNS: [&str; 3] = ["spring-launch", "retargeting", "brand"];
const TITLES: [&str; 6] = ["CEO", "CTO", "Marketing Manager", "Analyst", "Founder", "null"];
const REVENUE_BANDS: [&str; 4] = ["Up to 1M", "1M to 10M", "10M to 50M", "null"];
const EMPLOYEE_BANDS: [&str; 3] = ["1-10", "11-50", "51-200"];
const REGIONS: [&str; 4] = ["Southeast", "South", "Northeast", "Midwest"];

/// A utility for creating a database of synthetic leads for the leadlens server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The number of leads to create.
    #[arg(long, short, default_value_t = 250)]
    count: usize,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating {} synthetic leads...", args.count);

    let now = OffsetDateTime::now_utc();
    for index in 0..args.count {
        insert_lead(&synthetic_lead(index, now)?, &conn)?;
    }

    println!("Success! The database holds {} leads.", count_leads(&conn)?);

    Ok(())
}

/// Build the `index`-th lead, spread over the 90 days before `now`.
///
/// Names and contact details use reserved example domains and numbers.
fn synthetic_lead(index: usize, now: OffsetDateTime) -> Result<Lead, Box<dyn Error>> {
    let pick = |values: &[&str], step: usize| values[(index * step + index / 7) % values.len()].to_owned();
    let hours_ago = (index as i64 * 37) % (90 * 24);
    let registered_at = (now - Duration::hours(hours_ago)).format(&Rfc3339)?;

    Ok(Lead {
        name: Some(format!("Test Lead {index:04}")),
        email: Some(format!("lead{index:04}@example.com")),
        // Every tenth lead repeats a phone number so unique counts differ from totals.
        phone: Some(format!("+1-555-01{:02}", if index % 10 == 0 { 0 } else { index % 100 })),
        company: (index % 4 != 0).then(|| format!("Example Company {}", index % 17)),
        title: Some(pick(&TITLES, 5)),
        revenue_band: Some(pick(&REVENUE_BANDS, 3)),
        employee_band: Some(pick(&EMPLOYEE_BANDS, 2)),
        region: Some(pick(&REGIONS, 1)),
        unit: Some(pick(&UNITS, 1)),
        funnel_name: Some(pick(&FUNNELS, 1)),
        utm_source: (index % 9 != 0).then(|| pick(&SOURCES, 3)),
        utm_medium: Some(pick(&MEDIUMS, 1)),
        utm_campaign: Some(pick(&CAMPAIGNS, 2)),
        utm_content: (index % 3 == 0).then(|| format!("ad-{}", index % 5)),
        utm_term: None,
        page_url: Some("https://example.com/landing".to_owned()),
        consultant: Some(format!("Consultant {}", index % 3 + 1)),
        registered_at: Some(registered_at),
        ..Lead::new(format!("test-{index:04}"))
    })
}
