//! Write synthetic trip files for the three cities.
//!
//! ```text
//! generate_sample [OUT_DIR] [--parquet]
//! ```
//!
//! Output is the same on every run for a given format. Trips start between January and June 2017. Washington gets no gender or
//! birth year columns, like the real exports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use parquet::arrow::ArrowWriter;

const TRIPS_PER_CITY: usize = 600;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed seed, so regenerated sample files are byte-identical.
const SEED: u64 = 42;

/// xoshiro256** stream that draws the synthetic trips. Only ever seeded with
/// [`SEED`]; nothing here needs cryptographic quality.
struct TripRng {
    state: [u64; 4],
}

impl TripRng {
    fn seeded(seed: u64) -> Self {
        let mut state = [0u64; 4];
        let mut x = seed;
        for slot in &mut state {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        TripRng { state }
    }

    fn next_u64(&mut self) -> u64 {
        let [s0, s1, s2, s3] = &mut self.state;
        let result = s1.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = *s1 << 17;
        *s2 ^= *s0;
        *s3 ^= *s1;
        *s1 ^= *s2;
        *s0 ^= *s3;
        *s2 ^= t;
        *s3 = s3.rotate_left(45);
        result
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in `0..n`; `0` when `n` is zero.
    fn below(&mut self, n: usize) -> usize {
        (self.unit() * n as f64) as usize % n.max(1)
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

struct CityProfile {
    stem: &'static str,
    stations: &'static [&'static str],
    demographics: bool,
}

const CITIES: [CityProfile; 3] = [
    CityProfile {
        stem: "chicago",
        stations: &[
            "Streeter Dr & Grand Ave",
            "Lake Shore Dr & Monroe St",
            "Clinton St & Washington Blvd",
            "Canal St & Adams St",
            "Michigan Ave & Oak St",
            "Theater on the Lake",
        ],
        demographics: true,
    },
    CityProfile {
        stem: "new_york_city",
        stations: &[
            "Pershing Square North",
            "E 17 St & Broadway",
            "W 21 St & 6 Ave",
            "West St & Chambers St",
            "Broadway & E 22 St",
            "12 Ave & W 40 St",
        ],
        demographics: true,
    },
    CityProfile {
        stem: "washington",
        stations: &[
            "Columbus Circle / Union Station",
            "Lincoln Memorial",
            "Jefferson Dr & 14th St SW",
            "Massachusetts Ave & Dupont Circle NW",
            "15th & P St NW",
            "Smithsonian-National Mall / Jefferson Dr & 12th St SW",
        ],
        demographics: false,
    },
];

/// Weighted toward the commuting peaks.
const HOURS: [u32; 16] = [7, 8, 8, 8, 9, 12, 13, 15, 16, 17, 17, 17, 18, 18, 19, 22];

struct Trip {
    id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    duration: f64,
    start_station: String,
    end_station: String,
    user_type: String,
    gender: Option<String>,
    birth_year: Option<f64>,
}

fn generate_trips(profile: &CityProfile, rng: &mut TripRng) -> Result<Vec<Trip>> {
    let first_day = NaiveDate::from_ymd_opt(2017, 1, 1).context("invalid start date")?;
    // January 1st to June 30th.
    let days_in_range = 181;

    let mut trips = Vec::with_capacity(TRIPS_PER_CITY);
    for i in 0..TRIPS_PER_CITY {
        let day = first_day + Duration::days(rng.below(days_in_range) as i64);
        let hour = HOURS[rng.below(HOURS.len())];
        let start = day
            .and_hms_opt(hour, rng.below(60) as u32, rng.below(60) as u32)
            .context("invalid start time")?;
        let duration = 60.0 + (rng.unit() * 2400.0).round();
        let end = start + Duration::seconds(duration as i64);

        let user_type = match rng.below(100) {
            0..=74 => "Subscriber",
            75..=98 => "Customer",
            _ => "Dependent",
        };
        let (gender, birth_year) = if profile.demographics && user_type == "Subscriber" {
            let gender = rng.pick(&["Male", "Male", "Female"]).to_string();
            (Some(gender), Some(1950.0 + rng.below(50) as f64))
        } else {
            (None, None)
        };

        trips.push(Trip {
            id: (i * 37 + 1000) as i64,
            start,
            end,
            duration,
            start_station: rng.pick(profile.stations).to_string(),
            end_station: rng.pick(profile.stations).to_string(),
            user_type: user_type.to_string(),
            gender,
            birth_year,
        });
    }
    Ok(trips)
}

fn write_csv(path: &Path, trips: &[Trip], demographics: bool) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["", "Start Time", "End Time", "Trip Duration", "Start Station", "End Station", "User Type"];
    if demographics {
        header.extend(["Gender", "Birth Year"]);
    }
    writer.write_record(&header)?;

    for trip in trips {
        let mut row = vec![
            trip.id.to_string(),
            trip.start.format(TIME_FORMAT).to_string(),
            trip.end.format(TIME_FORMAT).to_string(),
            trip.duration.to_string(),
            trip.start_station.clone(),
            trip.end_station.clone(),
            trip.user_type.clone(),
        ];
        if demographics {
            row.push(trip.gender.clone().unwrap_or_default());
            // Written as floats, the way pandas exports a column with gaps.
            row.push(trip.birth_year.map(|y| format!("{y:.1}")).unwrap_or_default());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, trips: &[Trip], demographics: bool) -> Result<()> {
    let text = |f: &dyn Fn(&Trip) -> String| -> ArrayRef {
        Arc::new(StringArray::from(trips.iter().map(f).collect::<Vec<_>>()))
    };

    let mut fields = vec![
        Field::new("id", DataType::Int64, false),
        Field::new("Start Time", DataType::Utf8, false),
        Field::new("End Time", DataType::Utf8, false),
        Field::new("Trip Duration", DataType::Float64, false),
        Field::new("Start Station", DataType::Utf8, false),
        Field::new("End Station", DataType::Utf8, false),
        Field::new("User Type", DataType::Utf8, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(trips.iter().map(|t| t.id).collect::<Vec<_>>())),
        text(&|t: &Trip| t.start.format(TIME_FORMAT).to_string()),
        text(&|t: &Trip| t.end.format(TIME_FORMAT).to_string()),
        Arc::new(Float64Array::from(trips.iter().map(|t| t.duration).collect::<Vec<_>>())),
        text(&|t: &Trip| t.start_station.clone()),
        text(&|t: &Trip| t.end_station.clone()),
        text(&|t: &Trip| t.user_type.clone()),
    ];
    if demographics {
        fields.push(Field::new("Gender", DataType::Utf8, true));
        fields.push(Field::new("Birth Year", DataType::Float64, true));
        columns.push(Arc::new(StringArray::from(
            trips.iter().map(|t| t.gender.clone()).collect::<Vec<_>>(),
        )));
        columns.push(Arc::new(Float64Array::from(
            trips.iter().map(|t| t.birth_year).collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Write synthetic bikeshare trip files for chicago, new york city and washington.
#[derive(Parser, Debug)]
#[command(name = "generate_sample", version)]
struct Args {
    /// Directory to write the city files into; created if missing.
    #[arg(default_value = ".")]
    out_dir: PathBuf,

    /// Write `.parquet` files instead of `.csv`.
    #[arg(long)]
    parquet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let out_dir = &args.out_dir;
    std::fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = TripRng::seeded(SEED);
    let ext = if args.parquet { "parquet" } else { "csv" };
    for profile in &CITIES {
        let trips = generate_trips(profile, &mut rng)?;
        let path = out_dir.join(format!("{}.{ext}", profile.stem));
        if args.parquet {
            write_parquet(&path, &trips, profile.demographics)?;
        } else {
            write_csv(&path, &trips, profile.demographics)?;
        }
        println!("Wrote {} trips to {}", trips.len(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn help_is_not_taken_for_a_directory() {
        let err = Args::try_parse_from(["generate_sample", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let err = Args::try_parse_from(["generate_sample", "--bogus"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn defaults_to_csv_in_current_directory() {
        let args = Args::try_parse_from(["generate_sample"]).unwrap();
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert!(!args.parquet);

        let args = Args::try_parse_from(["generate_sample", "--parquet", "data"]).unwrap();
        assert_eq!(args.out_dir, PathBuf::from("data"));
        assert!(args.parquet);
    }

    #[test]
    fn same_seed_same_trips() {
        let draw = |rng: &mut TripRng| (0..8).map(|_| rng.below(181)).collect::<Vec<_>>();
        let first = draw(&mut TripRng::seeded(SEED));
        assert_eq!(first, draw(&mut TripRng::seeded(SEED)));
        assert!(first.iter().all(|&d| d < 181));
        assert_ne!(first, draw(&mut TripRng::seeded(SEED + 1)));
    }

    #[test]
    fn washington_files_have_no_demographics() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = TripRng::seeded(SEED);
        let profile = &CITIES[2];
        let trips = generate_trips(profile, &mut rng).unwrap();
        assert!(trips.iter().all(|t| t.gender.is_none() && t.birth_year.is_none()));

        let path = dir.path().join("washington.csv");
        write_csv(&path, &trips, profile.demographics).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, ",Start Time,End Time,Trip Duration,Start Station,End Station,User Type");
    }
}
