use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

use super::IngestError;
use crate::config::CsvPaths;
use crate::domain::{
    Dataset, GeoPoint, GridPoint, MeasurementSample, Period, ProductionRecord, Site, Variable,
};

#[derive(Debug, Deserialize)]
struct GridRow {
    location_id: String,
    latitude: f64,
    longitude: f64,
    elevation: f64,
}

#[derive(Debug, Deserialize)]
struct MeasurementRow {
    location_id: String,
    date: NaiveDate,
    period: Period,
    variable: Variable,
    member: u16,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct SiteRow {
    site_id: String,
    latitude: f64,
    longitude: f64,
    elevation: f64,
}

#[derive(Debug, Deserialize)]
struct ProductionRow {
    date: NaiveDate,
    site_id: String,
    energy: f64,
}

fn reader<R: Read>(input: R) -> ::csv::Reader<R> {
    ::csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(::csv::Trim::All)
        .from_reader(input)
}

fn open(path: &Path) -> Result<BufReader<File>, IngestError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Parse `location_id,latitude,longitude,elevation`
pub fn read_grid<R: Read>(input: R) -> Result<Vec<GridPoint>, IngestError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in reader(input).deserialize::<GridRow>() {
        let row = row?;
        if !seen.insert(row.location_id.clone()) {
            return Err(IngestError::Duplicate(row.location_id));
        }
        out.push(GridPoint {
            location_id: row.location_id,
            location: GeoPoint::new(row.latitude, row.longitude),
            elevation_m: row.elevation,
        });
    }
    Ok(out)
}

/// Parse `location_id,date,period,variable,member,value`
pub fn read_measurements<R: Read>(input: R) -> Result<Vec<MeasurementSample>, IngestError> {
    reader(input)
        .deserialize::<MeasurementRow>()
        .map(|row| {
            let row = row?;
            Ok(MeasurementSample {
                location_id: row.location_id,
                day: row.date,
                period: row.period,
                variable: row.variable,
                member: row.member,
                value: row.value,
            })
        })
        .collect()
}

/// Parse `site_id,latitude,longitude,elevation`
pub fn read_sites<R: Read>(input: R) -> Result<Vec<Site>, IngestError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for row in reader(input).deserialize::<SiteRow>() {
        let row = row?;
        if !seen.insert(row.site_id.clone()) {
            return Err(IngestError::Duplicate(row.site_id));
        }
        out.push(Site::new(row.site_id, row.latitude, row.longitude, row.elevation));
    }
    Ok(out)
}

/// Parse `date,site_id,energy`
pub fn read_production<R: Read>(input: R) -> Result<Vec<ProductionRecord>, IngestError> {
    let records = reader(input)
        .deserialize::<ProductionRow>()
        .map(|row| {
            let row = row?;
            Ok(ProductionRecord {
                site_id: row.site_id,
                day: row.date,
                energy: row.energy,
            })
        })
        .collect::<Result<Vec<_>, IngestError>>()?;
    check_production(&records)?;
    Ok(records)
}

/// Energies must be finite and each (site, day) must appear once.
fn check_production(records: &[ProductionRecord]) -> Result<(), IngestError> {
    let mut seen = HashSet::new();
    for record in records {
        if !record.energy.is_finite() {
            return Err(IngestError::NonFinite {
                site_id: record.site_id.clone(),
                day: record.day,
            });
        }
        if !seen.insert((record.site_id.as_str(), record.day)) {
            return Err(IngestError::DuplicateProduction {
                site_id: record.site_id.clone(),
                day: record.day,
            });
        }
    }
    Ok(())
}

/// Load all four inputs and check cross references.
pub fn load_dataset(paths: &CsvPaths) -> Result<Dataset, IngestError> {
    let grid = read_grid(open(&paths.grid)?)?;
    let samples = read_measurements(open(&paths.measurements)?)?;
    let sites = read_sites(open(&paths.sites)?)?;
    let production = read_production(open(&paths.production)?)?;

    let dataset = Dataset {
        grid,
        samples,
        sites,
        production,
    };
    check_references(&dataset)?;

    info!(
        grid_points = dataset.grid.len(),
        samples = dataset.samples.len(),
        sites = dataset.sites.len(),
        production_records = dataset.production.len(),
        "loaded CSV dataset"
    );
    Ok(dataset)
}

/// Reject datasets that are empty, whose production rows name unknown
/// sites, or whose production is non-finite or repeated.
pub fn check_references(dataset: &Dataset) -> Result<(), IngestError> {
    if dataset.grid.is_empty() {
        return Err(IngestError::Empty("grid points"));
    }
    if dataset.samples.is_empty() {
        return Err(IngestError::Empty("measurements"));
    }
    if dataset.sites.is_empty() {
        return Err(IngestError::Empty("sites"));
    }
    let known: HashSet<&str> = dataset.sites.iter().map(|s| s.site_id.as_str()).collect();
    if let Some(bad) = dataset
        .production
        .iter()
        .find(|r| !known.contains(r.site_id.as_str()))
    {
        return Err(IngestError::UnknownSite(bad.site_id.clone()));
    }
    check_production(&dataset.production)
}
