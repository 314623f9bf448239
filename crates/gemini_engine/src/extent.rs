use gemini_core::{vocabulary, Extent, Record};
use thiserror::Error;

use crate::store::{RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum ExtentError {
    #[error("record has no {0} extra")]
    Missing(&'static str),
    #[error("{key} is not a number: {value:?}")]
    NotNumeric { key: &'static str, value: String },
    #[error("{key} is out of range: {value}")]
    OutOfRange { key: &'static str, value: f64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub trait SpatialExtentComputer: Send + Sync {
    fn compute(&self, store: &mut dyn RecordStore, record: &Record) -> Result<(), ExtentError>;
}

/// Stores the record's bbox extras as a numeric [`Extent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BboxExtentComputer;

impl BboxExtentComputer {
    pub fn new() -> Self {
        Self
    }
}

impl SpatialExtentComputer for BboxExtentComputer {
    fn compute(&self, store: &mut dyn RecordStore, record: &Record) -> Result<(), ExtentError> {
        let extent = Extent {
            west: coordinate(record, vocabulary::BBOX_WEST_LONG, 180.0)?,
            east: coordinate(record, vocabulary::BBOX_EAST_LONG, 180.0)?,
            south: coordinate(record, vocabulary::BBOX_SOUTH_LAT, 90.0)?,
            north: coordinate(record, vocabulary::BBOX_NORTH_LAT, 90.0)?,
        };
        if extent.south > extent.north {
            return Err(ExtentError::OutOfRange {
                key: vocabulary::BBOX_SOUTH_LAT,
                value: extent.south,
            });
        }
        store.save_extent(record.id, extent)?;
        Ok(())
    }
}

fn coordinate(record: &Record, key: &'static str, limit: f64) -> Result<f64, ExtentError> {
    let raw = record
        .extra(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ExtentError::Missing(key))?;
    let value: f64 = raw.parse().map_err(|_| ExtentError::NotNumeric {
        key,
        value: raw.to_string(),
    })?;
    if !value.is_finite() || value.abs() > limit {
        return Err(ExtentError::OutOfRange { key, value });
    }
    Ok(value)
}
