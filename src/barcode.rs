use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use thiserror::Error;

use crate::record::Table;

/// Fixed company prefix of every issued barcode
pub const PREFIX: &str = "88061987";

/// Number of random digits appended to [`PREFIX`]
pub const SUFFIX_DIGITS: usize = 5;

const SUFFIX_SPACE: u32 = 100_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 64;

lazy_static! {
    static ref BARCODE_REGEX: Regex = Regex::new(r"^88061987\d{5}$").unwrap();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BarcodeError {
    #[error("every barcode with prefix 88061987 is already issued")]
    Exhausted,
}

/// Issues barcodes that are not yet present in a table
///
/// Random suffixes are drawn up to `max_attempts` times. If every draw
/// collides, the suffix space is scanned in order for the first free value.
#[derive(Debug, Clone)]
pub struct BarcodeGenerator {
    max_attempts: u32,
}

impl Default for BarcodeGenerator {
    fn default() -> Self {
        BarcodeGenerator::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl BarcodeGenerator {
    pub fn new(max_attempts: u32) -> Self {
        BarcodeGenerator { max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Generate a fresh barcode using the thread-local RNG
    pub fn generate(&self, table: &Table) -> Result<String, BarcodeError> {
        self.generate_with(table, &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng>(
        &self,
        table: &Table,
        rng: &mut R,
    ) -> Result<String, BarcodeError> {
        let taken = table.barcodes();

        for _ in 0..self.max_attempts {
            let candidate = compose(rng.gen_range(0..SUFFIX_SPACE));
            if !taken.contains(candidate.as_str()) {
                return Ok(candidate);
            }
        }

        log::warn!(
            "no free barcode after {} random draws, scanning suffix space",
            self.max_attempts
        );

        (0..SUFFIX_SPACE)
            .map(compose)
            .find(|candidate| !taken.contains(candidate.as_str()))
            .ok_or(BarcodeError::Exhausted)
    }
}

fn compose(suffix: u32) -> String {
    format!("{}{:0width$}", PREFIX, suffix, width = SUFFIX_DIGITS)
}

/// True when `barcode` is [`PREFIX`] followed by exactly [`SUFFIX_DIGITS`] digits
pub fn is_well_formed(barcode: &str) -> bool {
    BARCODE_REGEX.is_match(barcode)
}
