use crate::codec::{RecordCodec, read_str_into, write_str};
use crate::error::CodecError;
use crate::record::replace;
use crate::validate::{validate_postal_code, validate_region_code};
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io::{Read, Write};

/// Where a visitor is, as declared and as geolocated.
///
/// Setters validate: a region that is not a two-letter code, or a postal code
/// that is not one to five digits, is ignored and the field keeps its previous
/// value. Ordering is by postal code first; the other fields only break ties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    postal_code: String,
    county: String,
    region: String,
    geo_city: String,
    geo_region: String,
}

impl Location {
    #[must_use]
    pub fn new(
        postal_code: &str,
        county: &str,
        region: &str,
        geo_city: &str,
        geo_region: &str,
    ) -> Self {
        let mut location = Self::default();
        location.assign(postal_code, county, region, geo_city, geo_region);
        location
    }

    /// Reset every field, then apply the validating setters.
    pub fn assign(
        &mut self,
        postal_code: &str,
        county: &str,
        region: &str,
        geo_city: &str,
        geo_region: &str,
    ) {
        self.clear();
        self.set_postal_code(postal_code);
        self.set_county(county);
        self.set_region(region);
        self.set_geo_city(geo_city);
        self.set_geo_region(geo_region);
    }

    pub fn clear(&mut self) {
        self.postal_code.clear();
        self.county.clear();
        self.region.clear();
        self.geo_city.clear();
        self.geo_region.clear();
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn county(&self) -> &str {
        &self.county
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn geo_city(&self) -> &str {
        &self.geo_city
    }

    pub fn geo_region(&self) -> &str {
        &self.geo_region
    }

    pub fn set_postal_code(&mut self, value: &str) {
        if validate_postal_code(value) {
            replace(&mut self.postal_code, value);
        }
    }

    pub fn set_county(&mut self, value: &str) {
        replace(&mut self.county, value);
    }

    pub fn set_region(&mut self, value: &str) {
        if validate_region_code(value) {
            replace(&mut self.region, value);
        }
    }

    pub fn set_geo_city(&mut self, value: &str) {
        replace(&mut self.geo_city, value);
    }

    pub fn set_geo_region(&mut self, value: &str) {
        if validate_region_code(value) {
            replace(&mut self.geo_region, value);
        }
    }
}

impl RecordCodec for Location {
    fn encode<W: Write>(&self, out: &mut W) -> Result<(), CodecError> {
        write_str(out, "postal_code", &self.postal_code)?;
        write_str(out, "county", &self.county)?;
        write_str(out, "region", &self.region)?;
        write_str(out, "geo_city", &self.geo_city)?;
        write_str(out, "geo_region", &self.geo_region)
    }

    fn decode_into<R: Read>(&mut self, input: &mut R) -> Result<(), CodecError> {
        read_str_into(input, "postal_code", &mut self.postal_code)?;
        read_str_into(input, "county", &mut self.county)?;
        read_str_into(input, "region", &mut self.region)?;
        read_str_into(input, "geo_city", &mut self.geo_city)?;
        read_str_into(input, "geo_region", &mut self.geo_region)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.postal_code, self.county, self.region, self.geo_city, self.geo_region
        )
    }
}
