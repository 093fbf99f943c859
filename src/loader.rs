use std::{io::Read, path::Path};

use crate::{
    error::{Error, Result},
    record::Record,
};

/// Source column of each record field.
mod columns {
    pub const NAME: usize = 1;
    pub const CITY: usize = 2;
    pub const COUNTRY: usize = 3;
    pub const ADDRESS: usize = 4;
    pub const ZIP: usize = 5;
    pub const LATITUDE: usize = 6;
    pub const LONGITUDE: usize = 7;
}

/// Load hotel records from a CSV file whose first line is a header.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path)?;
    read_records(file)
}

/// Parse hotel records from CSV data, skipping the header line.
///
/// The location is `latitude,longitude` built from two source columns.
pub fn read_records(reader: impl Read) -> Result<Vec<Record>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv.records() {
        let row = row?;
        let line = row.position().map_or(0, |p| p.line());
        let field = |column: usize| {
            row.get(column).map(str::to_string).ok_or_else(|| Error::Load {
                line,
                reason: format!(
                    "expected at least {} columns, found {}",
                    columns::LONGITUDE + 1,
                    row.len()
                ),
            })
        };

        records.push(Record {
            name: field(columns::NAME)?,
            city: field(columns::CITY)?,
            zip: field(columns::ZIP)?,
            country: field(columns::COUNTRY)?,
            address: field(columns::ADDRESS)?,
            location: format!(
                "{},{}",
                field(columns::LATITUDE)?,
                field(columns::LONGITUDE)?
            ),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
id,name,city,country,address,zip,lat,lon
1,Sofitel Paris,Paris,France,8 Rue Louis Armand,75015,48.835,2.276
2,\"Hotel Lutetia, Paris\",Paris,France,45 Boulevard Raspail,75006,48.851,2.327
";

    #[test]
    fn maps_columns_and_skips_header() {
        let records = read_records(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(
            records[0],
            Record {
                name: "Sofitel Paris".to_string(),
                city: "Paris".to_string(),
                zip: "75015".to_string(),
                country: "France".to_string(),
                address: "8 Rue Louis Armand".to_string(),
                location: "48.835,2.276".to_string(),
            }
        );
        assert_eq!(records[1].name, "Hotel Lutetia, Paris");
    }

    #[test]
    fn header_only_yields_nothing() {
        let records = read_records("id,name\n".as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn short_row_names_its_line() {
        let data = "id,name,city,country,address,zip,lat,lon\n\
                    1,Sofitel,Paris,France,Rue,75015,48.8,2.2\n\
                    2,Broken,Paris\n";
        let err = read_records(data.as_bytes()).unwrap_err();
        match err {
            Error::Load { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("found 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("i.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        assert_eq!(load_records(&path).unwrap().len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_records(Path::new("/nonexistent/i.csv")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
