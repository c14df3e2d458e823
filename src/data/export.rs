use super::error::Result;
use super::model::Table;

/// Content type attached to CSV downloads.
pub const CSV_MIME: &str = "text/csv";

/// A downloadable export blob: the caller supplies the filename, the
/// exporter supplies bytes and content type.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Serialise a table as UTF-8 comma-separated text: header row, one row per
/// data row, no index column, nulls as empty fields. Re-parsing the bytes
/// through the CSV loader reproduces the table modulo schema inference.
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(table.column_names())?;
        for row in 0..table.n_rows() {
            let record: Vec<String> =
                table.columns().iter().map(|c| c.display(row)).collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// CSV export of a table under the given filename.
pub fn csv_download(table: &Table, filename: &str) -> Result<Download> {
    Ok(Download {
        filename: filename.to_string(),
        content_type: CSV_MIME,
        bytes: to_csv_bytes(table)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::infer::infer_schema;
    use crate::data::loader::load_csv_bytes;
    use crate::data::model::{Column, ColumnData, Table};

    fn sample() -> Table {
        Table::new(vec![
            Column::new(
                "year",
                ColumnData::Year(vec![Some(2020), Some(2021), None]),
            ),
            Column::new(
                "district",
                ColumnData::Categorical(vec![
                    Some("North".into()),
                    Some("East, Far".into()),
                    Some("South".into()),
                ]),
            ),
            Column::new(
                "wait",
                ColumnData::Numeric(vec![Some(12.5), None, Some(3.0)]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn header_row_and_empty_nulls() {
        let bytes = to_csv_bytes(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("year,district,wait"));
        assert_eq!(lines.next(), Some("2020,North,12.5"));
        // Delimiter inside a value gets quoted; null wait is an empty field.
        assert_eq!(lines.next(), Some("2021,\"East, Far\","));
        assert_eq!(lines.next(), Some(",South,3"));
    }

    #[test]
    fn round_trips_through_the_loader() {
        let table = sample();
        let bytes = to_csv_bytes(&table).unwrap();

        let outcome = load_csv_bytes("export", &bytes).unwrap();
        let reloaded = infer_schema(outcome.workbook.get("export").unwrap().clone());

        let original_names: Vec<&str> = table.column_names().collect();
        let reloaded_names: Vec<&str> = reloaded.column_names().collect();
        assert_eq!(original_names, reloaded_names);
        assert_eq!(reloaded.n_rows(), table.n_rows());

        for col in table.columns() {
            let back = reloaded.column(&col.name).unwrap();
            assert_eq!(back.column_type(), col.column_type());
            for row in 0..table.n_rows() {
                assert_eq!(back.display(row), col.display(row), "{}[{row}]", col.name);
            }
        }
    }

    #[test]
    fn download_carries_filename_and_mime() {
        let download = csv_download(&sample(), "filtered_data.csv").unwrap();
        assert_eq!(download.filename, "filtered_data.csv");
        assert_eq!(download.content_type, "text/csv");
        assert!(!download.bytes.is_empty());
    }
}
