use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::StringRecord;

use crate::candidate::Candidate;
use crate::error::ConfigError;

/// Columns written for every row, in this order.
pub const ENRICHED_COLUMNS: [&str; 5] = [
    "exact_book_name",
    "author",
    "publish_date",
    "ratings_count",
    "goodreads_link",
];

pub struct InputTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

pub fn read_table(path: &Path) -> Result<InputTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Open input CSV {:?}", path))?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record.with_context(|| format!("Read row from {:?}", path))?);
    }
    Ok(InputTable { headers, rows })
}

/// Index of the title column; the first column when none is requested.
pub fn resolve_column(headers: &StringRecord, requested: Option<&str>) -> Result<usize, ConfigError> {
    if headers.is_empty() {
        return Err(ConfigError::EmptyHeader);
    }
    let requested = match requested.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return Ok(0),
    };
    headers
        .iter()
        .position(|h| h == requested)
        .ok_or_else(|| ConfigError::MissingColumn {
            column: requested.to_string(),
            available: headers.iter().map(str::to_string).collect(),
        })
}

/// Title cell of a row; `None` when absent or blank.
pub fn title_cell(row: &StringRecord, column: usize) -> Option<&str> {
    row.get(column).filter(|cell| !cell.trim().is_empty())
}

/// `books.csv` → `books_with_goodreads.csv` in the same directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_with_goodreads.csv"))
}

/// Writes input rows with the enrichment columns set, one flushed row at a
/// time so an interrupted run keeps everything already written.
pub struct EnrichedWriter {
    writer: csv::Writer<File>,
    input_width: usize,
    width: usize,
    // where each of ENRICHED_COLUMNS lands in the output row
    slots: [usize; 5],
}

impl EnrichedWriter {
    pub fn create(path: &Path, input_headers: &StringRecord) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(true)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_path(path)
            .with_context(|| format!("Open output CSV {:?}", path))?;

        let mut headers: Vec<String> = input_headers.iter().map(str::to_string).collect();
        let input_width = headers.len();
        let mut slots = [0usize; 5];
        for (slot, name) in slots.iter_mut().zip(ENRICHED_COLUMNS) {
            // an existing column of the same name is overwritten in place
            *slot = match headers.iter().position(|h| h == name) {
                Some(i) => i,
                None => {
                    headers.push(name.to_string());
                    headers.len() - 1
                }
            };
        }
        writer.write_record(&headers)?;
        writer.flush()?;
        Ok(Self {
            writer,
            input_width,
            width: headers.len(),
            slots,
        })
    }

    pub fn write_row(&mut self, row: &StringRecord, resolution: &Candidate) -> Result<()> {
        let mut fields: Vec<String> = row
            .iter()
            .take(self.input_width)
            .map(str::to_string)
            .collect();
        fields.resize(self.width, String::new());
        let values = [
            resolution.exact_title.clone(),
            resolution.author.clone(),
            resolution.publish_date.clone(),
            resolution.ratings_count.to_string(),
            resolution.source_url.clone(),
        ];
        for (slot, value) in self.slots.iter().zip(values) {
            fields[*slot] = value;
        }
        self.writer.write_record(&fields)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_input(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("books.csv");
        fs::write(&path, body).unwrap();
        path
    }

    fn hobbit() -> Candidate {
        Candidate {
            exact_title: "The Hobbit".into(),
            author: "J.R.R. Tolkien".into(),
            publish_date: "1937".into(),
            ratings_count: 42,
            source_url: "https://www.goodreads.com/book/show/5907".into(),
            image_url: "https://images.example/c.jpg".into(),
        }
    }

    #[test]
    fn column_resolution() {
        let headers = StringRecord::from(vec!["Title", "Notes"]);
        assert_eq!(resolve_column(&headers, None).unwrap(), 0);
        assert_eq!(resolve_column(&headers, Some(" ")).unwrap(), 0);
        assert_eq!(resolve_column(&headers, Some("Notes")).unwrap(), 1);
        match resolve_column(&headers, Some("Book")) {
            Err(ConfigError::MissingColumn { column, available }) => {
                assert_eq!(column, "Book");
                assert_eq!(available, ["Title", "Notes"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            resolve_column(&StringRecord::new(), None),
            Err(ConfigError::EmptyHeader)
        ));
    }

    #[test]
    fn blank_cells_are_missing() {
        let row = StringRecord::from(vec!["", "  ", "Dune"]);
        assert_eq!(title_cell(&row, 0), None);
        assert_eq!(title_cell(&row, 1), None);
        assert_eq!(title_cell(&row, 2), Some("Dune"));
        assert_eq!(title_cell(&row, 7), None);
    }

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("/data/books.csv")),
            PathBuf::from("/data/books_with_goodreads.csv")
        );
    }

    #[test]
    fn appends_columns_and_keeps_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "Title,Shelf\nThe Hobbit,fantasy\n,empty\nshort\n");
        let table = read_table(&input).unwrap();
        assert_eq!(table.rows.len(), 3);

        let out = dir.path().join("out.csv");
        let mut writer = EnrichedWriter::create(&out, &table.headers).unwrap();
        writer.write_row(&table.rows[0], &hobbit()).unwrap();
        writer.write_row(&table.rows[1], &Candidate::empty()).unwrap();
        writer.write_row(&table.rows[2], &Candidate::empty()).unwrap();
        writer.finish().unwrap();

        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "Title,Shelf,exact_book_name,author,publish_date,ratings_count,goodreads_link",
                "The Hobbit,fantasy,The Hobbit,J.R.R. Tolkien,1937,42,https://www.goodreads.com/book/show/5907",
                ",empty,,,,0,",
                "short,,,,,0,",
            ]
        );
    }

    #[test]
    fn existing_enrichment_columns_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "Title,author\nThe Hobbit,someone\n");
        let table = read_table(&input).unwrap();
        let out = dir.path().join("out.csv");
        let mut writer = EnrichedWriter::create(&out, &table.headers).unwrap();
        writer.write_row(&table.rows[0], &hobbit()).unwrap();
        writer.finish().unwrap();

        let text = fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Title,author,exact_book_name,publish_date,ratings_count,goodreads_link"
        );
        assert_eq!(
            lines[1],
            "The Hobbit,J.R.R. Tolkien,The Hobbit,1937,42,https://www.goodreads.com/book/show/5907"
        );
    }
}
