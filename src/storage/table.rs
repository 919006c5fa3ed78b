use std::{
    borrow::Cow,
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    str::FromStr,
};

use crate::{Config, Record};

/// Output encodings for extracted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Delimited text with a header row.
    #[default]
    Csv,
    /// A pretty-printed JSON array of objects.
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format '{other}' (expected 'csv' or 'json')")),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Writes records in one of the supported [`Format`]s.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    headers: &'a [String; 5],
    delimiter: char,
    format: Format,
}

impl<'a> Table<'a> {
    /// Creates a table using the column titles and delimiter of `config`.
    #[must_use]
    pub const fn new(config: &'a Config, format: Format) -> Self {
        Self {
            headers: config.headers(),
            delimiter: config.delimiter,
            format,
        }
    }

    /// Overrides the field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Writes `records` to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write<W: Write>(&self, writer: &mut W, records: &[Record]) -> io::Result<()> {
        match self.format {
            Format::Csv => self.write_delimited(writer, records),
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, records)?;
                writer.write_all(b"\n")
            }
        }
    }

    /// Writes `records` to the file at `path`, creating parent directories
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories or the file cannot be created, or
    /// writing fails.
    pub fn save(&self, path: &Path, records: &[Record]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer, records)?;
        writer.flush()
    }

    fn write_delimited<W: Write>(&self, writer: &mut W, records: &[Record]) -> io::Result<()> {
        self.write_row(writer, self.headers.iter().map(String::as_str))?;
        for record in records {
            self.write_row(writer, record.fields().into_iter())?;
        }
        Ok(())
    }

    fn write_row<'f, W: Write>(
        &self,
        writer: &mut W,
        fields: impl Iterator<Item = &'f str>,
    ) -> io::Result<()> {
        let mut separator = [0; 4];
        let separator = self.delimiter.encode_utf8(&mut separator);

        for (index, field) in fields.enumerate() {
            if index > 0 {
                writer.write_all(separator.as_bytes())?;
            }
            writer.write_all(escape(field, self.delimiter).as_bytes())?;
        }
        writer.write_all(b"\n")
    }
}

/// Quotes a field containing the delimiter, a quote or a line break.
fn escape(field: &str, delimiter: char) -> Cow<'_, str> {
    if field.contains([delimiter, '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
