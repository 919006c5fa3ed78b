use std::{io::Write, path::PathBuf};

use anyhow::Context;
use reqcase::{Config, Document, Extractor, Format, storage::Table};
use tracing::instrument;

use super::terminal::{Tone, paint};

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// A requirement document, or a directory searched for .txt and .md files
    input: PathBuf,

    /// Where to write the records (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: csv or json
    #[arg(short, long, default_value_t = Format::Csv)]
    format: Format,

    /// Field delimiter for csv output (overrides the configuration)
    #[arg(short, long)]
    delimiter: Option<char>,
}

impl Command {
    #[instrument(skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let extractor =
            Extractor::from_config(config).context("Invalid conventions in configuration")?;

        let documents = Document::load_all(&self.input)
            .with_context(|| format!("Failed to load {}", self.input.display()))?;
        let records = Document::extract_all(&documents, &extractor);

        let mut table = Table::new(config, self.format);
        if let Some(delimiter) = self.delimiter {
            table = table.with_delimiter(delimiter);
        }

        match &self.output {
            Some(path) => table
                .save(path, &records)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => {
                let mut stdout = std::io::stdout().lock();
                table
                    .write(&mut stdout, &records)
                    .context("Failed to write records")?;
                stdout.flush()?;
            }
        }

        let summary = format!(
            "Extracted {} records from {} documents",
            records.len(),
            documents.len()
        );
        let tone = if records.is_empty() {
            Tone::Warning
        } else {
            Tone::Success
        };
        eprintln!("{}", paint(&summary, tone));
        if let Some(path) = &self.output {
            eprintln!("{}", paint(&format!("  Written: {}", path.display()), Tone::Muted));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_records_from_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let specs = tmp.path().join("specs");
        std::fs::create_dir_all(&specs).unwrap();
        std::fs::write(
            specs.join("lka.txt"),
            "3.2.1 Lane Keep【REQ-7】\nIF\n{v}==1\nTHEN\n{out}=1\n",
        )
        .unwrap();
        let output = tmp.path().join("out/cases.json");

        Command {
            input: specs,
            output: Some(output.clone()),
            format: Format::Json,
            delimiter: None,
        }
        .run(&Config::default())
        .unwrap();

        let records: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(records[0]["requirement_id"], "REQ-7");
        assert_eq!(records[0]["expected_result"], "{out} = 1");
    }

    #[test]
    fn missing_input_fails() {
        let tmp = tempfile::tempdir().unwrap();

        let result = Command {
            input: tmp.path().join("missing.txt"),
            output: None,
            format: Format::Csv,
            delimiter: None,
        }
        .run(&Config::default());

        assert!(result.is_err());
    }
}
