//! JSON output adapter.

use std::cell::RefCell;
use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;

use super::{ImageRecord, OutputFormat, Summary};

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a Summary,
}

#[derive(Serialize)]
struct Report<'a> {
    images: &'a [ImageRecord],
    summary: &'a Summary,
}

/// Writes image records and the final summary.
///
/// JSON Lines output streams each record as it arrives. JSON output buffers
/// the records and writes a single object once the summary is known.
pub struct JsonOutput {
    writer: RefCell<Box<dyn Write>>,
    format: OutputFormat,
    pretty: bool,
    buffered: RefCell<Vec<ImageRecord>>,
    error: RefCell<Option<anyhow::Error>>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout(format: OutputFormat, pretty: bool) -> Self {
        Self::new(Box::new(io::stdout()), format, pretty)
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer: RefCell::new(writer),
            format,
            pretty,
            buffered: RefCell::new(Vec::new()),
            error: RefCell::new(None),
        }
    }

    /// Accepts one resolved image.
    ///
    /// Write failures are kept and reported by [`JsonOutput::finish`].
    pub fn image(&self, record: ImageRecord) {
        match self.format {
            OutputFormat::Jsonl => {
                if let Err(e) = self.write_line(&record) {
                    self.error.borrow_mut().get_or_insert(e);
                }
            }
            OutputFormat::Json => self.buffered.borrow_mut().push(record),
        }
    }

    /// Writes the summary and flushes.
    ///
    /// # Errors
    ///
    /// Returns the first write error seen, or an error writing the summary.
    pub fn finish(&self, summary: &Summary) -> Result<()> {
        if let Some(e) = self.error.borrow_mut().take() {
            return Err(e);
        }
        match self.format {
            OutputFormat::Jsonl => self.write_line(&SummaryLine { summary })?,
            OutputFormat::Json => {
                let images = self.buffered.borrow();
                let report = Report {
                    images: &images,
                    summary,
                };
                let json = if self.pretty {
                    serde_json::to_string_pretty(&report)?
                } else {
                    serde_json::to_string(&report)?
                };
                writeln!(self.writer.borrow_mut(), "{json}")?;
            }
        }
        self.writer.borrow_mut().flush()?;
        Ok(())
    }

    fn write_line(&self, value: &impl Serialize) -> Result<()> {
        let json = serde_json::to_string(value)?;
        writeln!(self.writer.borrow_mut(), "{json}")?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::rc::Rc;

    use imagewatch_core::{ImageOutcome, SessionStatus};

    use super::*;

    /// Writer whose contents stay readable after being boxed.
    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn summary() -> Summary {
        Summary {
            status: SessionStatus::Failed,
            total: 2,
            proper: 1,
            broken: 1,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            broken_sources: vec!["b.png".to_string()],
        }
    }

    fn records() -> [ImageRecord; 2] {
        [
            ImageRecord {
                index: 1,
                src: "b.png".to_string(),
                outcome: ImageOutcome::Broken,
            },
            ImageRecord {
                index: 0,
                src: "a.png".to_string(),
                outcome: ImageOutcome::Proper,
            },
        ]
    }

    #[test]
    fn test_jsonl_streams_records_then_summary() {
        let sink = Shared::default();
        let output = JsonOutput::new(Box::new(sink.clone()), OutputFormat::Jsonl, false);

        let [first, second] = records();
        output.image(first);
        assert_eq!(sink.text().lines().count(), 1);
        output.image(second);
        output.finish(&summary()).unwrap();

        let lines: Vec<serde_json::Value> = sink
            .text()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["outcome"], "broken");
        assert_eq!(lines[1]["index"], 0);
        assert_eq!(lines[2]["summary"]["status"], "failed");
    }

    #[test]
    fn test_json_writes_single_object() {
        let sink = Shared::default();
        let output = JsonOutput::new(Box::new(sink.clone()), OutputFormat::Json, false);

        for record in records() {
            output.image(record);
        }
        assert!(sink.text().is_empty());
        output.finish(&summary()).unwrap();

        let text = sink.text();
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["images"].as_array().unwrap().len(), 2);
        assert_eq!(value["summary"]["broken_sources"][0], "b.png");
    }

    #[test]
    fn test_json_pretty() {
        let sink = Shared::default();
        let output = JsonOutput::new(Box::new(sink.clone()), OutputFormat::Json, true);
        output.finish(&summary()).unwrap();

        assert!(sink.text().lines().count() > 1);
    }
}
