//! Output formatting for CLI results.

use std::fmt::Write as FmtWrite;

use console::style;
use serde_json::json;

use crate::services::{Citation, IndexOutcome, IndexStats};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Index status as shown by the `status` command.
#[derive(Debug, Clone, Default)]
pub struct StatusInfo {
    pub connected: bool,
    pub stats: IndexStats,
    pub namespace: String,
    pub error: Option<String>,
}

/// A generated answer with its citations.
#[derive(Debug, Clone)]
pub struct AnswerInfo {
    pub answer: String,
    pub sources: Vec<Citation>,
}

pub trait Formatter {
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_index_outcome(&self, outcome: &IndexOutcome) -> String;
    fn format_answer(&self, answer: &AnswerInfo) -> String;
    fn format_message(&self, message: &str) -> String;
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Vector Index").unwrap();
        writeln!(output, "------------").unwrap();

        if let Some(ref error) = status.error {
            writeln!(output, "Status:     {}", style("[ERROR]").red()).unwrap();
            writeln!(output, "  {}", error).unwrap();
            return output;
        }

        let connected = if status.connected {
            style("[CONNECTED]").green().to_string()
        } else {
            style("[DISCONNECTED]").red().to_string()
        };
        writeln!(output, "Status:     {}", connected).unwrap();
        if status.connected {
            writeln!(output, "Vectors:    {}", status.stats.total_vectors).unwrap();
            writeln!(output, "Dimension:  {}", status.stats.dimension).unwrap();
            writeln!(output, "Fullness:   {:.1}%", status.stats.fullness * 100.0).unwrap();
            if !status.namespace.is_empty() {
                writeln!(output, "Namespace:  {}", status.namespace).unwrap();
            }
        }
        output
    }

    fn format_index_outcome(&self, outcome: &IndexOutcome) -> String {
        match outcome {
            IndexOutcome::Skipped { existing_vectors } => format!(
                "Index already contains {} vectors. Skipping. Use --force to re-index.\n",
                existing_vectors
            ),
            IndexOutcome::NoDocuments => {
                "No PDF documents found. Add PDFs to the configured directory.\n".to_string()
            }
            IndexOutcome::NoChunks => {
                "Documents loaded but produced no indexable chunks.\n".to_string()
            }
            IndexOutcome::Completed(report) => {
                let mut output = String::new();
                writeln!(output, "Indexing Complete").unwrap();
                writeln!(output, "-----------------").unwrap();
                writeln!(output, "Documents indexed: {}", report.documents).unwrap();
                writeln!(output, "Pages read:        {}", report.pages).unwrap();
                writeln!(output, "Chunks created:    {}", report.chunks).unwrap();
                writeln!(output, "Vectors upserted:  {}", report.vectors_upserted).unwrap();
                if report.files_failed > 0 {
                    writeln!(output, "Files skipped:     {}", report.files_failed).unwrap();
                }
                output
            }
        }
    }

    fn format_answer(&self, answer: &AnswerInfo) -> String {
        let mut output = String::new();
        writeln!(output, "{}", answer.answer).unwrap();

        if !answer.sources.is_empty() {
            writeln!(output).unwrap();
            writeln!(output, "{}", style("Sources:").bold()).unwrap();
            for source in &answer.sources {
                writeln!(output, "  - {}, page {}", source.source_pdf, source.page).unwrap();
            }
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }
}

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_status(&self, status: &StatusInfo) -> String {
        let value = json!({
            "connected": status.connected,
            "total_vectors": status.stats.total_vectors,
            "dimension": status.stats.dimension,
            "fullness": status.stats.fullness,
            "namespace": status.namespace,
            "error": status.error,
        });
        format!("{}\n", serde_json::to_string_pretty(&value).unwrap())
    }

    fn format_index_outcome(&self, outcome: &IndexOutcome) -> String {
        let value = match outcome {
            IndexOutcome::Skipped { existing_vectors } => json!({
                "outcome": "skipped",
                "existing_vectors": existing_vectors,
            }),
            IndexOutcome::NoDocuments => json!({ "outcome": "no_documents" }),
            IndexOutcome::NoChunks => json!({ "outcome": "no_chunks" }),
            IndexOutcome::Completed(report) => json!({
                "outcome": "completed",
                "documents": report.documents,
                "pages": report.pages,
                "chunks": report.chunks,
                "vectors_upserted": report.vectors_upserted,
                "files_failed": report.files_failed,
            }),
        };
        format!("{}\n", serde_json::to_string_pretty(&value).unwrap())
    }

    fn format_answer(&self, answer: &AnswerInfo) -> String {
        let sources: Vec<_> = answer
            .sources
            .iter()
            .map(|s| json!({ "source_pdf": s.source_pdf, "page": s.page }))
            .collect();
        let value = json!({
            "answer": answer.answer,
            "sources": sources,
        });
        format!("{}\n", serde_json::to_string_pretty(&value).unwrap())
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", json!({ "message": message }))
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::IndexReport;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_text_outcome_for_skipped_run() {
        let formatter = TextFormatter;
        let output = formatter.format_index_outcome(&IndexOutcome::Skipped {
            existing_vectors: 120,
        });
        assert!(output.contains("120"));
        assert!(output.contains("--force"));
    }

    #[test]
    fn test_json_outcome_for_completed_run() {
        let formatter = JsonFormatter;
        let output = formatter.format_index_outcome(&IndexOutcome::Completed(IndexReport {
            documents: 2,
            pages: 10,
            chunks: 14,
            vectors_upserted: 14,
            files_failed: 0,
        }));

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["outcome"], "completed");
        assert_eq!(value["chunks"], 14);
    }

    #[test]
    fn test_answer_lists_sources() {
        let formatter = TextFormatter;
        let output = formatter.format_answer(&AnswerInfo {
            answer: "Enrollment opens in May.".to_string(),
            sources: vec![Citation {
                source_pdf: "calendar.pdf".to_string(),
                page: 7,
            }],
        });
        assert!(output.contains("Enrollment opens in May."));
        assert!(output.contains("calendar.pdf, page 7"));
    }
}
