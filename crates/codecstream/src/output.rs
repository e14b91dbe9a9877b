use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A result set printable in every output format.
pub trait Report: Serialize {
    fn headers(&self) -> Vec<&'static str>;

    fn rows(&self) -> Vec<Vec<String>>;

    /// One line per row for `--format pretty`.
    fn pretty_lines(&self) -> Vec<String> {
        let headers = self.headers();
        self.rows()
            .into_iter()
            .map(|row| {
                headers
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| format!("{}={cell}", name.to_lowercase()))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

pub fn print_report(report: &impl Report, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(report.headers());
            for row in report.rows() {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for line in report.pretty_lines() {
                println!("{line}");
            }
        }
    }
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Text preview of a payload, or its size when it is not UTF-8.
pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Pairs(Vec<(u8, u8)>);

    impl Report for Pairs {
        fn headers(&self) -> Vec<&'static str> {
            vec!["LEFT", "RIGHT"]
        }

        fn rows(&self) -> Vec<Vec<String>> {
            self.0
                .iter()
                .map(|(l, r)| vec![l.to_string(), r.to_string()])
                .collect()
        }
    }

    #[test]
    fn pretty_lines_label_cells() {
        let lines = Pairs(vec![(1, 2)]).pretty_lines();
        assert_eq!(lines, vec!["left=1 right=2".to_string()]);
    }

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(hex(&[0x0A, 0xFF]), "0aff");
    }

    #[test]
    fn binary_payloads_are_summarised() {
        assert_eq!(payload_preview(b"hi"), "hi");
        assert_eq!(payload_preview(&[0xFF, 0xFE]), "<binary 2 bytes>");
    }
}
