use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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

#[derive(Debug, PartialEq, Eq, Serialize)]
struct EntryOutput<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

#[derive(Serialize)]
struct ListingOutput<'a> {
    directory: &'a str,
    entries: Vec<EntryOutput<'a>>,
}

#[derive(Serialize)]
struct ExecOutput<'a> {
    stdout: &'a str,
}

/// Print a directory listing. Long-format entries (`"path - N bytes"`) are
/// split into path and size.
pub fn print_listing(directory: &str, entries: &[String], format: OutputFormat) {
    let parsed: Vec<EntryOutput<'_>> = entries.iter().map(|e| split_entry(e)).collect();

    match format {
        OutputFormat::Json => {
            let out = ListingOutput {
                directory,
                entries: parsed,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PATH", "SIZE"]);
            for entry in &parsed {
                table.add_row(vec![
                    entry.path.to_string(),
                    entry.size.map(|s| s.to_string()).unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for entry in &parsed {
                match entry.size {
                    Some(size) => println!("{:<40} {size:>10} bytes", entry.path),
                    None => println!("{}", entry.path),
                }
            }
        }
        OutputFormat::Raw => {
            for entry in entries {
                println!("{entry}");
            }
        }
    }
}

/// Print what code printed on the device.
pub fn print_exec_output(stdout: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&ExecOutput { stdout }).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => {
            print_raw(stdout.as_bytes());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn split_entry(entry: &str) -> EntryOutput<'_> {
    let sized = entry.rsplit_once(" - ").and_then(|(path, rest)| {
        let size = rest.strip_suffix(" bytes")?.parse().ok()?;
        Some(EntryOutput {
            path,
            size: Some(size),
        })
    });
    sized.unwrap_or(EntryOutput {
        path: entry,
        size: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_entries_are_split() {
        assert_eq!(
            split_entry("/main.py - 120 bytes"),
            EntryOutput {
                path: "/main.py",
                size: Some(120)
            }
        );
    }

    #[test]
    fn short_entries_have_no_size() {
        assert_eq!(
            split_entry("/lib"),
            EntryOutput {
                path: "/lib",
                size: None
            }
        );
        assert_eq!(
            split_entry("/notes - draft"),
            EntryOutput {
                path: "/notes - draft",
                size: None
            }
        );
    }

    #[test]
    fn listing_json_shape() {
        let out = ListingOutput {
            directory: "/",
            entries: vec![split_entry("/a.txt - 3 bytes"), split_entry("/b")],
        };
        assert_eq!(
            serde_json::to_string(&out).unwrap(),
            r#"{"directory":"/","entries":[{"path":"/a.txt","size":3},{"path":"/b"}]}"#
        );
    }
}
