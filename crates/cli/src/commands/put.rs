//! put command - Upload local files
//!
//! Arguments may be plain paths or glob patterns. Each file is stored under
//! `<prefix><file name>`.

use std::path::{Path, PathBuf};

use clap::Args;
use stow_core::{ObjectClient, UploadSource};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Upload local files
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Destination bucket
    pub bucket: String,

    /// Files or glob patterns to upload
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Prefix prepended to every object key (e.g. "backups/")
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Content type for every file; guessed from the extension otherwise
    #[arg(long)]
    pub content_type: Option<String>,

    /// Metadata to attach, as NAME=VALUE (repeatable)
    #[arg(long = "meta", value_name = "NAME=VALUE", value_parser = parse_metadata)]
    pub metadata: Vec<(String, String)>,
}

/// Execute the put command
pub async fn execute(args: PutArgs, client: &ObjectClient, formatter: &Formatter) -> ExitCode {
    let paths = match expand_files(&args.files) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&e);
            return ExitCode::UsageError;
        }
    };

    let sources = paths
        .iter()
        .map(|path| {
            let mut source = UploadSource::from_file(object_key(&args.prefix, path), path);
            if let Some(ct) = &args.content_type {
                source = source.content_type(ct);
            }
            for (name, value) in &args.metadata {
                source = source.metadata(name, value);
            }
            source
        })
        .collect();

    let spinner = formatter.spinner(format!("Uploading {} file(s)", paths.len()));
    let result = client.put_objects(&args.bucket, sources).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            formatter.report("put", &args.bucket, &report);
            ExitCode::from_report(&report)
        }
        Err(e) => fail(formatter, "Failed to upload", &e),
    }
}

/// Expand glob patterns; plain paths pass through untouched so a missing
/// file is reported per item
fn expand_files(patterns: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if !is_glob(pattern) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let entries =
            glob::glob(pattern).map_err(|e| format!("Invalid pattern '{pattern}': {e}"))?;
        let before = paths.len();
        for entry in entries {
            let path = entry.map_err(|e| format!("Cannot read {}: {}", e.path().display(), e.error()))?;
            if path.is_file() {
                paths.push(path);
            }
        }
        if paths.len() == before {
            return Err(format!("No files match '{pattern}'"));
        }
    }
    Ok(paths)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn object_key(prefix: &str, path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    format!("{prefix}{name}")
}

fn parse_metadata(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("", Path::new("/tmp/a.txt")), "a.txt");
        assert_eq!(object_key("backups/", Path::new("data/b.csv")), "backups/b.csv");
    }

    #[test]
    fn test_parse_metadata() {
        assert_eq!(
            parse_metadata("title=the title").unwrap(),
            ("title".to_string(), "the title".to_string())
        );
        assert_eq!(parse_metadata("empty=").unwrap().1, "");
        assert!(parse_metadata("novalue").is_err());
        assert!(parse_metadata("=value").is_err());
    }

    #[test]
    fn test_expand_files() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a.log", "b.log", "c.txt"] {
            std::fs::write(temp_dir.path().join(name), name).unwrap();
        }
        std::fs::create_dir(temp_dir.path().join("dir.log")).unwrap();

        let pattern = format!("{}/*.log", temp_dir.path().display());
        let mut paths = expand_files(&[pattern, "missing.txt".to_string()]).unwrap();
        paths.sort();

        let names: Vec<String> = paths.iter().map(|p| object_key("", p)).collect();
        assert_eq!(names, vec!["a.log", "b.log", "missing.txt"]);
    }

    #[test]
    fn test_expand_unmatched_glob() {
        let temp_dir = TempDir::new().unwrap();
        let pattern = format!("{}/*.none", temp_dir.path().display());
        assert!(expand_files(&[pattern]).is_err());
    }
}
