//! ls command - List buckets or objects
//!
//! Without a bucket, lists every bucket. With one, lists its objects,
//! optionally filtered by a glob pattern on the key.

use clap::Args;
use serde::Serialize;
use stow_core::{BucketInfo, Listing, ObjectClient, ObjectInfo, OperationOutcome};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List buckets or objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Bucket to list; lists all buckets when omitted
    pub bucket: Option<String>,

    /// Only show keys matching a glob pattern (e.g. "logs/*.gz")
    #[arg(long)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
struct BucketListOutput {
    buckets: Vec<BucketInfo>,
}

#[derive(Debug, Serialize)]
struct ObjectListOutput {
    bucket: String,
    objects: Vec<ObjectInfo>,
    count: usize,
    total_size_bytes: i64,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, client: &ObjectClient, formatter: &Formatter) -> ExitCode {
    match args.bucket {
        None => list_buckets(client, formatter).await,
        Some(bucket) => list_objects(&bucket, args.pattern.as_deref(), client, formatter).await,
    }
}

async fn list_buckets(client: &ObjectClient, formatter: &Formatter) -> ExitCode {
    let buckets = match client.list_buckets().await {
        Ok(Listing::Items(b)) => b,
        Ok(Listing::Failed(outcome)) => return failed_listing(formatter, &outcome),
        Err(e) => return fail(formatter, "Failed to list buckets", &e),
    };

    if formatter.is_json() {
        formatter.json(&BucketListOutput { buckets });
    } else if buckets.is_empty() {
        formatter.println("No buckets found.");
    } else {
        formatter.println(&formatter.render_buckets(&buckets));
    }

    ExitCode::Success
}

async fn list_objects(
    bucket: &str,
    pattern: Option<&str>,
    client: &ObjectClient,
    formatter: &Formatter,
) -> ExitCode {
    let pattern = match pattern.map(glob::Pattern::new).transpose() {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&format!("Invalid pattern: {e}"));
            return ExitCode::UsageError;
        }
    };

    let objects = match client.list_objects(bucket).await {
        Ok(Listing::Items(o)) => o,
        Ok(Listing::Failed(outcome)) => return failed_listing(formatter, &outcome),
        Err(e) => return fail(formatter, &format!("Failed to list '{bucket}'"), &e),
    };
    let objects = filter_objects(objects, pattern.as_ref());
    let total_size_bytes: i64 = objects.iter().filter_map(|o| o.size_bytes).sum();

    if formatter.is_json() {
        formatter.json(&ObjectListOutput {
            bucket: bucket.to_string(),
            count: objects.len(),
            objects,
            total_size_bytes,
        });
    } else if objects.is_empty() {
        formatter.println("No objects found.");
    } else {
        formatter.println(&formatter.render_objects(&objects));
        formatter.println(&format!(
            "{} object(s), {}",
            objects.len(),
            humansize::format_size(total_size_bytes.max(0) as u64, humansize::BINARY)
        ));
    }

    ExitCode::Success
}

fn failed_listing(formatter: &Formatter, outcome: &OperationOutcome) -> ExitCode {
    formatter.outcome("Listed", outcome);
    ExitCode::from_outcome(outcome)
}

fn filter_objects(objects: Vec<ObjectInfo>, pattern: Option<&glob::Pattern>) -> Vec<ObjectInfo> {
    match pattern {
        Some(p) => objects
            .into_iter()
            .filter(|o| p.matches(o.key.key()))
            .collect(),
        None => objects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stow_core::BucketRef;

    #[test]
    fn test_filter_objects() {
        let bucket = BucketRef::new("logs").unwrap();
        let objects = vec![
            ObjectInfo::new(&bucket, "2024/app.log.gz", 10),
            ObjectInfo::new(&bucket, "2024/app.log", 10),
            ObjectInfo::new(&bucket, "readme.txt", 10),
        ];

        let pattern = glob::Pattern::new("*.gz").unwrap();
        let kept = filter_objects(objects.clone(), Some(&pattern));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].key.key(), "2024/app.log.gz");

        assert_eq!(filter_objects(objects, None).len(), 3);
    }
}
