//! Command surface for the connector binary
//!
//! One subcommand per client operation. This layer validates arguments,
//! loads credentials from the environment, invokes the session client and
//! renders payloads (pretty JSON on stdout, a one-line summary first for
//! data fetches). Errors from the client surface as plain messages on
//! stderr with a non-zero exit; they never crash the process.

use clap::{Parser, Subcommand};
use octoparse_client::SessionClient;
use octoparse_domain::{Credentials, DataRows, OctoparseError, Result};
use serde::Serialize;

/// Octoparse Open API connector.
#[derive(Debug, Parser)]
#[command(name = "octoparse", version, about)]
pub struct Cli {
    /// Override the API endpoint (default: https://openapi.octoparse.com)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List task groups in the account
    TaskGroups,

    /// List tasks inside a task group
    Tasks {
        /// Task group identifier
        #[arg(long)]
        group_id: i64,
    },

    /// Fetch scraped rows by offset (does not change export status)
    Data {
        /// Task identifier
        #[arg(long)]
        task_id: String,

        /// Row offset to resume from
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Rows per page
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=1000))]
        size: u32,
    },

    /// Fetch rows not yet exported (the server marks them as exporting)
    NotExported {
        /// Task identifier
        #[arg(long)]
        task_id: String,

        /// Rows per page
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..=1000))]
        size: u32,
    },

    /// Mark previously fetched rows as exported
    MarkExported {
        /// Task identifier
        #[arg(long)]
        task_id: String,
    },

    /// Delete all rows of a task (cannot be undone)
    ClearData {
        /// Task identifier
        #[arg(long)]
        task_id: String,
    },
}

/// Dispatch a parsed invocation against a freshly built client.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut client = SessionClient::new(credentials_from_env()?)?;

    let base_url = cli.base_url.or_else(|| std::env::var("OCTOPARSE_BASE_URL").ok());
    if let Some(base_url) = base_url {
        client = client.with_base_url(base_url);
    }

    match cli.command {
        Command::TaskGroups => print_json(&client.list_task_groups().await?)?,
        Command::Tasks { group_id } => print_json(&client.list_tasks(group_id).await?)?,
        Command::Data { task_id, offset, size } => {
            let page = client.get_task_data(&task_id, offset, size).await?;
            println!("{}", page_summary(&page));
            print_json(&page.data_list)?;
        }
        Command::NotExported { task_id, size } => {
            let page = client.get_not_exported_data(&task_id, size).await?;
            println!("{}", fetch_summary(&page));
            print_json(&page.data_list)?;
        }
        Command::MarkExported { task_id } => {
            client.mark_data_as_exported(&task_id).await?;
            println!("Export status updated to exported.");
        }
        Command::ClearData { task_id } => {
            client.clear_task_data(&task_id).await?;
            println!("Task data cleared.");
        }
    }

    Ok(())
}

fn credentials_from_env() -> Result<Credentials> {
    let username = required_env("OCTOPARSE_USERNAME")?;
    let password = required_env("OCTOPARSE_PASSWORD")?;
    Ok(Credentials::new(username, password))
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| OctoparseError::Config(format!("environment variable {key} is not set")))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Operator-facing summary for an offset fetch.
fn page_summary(page: &DataRows) -> String {
    let remaining =
        page.rest_total.map_or_else(|| "unknown".to_string(), |rest| rest.to_string());
    format!(
        "total: {} | fetched: {} | next offset: {} | remaining: {}",
        page.total,
        page.data_list.len(),
        page.offset,
        remaining
    )
}

/// Shorter summary for the not-exported fetch, which has no cursor to resume.
fn fetch_summary(page: &DataRows) -> String {
    format!("total: {} | fetched: {}", page.total, page.data_list.len())
}

#[cfg(test)]
mod tests {
    use octoparse_domain::OffsetCursor;
    use serde_json::json;

    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn data_defaults_offset_and_size() {
        let cli = parse(&["octoparse", "data", "--task-id", "t-1"]).expect("should parse");

        match cli.command {
            Command::Data { task_id, offset, size } => {
                assert_eq!(task_id, "t-1");
                assert_eq!(offset, 0);
                assert_eq!(size, 100);
            }
            other => panic!("expected Data command, got {other:?}"),
        }
    }

    #[test]
    fn size_must_stay_within_api_bounds() {
        assert!(parse(&["octoparse", "data", "--task-id", "t", "--size", "0"]).is_err());
        assert!(parse(&["octoparse", "data", "--task-id", "t", "--size", "1001"]).is_err());
        assert!(parse(&["octoparse", "data", "--task-id", "t", "--size", "1000"]).is_ok());
        assert!(parse(&["octoparse", "not-exported", "--task-id", "t", "--size", "1001"]).is_err());
    }

    #[test]
    fn negative_offset_is_rejected() {
        assert!(parse(&["octoparse", "data", "--task-id", "t", "--offset", "-1"]).is_err());
    }

    #[test]
    fn tasks_requires_group_id() {
        assert!(parse(&["octoparse", "tasks"]).is_err());
        assert!(parse(&["octoparse", "tasks", "--group-id", "7"]).is_ok());
    }

    #[test]
    fn page_summary_reports_remaining_when_known() {
        let page = DataRows {
            total: 120,
            offset: OffsetCursor::Number(100),
            data_list: vec![json!({"k": "v"}).as_object().cloned().unwrap_or_default()],
            rest_total: Some(20),
        };

        assert_eq!(page_summary(&page), "total: 120 | fetched: 1 | next offset: 100 | remaining: 20");
    }

    #[test]
    fn page_summary_falls_back_when_remaining_unknown() {
        let page = DataRows {
            total: 3,
            offset: OffsetCursor::Text("3".to_string()),
            data_list: Vec::new(),
            rest_total: None,
        };

        assert_eq!(page_summary(&page), "total: 3 | fetched: 0 | next offset: 3 | remaining: unknown");
        assert_eq!(fetch_summary(&page), "total: 3 | fetched: 0");
    }
}
