//! `ssm delete-parameters`

use crate::aws::ssm::SsmOperations;
use crate::output::Dataset;
use crate::runtime::CommandRuntime;
use anyhow::{Context, Result, anyhow, bail};
use awstbx_core::action::{STATUS_DELETED, failed_status, initial_status, skipped_if_cancelled};
use awstbx_core::{ActionPlan, Confirm, run_action_plan};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

const HEADERS: &[&str] = &["parameter_name", "action"];

/// Delete every parameter named in `input_file`.
pub async fn delete_parameters<S, C>(
    ssm: &S,
    runtime: &mut CommandRuntime<C>,
    path: &Path,
) -> Result<Dataset>
where
    S: SsmOperations,
    C: Confirm,
{
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read input file {}", path.display()))?;
    let names = parse_parameter_names(&contents)?;
    info!(count = names.len(), "Loaded SSM parameter names");

    let status = initial_status(runtime.dry_run(), "delete");
    let rows = names
        .iter()
        .map(|n| vec![n.clone(), status.clone()])
        .collect();

    let options = runtime.plan_options();
    let (names, cancel) = (&names, &runtime.cancel);
    let plan = ActionPlan {
        rows,
        status_column: 1,
        confirm_prompt: format!("Delete {} SSM parameter(s)", names.len()),
        execute: move |i: usize| async move {
            if let Some(skipped) = skipped_if_cancelled(cancel) {
                return skipped;
            }
            match ssm.delete_parameter(&names[i]).await {
                Ok(()) => STATUS_DELETED.to_string(),
                Err(e) => failed_status(e.to_string()),
            }
        },
    };
    let rows = run_action_plan(plan, options, &mut runtime.confirmer).await?;

    Ok(Dataset::new(HEADERS, rows))
}

/// Accepted input file shapes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputFile {
    Entries(Vec<Entry>),
    /// As printed by `aws ssm get-parameters-by-path`
    Envelope {
        #[serde(rename = "Parameters", alias = "parameters")]
        parameters: Vec<Entry>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Name(String),
    Record {
        #[serde(rename = "Name", alias = "name")]
        name: Option<String>,
    },
}

/// Parse the parameter list, returning unique names in sorted order.
///
/// Accepts an array of names (`["/a", "/b"]`), an array of records carrying
/// `Name` or `name`, or either array wrapped in an object under
/// `Parameters` or `parameters`.
pub fn parse_parameter_names(contents: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(contents).context("parse input file")?;
    let entries = match serde_json::from_value(value) {
        Ok(InputFile::Entries(entries)) | Ok(InputFile::Envelope { parameters: entries }) => entries,
        Err(_) => bail!("parse input file: expected JSON array of parameter objects"),
    };

    let mut names = BTreeSet::new();
    for (i, entry) in entries.into_iter().enumerate() {
        let name = match entry {
            Entry::Name(name) => {
                let name = name.trim();
                if name.is_empty() {
                    bail!("input file entry {i} has an empty name");
                }
                name.to_string()
            }
            Entry::Record { name } => name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .ok_or_else(|| anyhow!("input file entry {i} is missing Name"))?,
        };
        names.insert(name);
    }
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::{AwsError, ErrorKind};
    use crate::commands::testing;
    use awstbx_core::CancelSignal;
    use awstbx_test_utils::input_file;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSsm {
        missing: HashSet<String>,
        deleted: Mutex<Vec<String>>,
        /// Fired after the first successful delete.
        interrupt: Option<CancelSignal>,
    }

    impl SsmOperations for FakeSsm {
        async fn delete_parameter(&self, name: &str) -> Result<(), AwsError> {
            if self.missing.contains(name) {
                return Err(AwsError::new(
                    ErrorKind::NotFound,
                    Some("ParameterNotFound".into()),
                    "Parameter not found",
                ));
            }
            self.deleted.lock().unwrap().push(name.to_string());
            if let Some(signal) = &self.interrupt {
                signal.cancel("interrupted (Ctrl+C)");
            }
            Ok(())
        }
    }

    #[test]
    fn parses_plain_name_arrays() {
        let names = parse_parameter_names(r#"["/b", "/a", "/b"]"#).unwrap();
        assert_eq!(names, vec!["/a", "/b"]);
    }

    #[test]
    fn parses_records_and_envelopes() {
        let records = r#"[{"Name": "/x", "Type": "String"}, {"name": "/w"}]"#;
        assert_eq!(parse_parameter_names(records).unwrap(), vec!["/w", "/x"]);

        let envelope = r#"{"Parameters": [{"Name": "/p1"}, {"Name": "/p0"}]}"#;
        assert_eq!(parse_parameter_names(envelope).unwrap(), vec!["/p0", "/p1"]);

        let lower = r#"{"parameters": ["/only"]}"#;
        assert_eq!(parse_parameter_names(lower).unwrap(), vec!["/only"]);
    }

    #[test]
    fn rejects_malformed_entries() {
        let err = parse_parameter_names(r#"["/a", "  "]"#).unwrap_err();
        assert_eq!(err.to_string(), "input file entry 1 has an empty name");

        let err = parse_parameter_names(r#"[{"Type": "String"}]"#).unwrap_err();
        assert_eq!(err.to_string(), "input file entry 0 is missing Name");

        let err = parse_parameter_names(r#"{"Other": []}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "parse input file: expected JSON array of parameter objects"
        );

        assert!(parse_parameter_names("not json").is_err());
    }

    #[tokio::test]
    async fn deletes_each_parameter_once() {
        let file = input_file(r#"["/app/b", "/app/a", "/app/gone", "/app/a"]"#);
        let ssm = FakeSsm {
            missing: HashSet::from(["/app/gone".to_string()]),
            ..Default::default()
        };
        let mut runtime = testing::confirmed();

        let data = delete_parameters(&ssm, &mut runtime, file.path())
            .await
            .unwrap();

        assert_eq!(data.column(0), vec!["/app/a", "/app/b", "/app/gone"]);
        assert_eq!(
            data.column(1),
            vec![
                "deleted",
                "deleted",
                "failed: Parameter not found (ParameterNotFound)",
            ]
        );
        assert_eq!(*ssm.deleted.lock().unwrap(), vec!["/app/a", "/app/b"]);
    }

    #[tokio::test]
    async fn declined_prompt_cancels_everything() {
        let file = input_file(r#"["/a", "/b"]"#);
        let ssm = FakeSsm::default();
        let mut runtime = testing::declined();

        let data = delete_parameters(&ssm, &mut runtime, file.path())
            .await
            .unwrap();

        assert_eq!(data.column(1), vec!["cancelled", "cancelled"]);
        assert!(ssm.deleted.lock().unwrap().is_empty());
        let prompt = String::from_utf8(runtime.confirmer.into_output()).unwrap();
        assert_eq!(prompt, "Delete 2 SSM parameter(s) [y/N]: ");
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let ssm = FakeSsm::default();
        let mut runtime = testing::dry_run();
        let path = Path::new("/nonexistent/awstbx/params.json");

        let err = delete_parameters(&ssm, &mut runtime, path)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("read input file /nonexistent"));
    }

    #[tokio::test]
    async fn interrupt_stops_remaining_deletes() {
        let file = input_file(r#"["/a", "/b", "/c"]"#);
        let mut runtime = testing::confirmed();
        let ssm = FakeSsm {
            interrupt: Some(runtime.cancel.clone()),
            ..Default::default()
        };

        let data = delete_parameters(&ssm, &mut runtime, file.path())
            .await
            .unwrap();

        assert_eq!(
            data.column(1),
            vec![
                "deleted",
                "skipped: interrupted (Ctrl+C)",
                "skipped: interrupted (Ctrl+C)",
            ]
        );
        assert_eq!(*ssm.deleted.lock().unwrap(), vec!["/a"]);
    }
}
