//! `efs delete-filesystems`

use crate::aws::AwsError;
use crate::aws::efs::EfsOperations;
use crate::output::Dataset;
use crate::runtime::CommandRuntime;
use crate::tags::TagFilter;
use anyhow::{Context, Result};
use awstbx_core::action::{STATUS_DELETED, failed_status, initial_status, skipped_if_cancelled};
use awstbx_core::{
    ActionPlan, CancelSignal, Confirm, PollStatus, WaitConfig, collect_pages, run_action_plan,
    wait_until_complete,
};
use std::time::Duration;
use tracing::{debug, info};

const HEADERS: &[&str] = &["file_system_id", "mount_targets", "action"];

/// Mount target teardown is polled every 5 s, 120 times at most.
const MOUNT_TARGET_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MOUNT_TARGET_MAX_ATTEMPTS: u32 = 120;

#[derive(Debug, Clone)]
struct Target {
    file_system_id: String,
    mount_targets: Vec<String>,
}

/// Delete every file system (optionally only those carrying a tag),
/// removing its mount targets first.
pub async fn delete_filesystems<E, C>(
    efs: &E,
    runtime: &mut CommandRuntime<C>,
    filter: Option<&TagFilter>,
) -> Result<Dataset>
where
    E: EfsOperations,
    C: Confirm,
{
    let file_systems = collect_pages(|cursor| efs.list_file_systems_page(cursor))
        .await
        .context("list EFS file systems")?;

    let mut targets = Vec::new();
    for fs in file_systems {
        if let Some(filter) = filter
            && !fs.has_tag(&filter.key, &filter.value)
        {
            continue;
        }

        let mut mount_targets = list_mount_targets(efs, &fs.id)
            .await
            .with_context(|| format!("list mount targets for {}", fs.id))?;
        mount_targets.sort();

        targets.push(Target {
            file_system_id: fs.id,
            mount_targets,
        });
    }
    targets.sort_by(|a, b| a.file_system_id.cmp(&b.file_system_id));
    info!(count = targets.len(), "Found EFS file systems to delete");

    let status = initial_status(runtime.dry_run(), "delete");
    let rows = targets
        .iter()
        .map(|t| {
            vec![
                t.file_system_id.clone(),
                t.mount_targets.len().to_string(),
                status.clone(),
            ]
        })
        .collect();

    let options = runtime.plan_options();
    let wait = WaitConfig::attempts(MOUNT_TARGET_POLL_INTERVAL, MOUNT_TARGET_MAX_ATTEMPTS);
    let (targets, wait, cancel) = (&targets, &wait, &runtime.cancel);

    let plan = ActionPlan {
        rows,
        status_column: 2,
        confirm_prompt: format!("Delete {} EFS file system(s)", targets.len()),
        execute: move |i: usize| delete_file_system(efs, &targets[i], wait, cancel),
    };
    let rows = run_action_plan(plan, options, &mut runtime.confirmer).await?;

    Ok(Dataset::new(HEADERS, rows))
}

async fn list_mount_targets<E: EfsOperations>(
    efs: &E,
    file_system_id: &str,
) -> Result<Vec<String>, AwsError> {
    collect_pages(move |cursor| efs.list_mount_targets_page(file_system_id, cursor)).await
}

async fn delete_file_system<E: EfsOperations>(
    efs: &E,
    target: &Target,
    wait: &WaitConfig,
    cancel: &CancelSignal,
) -> String {
    if let Some(skipped) = skipped_if_cancelled(cancel) {
        return skipped;
    }
    let id = target.file_system_id.as_str();

    for mount_target in &target.mount_targets {
        match efs.delete_mount_target(mount_target).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(
                    file_system = %id,
                    mount_target = %mount_target,
                    "Mount target already gone"
                );
            }
            Err(e) => return failed_status(e.to_string()),
        }
    }

    if !target.mount_targets.is_empty() {
        let outcome = wait_until_complete(
            &format!("EFS mount targets to delete for file system {id}"),
            wait,
            cancel,
            move || async move {
                let remaining = list_mount_targets(efs, id).await?;
                Ok::<_, AwsError>(if remaining.is_empty() {
                    PollStatus::Complete
                } else {
                    PollStatus::InProgress
                })
            },
        )
        .await;
        if !outcome.is_success() {
            return failed_status(outcome.to_string());
        }
    }

    match efs.delete_file_system(id).await {
        Ok(()) => STATUS_DELETED.to_string(),
        Err(e) if e.is_not_found() => {
            debug!(file_system = %id, "File system already gone");
            STATUS_DELETED.to_string()
        }
        Err(e) => failed_status(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::ErrorKind;
    use crate::aws::efs::FileSystem;
    use crate::commands::testing;
    use awstbx_core::Page;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeEfs {
        file_systems: Vec<FileSystem>,
        mount_targets: Mutex<HashMap<String, Vec<String>>>,
        /// Mount targets that never go away once deleted
        stuck: HashSet<String>,
        fail_list: bool,
        fail_delete: HashSet<String>,
        /// Mount targets removed by someone else before our delete
        vanished: HashSet<String>,
        interrupt: Option<CancelSignal>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeEfs {
        fn with(file_systems: &[(&str, &[&str])]) -> Self {
            let mut fake = Self::default();
            for (id, mts) in file_systems {
                fake.file_systems.push(FileSystem {
                    id: id.to_string(),
                    tags: vec![],
                });
                fake.mount_targets.lock().unwrap().insert(
                    id.to_string(),
                    mts.iter().map(|m| m.to_string()).collect(),
                );
            }
            fake
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn denied() -> AwsError {
        AwsError::new(
            ErrorKind::AccessDenied,
            Some("AccessDenied".into()),
            "not allowed",
        )
    }

    impl EfsOperations for FakeEfs {
        async fn list_file_systems_page(
            &self,
            cursor: Option<String>,
        ) -> Result<Page<FileSystem>, AwsError> {
            if self.fail_list {
                return Err(denied());
            }
            // two file systems per page to exercise pagination
            let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let end = (start + 2).min(self.file_systems.len());
            let next = (end < self.file_systems.len()).then(|| end.to_string());
            Ok(Page::new(self.file_systems[start..end].to_vec(), next))
        }

        async fn list_mount_targets_page(
            &self,
            file_system_id: &str,
            _cursor: Option<String>,
        ) -> Result<Page<String>, AwsError> {
            let targets = self.mount_targets.lock().unwrap();
            Ok(Page::last(
                targets.get(file_system_id).cloned().unwrap_or_default(),
            ))
        }

        async fn delete_mount_target(&self, mount_target_id: &str) -> Result<(), AwsError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete-mount-target {mount_target_id}"));
            if self.vanished.contains(mount_target_id) {
                return Err(AwsError::new(
                    ErrorKind::NotFound,
                    Some("MountTargetNotFound".into()),
                    format!("Mount target '{mount_target_id}' does not exist."),
                ));
            }
            if !self.stuck.contains(mount_target_id) {
                for targets in self.mount_targets.lock().unwrap().values_mut() {
                    targets.retain(|t| t != mount_target_id);
                }
            }
            Ok(())
        }

        async fn delete_file_system(&self, file_system_id: &str) -> Result<(), AwsError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("delete-file-system {file_system_id}"));
            if self.fail_delete.contains(file_system_id) {
                return Err(denied());
            }
            if let Some(signal) = &self.interrupt {
                signal.cancel("interrupted (Ctrl+C)");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn dry_run_lists_sorted_targets_without_deleting() {
        let efs = FakeEfs::with(&[("fs-c", &[]), ("fs-a", &["fsmt-1", "fsmt-2"]), ("fs-b", &[])]);
        let mut runtime = testing::dry_run();

        let data = delete_filesystems(&efs, &mut runtime, None).await.unwrap();

        assert_eq!(data.headers, HEADERS);
        assert_eq!(data.column(0), vec!["fs-a", "fs-b", "fs-c"]);
        assert_eq!(data.column(1), vec!["2", "0", "0"]);
        assert_eq!(data.column(2), vec!["would-delete"; 3]);
        assert!(efs.calls().is_empty());
    }

    #[tokio::test]
    async fn deletes_mount_targets_before_file_system() {
        let efs = FakeEfs::with(&[("fs-a", &["fsmt-1", "fsmt-2"]), ("fs-b", &[])]);
        let mut runtime = testing::confirmed();

        let data = delete_filesystems(&efs, &mut runtime, None).await.unwrap();

        assert_eq!(data.column(2), vec!["deleted", "deleted"]);
        assert_eq!(
            efs.calls(),
            vec![
                "delete-mount-target fsmt-1",
                "delete-mount-target fsmt-2",
                "delete-file-system fs-a",
                "delete-file-system fs-b",
            ]
        );
    }

    #[tokio::test]
    async fn tag_filter_limits_targets() {
        let mut efs = FakeEfs::with(&[("fs-a", &[]), ("fs-b", &[])]);
        efs.file_systems[1].tags = vec![("env".into(), "dev".into())];
        let mut runtime = testing::dry_run();
        let filter = TagFilter {
            key: "env".into(),
            value: "dev".into(),
        };

        let data = delete_filesystems(&efs, &mut runtime, Some(&filter))
            .await
            .unwrap();
        assert_eq!(data.column(0), vec!["fs-b"]);
    }

    #[tokio::test]
    async fn declining_cancels_every_row() {
        let efs = FakeEfs::with(&[("fs-a", &[]), ("fs-b", &[])]);
        let mut runtime = testing::declined();

        let data = delete_filesystems(&efs, &mut runtime, None).await.unwrap();
        assert_eq!(data.column(2), vec!["cancelled", "cancelled"]);
        assert!(efs.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_does_not_stop_other_rows() {
        let mut efs = FakeEfs::with(&[("fs-a", &[]), ("fs-b", &[]), ("fs-c", &[])]);
        efs.fail_delete.insert("fs-b".into());
        let mut runtime = testing::confirmed();

        let data = delete_filesystems(&efs, &mut runtime, None).await.unwrap();
        assert_eq!(
            data.column(2),
            vec!["deleted", "failed: not allowed (AccessDenied)", "deleted"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_mount_target_times_out() {
        let mut efs = FakeEfs::with(&[("fs-a", &["fsmt-1"]), ("fs-b", &[])]);
        efs.stuck.insert("fsmt-1".into());
        let mut runtime = testing::confirmed();

        let data = delete_filesystems(&efs, &mut runtime, None).await.unwrap();

        assert_eq!(
            data.column(2),
            vec![
                "failed: timed out waiting for EFS mount targets to delete for file system fs-a after 120 attempts",
                "deleted",
            ]
        );
        assert!(!efs.calls().contains(&"delete-file-system fs-a".to_string()));
    }

    #[tokio::test]
    async fn vanished_mount_target_counts_as_deleted() {
        let mut efs = FakeEfs::with(&[("fs-a", &["fsmt-1", "fsmt-2"])]);
        efs.vanished.insert("fsmt-1".into());
        // Someone else already removed it.
        efs.mount_targets
            .lock()
            .unwrap()
            .insert("fs-a".into(), vec!["fsmt-2".into()]);
        let mut runtime = testing::confirmed();

        let data = delete_filesystems(&efs, &mut runtime, None).await.unwrap();

        assert_eq!(data.column(2), vec!["deleted"]);
        assert_eq!(
            efs.calls(),
            vec![
                "delete-mount-target fsmt-1",
                "delete-mount-target fsmt-2",
                "delete-file-system fs-a",
            ]
        );
    }

    #[tokio::test]
    async fn interrupt_skips_remaining_file_systems() {
        let mut efs = FakeEfs::with(&[("fs-a", &[]), ("fs-b", &["fsmt-1"]), ("fs-c", &[])]);
        let mut runtime = testing::confirmed();
        efs.interrupt = Some(runtime.cancel.clone());

        let data = delete_filesystems(&efs, &mut runtime, None).await.unwrap();

        assert_eq!(
            data.column(2),
            vec![
                "deleted",
                "skipped: interrupted (Ctrl+C)",
                "skipped: interrupted (Ctrl+C)",
            ]
        );
        assert_eq!(efs.calls(), vec!["delete-file-system fs-a"]);
    }

    #[tokio::test]
    async fn listing_failure_aborts() {
        let efs = FakeEfs {
            fail_list: true,
            ..Default::default()
        };
        let mut runtime = testing::confirmed();

        let err = delete_filesystems(&efs, &mut runtime, None)
            .await
            .unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "list EFS file systems: not allowed (AccessDenied)"
        );
    }
}
