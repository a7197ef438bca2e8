//! `s3 delete-buckets`

use crate::aws::AwsError;
use crate::aws::s3::{DELETE_BATCH_SIZE, ObjectRef, S3Operations};
use crate::output::Dataset;
use crate::runtime::CommandRuntime;
use anyhow::{Context, Result, bail};
use awstbx_core::action::{STATUS_DELETED, failed_status, initial_status, skipped_if_cancelled};
use awstbx_core::{
    ActionPlan, CancelSignal, Confirm, collect_pages, cursor_present, run_action_plan,
};
use tracing::{debug, info};

const HEADERS: &[&str] = &["bucket", "action"];

/// Which buckets `delete-buckets` targets
#[derive(Debug, Clone, Default)]
pub struct BucketFilter {
    /// Only buckets with no objects and versioning not enabled
    pub empty_only: bool,
    /// Only buckets whose name contains this substring
    pub name_contains: Option<String>,
}

/// Delete the selected buckets, emptying each one first.
pub async fn delete_buckets<S, C>(
    s3: &S,
    runtime: &mut CommandRuntime<C>,
    filter: &BucketFilter,
) -> Result<Dataset>
where
    S: S3Operations,
    C: Confirm,
{
    let name_contains = filter
        .name_contains
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if !filter.empty_only && name_contains.is_none() {
        bail!("set --empty or --filter-name-contains");
    }

    let buckets = collect_pages(|cursor| s3.list_buckets_page(cursor))
        .await
        .context("list buckets")?;

    let mut targets = Vec::new();
    for bucket in buckets {
        if let Some(needle) = name_contains
            && !bucket.contains(needle)
        {
            continue;
        }
        if filter.empty_only && !is_empty_and_unversioned(s3, &bucket).await? {
            debug!(bucket = %bucket, "Bucket is not empty or is versioned, skipping");
            continue;
        }
        targets.push(bucket);
    }
    targets.sort();
    info!(count = targets.len(), "Found S3 buckets to delete");

    let status = initial_status(runtime.dry_run(), "delete");
    let rows = targets
        .iter()
        .map(|b| vec![b.clone(), status.clone()])
        .collect();

    let options = runtime.plan_options();
    let (targets, cancel) = (&targets, &runtime.cancel);
    let plan = ActionPlan {
        rows,
        status_column: 1,
        confirm_prompt: format!("Delete {} S3 bucket(s)", targets.len()),
        execute: move |i: usize| delete_bucket(s3, &targets[i], cancel),
    };
    let rows = run_action_plan(plan, options, &mut runtime.confirmer).await?;

    Ok(Dataset::new(HEADERS, rows))
}

async fn is_empty_and_unversioned<S: S3Operations>(s3: &S, bucket: &str) -> Result<bool> {
    if s3
        .bucket_has_objects(bucket)
        .await
        .with_context(|| format!("list objects for bucket {bucket}"))?
    {
        return Ok(false);
    }
    let versioned = s3
        .versioning_enabled(bucket)
        .await
        .with_context(|| format!("get versioning for bucket {bucket}"))?;
    Ok(!versioned)
}

async fn delete_bucket<S: S3Operations>(
    s3: &S,
    bucket: &str,
    cancel: &CancelSignal,
) -> String {
    if let Some(skipped) = skipped_if_cancelled(cancel) {
        return skipped;
    }
    if let Err(reason) = empty_bucket(s3, bucket, cancel).await {
        return failed_status(reason);
    }
    // Emptied but not yet removed.
    if cancel.is_cancelled() {
        return failed_status(cancel.cause());
    }
    match s3.delete_bucket(bucket).await {
        Ok(()) => STATUS_DELETED.to_string(),
        Err(e) => failed_status(e.to_string()),
    }
}

/// Remove every object, object version and delete marker from a bucket.
///
/// Deletion happens in batches of at most [`DELETE_BATCH_SIZE`]. A batch is
/// the unit of failure: if S3 reports an error for any key in it, the whole
/// bucket is reported as failed. An interrupt stops before the next batch
/// and fails the bucket with the interrupt's cause.
async fn empty_bucket<S: S3Operations>(
    s3: &S,
    bucket: &str,
    cancel: &CancelSignal,
) -> Result<(), String> {
    let keys = collect_pages(move |cursor| s3.list_objects_page(bucket, cursor))
        .await
        .map_err(|e: AwsError| format!("list objects for bucket {bucket}: {e}"))?;
    let objects: Vec<ObjectRef> = keys.into_iter().map(ObjectRef::key).collect();
    delete_in_batches(s3, bucket, &objects, cancel).await?;

    // Versions continue from a key marker and a version-id marker together,
    // so this listing runs its own loop instead of collect_pages.
    let mut key_marker = None;
    let mut version_id_marker = None;
    loop {
        let page = s3
            .list_object_versions_page(bucket, key_marker.take(), version_id_marker.take())
            .await
            .map_err(|e| format!("list object versions for bucket {bucket}: {e}"))?;

        delete_in_batches(s3, bucket, &page.objects, cancel).await?;

        if !cursor_present(page.next_key_marker.as_deref())
            && !cursor_present(page.next_version_id_marker.as_deref())
        {
            return Ok(());
        }
        key_marker = page.next_key_marker;
        version_id_marker = page.next_version_id_marker;
    }
}

async fn delete_in_batches<S: S3Operations>(
    s3: &S,
    bucket: &str,
    objects: &[ObjectRef],
    cancel: &CancelSignal,
) -> Result<(), String> {
    for batch in objects.chunks(DELETE_BATCH_SIZE) {
        if cancel.is_cancelled() {
            return Err(cancel.cause());
        }
        let errors = s3
            .delete_objects(bucket, batch)
            .await
            .map_err(|e| format!("delete objects from bucket {bucket}: {e}"))?;
        if let Some(first) = errors.first() {
            return Err(format!(
                "delete objects from bucket {bucket}: {first} ({} key(s) failed)",
                errors.len()
            ));
        }
    }
    Ok(())
}
