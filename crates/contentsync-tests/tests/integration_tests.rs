//! Integration tests for ContentSync
//!
//! These tests drive the scanner, diff engine and sync engine together
//! against real temporary trees.

use contentsync_config::SyncPolicy;
use contentsync_sync::{
    CacheKey, ContentComparator, DiffEngine, DiffOptions, DiskListingCache, EngineOptions,
    FolderDiffResult, ListingCache, MemoryListingCache, SyncEngine, TreeScanner,
};
use contentsync_tests::test_utils::{mtime, snapshot, SyncFixture};
use contentsync_types::{PathCase, RelativePath, TreeListing};
use proptest::prelude::*;
use rstest::rstest;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn names(paths: &[RelativePath]) -> Vec<&str> {
    paths.iter().map(RelativePath::as_str).collect()
}

fn compare_options() -> DiffOptions {
    DiffOptions::default().with_compare_contents(true)
}

async fn diff(left: &Path, right: &Path, options: &DiffOptions) -> FolderDiffResult {
    DiffEngine::default()
        .diff(left, right, options, &CancellationToken::new())
        .await
        .expect("diff failed")
}

#[tokio::test]
async fn test_new_file_is_copied_into_empty_destination() {
    let fx = SyncFixture::new();
    let payload = vec![b'a'; 100];
    fx.source().file("a.txt", &payload, 1_000);
    fx.destination();

    let result = diff(&fx.source, &fx.destination, &compare_options()).await;
    assert_eq!(names(&result.left_only_files), vec!["a.txt"]);

    let policy = SyncPolicy::none().with_copy_left_only(true);
    let report = SyncEngine::default()
        .sync(&fx.source, &fx.destination, &policy, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fs::read(fx.destination.join("a.txt")).unwrap(), payload);
    assert_eq!(report.counters.files_copied, 1);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_equal_bytes_with_older_destination_are_changed() {
    let fx = SyncFixture::new();
    fx.source().file("b.txt", "same bytes", 2_000);
    fx.destination().file("b.txt", "same bytes", 1_000);

    let options = compare_options().with_respect_date(true);
    let result = diff(&fx.source, &fx.destination, &options).await;

    assert_eq!(names(&result.changed_files), vec!["b.txt"]);
    assert!(result.identical_files.is_empty());
}

#[tokio::test]
async fn test_extra_file_is_deleted() {
    let fx = SyncFixture::new();
    fx.destination().file("c.txt", "extra", 1_000);

    let result = diff(&fx.source, &fx.destination, &compare_options()).await;
    assert_eq!(names(&result.right_only_files), vec!["c.txt"]);

    let policy = SyncPolicy::none().with_delete_right_only_files(true);
    let report = SyncEngine::default()
        .sync(&fx.source, &fx.destination, &policy, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!fx.destination.join("c.txt").exists());
    assert_eq!(report.counters.files_deleted(), 1);
    assert_eq!(report.counters.total_failures(), 0);
}

/// Seed the cache with a destination listing that still names `ghost.txt`,
/// which no longer exists on disk
fn stale_destination_cache(fx: &SyncFixture) -> Arc<MemoryListingCache> {
    let cache = Arc::new(MemoryListingCache::new());
    let key = CacheKey::new(&fx.destination, SyncPolicy::MATCH_ALL);
    let listing = TreeListing::with_entries(
        vec![RelativePath::new("ghost.txt"), RelativePath::new("keep.txt")],
        Vec::new(),
    );
    cache.write(&key, &listing).unwrap();
    cache
}

#[tokio::test]
async fn test_vanished_file_fails_only_its_own_comparison() {
    let fx = SyncFixture::new();
    fx.source()
        .file("ghost.txt", "boo", 1_000)
        .file("keep.txt", "keep", 1_000)
        .file("new.txt", "new", 1_000);
    fx.destination().file("keep.txt", "keep", 1_000);
    let cache = stale_destination_cache(&fx);

    let scanner = TreeScanner::new().with_cache(cache);
    let engine = DiffEngine::new(scanner, ContentComparator::default());
    let result = engine
        .diff(&fx.source, &fx.destination, &compare_options(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(names(&result.failed_comparisons), vec!["ghost.txt"]);
    assert_eq!(names(&result.identical_files), vec!["keep.txt"]);
    assert_eq!(names(&result.left_only_files), vec!["new.txt"]);
    assert!(result.changed_files.is_empty());
    assert_eq!(names(&result.right_only_files), vec!["ghost.txt"]);
    assert!(!result.are_fully_identical());
}

#[tokio::test]
async fn test_failed_run_keeps_cached_listings() {
    let fx = SyncFixture::new();
    fx.source()
        .file("ghost.txt", "boo", 1_000)
        .file("keep.txt", "keep", 1_000);
    fx.destination().file("keep.txt", "keep", 1_000);
    let cache = stale_destination_cache(&fx);

    let engine = SyncEngine::new(Some(cache.clone()), EngineOptions::default());
    let report = engine
        .sync(&fx.source, &fx.destination, &SyncPolicy::mirror(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.counters.comparisons_failed, 1);
    assert!(!report.is_success());
    assert!(!report.cache_cleared);
    let key = CacheKey::new(&fx.destination, SyncPolicy::MATCH_ALL);
    assert!(cache.try_read(&key).unwrap().is_some());
    assert!(report
        .summary_lines()
        .iter()
        .any(|line| line.text == "Failed to compare 1 file."));
}

fn populate_mixed_trees(fx: &SyncFixture) {
    fx.source()
        .file("same.txt", "same", 1_000)
        .file("docs/edited.md", "version two", 2_000)
        .file("docs/new.md", "fresh", 1_000)
        .file("deep/a/b/c.txt", "deep", 1_000)
        .folder("empty/inner");
    fx.destination()
        .file("same.txt", "same", 1_000)
        .file("docs/edited.md", "version one", 1_000)
        .file("stale.log", "old", 1_000)
        .file("obsolete/x/y.txt", "y", 1_000);
}

#[tokio::test]
async fn test_second_mirror_run_changes_nothing() {
    let fx = SyncFixture::new();
    populate_mixed_trees(&fx);
    let cache: Arc<dyn ListingCache> = Arc::new(MemoryListingCache::new());
    let engine = SyncEngine::new(Some(cache), EngineOptions::default());
    let cancel = CancellationToken::new();

    let first = engine
        .sync(&fx.source, &fx.destination, &SyncPolicy::mirror(), &cancel)
        .await
        .unwrap();
    assert!(first.changes_made);
    assert!(first.is_success());
    assert_eq!(
        mtime(&fx.destination.join("docs/edited.md")),
        mtime(&fx.source.join("docs/edited.md"))
    );

    let second = engine
        .sync(&fx.source, &fx.destination, &SyncPolicy::mirror(), &cancel)
        .await
        .unwrap();
    assert!(second.fully_identical);
    assert!(!second.changes_made);
    assert_eq!(second.counters.total_changes(), 0);
    assert_eq!(second.summary_lines().last().unwrap().text, "Made no changes.");
}

#[rstest]
#[case::mirror_deleting_identical(SyncPolicy::mirror().with_delete_identical(true))]
#[case::mirror_deleting_changed(SyncPolicy::mirror().with_update_changed(false).with_delete_changed(true))]
#[case::copy_only(SyncPolicy::copy_only())]
#[tokio::test]
async fn test_dry_run_touches_nothing_and_counts_like_a_real_run(#[case] policy: SyncPolicy) {
    let dry = SyncFixture::new();
    populate_mixed_trees(&dry);
    let before = (snapshot(&dry.source), snapshot(&dry.destination));

    let dry_report = SyncEngine::default()
        .sync(
            &dry.source,
            &dry.destination,
            &policy.clone().with_dry_run(true),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!((snapshot(&dry.source), snapshot(&dry.destination)), before);

    let real = SyncFixture::new();
    populate_mixed_trees(&real);
    let real_report = SyncEngine::default()
        .sync(&real.source, &real.destination, &policy, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(dry_report.counters, real_report.counters);
    assert_eq!(dry_report.changes_made, real_report.changes_made);
    assert!(dry_report.dry_run);
    assert!(dry_report
        .summary_lines()
        .iter()
        .any(|line| line.text.starts_with("Would have")));
}

#[tokio::test]
async fn test_dry_run_against_missing_destination() {
    let fx = SyncFixture::new();
    fx.source().file("a/b.txt", "b", 1_000).folder("a/c");

    let report = SyncEngine::default()
        .sync(
            &fx.source,
            &fx.destination,
            &SyncPolicy::mirror().with_dry_run(true),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!fx.destination.exists());
    assert_eq!(report.counters.files_copied, 1);
    assert_eq!(report.counters.folders_created, 1);
}

#[tokio::test]
async fn test_cancelled_sync_leaves_destination_alone() {
    let fx = SyncFixture::new();
    populate_mixed_trees(&fx);
    let before = snapshot(&fx.destination);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = SyncEngine::default()
        .sync(&fx.source, &fx.destination, &SyncPolicy::mirror(), &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(!report.changes_made);
    assert_eq!(snapshot(&fx.destination), before);
}

#[tokio::test]
async fn test_fully_identical_trees() {
    let fx = SyncFixture::new();
    fx.source().file("x/y.txt", "y", 1_000).file("z.txt", "z", 1_000);
    fx.destination().file("x/y.txt", "y", 1_000).file("z.txt", "z", 1_000);

    let result = diff(&fx.source, &fx.destination, &compare_options()).await;
    assert!(result.are_fully_identical());
    assert_eq!(result.identical_files.len(), 2);

    fx.destination().folder("x/extra");
    let result = diff(&fx.source, &fx.destination, &compare_options()).await;
    assert!(!result.are_fully_identical());
    assert_eq!(names(&result.right_only_folders), vec!["x/extra"]);
}

#[tokio::test]
async fn test_paths_match_across_case() {
    let fx = SyncFixture::new();
    fx.source().file("Docs/ReadMe.TXT", "same", 1_000);
    fx.destination().file("docs/readme.txt", "same", 1_000);

    let result = diff(&fx.source, &fx.destination, &compare_options()).await;
    assert_eq!(result.identical_files.len(), 1);
    assert!(result.left_only_files.is_empty());
    assert!(result.right_only_files.is_empty());
    assert!(result.left_only_folders.is_empty());
}

#[tokio::test]
async fn test_different_contents_without_dates_count_as_identical() {
    let fx = SyncFixture::new();
    fx.source().file("t.txt", "aaa", 2_000);
    fx.destination().file("t.txt", "bbb", 1_000);

    let options = compare_options().with_respect_date(false);
    let result = diff(&fx.source, &fx.destination, &options).await;

    assert_eq!(names(&result.identical_files), vec!["t.txt"]);
}

#[test]
fn test_comparator_self_and_size_mismatch() {
    let fx = SyncFixture::new();
    fx.source()
        .file("one.bin", contentsync_tests::test_utils::generate_test_data(10_000), 1_000)
        .file("two.bin", contentsync_tests::test_utils::generate_test_data(9_999), 1_000);
    let cancel = CancellationToken::new();

    let comparator = ContentComparator::default();
    let one = fx.source.join("one.bin");
    assert!(comparator.are_identical(&one, &one, &cancel).unwrap());
    assert_eq!(comparator.bytes_read(), 20_000);

    let fresh = ContentComparator::default();
    assert!(!fresh
        .are_identical(&one, &fx.source.join("two.bin"), &cancel)
        .unwrap());
    assert_eq!(fresh.bytes_read(), 0);
}

#[tokio::test]
async fn test_single_file_sync() {
    let fx = SyncFixture::new();
    fx.source().file("report.pdf", "pdf bytes", 1_000);
    let source = fx.source.join("report.pdf");
    let target = fx.source.join("copy.pdf");
    let cancel = CancellationToken::new();
    let engine = SyncEngine::default();

    let dry = engine
        .sync_file(&source, &target, &SyncPolicy::mirror().with_dry_run(true), &cancel)
        .await
        .unwrap();
    assert_eq!(dry.counters.files_copied, 1);
    assert!(!target.exists());

    engine
        .sync_file(&source, &target, &SyncPolicy::mirror(), &cancel)
        .await
        .unwrap();
    let again = engine
        .sync_file(&source, &target, &SyncPolicy::mirror(), &cancel)
        .await
        .unwrap();
    assert!(again.contents_identical);
    assert_eq!(again.summary_lines()[0].text, "File contents are identical.");
}

#[tokio::test]
async fn test_disk_cache_drops_destination_entries_after_success() {
    let fx = SyncFixture::new();
    populate_mixed_trees(&fx);
    let cache_dir = tempfile::TempDir::new().unwrap();
    let cache = Arc::new(DiskListingCache::new(cache_dir.path()).unwrap());
    let engine = SyncEngine::new(Some(cache.clone()), EngineOptions::default());

    let report = engine
        .sync(&fx.source, &fx.destination, &SyncPolicy::mirror(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.cache_cleared);

    let source_key = CacheKey::new(&fx.source, SyncPolicy::MATCH_ALL);
    let destination_key = CacheKey::new(&fx.destination, SyncPolicy::MATCH_ALL);
    assert!(cache.try_read(&source_key).unwrap().is_some());
    assert!(cache.try_read(&destination_key).unwrap().is_none());
}

const POOL: [&str; 6] = [
    "a.txt",
    "B.txt",
    "d1/c.txt",
    "d1/d2/e.txt",
    "d3/f.txt",
    "d3/d4/g.txt",
];

fn keys(paths: &[RelativePath]) -> BTreeSet<String> {
    paths.iter().map(|p| p.key(PathCase::Insensitive)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_every_scanned_path_lands_in_one_category(
        layout in prop::collection::btree_map(0usize..POOL.len(), (0u8..3, 0u8..2, 0i64..2), 0..POOL.len())
    ) {
        let fx = SyncFixture::new();
        let left = fx.source();
        let right = fx.destination();
        for (index, (side, variant, age)) in &layout {
            let path = POOL[*index];
            let contents = if *variant == 0 { "zero" } else { "one!" };
            if *side != 1 {
                left.file(path, "zero", 1_000 + age);
            }
            if *side != 0 {
                right.file(path, contents, 1_000);
            }
        }

        let result = tokio_test::block_on(DiffEngine::default().diff(
            &fx.source,
            &fx.destination,
            &DiffOptions::default().with_compare_contents(true),
            &CancellationToken::new(),
        ))
        .unwrap();

        let scanner = TreeScanner::new();
        let cancel = CancellationToken::new();
        let left_listing = scanner.scan(&fx.source, "*", true, &cancel).unwrap();
        let right_listing = scanner.scan(&fx.destination, "*", true, &cancel).unwrap();
        let left_files = keys(&left_listing.files);
        let right_files = keys(&right_listing.files);

        let left_only = keys(&result.left_only_files);
        let right_only = keys(&result.right_only_files);
        let identical = keys(&result.identical_files);
        let changed = keys(&result.changed_files);
        prop_assert!(result.failed_comparisons.is_empty());

        let both: BTreeSet<_> = left_files.intersection(&right_files).cloned().collect();
        prop_assert_eq!(&left_only, &left_files.difference(&right_files).cloned().collect());
        prop_assert_eq!(&right_only, &right_files.difference(&left_files).cloned().collect());
        prop_assert!(identical.is_disjoint(&changed));
        prop_assert_eq!(&identical.union(&changed).cloned().collect::<BTreeSet<_>>(), &both);

        let left_folders = keys(&left_listing.folders);
        let right_folders = keys(&right_listing.folders);
        prop_assert_eq!(
            keys(&result.left_only_folders),
            left_folders.difference(&right_folders).cloned().collect::<BTreeSet<_>>()
        );
        prop_assert_eq!(
            keys(&result.right_only_folders),
            right_folders.difference(&left_folders).cloned().collect::<BTreeSet<_>>()
        );

        // dates are respected, so only a newer left side makes a pair changed
        let fully = layout.values().all(|(side, _, age)| *side == 2 && *age == 0);
        prop_assert_eq!(result.are_fully_identical(), fully);
    }
}
