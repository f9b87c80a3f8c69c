use std::sync::mpsc;
use std::sync::Arc;

use assist_index::{ClasspathRoot, MetadataDiscovery, MetadataService};
use assist_metadata::MergePolicy;
use assist_scheduler::{ProgressEvent, Scheduler, SchedulerConfig, TaskError};
use pretty_assertions::assert_eq;

use super::{properties, write_metadata_file, write_starter_jar};

fn single_thread_scheduler() -> Scheduler {
    Scheduler::new(SchedulerConfig {
        background_threads: 1,
        progress_channel_capacity: 64,
    })
}

/// Occupy the only pool thread until the returned sender fires.
fn block_pool(scheduler: &Scheduler) -> mpsc::Sender<()> {
    let (tx, rx) = mpsc::channel::<()>();
    drop(scheduler.spawn_background(move |_| {
        let _ = rx.recv();
        Ok(())
    }));
    tx
}

#[test]
fn jar_and_build_directory_metadata_are_merged() {
    let dir = tempfile::tempdir().unwrap();
    let jar = write_starter_jar(
        &dir.path().join("starter.jar"),
        &properties(&["server.port", "server.address"]),
    );
    let meta_inf = dir.path().join("app/target/classes/META-INF");
    std::fs::create_dir_all(&meta_inf).unwrap();
    std::fs::write(
        meta_inf.join("additional-spring-configuration-metadata.json"),
        properties(&["app.greeting"]),
    )
    .unwrap();

    let roots = [
        ClasspathRoot::from_path(&jar).unwrap(),
        ClasspathRoot::Directory(dir.path().join("app/target")),
    ];
    let files = MetadataDiscovery::default().find_in_roots(&roots);
    assert_eq!(files.len(), 2);

    let service = MetadataService::new("app".into(), Scheduler::inline(), MergePolicy::LastWins);
    let report = service.refresh_metadata(files).wait().unwrap();
    assert_eq!(report.build.properties, 3);
    assert!(report.failed_files.is_empty());

    let names: Vec<_> = service
        .complete("server.")
        .unwrap()
        .into_iter()
        .map(|suggestion| suggestion.name)
        .collect();
    assert_eq!(names, vec!["server.address", "server.port"]);
    assert_eq!(
        service.resolve("app.greeting").unwrap().last().unwrap().ty.as_deref(),
        Some("java.lang.String")
    );
}

#[test]
fn cancelled_rebuild_leaves_the_published_tree_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_metadata_file(dir.path(), "first.json", &properties(&["server.port"]));
    let second = write_metadata_file(dir.path(), "second.json", &properties(&["server.address"]));

    let scheduler = single_thread_scheduler();
    let service = MetadataService::new("app".into(), scheduler.clone(), MergePolicy::LastWins);
    service.refresh_metadata([first]).wait().unwrap();
    let before = service.snapshot();

    let release = block_pool(&scheduler);
    let task = service.refresh_metadata([second]);
    task.cancel();
    release.send(()).unwrap();

    assert_eq!(task.wait().unwrap_err(), TaskError::Cancelled);
    let after = service.snapshot();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(after.find_str("server.port").is_some());
    assert!(after.find_str("server.address").is_none());
}

#[test]
fn newer_refresh_supersedes_the_running_one() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_metadata_file(dir.path(), "a.json", &properties(&["a.one"]));
    let b = write_metadata_file(dir.path(), "b.json", &properties(&["b.two"]));

    let scheduler = single_thread_scheduler();
    let service = MetadataService::new("app".into(), scheduler.clone(), MergePolicy::LastWins);

    let release = block_pool(&scheduler);
    let older = service.refresh_metadata([a]);
    let newer = service.refresh_metadata([b]);
    release.send(()).unwrap();

    assert_eq!(older.wait().unwrap_err(), TaskError::Cancelled);
    let report = newer.wait().unwrap();
    assert_eq!(report.generation, 2);
    assert_eq!(report.files, 2);
    assert_eq!(service.snapshot().property_count(), 2);
}

#[test]
fn rebuild_reports_progress() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_metadata_file(dir.path(), "a.json", &properties(&["a.one"]));
    let scheduler = Scheduler::inline();
    let mut events = scheduler.subscribe_progress();

    let service = MetadataService::new("app".into(), scheduler, MergePolicy::LastWins);
    service.refresh_metadata([file]).wait().unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen.first(), Some(ProgressEvent::Begin { .. })));
    assert!(seen.iter().any(|event| matches!(
        event,
        ProgressEvent::Report {
            percentage: Some(100),
            ..
        }
    )));
    assert!(matches!(seen.last(), Some(ProgressEvent::End { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn refresh_can_be_awaited_from_async_code() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_metadata_file(dir.path(), "a.json", &properties(&["spring.main.banner-mode"]));

    let service = MetadataService::new("app".into(), single_thread_scheduler(), MergePolicy::LastWins);
    let report = service.refresh_metadata([file]).join().await.unwrap();
    assert_eq!(report.build.properties, 1);
    assert!(service.snapshot().find_str("spring.main.bannerMode").is_some());
}
