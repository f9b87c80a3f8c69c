use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use assist_core::ScopeId;
use assist_index::{
    DependencyItem, DependencyWatcher, LibraryRef, MetadataDiscovery, ModuleChange, ModuleRef,
    ScopeRegistry,
};
use assist_metadata::MergePolicy;
use assist_scheduler::{Scheduler, SchedulerConfig, TaskError};
use pretty_assertions::assert_eq;

use super::{properties, write_starter_jar};

fn library(path: PathBuf) -> DependencyItem {
    DependencyItem::Library(LibraryRef {
        name: path.file_stem().unwrap().to_string_lossy().into_owned(),
        roots: vec![path],
    })
}

#[test]
fn added_dependencies_refresh_their_module() {
    let dir = tempfile::tempdir().unwrap();
    let jar = write_starter_jar(&dir.path().join("web.jar"), &properties(&["server.port"]));
    let meta_inf = dir.path().join("shared/target/classes/META-INF");
    std::fs::create_dir_all(&meta_inf).unwrap();
    std::fs::write(
        meta_inf.join("spring-configuration-metadata.json"),
        properties(&["shared.enabled"]),
    )
    .unwrap();

    let registry = ScopeRegistry::new(Scheduler::inline(), MergePolicy::LastWins);
    let watcher = DependencyWatcher::new(registry.clone(), MetadataDiscovery::default(), Duration::ZERO);

    let shared = DependencyItem::Module(ModuleRef {
        name: "shared".into(),
        excluded_dirs: vec![dir.path().join("shared/target")],
    });
    let changes = vec![
        ModuleChange {
            scope: "app".into(),
            old: vec![DependencyItem::Other("jdk".into())],
            new: vec![DependencyItem::Other("jdk".into()), library(jar), shared],
        },
        ModuleChange {
            scope: "tools".into(),
            old: Vec::new(),
            new: vec![DependencyItem::Other("jdk".into())],
        },
    ];

    let report = watcher.process(changes).wait().unwrap();
    assert_eq!(report.modules, 2);
    assert_eq!(report.refreshed.len(), 1);

    let refresh = report.refreshed.into_iter().next().unwrap();
    assert_eq!(refresh.scope, ScopeId::from("app"));
    assert_eq!(refresh.files.len(), 2);
    assert_eq!(refresh.task.wait().unwrap().build.properties, 2);

    assert_eq!(registry.scopes(), vec![ScopeId::from("app")]);
    let app = registry.get(&"app".into()).unwrap();
    assert!(app.snapshot().find_str("shared.enabled").is_some());
}

#[test]
fn processing_stops_once_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let jar = write_starter_jar(&dir.path().join("web.jar"), &properties(&["server.port"]));

    let scheduler = Scheduler::new(SchedulerConfig {
        background_threads: 1,
        progress_channel_capacity: 16,
    });
    let registry = ScopeRegistry::new(scheduler.clone(), MergePolicy::LastWins);
    let watcher = DependencyWatcher::new(registry.clone(), MetadataDiscovery::default(), Duration::ZERO);

    let (release, blocked) = mpsc::channel::<()>();
    drop(scheduler.spawn_background(move |_| {
        let _ = blocked.recv();
        Ok(())
    }));

    let task = watcher.process(vec![ModuleChange {
        scope: "app".into(),
        old: Vec::new(),
        new: vec![library(jar)],
    }]);
    task.cancel();
    release.send(()).unwrap();

    assert!(matches!(task.wait(), Err(TaskError::Cancelled)));
    assert!(registry.scopes().is_empty());
}

#[test]
fn scheduled_changes_for_one_scope_are_coalesced() {
    let dir = tempfile::tempdir().unwrap();
    let web = write_starter_jar(&dir.path().join("web.jar"), &properties(&["server.port"]));
    let data = write_starter_jar(&dir.path().join("data.jar"), &properties(&["spring.datasource.url"]));

    let scheduler = Scheduler::new(SchedulerConfig {
        background_threads: 1,
        progress_channel_capacity: 16,
    });
    let registry = ScopeRegistry::new(scheduler, MergePolicy::LastWins);
    let watcher = DependencyWatcher::new(
        registry.clone(),
        MetadataDiscovery::default(),
        Duration::from_millis(30),
    );

    let scope = ScopeId::from("app");
    watcher.schedule(ModuleChange {
        scope: scope.clone(),
        old: Vec::new(),
        new: vec![library(web.clone())],
    });
    watcher.schedule(ModuleChange {
        scope: scope.clone(),
        old: vec![library(web.clone())],
        new: vec![library(web), library(data)],
    });

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let count = registry
            .get(&scope)
            .map(|service| service.snapshot().property_count())
            .unwrap_or(0);
        if count == 2 {
            break;
        }
        assert!(Instant::now() < deadline, "scope was not refreshed in time");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(registry.get(&scope).unwrap().known_files().len(), 2);
    assert!(!watcher.is_pending(&scope));
}

#[test]
fn index_settings_come_from_config() {
    let config = assist_config::AssistConfig::load_from_str(
        r#"
[metadata]
merge_policy = "first-wins"

[index]
background_threads = 3
debounce_ms = 25
"#,
    )
    .unwrap();

    let registry = ScopeRegistry::from_config(&config);
    assert_eq!(registry.policy(), MergePolicy::FirstWins);
    assert_eq!(registry.scheduler().background_threads(), 3);

    let watcher = DependencyWatcher::from_config(
        registry,
        MetadataDiscovery::from_config(&config.metadata),
        &config.index,
    );
    assert_eq!(watcher.debounce_delay(), Duration::from_millis(25));
}
