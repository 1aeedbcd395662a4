use compdup_core::db::open_db_in_memory;
use compdup_core::{
    import_snapshot, load_snapshot, DuplicateService, DuplicationConfig, ItemKind, NameIndex,
    ProjectRepository, ProjectService, ProjectServiceError, ProjectSnapshot, SnapshotError,
    SqliteProjectRepository,
};

const TEMPLATE_PROJECT: &str = r#"{
    "folders": [
        {"name": "Assets"},
        {"name": "Templates"},
        {"name": "Output", "parent": "Assets"}
    ],
    "items": [
        {"name": "Logo", "kind": "Composition", "folder": "Assets", "durationMs": 3000},
        {"name": "Track.wav", "kind": "Other", "folder": "Assets", "metadata": {"channels": 2}},
        {
            "name": "Intro",
            "kind": "Composition",
            "folder": "Templates",
            "layers": [
                {"name": "Logo", "source": "Logo", "startMs": 0, "inMs": 0, "outMs": 3000},
                {"name": "Guide", "isNull": true},
                {"name": "Track", "source": "Track.wav", "enabled": false}
            ]
        },
        {"name": "BackgroundMusic", "kind": "Other", "folder": "Templates"}
    ]
}"#;

#[test]
fn import_builds_folders_items_and_layers() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let service = ProjectService::new(repo);
    let snapshot: ProjectSnapshot = serde_json::from_str(TEMPLATE_PROJECT).unwrap();

    let summary = import_snapshot(&service, &snapshot).unwrap();
    assert_eq!((summary.folders, summary.items, summary.layers), (3, 4, 3));

    let repo = service.repo();
    let assets = repo.find_folder_by_name("Assets").unwrap().unwrap();
    let output = repo.find_folder_by_name("Output").unwrap().unwrap();
    assert_eq!(output.parent_uuid, Some(assets.folder_uuid));

    let logo = repo.find_item_by_name("Logo").unwrap().unwrap();
    assert_eq!(logo.duration_ms, Some(3_000));
    let track = repo.find_item_by_name("Track.wav").unwrap().unwrap();
    assert_eq!(track.kind, ItemKind::Other);
    assert_eq!(track.metadata, r#"{"channels":2}"#);

    let intro = repo.find_item_by_name("Intro").unwrap().unwrap();
    let layers = repo.list_layers(intro.item_uuid).unwrap();
    assert_eq!(layers.len(), 3);
    assert_eq!(layers[0].source_uuid, Some(logo.item_uuid));
    assert_eq!(layers[0].out_ms, 3_000);
    assert!(layers[1].is_null);
    assert!(!layers[2].enabled);
    assert_eq!(layers[2].source_uuid, Some(track.item_uuid));
}

#[test]
fn imported_project_duplicates_end_to_end() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(SqliteProjectRepository::try_new(&conn).unwrap());
    let snapshot: ProjectSnapshot = serde_json::from_str(TEMPLATE_PROJECT).unwrap();
    import_snapshot(&service, &snapshot).unwrap();

    let duplicator = DuplicateService::new(SqliteProjectRepository::try_new(&conn).unwrap());
    let mut config = DuplicationConfig::new("Templates", "Render1");
    config.parent_folder = "Output".to_string();
    let run = duplicator.run(&config).unwrap();

    let names: Vec<_> = run
        .manifest
        .entries
        .iter()
        .map(|entry| entry.new_name.as_str())
        .collect();
    assert_eq!(names, vec!["render1-intro", "BackgroundMusic"]);
    assert!(service.repo().find_item_by_name("render1-logo").unwrap().is_some());
    assert!(service.repo().find_item_by_name("render1-track-wav").unwrap().is_none());

    let render = service
        .repo()
        .find_folder_by_name("Render1")
        .unwrap()
        .unwrap();
    let output = service.repo().find_folder_by_name("Output").unwrap().unwrap();
    assert_eq!(render.parent_uuid, Some(output.folder_uuid));
}

#[test]
fn import_rejects_forward_and_unknown_references() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::new(SqliteProjectRepository::try_new(&conn).unwrap());

    let forward: ProjectSnapshot = serde_json::from_str(
        r#"{"items": [
            {"name": "Intro", "kind": "Composition", "layers": [{"name": "L", "source": "Later"}]},
            {"name": "Later", "kind": "Composition"}
        ]}"#,
    )
    .unwrap();
    let err = import_snapshot(&service, &forward).unwrap_err();
    assert!(matches!(
        err,
        SnapshotError::UnknownSource { ref source_name, .. } if source_name == "Later"
    ));

    let missing_folder: ProjectSnapshot = serde_json::from_str(
        r#"{"items": [{"name": "X", "kind": "Other", "folder": "Nowhere"}]}"#,
    )
    .unwrap();
    assert!(matches!(
        import_snapshot(&service, &missing_folder),
        Err(SnapshotError::UnknownFolder(name)) if name == "Nowhere"
    ));

    let flat_with_layers: ProjectSnapshot = serde_json::from_str(
        r#"{"items": [{"name": "Clip", "kind": "Other", "layers": [{"name": "L"}]}]}"#,
    )
    .unwrap();
    assert!(matches!(
        import_snapshot(&service, &flat_with_layers),
        Err(SnapshotError::LayersOnNonComposition(_))
    ));

    let blank: ProjectSnapshot =
        serde_json::from_str(r#"{"folders": [{"name": "  "}]}"#).unwrap();
    assert!(matches!(
        import_snapshot(&service, &blank),
        Err(SnapshotError::Service(ProjectServiceError::InvalidName))
    ));
}

#[test]
fn load_snapshot_reads_file_and_reports_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("project.json");
    std::fs::write(&good, TEMPLATE_PROJECT).unwrap();
    let snapshot = load_snapshot(&good).unwrap();
    assert_eq!(snapshot.items.len(), 4);

    let bad = dir.path().join("broken.json");
    std::fs::write(&bad, "{ not json").unwrap();
    assert!(matches!(
        load_snapshot(&bad),
        Err(SnapshotError::Json { .. })
    ));
    assert!(matches!(
        load_snapshot(dir.path().join("missing.json")),
        Err(SnapshotError::Io { .. })
    ));
}
