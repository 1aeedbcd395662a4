use compdup_core::db::open_db_in_memory;
use compdup_core::{
    ItemKind, NameIndex, NewItem, NewLayer, ProjectRepoError, ProjectRepository,
    ProjectService, ProjectServiceError, SourceTiming, SqliteProjectRepository,
};

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn duplicate_item_copies_row_and_layers_without_touching_source() {
    let conn = setup();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let folder = repo.create_folder("Templates").unwrap();
    let logo = repo
        .create_item(&NewItem::new(ItemKind::Composition, "Logo").in_folder(Some(folder.folder_uuid)))
        .unwrap();
    let intro = repo
        .create_item(
            &NewItem::new(ItemKind::Composition, "Intro")
                .in_folder(Some(folder.folder_uuid))
                .with_duration(5_000)
                .with_metadata(r#"{"fps":25}"#),
        )
        .unwrap();
    let original_layer = repo
        .add_layer(
            intro.item_uuid,
            &NewLayer::sourced("Logo", logo.item_uuid).timed(100, 200, 900),
        )
        .unwrap();

    let copy = repo.duplicate_item(intro.item_uuid).unwrap();

    assert_ne!(copy.item_uuid, intro.item_uuid);
    assert_eq!(copy.name, "Intro");
    assert_eq!(copy.kind, ItemKind::Composition);
    assert_eq!(copy.parent_uuid, None);
    assert_eq!(copy.duration_ms, Some(5_000));
    assert_eq!(copy.metadata, r#"{"fps":25}"#);

    let copied_layers = repo.list_layers(copy.item_uuid).unwrap();
    assert_eq!(copied_layers.len(), 1);
    assert_ne!(copied_layers[0].layer_uuid, original_layer.layer_uuid);
    assert_eq!(copied_layers[0].source_uuid, Some(logo.item_uuid));
    assert_eq!(
        (copied_layers[0].start_ms, copied_layers[0].in_ms, copied_layers[0].out_ms),
        (100, 200, 900)
    );

    let source_after = repo.get_item(intro.item_uuid).unwrap().unwrap();
    assert_eq!(source_after, intro);
    assert_eq!(repo.list_layers(intro.item_uuid).unwrap(), vec![original_layer]);
}

#[test]
fn name_index_reflects_writes_and_prefers_earliest_row() {
    let conn = setup();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let render = repo.create_folder("Render1").unwrap();

    assert!(repo.find_item_by_name("render1-intro").unwrap().is_none());

    let first = repo
        .create_item(&NewItem::new(ItemKind::Composition, "Intro"))
        .unwrap();
    repo.rename_item(first.item_uuid, "render1-intro").unwrap();
    assert_eq!(
        repo.find_item_id_by_name("render1-intro").unwrap(),
        Some(first.item_uuid)
    );

    let second = repo
        .create_item(&NewItem::new(ItemKind::Composition, "render1-intro"))
        .unwrap();
    repo.set_item_parent(second.item_uuid, Some(render.folder_uuid))
        .unwrap();

    assert_eq!(
        repo.find_item_id_by_name("render1-intro").unwrap(),
        Some(first.item_uuid)
    );
    let scoped = repo
        .find_item_by_name_in(Some(render.folder_uuid), "render1-intro")
        .unwrap()
        .unwrap();
    assert_eq!(scoped.item_uuid, second.item_uuid);
    let at_root = repo
        .find_item_by_name_in(None, "render1-intro")
        .unwrap()
        .unwrap();
    assert_eq!(at_root.item_uuid, first.item_uuid);
}

#[test]
fn folder_scan_merges_same_named_folders_and_root() {
    let conn = setup();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let first = repo.create_folder("Templates").unwrap();
    let second = repo.create_folder("Templates").unwrap();
    let nested = repo.create_folder("Nested").unwrap();
    repo.set_folder_parent(nested.folder_uuid, Some(first.folder_uuid))
        .unwrap();

    let a = repo
        .create_item(&NewItem::new(ItemKind::Other, "A").in_folder(Some(first.folder_uuid)))
        .unwrap();
    let b = repo
        .create_item(&NewItem::new(ItemKind::Other, "B").in_folder(Some(second.folder_uuid)))
        .unwrap();
    repo.create_item(&NewItem::new(ItemKind::Other, "Deep").in_folder(Some(nested.folder_uuid)))
        .unwrap();
    let loose = repo.create_item(&NewItem::new(ItemKind::Other, "Loose")).unwrap();

    let scanned: Vec<_> = repo
        .list_items_in_folder_named("Templates")
        .unwrap()
        .into_iter()
        .map(|item| item.item_uuid)
        .collect();
    assert_eq!(scanned, vec![a.item_uuid, b.item_uuid]);

    let root: Vec<_> = repo
        .list_items_in_folder_named("Root")
        .unwrap()
        .into_iter()
        .map(|item| item.item_uuid)
        .collect();
    assert_eq!(root, vec![loose.item_uuid]);

    assert!(repo.list_items_in_folder_named("Missing").unwrap().is_empty());
}

#[test]
fn replace_layer_source_preserves_or_fits_timing() {
    let conn = setup();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let short = repo
        .create_item(&NewItem::new(ItemKind::Composition, "Short").with_duration(1_000))
        .unwrap();
    let long = repo
        .create_item(&NewItem::new(ItemKind::Composition, "Long").with_duration(8_000))
        .unwrap();
    let owner = repo
        .create_item(&NewItem::new(ItemKind::Composition, "Owner"))
        .unwrap();
    let layer = repo
        .add_layer(
            owner.item_uuid,
            &NewLayer::sourced("Clip", short.item_uuid).timed(0, 500, 1_500),
        )
        .unwrap();

    repo.replace_layer_source(layer.layer_uuid, long.item_uuid, SourceTiming::Preserve)
        .unwrap();
    let preserved = repo.get_layer(layer.layer_uuid).unwrap().unwrap();
    assert_eq!(preserved.source_uuid, Some(long.item_uuid));
    assert_eq!((preserved.in_ms, preserved.out_ms), (500, 1_500));

    repo.replace_layer_source(layer.layer_uuid, long.item_uuid, SourceTiming::FitToSource)
        .unwrap();
    let fitted = repo.get_layer(layer.layer_uuid).unwrap().unwrap();
    assert_eq!(fitted.out_ms, 8_500);
}

#[test]
fn replace_layer_source_rejects_null_layer() {
    let conn = setup();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let owner = repo
        .create_item(&NewItem::new(ItemKind::Composition, "Owner"))
        .unwrap();
    let other = repo
        .create_item(&NewItem::new(ItemKind::Composition, "Other"))
        .unwrap();
    let null = repo.add_layer(owner.item_uuid, &NewLayer::null("Ctrl")).unwrap();

    let err = repo
        .replace_layer_source(null.layer_uuid, other.item_uuid, SourceTiming::Preserve)
        .unwrap_err();
    assert!(matches!(err, ProjectRepoError::NullLayer(id) if id == null.layer_uuid));
}

#[test]
fn add_layer_requires_composition_owner() {
    let conn = setup();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let footage = repo
        .create_item(&NewItem::new(ItemKind::Other, "Clip.mov"))
        .unwrap();

    let err = repo
        .add_layer(footage.item_uuid, &NewLayer::null("Ctrl"))
        .unwrap_err();
    assert!(matches!(err, ProjectRepoError::NotComposition(id) if id == footage.item_uuid));
}

#[test]
fn service_validates_names_sources_and_cycles() {
    let conn = setup();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let service = ProjectService::new(repo);

    assert!(matches!(
        service.create_folder(None, "   "),
        Err(ProjectServiceError::InvalidName)
    ));

    let a = service.create_composition(None, " A ", None).unwrap();
    assert_eq!(a.name, "A");
    let b = service.create_composition(None, "B", None).unwrap();
    service
        .add_layer(a.item_uuid, NewLayer::sourced("B", b.item_uuid))
        .unwrap();

    let err = service
        .add_layer(b.item_uuid, NewLayer::sourced("A", a.item_uuid))
        .unwrap_err();
    assert!(matches!(err, ProjectServiceError::SourceCycle { .. }));

    let err = service
        .add_layer(a.item_uuid, NewLayer::sourced("Self", a.item_uuid))
        .unwrap_err();
    assert!(matches!(err, ProjectServiceError::SourceCycle { .. }));

    let mut null_with_source = NewLayer::null("Ctrl");
    null_with_source.source_uuid = Some(b.item_uuid);
    let err = service.add_layer(a.item_uuid, null_with_source).unwrap_err();
    assert!(matches!(err, ProjectServiceError::NullLayerWithSource));
}

#[test]
fn service_nests_folders_under_existing_parents_only() {
    let conn = setup();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let service = ProjectService::new(repo);

    let outer = service.create_folder(None, "Outer").unwrap();
    let inner = service
        .create_folder(Some(outer.folder_uuid), " Inner ")
        .unwrap();
    assert_eq!(inner.parent_uuid, Some(outer.folder_uuid));
    assert_eq!(inner.name, "Inner");

    let missing = uuid::Uuid::new_v4();
    let err = service.create_folder(Some(missing), "Orphan").unwrap_err();
    assert!(matches!(err, ProjectServiceError::FolderNotFound(id) if id == missing));
    assert!(service.repo().find_folder_by_name("Orphan").unwrap().is_none());
}

#[test]
fn search_folder_items_reports_summaries() {
    let conn = setup();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let service = ProjectService::new(repo);
    let templates = service.create_folder(None, "Templates").unwrap();
    let intro = service
        .create_composition(Some(templates.folder_uuid), "Intro", Some(5_000))
        .unwrap();
    service
        .create_item(NewItem::new(ItemKind::Other, "Music.wav"))
        .unwrap();

    let found = service.search_folder_items("Templates").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, intro.item_uuid);
    assert_eq!(found[0].parent_folder, "Templates");
    assert_eq!(found[0].parent_id, Some(templates.folder_uuid));

    let json = serde_json::to_value(&found[0]).unwrap();
    assert_eq!(json["type"], "Composition");
    assert_eq!(json["parentFolder"], "Templates");

    let map = service.project_map().unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[1].parent_folder, "Root");
}
