use compdup_core::db::open_db_in_memory;
use compdup_core::{
    FolderResolveError, FolderResolver, ItemKind, NewItem, ProjectRepository,
    SqliteProjectRepository,
};

#[test]
fn resolve_returns_existing_folder_untouched() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let existing = repo.create_folder("Render1").unwrap();
    repo.create_folder("Output").unwrap();

    let resolved = FolderResolver::new(&repo)
        .resolve("Render1", "Output")
        .unwrap();

    assert!(!resolved.created);
    assert_eq!(resolved.folder, existing);
    assert_eq!(resolved.folder.parent_uuid, None);
}

#[test]
fn resolve_creates_and_nests_under_parent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let output = repo.create_folder("Output").unwrap();

    let resolved = FolderResolver::new(&repo)
        .resolve(" Render1 ", "Output")
        .unwrap();

    assert!(resolved.created);
    assert_eq!(resolved.folder.name, "Render1");
    assert_eq!(resolved.folder.parent_uuid, Some(output.folder_uuid));

    let again = FolderResolver::new(&repo).resolve("Render1", "").unwrap();
    assert!(!again.created);
    assert_eq!(again.folder.folder_uuid, resolved.folder.folder_uuid);
    assert_eq!(repo.list_folders().unwrap().len(), 2);
}

#[test]
fn resolve_ignores_items_sharing_the_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    repo.create_item(&NewItem::new(ItemKind::Composition, "Render1"))
        .unwrap();

    let resolved = FolderResolver::new(&repo).resolve("Render1", "").unwrap();

    assert!(resolved.created);
    assert_eq!(resolved.folder.parent_uuid, None);
}

#[test]
fn resolve_rejects_blank_name_and_missing_parent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::try_new(&conn).unwrap();
    let resolver = FolderResolver::new(&repo);

    assert!(matches!(
        resolver.resolve("  ", ""),
        Err(FolderResolveError::InvalidFolderName)
    ));
    assert!(matches!(
        resolver.resolve("Render1", "Nowhere"),
        Err(FolderResolveError::ParentFolderNotFound(name)) if name == "Nowhere"
    ));
    assert!(repo.list_folders().unwrap().is_empty());
}
