//! Tests for applying parsed proposals to the narrative store.

mod test_utils;

use scriptorium_core::{
    ExtractedEntities, ForeshadowingStatus, ForeshadowingUpdate, NewCharacter, NewWorldEntry,
};
use scriptorium_interface::NarrativeStore;
use scriptorium_pipeline::{EntityExtractor, ForeshadowingUpdater, parse_new_entities};
use test_utils::sample_store;

fn update(title: &str, status: ForeshadowingStatus) -> ForeshadowingUpdate {
    ForeshadowingUpdate {
        title: title.into(),
        status,
        chapter: None,
        note: None,
    }
}

fn character(name: &str) -> NewCharacter {
    NewCharacter {
        name: name.into(),
        role: None,
        description: String::new(),
    }
}

#[tokio::test]
async fn test_status_only_moves_forward() {
    let store = sample_store().await;
    let updater = ForeshadowingUpdater::new(store.clone());

    let report = updater
        .apply(
            "salt-road",
            &[
                update("The lame camel", ForeshadowingStatus::Hinted),
                update("The sealed letter", ForeshadowingStatus::Hinted),
            ],
            Some(2),
        )
        .await
        .unwrap();

    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.errors.is_empty());

    let items = store.list_foreshadowing("salt-road").await.unwrap();
    let camel = items.iter().find(|f| f.id == "f2").unwrap();
    assert_eq!(camel.status, ForeshadowingStatus::Resolved);
    let letter = items.iter().find(|f| f.id == "f1").unwrap();
    assert_eq!(letter.status, ForeshadowingStatus::Hinted);
    assert_eq!(letter.resolved_chapter, None);
}

#[tokio::test]
async fn test_later_proposals_see_earlier_ones() {
    let store = sample_store().await;
    let updater = ForeshadowingUpdater::new(store.clone());

    let report = updater
        .apply(
            "salt-road",
            &[
                ForeshadowingUpdate {
                    chapter: Some(4),
                    note: Some("Burned unread".into()),
                    ..update("The sealed letter", ForeshadowingStatus::Resolved)
                },
                update("The sealed letter", ForeshadowingStatus::Hinted),
            ],
            Some(2),
        )
        .await
        .unwrap();

    assert_eq!((report.applied, report.skipped), (1, 1));
    let items = store.list_foreshadowing("salt-road").await.unwrap();
    let letter = items.iter().find(|f| f.id == "f1").unwrap();
    assert_eq!(letter.status, ForeshadowingStatus::Resolved);
    assert_eq!(letter.resolved_chapter, Some(4));
    assert_eq!(letter.resolution_note.as_deref(), Some("Burned unread"));
}

#[tokio::test]
async fn test_unknown_title_is_reported_not_raised() {
    let store = sample_store().await;
    let updater = ForeshadowingUpdater::new(store);

    let report = updater
        .apply(
            "salt-road",
            &[update("The sealed Letter", ForeshadowingStatus::Resolved)],
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.applied, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("The sealed Letter"));
}

#[tokio::test]
async fn test_unknown_project_fails() {
    let store = sample_store().await;
    let updater = ForeshadowingUpdater::new(store);

    assert!(
        updater
            .apply("missing", &[update("x", ForeshadowingStatus::Hinted)], None)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_entities_are_inserted_once() {
    let store = sample_store().await;
    let extractor = EntityExtractor::new(store.clone());
    let entities = ExtractedEntities {
        characters: vec![character("Mira"), character("Tarek"), character("Tarek"), character("  ")],
        world_entries: vec![
            NewWorldEntry {
                category: "location".into(),
                title: "Qasr".into(),
                content: "Duplicate.".into(),
            },
            NewWorldEntry {
                category: "faction".into(),
                title: "Qasr".into(),
                content: "The fort's garrison.".into(),
            },
        ],
    };

    let first = extractor.apply("salt-road", &entities).await.unwrap();
    assert_eq!(first.applied, 2);
    assert_eq!(first.skipped, 3);
    assert_eq!(first.errors.len(), 1);

    let second = extractor.apply("salt-road", &entities).await.unwrap();
    assert_eq!(second.applied, 0);

    let names: Vec<_> = store
        .list_characters("salt-road")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Mira", "Tarek"]);
    assert_eq!(store.list_world_entries("salt-road").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_parsed_proposals_apply_end_to_end() {
    let store = sample_store().await;
    let extractor = EntityExtractor::new(store.clone());
    let raw = r#"Notes follow.
```json
{"characters": ["Old Salim", {"name": "Nadia", "role": "trader"}]}
```"#;

    let entities = parse_new_entities(raw).into_inner();
    let report = extractor.apply("salt-road", &entities).await.unwrap();

    assert_eq!(report.applied, 2);
    let characters = store.list_characters("salt-road").await.unwrap();
    let nadia = characters.iter().find(|c| c.name == "Nadia").unwrap();
    assert_eq!(nadia.role.as_deref(), Some("trader"));
}
