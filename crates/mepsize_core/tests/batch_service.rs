use mepsize_core::{
    AttributeSpec, AttributeValue, BatchService, CollectionKey, CoreConfig, DocumentSnapshot,
    EntityId, FieldOutcome, InMemoryDocument, StorageKind, TypeKey,
};

const FITTING_TYPE: TypeKey = TypeKey(70);
const HEATING: CollectionKey = CollectionKey(3);

fn batch_config() -> CoreConfig {
    CoreConfig::from_json_str(
        r#"{
            "batch": {
                "source_attribute": "Size",
                "target_attribute": "Nominal Size",
                "categories": ["Ducts", "pipes"],
                "quantity": {
                    "source_attribute": "Length",
                    "target_attribute": "Length m",
                    "scale": 0.001
                }
            }
        }"#,
    )
    .expect("batch config should decode")
}

fn project_document() -> InMemoryDocument {
    let mut doc = InMemoryDocument::new();
    doc.add_type(FITTING_TYPE);
    doc.add_type_attribute(FITTING_TYPE, AttributeSpec::empty("Nominal Size", StorageKind::Text))
        .expect("type attribute should be added");
    doc.add_collection_attribute(HEATING, AttributeSpec::text("Size", "12.7mm"));

    doc.add_entity(EntityId(1), Some("Ducts"), None);
    doc.add_instance_attribute(EntityId(1), AttributeSpec::text("Size", "200x198x100"))
        .expect("attribute should be added");
    doc.add_instance_attribute(EntityId(1), AttributeSpec::empty("Nominal Size", StorageKind::Text))
        .expect("attribute should be added");
    doc.add_instance_attribute(EntityId(1), AttributeSpec::number("Length", 2500.0))
        .expect("attribute should be added");
    doc.add_instance_attribute(EntityId(1), AttributeSpec::empty("Length m", StorageKind::Number))
        .expect("attribute should be added");

    doc.add_entity(EntityId(2), Some("Pipes"), None);
    doc.add_instance_attribute(EntityId(2), AttributeSpec::text("Size", "19.05"))
        .expect("attribute should be added");
    doc.add_instance_attribute(EntityId(2), AttributeSpec::text("Nominal Size", "3/4\""))
        .expect("attribute should be added");

    doc.add_entity(EntityId(3), Some("Pipes"), None);

    doc.add_entity(EntityId(4), Some("Pipes"), None);
    doc.add_instance_attribute(EntityId(4), AttributeSpec::text("Size", "   "))
        .expect("attribute should be added");

    doc.add_entity(EntityId(5), Some("Ducts"), None);
    doc.add_instance_attribute(EntityId(5), AttributeSpec::text("Size", "300x200"))
        .expect("attribute should be added");

    doc.add_entity(EntityId(6), Some("Electrical Fixtures"), None);
    doc.add_instance_attribute(EntityId(6), AttributeSpec::text("Size", "200x100"))
        .expect("attribute should be added");

    doc.add_entity(EntityId(7), Some("Pipes"), Some(FITTING_TYPE));
    doc.set_entity_collection(EntityId(7), HEATING)
        .expect("entity should exist");
    doc
}

#[test]
fn batch_reports_each_outcome() {
    let mut doc = project_document();
    let mut service = BatchService::new(&batch_config());
    let ids = doc.entity_ids();

    let report = service.run(&mut doc, &ids);

    assert_eq!(report.processed, 6);
    assert_eq!(report.skipped_category, 1);
    assert_eq!(report.size.updated, 2);
    assert_eq!(report.size.unchanged, 1);
    assert_eq!(report.size.missing_source, 1);
    assert_eq!(report.size.empty_source, 1);
    assert_eq!(report.size.missing_target, 1);
    assert_eq!(report.size.failed, 0);
    assert_eq!(report.quantity.updated, 1);
    assert_eq!(report.quantity.missing_source, 5);

    let by_id = |id: u64| {
        report
            .entities
            .iter()
            .find(|entry| entry.entity == EntityId(id))
            .expect("entity should be reported")
    };
    assert_eq!(by_id(1).size, Some(FieldOutcome::Updated));
    assert_eq!(by_id(1).formatted_size.as_deref(), Some("DN200x100"));
    assert_eq!(by_id(2).size, Some(FieldOutcome::Unchanged));
    assert_eq!(by_id(3).size, Some(FieldOutcome::MissingSource));
    assert_eq!(by_id(4).size, Some(FieldOutcome::EmptySource));
    assert_eq!(by_id(5).size, Some(FieldOutcome::MissingTarget));
    assert_eq!(by_id(5).formatted_size.as_deref(), Some("DN300x200"));
    assert!(by_id(6).skipped);
    assert_eq!(by_id(6).size, None);
    assert_eq!(by_id(6).quantity, None);
    assert_eq!(by_id(7).formatted_size.as_deref(), Some("1/2\""));
}

#[test]
fn batch_writes_canonical_values() {
    let mut doc = project_document();
    let mut service = BatchService::new(&batch_config());
    let ids = doc.entity_ids();
    service.run(&mut doc, &ids);

    let mut resolver = mepsize_core::AttributeResolver::new();
    let size = resolver
        .resolve_instance_or_type(&doc, EntityId(1), "Nominal Size")
        .expect("target should resolve");
    assert_eq!(
        doc.value(&size),
        Some(&AttributeValue::Text("DN200x100".to_string()))
    );
    let length = resolver
        .resolve_instance_or_type(&doc, EntityId(1), "Length m")
        .expect("quantity target should resolve");
    assert_eq!(doc.value(&length), Some(&AttributeValue::Number(2.5)));
    let fitting = resolver
        .resolve_instance_or_type(&doc, EntityId(7), "Nominal Size")
        .expect("type target should resolve");
    assert!(fitting.is_type_level());
    assert_eq!(
        doc.value(&fitting),
        Some(&AttributeValue::Text("1/2\"".to_string()))
    );
}

#[test]
fn second_run_changes_nothing() {
    let mut doc = project_document();
    let mut service = BatchService::new(&batch_config());
    let ids = doc.entity_ids();

    service.run(&mut doc, &ids);
    let writes = doc.writes();
    let again = service.run(&mut doc, &ids);

    assert_eq!(again.size.updated, 0);
    assert_eq!(again.size.unchanged, 3);
    assert_eq!(again.quantity.updated, 0);
    assert_eq!(again.quantity.unchanged, 1);
    assert_eq!(doc.writes(), writes);
    assert_eq!(doc.type_enumerations(), 1);
}

#[test]
fn empty_category_filter_accepts_everything() {
    let mut doc = project_document();
    let mut service = BatchService::new(&CoreConfig::default());
    let ids = doc.entity_ids();

    let report = service.run(&mut doc, &ids);

    assert_eq!(report.skipped_category, 0);
    assert_eq!(report.processed, 7);
    assert_eq!(report.quantity.updated, 0);
    assert!(report.entities.iter().all(|entry| entry.quantity.is_none()));
}

#[test]
fn snapshot_documents_run_end_to_end() {
    let snapshot: DocumentSnapshot = serde_json::from_value(serde_json::json!({
        "types": [{"key": 1, "attributes": [
            {"name": "Nominal Size", "kind": "text"}
        ]}],
        "entities": [
            {"id": 10, "category": "Ducts", "owning_type": 1, "attributes": [
                {"name": "Size", "kind": "text", "value": "100x200"}
            ]},
            {"id": 11, "category": "Pipes", "attributes": [
                {"name": "Size", "kind": "text", "value": "NW 50"},
                {"name": "Nominal Size", "kind": "text", "value": "x"}
            ]}
        ]
    }))
    .expect("snapshot json should decode");
    let mut doc = InMemoryDocument::from_snapshot(snapshot).expect("snapshot should load");
    let mut service = BatchService::new(&CoreConfig::default());
    let ids = doc.entity_ids();

    let report = service.run(&mut doc, &ids);
    assert_eq!(report.size.updated, 2);

    let exported = serde_json::to_value(doc.snapshot()).expect("snapshot should encode");
    assert_eq!(
        exported["types"][0]["attributes"][0]["value"],
        serde_json::json!("DN200x100")
    );
    assert_eq!(
        exported["entities"][1]["attributes"][1]["value"],
        serde_json::json!("DN50")
    );

    let report_json = serde_json::to_value(&report).expect("report should encode");
    assert_eq!(report_json["size"]["updated"], serde_json::json!(2));
    assert_eq!(report_json["entities"][0]["size"], serde_json::json!("updated"));
}
