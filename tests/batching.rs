#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use kennel_import_lib::transform::BatchProgress;
use kennel_import_lib::{
    transform_in_batches, CancelFlag, ColumnMappings, ColumnTarget, EntityCatalog, ImportSession,
    ParsedDataset, RawRow, RowTransformer, SelectedTypes,
};

fn owner_rows(count: usize) -> Vec<RawRow> {
    (0..count)
        .map(|index| {
            [
                ("First".to_string(), format!("Owner{index}")),
                ("Last".to_string(), "Doe".to_string()),
            ]
            .into_iter()
            .collect()
        })
        .collect()
}

fn owner_transformer(catalog: &EntityCatalog) -> RowTransformer {
    let selected = SelectedTypes::new(catalog, ["owners"]).unwrap();
    let mappings: ColumnMappings = [
        ("First", ColumnTarget::property("owners", "firstName")),
        ("Last", ColumnTarget::property("owners", "lastName")),
    ]
    .into_iter()
    .collect();
    RowTransformer::new(catalog, &mappings, &selected).unwrap()
}

#[test]
fn batched_output_matches_row_by_row_output() {
    let catalog = EntityCatalog::builtin();
    let transformer = owner_transformer(&catalog);
    let rows = owner_rows(1_003);

    let mut progress = Vec::new();
    let outcome = transform_in_batches(&transformer, &rows, 250, &CancelFlag::new(), |step| {
        progress.push(*step)
    });

    let expected: Vec<_> = rows.iter().map(|row| transformer.transform(row)).collect();
    assert_eq!(outcome.rows, expected);
    assert_eq!(outcome.remaining, 0);
    assert!(!outcome.cancelled);
    assert_eq!(
        progress.iter().map(|step| step.processed).collect::<Vec<_>>(),
        vec![250, 500, 750, 1_000, 1_003]
    );
    assert!(progress.iter().all(|step| step.total == 1_003));
}

#[test]
fn cancel_from_another_thread_stops_at_a_batch_boundary() {
    let catalog = EntityCatalog::builtin();
    let transformer = owner_transformer(&catalog);
    let rows = owner_rows(100);
    let cancel = CancelFlag::new();
    let remote = cancel.clone();
    let seen: Mutex<Vec<BatchProgress>> = Mutex::new(Vec::new());

    let outcome = std::thread::scope(|scope| {
        let worker = scope.spawn(|| {
            transform_in_batches(&transformer, &rows, 10, &cancel, |step| {
                seen.lock().unwrap().push(*step);
                if step.batch == 2 {
                    remote.cancel();
                }
            })
        });
        worker.join().unwrap()
    });

    assert!(outcome.cancelled);
    assert_eq!(outcome.rows.len(), 30);
    assert_eq!(outcome.remaining, 70);
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[test]
fn session_resets_the_cancel_flag_after_a_run() {
    let catalog = EntityCatalog::builtin();
    let dataset = ParsedDataset::new(
        vec!["First Name".into(), "Last Name".into()],
        (0..20)
            .map(|index| {
                [
                    ("First Name".to_string(), format!("F{index}")),
                    ("Last Name".to_string(), format!("L{index}")),
                ]
                .into_iter()
                .collect()
            })
            .collect(),
    )
    .unwrap();

    let mut session = ImportSession::new(&catalog);
    session.toggle_type("owners").unwrap();
    session.load_dataset(dataset).unwrap();
    session.set_batch_size(5);

    let flag = session.cancel_flag();
    let cancelled = session
        .transform(|step| {
            if step.batch == 0 {
                flag.cancel();
            }
        })
        .unwrap();
    assert!(cancelled.cancelled);
    assert_eq!(cancelled.rows.len(), 5);
    assert_eq!(cancelled.remaining, 15);

    let full = session.transform(|_| {}).unwrap();
    assert!(!full.cancelled);
    assert_eq!(full.rows.len(), 20);
}
