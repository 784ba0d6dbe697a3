mod common;

use anyhow::Result;
use common::{sample_dataset, write_files};
use tablesync::io::cloud::*;
use tablesync::io::parquet::encode_parquet;
use tablesync::{
    Codec, Container, Direction, ItemState, ObjectStore, PipelineOptions, ProgressEvent,
    ProgressSink, RecordingProgress, RelationalStore, SyncError, SyncPipeline, TransferBatch, Value,
};

fn recording_pipeline() -> (SyncPipeline, RecordingProgress) {
    let progress = RecordingProgress::new();
    let pipeline = SyncPipeline::new(Codec::default(), PipelineOptions::default())
        .with_progress(progress.clone());
    (pipeline, progress)
}

fn seed_objects(fake: &FakeObjectIO, names: &[&str]) -> Result<()> {
    for name in names {
        let bytes = encode_parquet(&sample_dataset(name, 3)?)?;
        fake.put_object("bucket", &format!("files/{name}.parquet"), &bytes)?;
    }
    Ok(())
}

// ============================================================================
// Local folder -> object store
// ============================================================================

#[test]
fn upload_folder_converts_every_data_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_files(
        dir.path(),
        &[
            ("b_sales.csv", b"region,total\nNord,10\n"),
            ("a_people.CSV", b"name,age\nZo\xE9,31\n"),
            ("readme.txt", b"not data"),
        ],
    )?;
    std::fs::create_dir(dir.path().join("nested.csv"))?;

    let fake = FakeObjectIO::new();
    let store = ObjectStore::new(fake.clone());
    let (mut pipeline, _) = recording_pipeline();
    let report = pipeline.upload_folder(dir.path(), &store, "bucket")?;

    assert_eq!(report.direction, Direction::LocalToObjectStore);
    assert_eq!(report.total, 2);
    assert!(report.all_succeeded(), "{}", report.summary());
    let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["a_people", "b_sales"]);
    assert_eq!(
        fake.keys("bucket"),
        vec!["files/a_people.parquet", "files/b_sales.parquet"]
    );

    let people = Codec::default().decode(
        "a_people",
        fake.get_object("bucket", "files/a_people.parquet")?,
    )?;
    assert_eq!(people.value(0, "name"), Some(&Value::from("Zoé")));
    assert_eq!(people.value(0, "age"), Some(&Value::Int(31)));
    Ok(())
}

#[test]
fn upload_folder_isolates_bad_files_and_rejected_writes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_files(
        dir.path(),
        &[
            ("a.csv", b"x,y\n1,2\n"),
            ("b.csv", b"x,y\n1\n"),
            ("c.csv", b"x,y\n3,4\n"),
            ("d.csv", b"x,y\n5,6\n"),
        ],
    )?;

    let fake = FakeObjectIO::new();
    fake.reject_key("files/c.parquet", 500);
    let store = ObjectStore::new(fake.clone());
    let (mut pipeline, _) = recording_pipeline();
    let report = pipeline.upload_folder(dir.path(), &store, "bucket")?;

    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded_count, 2);
    assert_eq!(report.failed, vec!["b", "c"]);
    let bad_row = report.outcome("b").and_then(|o| o.detail.clone()).unwrap_or_default();
    assert!(bad_row.contains("line 2"), "{bad_row}");
    let rejected = report.outcome("c").and_then(|o| o.detail.clone()).unwrap_or_default();
    assert!(rejected.contains("not acknowledged"), "{rejected}");
    assert_eq!(fake.keys("bucket"), vec!["files/a.parquet", "files/d.parquet"]);
    Ok(())
}

#[test]
fn upload_folder_missing_folder_is_fatal() {
    let (mut pipeline, progress) = recording_pipeline();
    let store = ObjectStore::new(FakeObjectIO::new());
    let res = pipeline.upload_folder("/definitely/not/here".as_ref(), &store, "bucket");
    assert!(matches!(res, Err(SyncError::Io(_))));
    assert!(progress.events().is_empty());
}

#[test]
fn custom_prefix_and_extension() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_files(dir.path(), &[("a.tsv", b"x\ty\n1\t2\n"), ("b.csv", b"x\n1\n")])?;

    let options = PipelineOptions {
        key_prefix: "exports/2024".into(),
        source_extension: ".tsv".into(),
    };
    let codec = Codec::new(tablesync::CsvOptions {
        delimiter: b'\t',
        encoding: tablesync::TextEncoding::utf8(),
    });
    let fake = FakeObjectIO::new();
    let mut pipeline = SyncPipeline::new(codec, options);
    let report = pipeline.upload_folder(dir.path(), &ObjectStore::new(fake.clone()), "bucket")?;

    assert_eq!(report.total, 1);
    assert_eq!(fake.keys("bucket"), vec!["exports/2024/a.parquet"]);
    Ok(())
}

// ============================================================================
// Object store -> memory
// ============================================================================

#[test]
fn download_collects_every_parquet_object() -> Result<()> {
    let fake = FakeObjectIO::new().with_page_size(2);
    seed_objects(&fake, &["a", "b", "c"])?;
    fake.put_object("bucket", "files/notes.txt", b"skip me")?;
    fake.put_object("bucket", "elsewhere/z.parquet", b"skip me too")?;

    let store = ObjectStore::new(fake).with_page_size(2);
    let (mut pipeline, _) = recording_pipeline();
    let downloaded = pipeline.download_datasets(&store, "bucket", "files/")?;

    assert_eq!(downloaded.batch.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(downloaded.batch.get("b"), Some(&sample_dataset("b", 3)?));
    assert_eq!(downloaded.report.direction, Direction::ObjectStoreToMemory);
    assert_eq!(downloaded.message, "downloaded 3 of 3 datasets from bucket/files/");
    Ok(())
}

#[test]
fn download_records_undecodable_and_vanished_objects() -> Result<()> {
    let fake = FakeObjectIO::new();
    seed_objects(&fake, &["a", "c"])?;
    fake.put_object("bucket", "files/b.parquet", b"corrupt")?;

    // `c` vanishes between the listing and its fetch.
    let progress = RecordingProgress::new();
    let remover = fake.clone();
    let mut watch = progress.clone();
    let mut pipeline = SyncPipeline::default().with_progress(move |event: &ProgressEvent| {
        if let ProgressEvent::ItemState {
            name,
            state: ItemState::Pending,
            ..
        } = event
            && name == "c"
        {
            remover.remove("bucket", "files/c.parquet");
        }
        watch.emit(event);
    });

    let downloaded = pipeline.download_datasets(&ObjectStore::new(fake), "bucket", "files")?;
    assert_eq!(downloaded.batch.names().collect::<Vec<_>>(), vec!["a"]);
    assert_eq!(downloaded.report.failed, vec!["b", "c"]);
    let vanished = downloaded
        .report
        .outcome("c")
        .and_then(|o| o.detail.clone())
        .unwrap_or_default();
    assert!(vanished.contains("object not found"), "{vanished}");
    assert_eq!(downloaded.message, "downloaded 1 of 3 datasets from bucket/files");
    assert_eq!(
        progress.states_of("c"),
        vec![ItemState::Pending, ItemState::Converting, ItemState::Failed]
    );
    Ok(())
}

#[test]
fn download_duplicate_names_fail_individually() -> Result<()> {
    let fake = FakeObjectIO::new();
    let bytes = encode_parquet(&sample_dataset("x", 1)?)?;
    fake.put_object("bucket", "files/2023/sales.parquet", &bytes)?;
    fake.put_object("bucket", "files/2024/sales.parquet", &bytes)?;

    let (mut pipeline, _) = recording_pipeline();
    let downloaded = pipeline.download_datasets(&ObjectStore::new(fake), "bucket", "files/")?;
    assert_eq!(downloaded.batch.len(), 1);
    assert_eq!(downloaded.report.succeeded_count, 1);
    let dup = downloaded.report.outcomes[1].detail.clone().unwrap_or_default();
    assert!(dup.contains("duplicate"), "{dup}");
    Ok(())
}

#[test]
fn download_listing_outage_is_fatal() {
    let fake = FakeObjectIO::new();
    fake.set_unreachable(true);
    let (mut pipeline, progress) = recording_pipeline();
    let err = pipeline
        .download_datasets(&ObjectStore::new(fake), "bucket", "files/")
        .unwrap_err();
    assert!(err.is_connectivity(), "{err}");
    assert!(progress.events().is_empty());
}

#[test]
fn download_empty_prefix_is_empty_batch() -> Result<()> {
    let fake = FakeObjectIO::new();
    fake.create_bucket("bucket");
    let (mut pipeline, _) = recording_pipeline();
    let downloaded = pipeline.download_datasets(&ObjectStore::new(fake), "bucket", "files/")?;
    assert!(downloaded.batch.is_empty());
    assert_eq!(downloaded.report.total, 0);
    assert!(downloaded.report.all_succeeded());
    Ok(())
}

// ============================================================================
// Memory -> relational store
// ============================================================================

#[test]
fn upload_tables_writes_every_item_in_order() -> Result<()> {
    let fake = FakeDatabaseIO::new();
    let store = RelationalStore::new(fake.clone());
    let batch = TransferBatch::from_datasets([
        sample_dataset("orders", 4)?,
        sample_dataset("customers", 2)?,
    ])?;

    let (mut pipeline, progress) = recording_pipeline();
    let report = pipeline.upload_tables(&store, "analytics", &batch)?;

    assert_eq!(report.direction, Direction::MemoryToRelational);
    assert!(report.all_succeeded());
    assert_eq!(fake.tables("analytics"), vec!["customers", "orders"]);
    assert_eq!(store.read_table("analytics", "orders")?.num_rows(), 4);
    assert_eq!(
        progress.states_of("orders"),
        vec![
            ItemState::Pending,
            ItemState::Converting,
            ItemState::Transferring,
            ItemState::Succeeded
        ]
    );
    Ok(())
}

#[test]
fn one_failing_table_does_not_stop_the_rest() -> Result<()> {
    let fake = FakeDatabaseIO::new();
    fake.fail_table("t2");
    let store = RelationalStore::new(fake.clone());
    let batch = TransferBatch::zip(
        (0..4)
            .map(|i| sample_dataset(&format!("ds{i}"), 1))
            .collect::<Result<Vec<_>>>()?,
        (1..=4).map(|i| format!("t{i}")).collect(),
    )?;

    let (mut pipeline, progress) = recording_pipeline();
    let report = pipeline.upload_tables(&store, "analytics", &batch)?;

    assert_eq!(report.succeeded_count, 3);
    assert_eq!(report.failed, vec!["t2"]);
    assert_eq!(fake.tables("analytics"), vec!["t1", "t3", "t4"]);
    assert_eq!(
        progress.states_of("t2"),
        vec![
            ItemState::Pending,
            ItemState::Converting,
            ItemState::Transferring,
            ItemState::Failed
        ]
    );
    Ok(())
}

#[test]
fn invalid_table_name_fails_before_transfer() -> Result<()> {
    let store = RelationalStore::new(FakeDatabaseIO::new());
    let mut batch = TransferBatch::new();
    batch.push(sample_dataset("a", 1)?, "sales 2024")?;
    batch.push(sample_dataset("b", 1)?, "ok")?;

    let (mut pipeline, progress) = recording_pipeline();
    let report = pipeline.upload_tables(&store, "d", &batch)?;
    assert_eq!(report.failed, vec!["sales 2024"]);
    assert_eq!(
        progress.states_of("sales 2024"),
        vec![ItemState::Pending, ItemState::Converting, ItemState::Failed]
    );
    Ok(())
}

#[test]
fn unusable_database_is_fatal() -> Result<()> {
    let fake = FakeDatabaseIO::new();
    fake.set_unreachable(true);
    let store = RelationalStore::new(fake);
    let batch = TransferBatch::from_datasets([sample_dataset("a", 1)?])?;

    let (mut pipeline, progress) = recording_pipeline();
    let err = pipeline.upload_tables(&store, "analytics", &batch).unwrap_err();
    assert!(err.is_connectivity(), "{err}");
    assert!(progress.events().is_empty());
    Ok(())
}

#[test]
fn batch_events_bracket_item_events() -> Result<()> {
    let store = RelationalStore::new(FakeDatabaseIO::new());
    let batch = TransferBatch::from_datasets([sample_dataset("a", 1)?])?;
    let (mut pipeline, progress) = recording_pipeline();
    pipeline.upload_tables(&store, "d", &batch)?;

    let events = progress.events();
    assert!(matches!(
        events.first(),
        Some(ProgressEvent::BatchStarted {
            direction: Direction::MemoryToRelational,
            total: 1
        })
    ));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::BatchFinished {
            succeeded: 1,
            total: 1,
            ..
        })
    ));
    let finished = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::ItemFinished { .. }))
        .count();
    assert_eq!(finished, 1);
    Ok(())
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn bucket_to_database_on_fakes() -> Result<()> {
    let objects = ObjectStore::new({
        let fake = FakeObjectIO::new();
        seed_objects(&fake, &["orders", "customers"])?;
        fake
    });
    let fake_tables = FakeDatabaseIO::new();
    let tables = RelationalStore::new(fake_tables.clone());

    let (mut pipeline, _) = recording_pipeline();
    let first = pipeline.sync_bucket_to_database(&objects, "bucket", "files/", &tables, "analytics")?;
    assert_eq!(first.container, Container::Created);
    assert!(first.download.all_succeeded());
    assert!(first.upload.all_succeeded());
    assert_eq!(fake_tables.tables("analytics"), vec!["customers", "orders"]);

    // A second run reuses the database and replaces the tables.
    let second = pipeline.sync_bucket_to_database(&objects, "bucket", "files/", &tables, "analytics")?;
    assert_eq!(second.container, Container::Existing);
    assert_eq!(fake_tables.create_calls(), 1);
    assert_eq!(tables.read_table("analytics", "orders")?.num_rows(), 3);
    Ok(())
}

#[test]
fn bucket_to_database_missing_bucket_is_fatal() {
    let tables = FakeDatabaseIO::new();
    let (mut pipeline, _) = recording_pipeline();
    let res = pipeline.sync_bucket_to_database(
        &ObjectStore::new(FakeObjectIO::new()),
        "ghost",
        "files/",
        &RelationalStore::new(tables.clone()),
        "analytics",
    );
    assert!(matches!(res, Err(SyncError::Store { .. })));
    assert_eq!(tables.database_count("analytics"), 0);
}

#[cfg(feature = "io-sqlite")]
#[test]
fn folder_to_bucket_to_sqlite() -> Result<()> {
    let source = tempfile::tempdir()?;
    let buckets = tempfile::tempdir()?;
    let databases = tempfile::tempdir()?;
    write_files(
        source.path(),
        &[
            ("cities.csv", b"city,pop\nOrl\xE9ans,116000\nLyon,\n"),
            ("prices.csv", b"item,price\npain,1.2\ncaf\xE9,2\n"),
        ],
    )?;

    let objects = ObjectStore::new(LocalObjectIO::new(buckets.path()));
    let tables = RelationalStore::new(SqliteDatabaseIO::open(databases.path())?);
    let (mut pipeline, _) = recording_pipeline();

    let uploaded = pipeline.upload_folder(source.path(), &objects, "datasets")?;
    assert!(uploaded.all_succeeded(), "{}", uploaded.summary());

    for _ in 0..2 {
        let synced =
            pipeline.sync_bucket_to_database(&objects, "datasets", "files/", &tables, "analytics")?;
        assert!(synced.upload.all_succeeded(), "{}", synced.upload.summary());
    }

    let cities = tables.read_table("analytics", "cities")?;
    assert_eq!(cities.num_rows(), 2);
    assert_eq!(cities.value(0, "city"), Some(&Value::from("Orléans")));
    assert_eq!(cities.value(1, "pop"), Some(&Value::Null));

    let prices = tables.read_table("analytics", "prices")?;
    assert_eq!(prices.value(1, "price"), Some(&Value::Float(2.0)));
    assert_eq!(prices.value(1, "item"), Some(&Value::from("café")));
    Ok(())
}
