use srctl::{Reference, SchemaRegistryAPI, UnregisteredSchema, Version};

mod utils;

const BOOK_KEY_SUBJECT: &str = "test.avro.book-key";
const BOOK_VALUE_SUBJECT: &str = "test.avro.book-value";
const AUTHOR_VALUE_SUBJECT: &str = "test.avro.author-value";

const BOOK_KEY_SCHEMA: &str = r#"{"type":"string"}"#;
const AUTHOR_VALUE_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Author",
    "namespace": "test.avro",
    "fields": [
        {"name": "name", "type": "string"}
    ]
}"#;
const BOOK_VALUE_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Book",
    "namespace": "test.avro",
    "fields": [
        {"name": "title", "type": "string"},
        {"name": "author", "type": "test.avro.Author"}
    ]
}"#;

#[tokio::test]
#[serial_test::serial]
async fn can_register_schema() {
    let env = utils::TestEnvironment::start().await;
    let client = env.create_schema_registry_client().await;

    let schema = UnregisteredSchema::schema(BOOK_KEY_SCHEMA);
    let id = client
        .register_schema(BOOK_KEY_SUBJECT, &schema)
        .await
        .expect("to register schema successfully");

    let fetched = client.get_schema_by_id(id).await;
    assert!(fetched.is_ok());
}

#[tokio::test]
#[serial_test::serial]
async fn can_register_schema_with_references() {
    let env = utils::TestEnvironment::start().await;
    let client = env.create_schema_registry_client().await;

    let author_schema = UnregisteredSchema::schema(AUTHOR_VALUE_SCHEMA);
    client
        .register_schema(AUTHOR_VALUE_SUBJECT, &author_schema)
        .await
        .expect("to register author schema successfully");

    let book_schema = UnregisteredSchema::schema(BOOK_VALUE_SCHEMA)
        .references([Reference::new("test.avro.Author", AUTHOR_VALUE_SUBJECT)]);

    let id = client
        .register_schema(BOOK_VALUE_SUBJECT, &book_schema)
        .await
        .expect("to register book schema successfully");

    let fetched = client.get_schema_by_id(id).await;
    assert!(fetched.is_ok());
}

#[tokio::test]
#[serial_test::serial]
async fn can_list_subjects() {
    let env = utils::TestEnvironment::start().await;
    let client = env.create_schema_registry_client().await;

    let schema = UnregisteredSchema::schema(BOOK_KEY_SCHEMA);
    client
        .register_schema(BOOK_KEY_SUBJECT, &schema)
        .await
        .expect("to register schema successfully");

    let author_schema = UnregisteredSchema::schema(AUTHOR_VALUE_SCHEMA);
    client
        .register_schema(AUTHOR_VALUE_SUBJECT, &author_schema)
        .await
        .expect("to register schema successfully");

    let subjects = client
        .get_subjects(false)
        .await
        .expect("to fetch subjects successfully");

    assert!(subjects.contains(&BOOK_KEY_SUBJECT.to_string()));
    assert!(subjects.contains(&AUTHOR_VALUE_SUBJECT.to_string()));
}

#[tokio::test]
#[serial_test::serial]
async fn can_fetch_schema_by_subject_version() {
    let env = utils::TestEnvironment::start().await;
    let client = env.create_schema_registry_client().await;

    let schema = UnregisteredSchema::schema(BOOK_KEY_SCHEMA);
    client
        .register_schema(BOOK_KEY_SUBJECT, &schema)
        .await
        .expect("to register schema successfully");

    let version_by_number = client
        .get_subject_version(BOOK_KEY_SUBJECT, Version::Number(1))
        .await
        .expect("to fetch schema successfully");
    let version_latest = client
        .get_subject_version(BOOK_KEY_SUBJECT, Version::Latest)
        .await
        .expect("to fetch schema successfully");

    assert_eq!(version_by_number, version_latest);
}

#[tokio::test]
#[serial_test::serial]
async fn can_fetch_subject_versions() {
    let env = utils::TestEnvironment::start().await;
    let client = env.create_schema_registry_client().await;

    let schema = UnregisteredSchema::schema(BOOK_KEY_SCHEMA);
    client
        .register_schema(BOOK_KEY_SUBJECT, &schema)
        .await
        .expect("to register schema successfully");

    let versions = client
        .get_subject_versions(BOOK_KEY_SUBJECT, false)
        .await
        .expect("to fetch versions successfully");

    assert_eq!(versions, vec![1]);
}

#[tokio::test]
#[serial_test::serial]
async fn can_lookup_subject_schema() {
    let env = utils::TestEnvironment::start().await;
    let client = env.create_schema_registry_client().await;

    let author_schema = UnregisteredSchema::schema(AUTHOR_VALUE_SCHEMA);
    client
        .register_schema(AUTHOR_VALUE_SUBJECT, &author_schema)
        .await
        .expect("to register author schema successfully");

    let book_schema = UnregisteredSchema::schema(BOOK_VALUE_SCHEMA).references([Reference::new(
        "test.avro.Author",
        AUTHOR_VALUE_SUBJECT,
    )
    .version(1)]);
    client
        .register_schema(BOOK_VALUE_SUBJECT, &book_schema)
        .await
        .expect("to register book schema successfully");

    let lookup = UnregisteredSchema::schema(BOOK_VALUE_SCHEMA).references([Reference::new(
        "test.avro.Author",
        AUTHOR_VALUE_SUBJECT,
    )
    .version(1)]);

    let found = client
        .lookup_subject_schema(BOOK_VALUE_SUBJECT, &lookup)
        .await
        .expect("to lookup schema successfully");

    assert_eq!(found.subject, BOOK_VALUE_SUBJECT);
}
