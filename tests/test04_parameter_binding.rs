#![cfg(feature = "sqlite")]

use sql_mapper::prelude::*;
use tempfile::tempdir;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UserId(i64);

/// Property names keep their declared spelling on the write side.
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
struct NewUser {
    userId: UserId,
    displayName: String,
}

impl ToParams for NewUser {
    fn properties() -> Vec<Property<Self>> {
        vec![
            Property::readable("userId", |u: &NewUser| u.userId),
            Property::readable("displayName", |u: &NewUser| u.displayName.clone()),
            Property::write_only::<String>("password"),
        ]
    }
}

/// Read side goes through the snake-case convention.
#[derive(Debug, Clone, PartialEq)]
#[allow(non_snake_case)]
struct User {
    userId: UserId,
    displayName: String,
}

impl FromRecord for User {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::new(|args| {
                Ok(User {
                    userId: args.next()?,
                    displayName: args.next()?,
                })
            })
            .param::<UserId>("userId")
            .param::<String>("displayName"),
        ]
    }
}

async fn factory(prefix: &str) -> Result<UnitOfWorkFactory, Box<dyn std::error::Error>> {
    let factory = UnitOfWorkFactory::builder()
        .options(SqliteOptions::new(unique_db_path(prefix)))
        .add_converter(ValueConverter::new(|id: UserId| id.0 * 10, |raw: i64| UserId(raw / 10)))
        .build()
        .await?;
    let mut uow = factory.create(TransactionBehavior::Immediate).await?;
    uow.execute(
        "CREATE TABLE users (user_id INTEGER PRIMARY KEY, display_name TEXT NOT NULL)",
        &(),
    )
    .await?;
    uow.commit().await?;
    Ok(factory)
}

#[test]
fn command_parameters_use_declared_names_and_forward_converters() -> Result<(), SqlMapperError> {
    let mapper = RecordMapper::builder()
        .add_converter(ValueConverter::new(|id: UserId| id.0 * 10, |raw: i64| UserId(raw / 10)))
        .build()?;
    let mut command = SqlCommand::new("INSERT INTO users VALUES (@userId, @displayName)");
    mapper.bind_parameters(
        &mut command,
        &NewUser {
            userId: UserId(4),
            displayName: "Ada".into(),
        },
    )?;

    let names: Vec<_> = command.parameters().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["userId", "displayName"]);
    assert_eq!(
        command.parameter("userId").map(|p| &p.value),
        Some(&RowValues::Int(40))
    );
    assert!(command.parameter("password").is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn converted_parameters_reach_the_database() -> Result<(), Box<dyn std::error::Error>> {
    let factory = factory("converted").await?;

    let mut uow = factory.create(TransactionBehavior::Immediate).await?;
    uow.execute(
        "INSERT INTO users (user_id, display_name) VALUES (@userId, @displayName)",
        &NewUser {
            userId: UserId(7),
            displayName: "Grace".into(),
        },
    )
    .await?;

    let raw: RawId = uow.single("SELECT user_id FROM users", &()).await?;
    assert_eq!(raw.user_id, 70);

    let user: User = uow
        .single("SELECT user_id, display_name FROM users", &())
        .await?;
    uow.commit().await?;

    assert_eq!(
        user,
        User {
            userId: UserId(7),
            displayName: "Grace".into()
        }
    );
    Ok(())
}

#[derive(Debug)]
struct RawId {
    user_id: i64,
}
sql_mapper::impl_from_record!(RawId { user_id: i64 });

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn placeholder_without_parameter_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let factory = factory("missing_param").await?;
    let mut uow = factory.create(TransactionBehavior::Immediate).await?;

    // Write-side names are not converted, so the snake-case placeholder has no match.
    let err = uow
        .execute(
            "INSERT INTO users (user_id, display_name) VALUES (@user_id, @displayName)",
            &NewUser {
                userId: UserId(1),
                displayName: "x".into(),
            },
        )
        .await
        .expect_err("@user_id is not a declared property");
    assert!(matches!(err, SqlMapperError::ParameterError(ref msg) if msg.contains("user_id")));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unused_parameters_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let factory = factory("extra_params").await?;
    let mut uow = factory.create(TransactionBehavior::Immediate).await?;

    let changed = uow
        .execute(
            "INSERT INTO users (user_id, display_name) VALUES (5, @displayName)",
            &NewUser {
                userId: UserId(99),
                displayName: "only the name".into(),
            },
        )
        .await?;
    assert_eq!(changed, 1);

    let raw: RawId = uow.single("SELECT user_id FROM users", &()).await?;
    assert_eq!(raw.user_id, 5);
    Ok(())
}
