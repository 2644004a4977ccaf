use crate::db::connect_in_memory;
use crate::{category, comment, news, user};
use crate::news::MediaList;
use anyhow::Result;
use chrono::Utc;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};

async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = connect_in_memory().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn insert_category(db: &DatabaseConnection, name: &str) -> Result<category::Model> {
    let am = category::ActiveModel { name: Set(name.into()), created: Set(Utc::now().into()), ..Default::default() };
    Ok(am.insert(db).await?)
}

async fn insert_news(db: &DatabaseConnection, title: &str, category_id: Option<i32>) -> Result<news::Model> {
    let now = Utc::now();
    let am = news::ActiveModel {
        title: Set(title.into()),
        content: Set(None),
        images: Set(MediaList(vec![Some("media/a.png".into()), None])),
        created: Set(now.into()),
        updated: Set(now.into()),
        category_id: Set(category_id),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

async fn insert_comment(db: &DatabaseConnection, news_id: i32, user_id: uuid::Uuid) -> Result<comment::Model> {
    let now = Utc::now();
    let am = comment::ActiveModel {
        text: Set("first".into()),
        created: Set(now.into()),
        updated: Set(now.into()),
        news_id: Set(news_id),
        user_id: Set(user_id),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

#[tokio::test]
async fn images_round_trip_with_empty_slots() -> Result<()> {
    let db = setup_test_db().await?;
    let n = insert_news(&db, "A", None).await?;
    let found = news::Entity::find_by_id(n.id).one(&db).await?.expect("news row");
    assert_eq!(found.images.0, vec![Some("media/a.png".to_string()), None]);
    Ok(())
}

#[tokio::test]
async fn deleting_category_detaches_news() -> Result<()> {
    let db = setup_test_db().await?;
    let c = insert_category(&db, "Tech").await?;
    let n = insert_news(&db, "A", Some(c.id)).await?;

    category::Entity::delete_by_id(c.id).exec(&db).await?;

    let found = news::Entity::find_by_id(n.id).one(&db).await?;
    let found = found.expect("news must survive its category");
    assert_eq!(found.category_id, None);
    Ok(())
}

#[tokio::test]
async fn deleting_news_removes_its_comments() -> Result<()> {
    let db = setup_test_db().await?;
    let u = user::create(&db, "author@example.com", "Author").await?;
    let n = insert_news(&db, "A", None).await?;
    let other = insert_news(&db, "B", None).await?;
    for _ in 0..3 {
        insert_comment(&db, n.id, u.id).await?;
    }
    insert_comment(&db, other.id, u.id).await?;

    news::Entity::delete_by_id(n.id).exec(&db).await?;

    let left = comment::Entity::find().filter(comment::Column::NewsId.eq(n.id)).count(&db).await?;
    assert_eq!(left, 0);
    let kept = comment::Entity::find().filter(comment::Column::NewsId.eq(other.id)).count(&db).await?;
    assert_eq!(kept, 1);
    Ok(())
}

#[tokio::test]
async fn deleting_user_removes_authored_comments() -> Result<()> {
    let db = setup_test_db().await?;
    let u = user::create(&db, "gone@example.com", "Gone").await?;
    let n = insert_news(&db, "A", None).await?;
    insert_comment(&db, n.id, u.id).await?;

    user::hard_delete(&db, u.id).await?;

    assert_eq!(comment::Entity::find().count(&db).await?, 0);
    assert!(news::Entity::find_by_id(n.id).one(&db).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn news_detail_relations_resolve() -> Result<()> {
    use sea_orm::ModelTrait;

    let db = setup_test_db().await?;
    let u = user::create(&db, "reader@example.com", "Reader").await?;
    let c = insert_category(&db, "Science").await?;
    let n = insert_news(&db, "A", Some(c.id)).await?;
    insert_comment(&db, n.id, u.id).await?;

    let cat = n.find_related(category::Entity).one(&db).await?;
    assert_eq!(cat.map(|c| c.name), Some("Science".to_string()));
    let comments = n.find_related(comment::Entity).all(&db).await?;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].user_id, u.id);
    Ok(())
}

#[test]
fn bounded_fields_are_validated() {
    assert!(category::validate_name("Tech").is_ok());
    assert!(category::validate_name("   ").is_err());
    assert!(news::validate_title(&"x".repeat(news::TITLE_MAX_LEN)).is_ok());
    assert!(news::validate_title(&"x".repeat(news::TITLE_MAX_LEN + 1)).is_err());
    assert!(comment::validate_text("hi").is_ok());
    assert!(user::validate_email("nobody").is_err());
}
