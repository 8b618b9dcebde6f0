use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use anyhow::Result;
use uuid::Uuid;

use super::setup_test_db;
use crate::enums::{BookingStatus, PaymentProvider, PaymentStatus};
use crate::errors::ModelError;
use crate::{booking, course, member, payment_order, processed_webhook_event, tenant};

fn random_phone() -> String {
    format!("139{:08}", Uuid::new_v4().as_u128() % 100_000_000)
}

fn new_member(tenant_id: Uuid, phone: &str) -> member::NewMember {
    let now = Utc::now();
    member::NewMember {
        tenant_id,
        phone: phone.to_string(),
        card_no: None,
        name: "Test Member".into(),
        id_card_encrypted: None,
        validity_start: now,
        validity_end: now + Duration::days(30),
    }
}

#[tokio::test]
async fn test_tenant_crud() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let name = format!("tenant_{}", Uuid::new_v4());
    let created = tenant::create(&db, &name).await?;
    assert_eq!(created.name, name);

    let found = tenant::Entity::find().filter(tenant::Column::Name.eq(name.clone())).one(&db).await?;
    assert_eq!(found.map(|t| t.id), Some(created.id));

    assert!(tenant::create(&db, "   ").await.is_err());

    tenant::Entity::delete_by_id(created.id).exec(&db).await?;
    assert!(tenant::Entity::find_by_id(created.id).one(&db).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_member_crud_and_soft_delete() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let t = tenant::create(&db, "gym").await?;

    let m = member::create(&db, new_member(t.id, &random_phone())).await?;
    assert_eq!(m.tenant_id, t.id);
    assert!(m.is_active(Utc::now()));

    let deleted = member::soft_delete(&db, m.id).await?;
    assert!(deleted.deleted_at.is_some());
    assert!(!deleted.is_active(Utc::now()));

    assert!(member::hard_delete(&db, m.id).await?);
    assert!(!member::hard_delete(&db, m.id).await?);
    Ok(())
}

#[tokio::test]
async fn test_phone_unique_per_tenant() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let a = tenant::create(&db, "a").await?;
    let b = tenant::create(&db, "b").await?;

    let phone = random_phone();
    member::create(&db, new_member(a.id, &phone)).await?;
    let dup = member::create(&db, new_member(a.id, &phone)).await;
    assert!(matches!(dup, Err(crate::errors::ModelError::Conflict(_))), "same phone in same tenant must be rejected");

    // another tenant may reuse the number
    member::create(&db, new_member(b.id, &phone)).await?;
    Ok(())
}

#[tokio::test]
async fn test_booking_unique_member_course() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let t = tenant::create(&db, "studio").await?;
    let m = member::create(&db, new_member(t.id, &random_phone())).await?;
    let c = course::create(&db, t.id, "Spin", Utc::now() + Duration::days(1), 10).await?;

    let mk = || booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        course_id: Set(c.id),
        member_id: Set(m.id),
        status: Set(BookingStatus::Confirmed),
        created_at: Set(Utc::now().into()),
        cancelled_at: Set(None),
    };
    mk().insert(&db).await?;
    assert!(mk().insert(&db).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_payment_order_enums_roundtrip_through_db() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let t = tenant::create(&db, "pay").await?;
    let m = member::create(&db, new_member(t.id, &random_phone())).await?;
    let now = Utc::now();
    let order = payment_order::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(t.id),
        member_id: Set(m.id),
        order_no: Set(format!("PO-{}", Uuid::new_v4().simple())),
        amount_cents: Set(9900),
        provider: Set(PaymentProvider::Alipay),
        status: Set(PaymentStatus::Processing),
        gateway_txn_id: Set(Some("ali_1".into())),
        failure_reason: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&db)
    .await?;

    let found = payment_order::Entity::find()
        .filter(payment_order::Column::Id.eq(order.id))
        .filter(payment_order::Column::Status.eq(PaymentStatus::Processing))
        .one(&db)
        .await?
        .expect("order by status");
    assert_eq!(found.id, order.id);
    assert_eq!(found.provider, PaymentProvider::Alipay);
    Ok(())
}

#[tokio::test]
async fn test_webhook_marker_keyed_by_provider_and_event() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let event_id = format!("evt_{}", Uuid::new_v4().simple());
    let marker = |provider: &str| processed_webhook_event::ActiveModel {
        provider: Set(provider.to_string()),
        event_id: Set(event_id.clone()),
        order_no: Set("PO-marker".into()),
        processed_at: Set(Utc::now().into()),
    };

    marker("wechat").insert(&db).await?;
    marker("alipay").insert(&db).await?;
    let dup = marker("wechat").insert(&db).await.map_err(ModelError::from);
    assert!(matches!(dup, Err(ModelError::Conflict(_))));

    let found = processed_webhook_event::Entity::find_by_id(("alipay".to_string(), event_id.clone())).one(&db).await?;
    assert_eq!(found.map(|m| m.provider).as_deref(), Some("alipay"));
    let all = processed_webhook_event::Entity::find()
        .filter(processed_webhook_event::Column::EventId.eq(event_id.as_str()))
        .all(&db)
        .await?;
    assert_eq!(all.len(), 2);
    Ok(())
}
