use chrono::{DateTime, Utc};
use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(utoipa::ToSchema)]
pub struct CreateTenantDoc { pub name: String }

#[derive(utoipa::ToSchema)]
pub struct RegisterMemberDoc {
    /// 11-digit mobile number, unique per deployment
    pub phone: String,
    pub name: String,
    pub card_no: Option<String>,
    /// stored encrypted; needs a configured PII key
    pub id_card: Option<String>,
    /// days of validity granted on registration, 0 leaves the member expired
    pub initial_days: Option<i64>,
}

#[derive(utoipa::ToSchema)]
pub struct UpdateMemberDoc {
    pub name: Option<String>,
    pub card_no: Option<String>,
    pub id_card: Option<String>,
}

#[derive(utoipa::ToSchema)]
pub struct RenewDoc {
    pub days: i64,
    pub amount_cents: Option<i64>,
}

#[derive(utoipa::ToSchema)]
pub struct PaidRenewalDoc {
    pub days: i64,
    pub amount_cents: i64,
    /// wechat | alipay | stripe
    pub provider: String,
}

#[derive(utoipa::ToSchema)]
pub struct CreateCourseDoc {
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub max_capacity: i32,
}

#[derive(utoipa::ToSchema)]
pub struct UpdateCourseDoc {
    pub name: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub max_capacity: Option<i32>,
}

#[derive(utoipa::ToSchema)]
pub struct BookDoc { pub member_id: Uuid }

#[derive(utoipa::ToSchema)]
pub struct CreatePaymentDoc {
    pub tenant_id: Uuid,
    pub member_id: Uuid,
    pub amount_cents: i64,
    pub provider: String,
}

#[derive(utoipa::ToSchema)]
pub struct CancelPaymentDoc { pub reason: Option<String> }

#[derive(utoipa::ToSchema)]
pub struct TransitionDoc {
    /// pending | processing | success | failed | cancelled
    pub status: String,
    pub reason: Option<String>,
}

#[derive(utoipa::ToSchema)]
pub struct WebhookEventDoc {
    pub event_id: String,
    pub order_no: String,
    pub status: String,
    pub gateway_txn_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::tenants::create,
        crate::routes::tenants::get,
        crate::routes::members::list,
        crate::routes::members::register,
        crate::routes::members::get_by_phone,
        crate::routes::members::get,
        crate::routes::members::update,
        crate::routes::members::delete,
        crate::routes::members::reveal_id_card,
        crate::routes::members::renew,
        crate::routes::members::request_renewal,
        crate::routes::members::list_renewals,
        crate::routes::courses::list,
        crate::routes::courses::create,
        crate::routes::courses::get,
        crate::routes::courses::update,
        crate::routes::courses::delete,
        crate::routes::bookings::book,
        crate::routes::bookings::cancel,
        crate::routes::bookings::list_for_course,
        crate::routes::bookings::list_for_member,
        crate::routes::payments::create,
        crate::routes::payments::get,
        crate::routes::payments::get_by_no,
        crate::routes::payments::list_for_member,
        crate::routes::payments::submit,
        crate::routes::payments::cancel,
        crate::routes::payments::transition,
        crate::routes::payments::sync,
        crate::routes::payments::webhook,
        crate::routes::audit::list,
    ),
    components(
        schemas(
            HealthResponse,
            CreateTenantDoc,
            RegisterMemberDoc,
            UpdateMemberDoc,
            RenewDoc,
            PaidRenewalDoc,
            CreateCourseDoc,
            UpdateCourseDoc,
            BookDoc,
            CreatePaymentDoc,
            CancelPaymentDoc,
            TransitionDoc,
            WebhookEventDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "tenants"),
        (name = "members"),
        (name = "renewals"),
        (name = "courses"),
        (name = "bookings"),
        (name = "payments"),
        (name = "audit")
    )
)]
pub struct ApiDoc;
