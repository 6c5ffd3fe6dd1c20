//! Absence type business logic - tenant configuration of leave categories.
//!
//! Provides functions for creating, retrieving, updating and deleting absence
//! types, plus seeding from config.toml. Names are trimmed and unique per tenant.
//! Deleting a type is refused while any leave request still references it.

use crate::{
    config::AbsenceTypeSeed,
    context::CallerContext,
    core::{Paged, Pagination},
    entities::{AbsenceType, LeaveAllowance, LeaveRequest, absence_type, leave_allowance, leave_request},
    errors::{Error, Result},
};
use sea_orm::{
    ConnectionTrait, PaginatorTrait, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*,
};
use tracing::{debug, info, instrument, warn};

/// Input for creating an absence type. Defaults mirror the column defaults:
/// deducts from allowance, requires approval, active, no signing.
#[derive(Debug, Clone)]
pub struct NewAbsenceType {
    /// Unique name within the tenant
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
    /// Calendar color
    pub color: Option<String>,
    /// Icon name
    pub icon: Option<String>,
    /// Whether approved requests consume allowance
    pub deducts_from_allowance: bool,
    /// Whether requests need a reviewer decision
    pub requires_approval: bool,
    /// Whether approval goes through document signing
    pub requires_signing: bool,
    /// Signing template reference
    pub signing_template_id: Option<String>,
    /// Available for new requests
    pub is_active: bool,
    /// Display ordering
    pub sort_order: i32,
    /// Free-form metadata
    pub metadata: Option<Json>,
}

impl NewAbsenceType {
    /// A type with the given name and default policy.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            color: None,
            icon: None,
            deducts_from_allowance: true,
            requires_approval: true,
            requires_signing: false,
            signing_template_id: None,
            is_active: true,
            sort_order: 0,
            metadata: None,
        }
    }
}

impl From<&AbsenceTypeSeed> for NewAbsenceType {
    fn from(seed: &AbsenceTypeSeed) -> Self {
        Self {
            description: seed.description.clone(),
            color: seed.color.clone(),
            deducts_from_allowance: seed.deducts_from_allowance,
            requires_approval: seed.requires_approval,
            requires_signing: seed.requires_signing,
            signing_template_id: seed.signing_template_id.clone(),
            sort_order: seed.sort_order,
            ..Self::named(seed.name.clone())
        }
    }
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AbsenceTypeUpdate {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New color
    pub color: Option<String>,
    /// New icon
    pub icon: Option<String>,
    /// New deduction flag
    pub deducts_from_allowance: Option<bool>,
    /// New approval flag
    pub requires_approval: Option<bool>,
    /// New signing flag
    pub requires_signing: Option<bool>,
    /// New signing template
    pub signing_template_id: Option<String>,
    /// New active flag
    pub is_active: Option<bool>,
    /// New ordering
    pub sort_order: Option<i32>,
    /// New metadata
    pub metadata: Option<Json>,
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::bad_request("absence type name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn duplicate_name() -> Error {
    Error::AlreadyExists {
        message: "absence type already exists with this name".to_string(),
    }
}

fn map_unique_violation(err: DbErr) -> Error {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        duplicate_name()
    } else {
        Error::from(err)
    }
}

async fn find_by_name<C>(conn: &C, tenant_id: u32, name: &str) -> Result<Option<absence_type::Model>>
where
    C: ConnectionTrait,
{
    AbsenceType::find()
        .filter(absence_type::Column::TenantId.eq(tenant_id))
        .filter(absence_type::Column::Name.eq(name))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Creates a new absence type in the caller's tenant.
#[instrument(skip(db, caller, input), fields(tenant_id = caller.tenant_id(), name = %input.name))]
pub async fn create_absence_type(
    db: &DatabaseConnection,
    caller: &CallerContext,
    input: NewAbsenceType,
) -> Result<absence_type::Model> {
    let name = validate_name(&input.name)?;

    if find_by_name(db, caller.tenant_id(), &name).await?.is_some() {
        return Err(duplicate_name());
    }

    let now = chrono::Utc::now();
    let model = absence_type::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        tenant_id: Set(caller.tenant_id()),
        name: Set(name),
        description: Set(input.description),
        color: Set(input.color),
        icon: Set(input.icon),
        deducts_from_allowance: Set(input.deducts_from_allowance),
        requires_approval: Set(input.requires_approval),
        requires_signing: Set(input.requires_signing),
        signing_template_id: Set(input.signing_template_id),
        is_active: Set(input.is_active),
        sort_order: Set(input.sort_order),
        metadata: Set(input.metadata),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = model.insert(db).await.map_err(map_unique_violation)?;
    info!(absence_type_id = %created.id, "Created absence type");
    Ok(created)
}

/// Looks up an absence type by id within the caller's tenant.
pub async fn get_absence_type(
    db: &DatabaseConnection,
    caller: &CallerContext,
    absence_type_id: &str,
) -> Result<absence_type::Model> {
    find_absence_type(db, caller.tenant_id(), absence_type_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "absence type",
            id: absence_type_id.to_string(),
        })
}

/// Tenant-scoped lookup usable inside a transaction.
pub(crate) async fn find_absence_type<C>(
    conn: &C,
    tenant_id: u32,
    absence_type_id: &str,
) -> Result<Option<absence_type::Model>>
where
    C: ConnectionTrait,
{
    AbsenceType::find_by_id(absence_type_id)
        .filter(absence_type::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Lists absence types ordered by `sort_order`, then name.
///
/// `query` filters by a case-sensitive substring of the name.
pub async fn list_absence_types(
    db: &DatabaseConnection,
    caller: &CallerContext,
    query: Option<&str>,
    pagination: Pagination,
) -> Result<Paged<absence_type::Model>> {
    let mut select =
        AbsenceType::find().filter(absence_type::Column::TenantId.eq(caller.tenant_id()));
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        select = select.filter(absence_type::Column::Name.contains(q));
    }

    let total = select.clone().count(db).await?;
    let items = pagination
        .apply(
            select
                .order_by_asc(absence_type::Column::SortOrder)
                .order_by_asc(absence_type::Column::Name),
        )
        .all(db)
        .await?;

    Ok(Paged { items, total })
}

/// Applies a partial update to an absence type.
pub async fn update_absence_type(
    db: &DatabaseConnection,
    caller: &CallerContext,
    absence_type_id: &str,
    update: AbsenceTypeUpdate,
) -> Result<absence_type::Model> {
    let existing = get_absence_type(db, caller, absence_type_id).await?;
    let current_name = existing.name.clone();
    let mut active: absence_type::ActiveModel = existing.into();

    if let Some(name) = update.name {
        let name = validate_name(&name)?;
        if name != current_name && find_by_name(db, caller.tenant_id(), &name).await?.is_some() {
            return Err(duplicate_name());
        }
        active.name = Set(name);
    }
    if let Some(description) = update.description {
        active.description = Set(Some(description));
    }
    if let Some(color) = update.color {
        active.color = Set(Some(color));
    }
    if let Some(icon) = update.icon {
        active.icon = Set(Some(icon));
    }
    if let Some(deducts) = update.deducts_from_allowance {
        active.deducts_from_allowance = Set(deducts);
    }
    if let Some(requires) = update.requires_approval {
        active.requires_approval = Set(requires);
    }
    if let Some(requires_signing) = update.requires_signing {
        active.requires_signing = Set(requires_signing);
    }
    if let Some(template) = update.signing_template_id {
        active.signing_template_id = Set(Some(template));
    }
    if let Some(is_active) = update.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(sort_order) = update.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(metadata) = update.metadata {
        active.metadata = Set(Some(metadata));
    }
    active.updated_at = Set(chrono::Utc::now());

    active.update(db).await.map_err(map_unique_violation)
}

/// Deletes an absence type together with its allowances.
///
/// Refused with `AbsenceTypeInUse` while leave requests reference the type.
pub async fn delete_absence_type(
    db: &DatabaseConnection,
    caller: &CallerContext,
    absence_type_id: &str,
) -> Result<()> {
    let txn = db.begin().await?;

    find_absence_type(&txn, caller.tenant_id(), absence_type_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "absence type",
            id: absence_type_id.to_string(),
        })?;

    let in_use = LeaveRequest::find()
        .filter(leave_request::Column::AbsenceTypeId.eq(absence_type_id))
        .count(&txn)
        .await?;
    if in_use > 0 {
        return Err(Error::AbsenceTypeInUse { count: in_use });
    }

    LeaveAllowance::delete_many()
        .filter(leave_allowance::Column::AbsenceTypeId.eq(absence_type_id))
        .exec(&txn)
        .await?;
    AbsenceType::delete_by_id(absence_type_id).exec(&txn).await?;

    txn.commit().await?;
    info!(absence_type_id, "Deleted absence type");
    Ok(())
}

/// Creates the configured absence types that do not exist yet.
///
/// Existing types (matched by tenant and name) are left untouched so that
/// administrative edits survive restarts. Returns the number created.
pub async fn seed_absence_types(db: &DatabaseConnection, seeds: &[AbsenceTypeSeed]) -> Result<usize> {
    info!(
        "Starting to seed absence types. Found {} configurations from TOML.",
        seeds.len()
    );

    let mut created = 0;
    for seed in seeds {
        if find_by_name(db, seed.tenant_id, seed.name.trim()).await?.is_some() {
            debug!(tenant_id = seed.tenant_id, name = %seed.name, "Absence type already exists. Skipping.");
            continue;
        }
        if seed.requires_signing && seed.signing_template_id.is_none() {
            warn!(
                name = %seed.name,
                "Absence type requires signing but has no template; approvals will skip signing"
            );
        }

        // Seeding runs before any caller exists; act as the seed's tenant
        let caller = CallerContext::new(seed.tenant_id, 0, "seed");
        create_absence_type(db, &caller, NewAbsenceType::from(seed)).await?;
        created += 1;
    }

    info!("Seeded {created} absence types.");
    Ok(created)
}
