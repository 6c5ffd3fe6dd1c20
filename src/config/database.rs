//! Database configuration module.
//!
//! This module handles the record store connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`; the composite uniqueness rules that
//! entities cannot express (absence type name per tenant, one allowance per
//! tenant/user/type/year) are added as explicit unique indexes.

use crate::entities::{
    AbsenceType, LeaveAllowance, LeaveRequest, absence_type, leave_allowance, leave_request,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

/// Default local `SQLite` database used when nothing is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/leave_ledger.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling
/// back to the given value and finally to [`DEFAULT_DATABASE_URL`].
#[must_use]
pub fn resolve_database_url(configured: Option<&str>) -> String {
    std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| configured.map(ToString::to_string))
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the record store.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database: {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Absence types are created first because allowances and leave requests
/// reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_entity_table(db, &schema, AbsenceType).await?;
    create_entity_table(db, &schema, LeaveAllowance).await?;
    create_entity_table(db, &schema, LeaveRequest).await?;

    let unique_indexes = [
        unique_index(
            "idx_hr_abstype_tenant_name",
            AbsenceType,
            &[absence_type::Column::TenantId, absence_type::Column::Name],
        ),
        unique_index(
            "idx_hr_allowance_tenant_user_type_year",
            LeaveAllowance,
            &[
                leave_allowance::Column::TenantId,
                leave_allowance::Column::UserId,
                leave_allowance::Column::AbsenceTypeId,
                leave_allowance::Column::Year,
            ],
        ),
    ];
    for index in &unique_indexes {
        db.execute(builder.build(index)).await?;
    }

    let mut overlap_index = Index::create();
    overlap_index
        .name("idx_hr_leavereq_tenant_user_start")
        .table(LeaveRequest)
        .col(leave_request::Column::TenantId)
        .col(leave_request::Column::UserId)
        .col(leave_request::Column::StartDate)
        .if_not_exists();
    db.execute(builder.build(&overlap_index)).await?;

    info!("Database tables ensured.");
    Ok(())
}

async fn create_entity_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }
    Ok(())
}

fn unique_index<E, C>(name: &str, entity: E, columns: &[C]) -> IndexCreateStatement
where
    E: EntityTrait,
    C: sea_orm::ColumnTrait,
{
    let mut index = Index::create();
    index.name(name).table(entity).unique().if_not_exists();
    for column in columns {
        index.col(*column);
    }
    index
}
