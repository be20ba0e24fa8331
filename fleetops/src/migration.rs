//! Schema migrations. Tables are generated from the entity definitions so the
//! schema cannot drift from the models; foreign keys come from the `belongs_to`
//! relations.

use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entities::{
    api_key, bid, inspection, job, license, notification, organization, profile, schedule, setting,
    vehicle,
};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateFleetTables), Box::new(CreateLookupIndexes)]
    }
}

async fn create_from_entity<E>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let schema = Schema::new(manager.get_database_backend());
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}

async fn drop_table<E>(manager: &SchemaManager<'_>, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .drop_table(Table::drop().table(entity).if_exists().to_owned())
        .await
}

pub struct CreateFleetTables;

impl MigrationName for CreateFleetTables {
    fn name(&self) -> &'static str {
        "m20250101_000001_create_fleet_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateFleetTables {
    // Referenced tables first.
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        create_from_entity(manager, organization::Entity).await?;
        create_from_entity(manager, profile::Entity).await?;
        create_from_entity(manager, vehicle::Entity).await?;
        create_from_entity(manager, job::Entity).await?;
        create_from_entity(manager, bid::Entity).await?;
        create_from_entity(manager, inspection::Entity).await?;
        create_from_entity(manager, notification::Entity).await?;
        create_from_entity(manager, license::Entity).await?;
        create_from_entity(manager, schedule::Entity).await?;
        create_from_entity(manager, api_key::Entity).await?;
        create_from_entity(manager, setting::Entity).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table(manager, setting::Entity).await?;
        drop_table(manager, api_key::Entity).await?;
        drop_table(manager, schedule::Entity).await?;
        drop_table(manager, license::Entity).await?;
        drop_table(manager, notification::Entity).await?;
        drop_table(manager, inspection::Entity).await?;
        drop_table(manager, bid::Entity).await?;
        drop_table(manager, job::Entity).await?;
        drop_table(manager, vehicle::Entity).await?;
        drop_table(manager, profile::Entity).await?;
        drop_table(manager, organization::Entity).await?;
        Ok(())
    }
}

pub struct CreateLookupIndexes;

impl MigrationName for CreateLookupIndexes {
    fn name(&self) -> &'static str {
        "m20250101_000002_create_lookup_indexes"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateLookupIndexes {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_settings_organization_section")
                    .table(setting::Entity)
                    .col(setting::Column::OrganizationId)
                    .col(setting::Column::Section)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_bids_job_driver")
                    .table(bid::Entity)
                    .col(bid::Column::JobId)
                    .col(bid::Column::DriverId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_schedules_driver_window")
                    .table(schedule::Entity)
                    .col(schedule::Column::DriverId)
                    .col(schedule::Column::StartsAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table) in [
            ("idx_schedules_driver_window", "schedules"),
            ("idx_bids_job_driver", "bids"),
            ("idx_settings_organization_section", "settings"),
        ] {
            manager
                .drop_index(Index::drop().name(name).table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, Database, Statement};

    #[tokio::test]
    async fn test_migrations_apply_and_revert() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let rows = db
            .query_all(Statement::from_string(
                db.get_database_backend(),
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'seaql_%'",
            ))
            .await
            .unwrap();
        assert_eq!(rows.len(), 11);

        Migrator::down(&db, None).await.unwrap();
        let rows = db
            .query_all(Statement::from_string(
                db.get_database_backend(),
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'seaql_%'",
            ))
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
