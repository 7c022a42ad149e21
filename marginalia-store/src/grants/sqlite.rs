// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Capability, CapabilitySet, ObjectRef, PrincipalId};
use sqlx::{query, query_as};

use crate::grants::GrantStore;
use crate::sqlite::{DecodeError, SqliteError, SqliteStore, WriteTx, lookup_id, to_sql_id};

/// Bump the grant version counter within the current transaction.
async fn bump_version(tx: &mut WriteTx<'_>) -> Result<(), SqliteError> {
    query(
        "
        UPDATE
            grant_version_v1
        SET
            version = version + 1
        WHERE
            id = 0
        ",
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

impl<'a> GrantStore for SqliteStore<'a> {
    async fn grants_for(
        &self,
        principal: &PrincipalId,
        object: &ObjectRef,
    ) -> Result<CapabilitySet, SqliteError> {
        let rows = self
            .execute(async |pool| {
                query_as::<_, (String,)>(
                    "
                    SELECT
                        capability
                    FROM
                        grants_v1
                    WHERE
                        principal = ?
                        AND kind = ?
                        AND object_id = ?
                    ",
                )
                .bind(lookup_id(principal.as_u64()))
                .bind(object.kind.as_str())
                .bind(lookup_id(object.id.as_u64()))
                .fetch_all(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter()
            .map(|(token,)| {
                token.parse::<Capability>().map_err(|err| {
                    SqliteError::Decode("capability".into(), DecodeError::Capability(err))
                })
            })
            .collect()
    }

    async fn write_grants(
        &self,
        principal: &PrincipalId,
        object: &ObjectRef,
        capabilities: CapabilitySet,
    ) -> Result<bool, SqliteError> {
        let principal = to_sql_id("principal", principal.as_u64())?;
        let object_id = to_sql_id("object_id", object.id.as_u64())?;

        self.tx(async |tx| {
            let mut insertion_occured = false;

            for capability in capabilities.iter() {
                // Ignore insertion when grant already exists (UNIQUE constraint).
                let result = query(
                    "
                    INSERT OR IGNORE
                    INTO
                        grants_v1 (
                            principal,
                            kind,
                            object_id,
                            capability
                        )
                    VALUES
                        (?, ?, ?, ?)
                    ",
                )
                .bind(principal)
                .bind(object.kind.as_str())
                .bind(object_id)
                .bind(capability.as_str())
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() > 0 {
                    insertion_occured = true;
                }
            }

            if insertion_occured {
                bump_version(tx).await?;
            }

            Ok(insertion_occured)
        })
        .await
    }

    async fn revoke(
        &self,
        principal: &PrincipalId,
        object: &ObjectRef,
        capabilities: CapabilitySet,
    ) -> Result<bool, SqliteError> {
        let principal = to_sql_id("principal", principal.as_u64())?;
        let object_id = to_sql_id("object_id", object.id.as_u64())?;

        self.tx(async |tx| {
            let mut removal_occured = false;

            for capability in capabilities.iter() {
                let result = query(
                    "
                    DELETE FROM
                        grants_v1
                    WHERE
                        principal = ?
                        AND kind = ?
                        AND object_id = ?
                        AND capability = ?
                    ",
                )
                .bind(principal)
                .bind(object.kind.as_str())
                .bind(object_id)
                .bind(capability.as_str())
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() > 0 {
                    removal_occured = true;
                }
            }

            if removal_occured {
                bump_version(tx).await?;
            }

            Ok(removal_occured)
        })
        .await
    }

    async fn grant_version(&self) -> Result<u64, SqliteError> {
        let (version,) = self
            .execute(async |pool| {
                query_as::<_, (i64,)>(
                    "
                    SELECT
                        version
                    FROM
                        grant_version_v1
                    WHERE
                        id = 0
                    ",
                )
                .fetch_one(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        crate::sqlite::from_sql_id("version", version)
    }
}
