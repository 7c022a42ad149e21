// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::ObjectId;
use sqlx::query_as;

use crate::objects::sqlite::object_id;
use crate::sqlite::{SqliteError, SqliteStore, lookup_id};
use crate::tree::TreeStore;
use crate::tree::traits::MAX_TREE_DEPTH;

impl<'a> SqliteStore<'a> {
    async fn walk_tree(&self, sql: &str, id: &ObjectId) -> Result<Vec<ObjectId>, SqliteError> {
        let rows: Vec<(i64, i64)> = self
            .execute(async |pool| {
                query_as::<_, (i64, i64)>(sql)
                    .bind(lookup_id(id.as_u64()))
                    .bind(MAX_TREE_DEPTH as i64)
                    .bind(lookup_id(id.as_u64()))
                    .fetch_all(pool)
                    .await
                    .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter()
            .map(|(id, _depth)| object_id("id", id))
            .collect()
    }
}

impl<'a> TreeStore for SqliteStore<'a> {
    async fn ancestors(&self, id: &ObjectId) -> Result<Vec<ObjectId>, SqliteError> {
        self.walk_tree(
            "
            WITH RECURSIVE tree(id, depth) AS (
                SELECT
                    parent_id,
                    1
                FROM
                    annotations_v1
                WHERE
                    id = ?1
                    AND parent_id IS NOT NULL
                UNION
                SELECT
                    a.parent_id,
                    tree.depth + 1
                FROM
                    annotations_v1 a
                    JOIN tree ON a.id = tree.id
                WHERE
                    a.parent_id IS NOT NULL
                    AND tree.depth < ?2
            )
            SELECT
                id,
                MIN(depth) AS depth
            FROM
                tree
            WHERE
                id != ?3
            GROUP BY
                id
            ORDER BY
                depth, id
            ",
            id,
        )
        .await
    }

    async fn descendants(&self, id: &ObjectId) -> Result<Vec<ObjectId>, SqliteError> {
        self.walk_tree(
            "
            WITH RECURSIVE tree(id, depth) AS (
                SELECT
                    id,
                    1
                FROM
                    annotations_v1
                WHERE
                    parent_id = ?1
                UNION
                SELECT
                    a.id,
                    tree.depth + 1
                FROM
                    annotations_v1 a
                    JOIN tree ON a.parent_id = tree.id
                WHERE
                    tree.depth < ?2
            )
            SELECT
                id,
                MIN(depth) AS depth
            FROM
                tree
            WHERE
                id != ?3
            GROUP BY
                id
            ORDER BY
                depth, id
            ",
            id,
        )
        .await
    }
}
