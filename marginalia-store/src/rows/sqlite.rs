// SPDX-License-Identifier: MIT OR Apache-2.0

use marginalia_core::{Annotation, Relationship};
use sqlx::{QueryBuilder, Sqlite};

use crate::objects::sqlite::{
    ANNOTATION_COLUMNS, AnnotationRow, RELATIONSHIP_COLUMNS, RelationshipRow, load_links,
};
use crate::rows::{CorpusScope, OwnerFilter, RowQuery, ScopedRows};
use crate::sqlite::{SqliteError, SqliteStore, lookup_id};

/// Append the `WHERE` conditions shared by annotations and relationships.
///
/// `alias` is the table alias of the selected rows.
fn push_conditions(builder: &mut QueryBuilder<'_, Sqlite>, alias: &str, query: &RowQuery) {
    builder.push(format!(" WHERE {alias}.document_id = "));
    builder.push_bind(lookup_id(query.document_id.as_u64()));

    match query.scope {
        CorpusScope::Corpus(corpus_id) => {
            builder.push(format!(" AND ({alias}.corpus_id = "));
            builder.push_bind(lookup_id(corpus_id.as_u64()));
            builder.push(format!(
                " OR ({alias}.structural = 1 AND {alias}.corpus_id IS NULL))"
            ));
        }
        CorpusScope::StructuralOnly => {
            builder.push(format!(" AND {alias}.structural = 1"));
        }
    }

    if let Some(structural) = query.structural {
        builder.push(format!(" AND {alias}.structural = "));
        builder.push_bind(structural);
    }

    for (column, filter) in [
        ("created_by_analysis_id", query.analysis),
        ("created_by_extract_id", query.extract),
    ] {
        match filter {
            Some(OwnerFilter::Absent) => {
                builder.push(format!(" AND {alias}.{column} IS NULL"));
            }
            Some(OwnerFilter::Is(id)) => {
                builder.push(format!(" AND {alias}.{column} = "));
                builder.push_bind(lookup_id(id.as_u64()));
            }
            None => (),
        }
    }
}

fn push_pages(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, pages: &[u32]) {
    builder.push(format!(" AND {column} IN ("));
    let mut separated = builder.separated(", ");
    for page in pages {
        separated.push_bind(*page as i64);
    }
    separated.push_unseparated(")");
}

impl<'a> ScopedRows<Annotation> for SqliteStore<'a> {
    async fn select(&self, query: &RowQuery) -> Result<Vec<Annotation>, SqliteError> {
        if query.pages.as_ref().is_some_and(|pages| pages.is_empty()) {
            return Ok(Vec::new());
        }

        let rows = self
            .execute(async |pool| {
                let mut builder: QueryBuilder<Sqlite> =
                    QueryBuilder::new(format!("SELECT {ANNOTATION_COLUMNS} FROM annotations_v1 a"));
                push_conditions(&mut builder, "a", query);
                if let Some(pages) = &query.pages {
                    push_pages(&mut builder, "a.page", pages);
                }
                builder.push(" ORDER BY a.id");

                builder
                    .build_query_as::<AnnotationRow>()
                    .fetch_all(pool)
                    .await
                    .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(Annotation::try_from).collect()
    }
}

impl<'a> ScopedRows<Relationship> for SqliteStore<'a> {
    async fn select(&self, query: &RowQuery) -> Result<Vec<Relationship>, SqliteError> {
        if query.pages.as_ref().is_some_and(|pages| pages.is_empty()) {
            return Ok(Vec::new());
        }

        let (rows, links) = self
            .execute(async |pool| {
                let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                    "SELECT {RELATIONSHIP_COLUMNS} FROM relationships_v1 r"
                ));

                // Matching pages joins through the many-to-many link table, a relationship shows
                // up once for every linked annotation on a requested page.
                if query.pages.is_some() {
                    builder.push(
                        " JOIN relationship_annotations_v1 l ON l.relationship_id = r.id
                          JOIN annotations_v1 a ON a.id = l.annotation_id",
                    );
                }
                push_conditions(&mut builder, "r", query);
                if let Some(pages) = &query.pages {
                    push_pages(&mut builder, "a.page", pages);
                }
                builder.push(" ORDER BY r.id");

                let rows: Vec<RelationshipRow> = builder.build_query_as().fetch_all(pool).await?;

                let mut ids: Vec<i64> = rows.iter().map(|row| row.id()).collect();
                ids.dedup();
                let links = load_links(pool, &ids).await?;

                Ok((rows, links))
            })
            .await?;

        rows.into_iter()
            .map(|row| row.into_relationship(&links))
            .collect()
    }
}
