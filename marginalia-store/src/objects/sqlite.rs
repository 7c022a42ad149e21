// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use marginalia_core::cbor::{decode_embedding, encode_embedding};
use marginalia_core::{
    Analysis, Annotation, Corpus, Document, Extract, ObjectId, ObjectKind, Origin, PrincipalId,
    Relationship,
};
use sqlx::{FromRow, QueryBuilder, Sqlite, query, query_as};

use crate::objects::ObjectStore;
use crate::sqlite::{
    DecodeError, SqliteError, SqliteStore, WriteTx, from_sql_id, lookup_id, to_sql_id,
};

/// Columns selected for every annotation row, prefixed with the `a` table alias.
pub(crate) const ANNOTATION_COLUMNS: &str = "
    a.id,
    a.document_id,
    a.corpus_id,
    a.page,
    a.parent_id,
    a.structural,
    a.creator,
    a.created_by_analysis_id,
    a.created_by_extract_id,
    a.embedding
";

/// Columns selected for every relationship row, prefixed with the `r` table alias.
pub(crate) const RELATIONSHIP_COLUMNS: &str = "
    r.id,
    r.document_id,
    r.corpus_id,
    r.structural,
    r.creator,
    r.created_by_analysis_id,
    r.created_by_extract_id
";

pub(crate) fn object_id(field: &str, value: i64) -> Result<ObjectId, SqliteError> {
    Ok(ObjectId::new(from_sql_id(field, value)?))
}

fn optional_object_id(field: &str, value: Option<i64>) -> Result<Option<ObjectId>, SqliteError> {
    value.map(|value| object_id(field, value)).transpose()
}

fn optional_sql_id(field: &str, id: Option<ObjectId>) -> Result<Option<i64>, SqliteError> {
    id.map(|id| to_sql_id(field, id.as_u64())).transpose()
}

fn principal_id(field: &str, value: i64) -> Result<PrincipalId, SqliteError> {
    Ok(PrincipalId::new(from_sql_id(field, value)?))
}

fn origin(analysis_id: Option<i64>, extract_id: Option<i64>) -> Result<Origin, SqliteError> {
    Origin::from_fields(
        optional_object_id("created_by_analysis_id", analysis_id)?,
        optional_object_id("created_by_extract_id", extract_id)?,
    )
    .map_err(|err| SqliteError::Decode("origin".into(), DecodeError::Misconfiguration(err)))
}

/// Single base object row as it is inserted in the SQLite database.
#[derive(Debug, FromRow)]
struct BaseObjectRow {
    id: i64,
    creator: i64,
    is_public: bool,
    allow_comments: bool,
}

/// Single annotation row as it is inserted in the SQLite database.
#[derive(Debug, FromRow)]
pub(crate) struct AnnotationRow {
    id: i64,
    document_id: i64,
    corpus_id: Option<i64>,
    page: i64,
    parent_id: Option<i64>,
    structural: bool,
    creator: i64,
    created_by_analysis_id: Option<i64>,
    created_by_extract_id: Option<i64>,
    embedding: Option<Vec<u8>>,
}

impl TryFrom<AnnotationRow> for Annotation {
    type Error = SqliteError;

    fn try_from(row: AnnotationRow) -> Result<Self, Self::Error> {
        Ok(Annotation {
            id: object_id("id", row.id)?,
            document_id: object_id("document_id", row.document_id)?,
            corpus_id: optional_object_id("corpus_id", row.corpus_id)?,
            page: u32::try_from(row.page).map_err(|_| {
                SqliteError::Decode("page".into(), DecodeError::NegativeId(row.page))
            })?,
            parent_id: optional_object_id("parent_id", row.parent_id)?,
            structural: row.structural,
            creator: principal_id("creator", row.creator)?,
            origin: origin(row.created_by_analysis_id, row.created_by_extract_id)?,
            embedding: row
                .embedding
                .map(|bytes| {
                    decode_embedding(&bytes)
                        .map_err(|err| SqliteError::Decode("embedding".into(), err.into()))
                })
                .transpose()?,
        })
    }
}

/// Single relationship row as it is inserted in the SQLite database, without its links.
#[derive(Debug, FromRow)]
pub(crate) struct RelationshipRow {
    id: i64,
    document_id: i64,
    corpus_id: Option<i64>,
    structural: bool,
    creator: i64,
    created_by_analysis_id: Option<i64>,
    created_by_extract_id: Option<i64>,
}

impl RelationshipRow {
    pub(crate) fn id(&self) -> i64 {
        self.id
    }

    /// Convert row into a relationship, attaching the source and target annotations.
    pub(crate) fn into_relationship(
        self,
        links: &HashMap<i64, (Vec<ObjectId>, Vec<ObjectId>)>,
    ) -> Result<Relationship, SqliteError> {
        let (source_ids, target_ids) = links.get(&self.id).cloned().unwrap_or_default();

        Ok(Relationship {
            id: object_id("id", self.id)?,
            document_id: object_id("document_id", self.document_id)?,
            corpus_id: optional_object_id("corpus_id", self.corpus_id)?,
            structural: self.structural,
            creator: principal_id("creator", self.creator)?,
            origin: origin(self.created_by_analysis_id, self.created_by_extract_id)?,
            source_ids,
            target_ids,
        })
    }
}

/// Load source and target annotation ids of the given relationships in one query.
pub(crate) async fn load_links(
    pool: &sqlx::SqlitePool,
    relationship_ids: &[i64],
) -> Result<HashMap<i64, (Vec<ObjectId>, Vec<ObjectId>)>, SqliteError> {
    let mut links: HashMap<i64, (Vec<ObjectId>, Vec<ObjectId>)> = HashMap::new();
    if relationship_ids.is_empty() {
        return Ok(links);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "
        SELECT
            relationship_id,
            annotation_id,
            role
        FROM
            relationship_annotations_v1
        WHERE
            relationship_id IN (",
    );
    let mut separated = builder.separated(", ");
    for id in relationship_ids {
        separated.push_bind(*id);
    }
    builder.push(") ORDER BY relationship_id, role, position");

    let rows: Vec<(i64, i64, String)> = builder.build_query_as().fetch_all(pool).await?;

    for (relationship_id, annotation_id, role) in rows {
        let annotation_id = object_id("annotation_id", annotation_id)?;
        let entry = links.entry(relationship_id).or_default();
        match role.as_str() {
            "source" => entry.0.push(annotation_id),
            "target" => entry.1.push(annotation_id),
            _ => return Err(SqliteError::Decode("role".into(), DecodeError::Role(role))),
        }
    }

    Ok(links)
}

impl<'a> SqliteStore<'a> {
    async fn base_object(
        &self,
        kind: ObjectKind,
        id: &ObjectId,
    ) -> Result<Option<BaseObjectRow>, SqliteError> {
        self.execute(async |pool| {
            query_as::<_, BaseObjectRow>(
                "
                SELECT
                    id,
                    creator,
                    is_public,
                    allow_comments
                FROM
                    base_objects_v1
                WHERE
                    kind = ?
                    AND id = ?
                ",
            )
            .bind(kind.as_str())
            .bind(lookup_id(id.as_u64()))
            .fetch_optional(pool)
            .await
            .map_err(SqliteError::Sqlite)
        })
        .await
    }

    async fn insert_base_object(
        &self,
        kind: ObjectKind,
        id: &ObjectId,
        creator: &PrincipalId,
        is_public: bool,
        allow_comments: bool,
    ) -> Result<bool, SqliteError> {
        let id = to_sql_id("id", id.as_u64())?;
        let creator = to_sql_id("creator", creator.as_u64())?;

        let result = self
            .tx(async |tx| {
                query(
                    "
                    INSERT OR IGNORE
                    INTO
                        base_objects_v1 (
                            kind,
                            id,
                            creator,
                            is_public,
                            allow_comments
                        )
                    VALUES
                        (?, ?, ?, ?, ?)
                    ",
                )
                .bind(kind.as_str())
                .bind(id)
                .bind(creator)
                .bind(is_public)
                .bind(allow_comments)
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_links(
    tx: &mut WriteTx<'_>,
    relationship_id: i64,
    role: &str,
    annotation_ids: &[i64],
) -> Result<(), SqliteError> {
    for (position, annotation_id) in annotation_ids.iter().enumerate() {
        query(
            "
            INSERT OR IGNORE
            INTO
                relationship_annotations_v1 (
                    relationship_id,
                    annotation_id,
                    role,
                    position
                )
            VALUES
                (?, ?, ?, ?)
            ",
        )
        .bind(relationship_id)
        .bind(annotation_id)
        .bind(role)
        .bind(position as i64)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

macro_rules! base_object_from_row {
    ($row:expr, $name:ident) => {{
        let row = $row;
        $name {
            id: object_id("id", row.id)?,
            creator: principal_id("creator", row.creator)?,
            is_public: row.is_public,
        }
    }};
}

impl<'a> ObjectStore for SqliteStore<'a> {
    async fn document(&self, id: &ObjectId) -> Result<Option<Document>, SqliteError> {
        match self.base_object(ObjectKind::Document, id).await? {
            Some(row) => Ok(Some(base_object_from_row!(row, Document))),
            None => Ok(None),
        }
    }

    async fn corpus(&self, id: &ObjectId) -> Result<Option<Corpus>, SqliteError> {
        match self.base_object(ObjectKind::Corpus, id).await? {
            Some(row) => Ok(Some(Corpus {
                id: object_id("id", row.id)?,
                creator: principal_id("creator", row.creator)?,
                is_public: row.is_public,
                allow_comments: row.allow_comments,
            })),
            None => Ok(None),
        }
    }

    async fn analysis(&self, id: &ObjectId) -> Result<Option<Analysis>, SqliteError> {
        match self.base_object(ObjectKind::Analysis, id).await? {
            Some(row) => Ok(Some(base_object_from_row!(row, Analysis))),
            None => Ok(None),
        }
    }

    async fn extract(&self, id: &ObjectId) -> Result<Option<Extract>, SqliteError> {
        match self.base_object(ObjectKind::Extract, id).await? {
            Some(row) => Ok(Some(base_object_from_row!(row, Extract))),
            None => Ok(None),
        }
    }

    async fn annotation(&self, id: &ObjectId) -> Result<Option<Annotation>, SqliteError> {
        let row = self
            .execute(async |pool| {
                query_as::<_, AnnotationRow>(&format!(
                    "
                    SELECT
                        {ANNOTATION_COLUMNS}
                    FROM
                        annotations_v1 a
                    WHERE
                        a.id = ?
                    "
                ))
                .bind(lookup_id(id.as_u64()))
                .fetch_optional(pool)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_into()?)),
            None => Ok(None),
        }
    }

    async fn relationship(&self, id: &ObjectId) -> Result<Option<Relationship>, SqliteError> {
        let Some(id) = lookup_id(id.as_u64()) else {
            return Ok(None);
        };
        let result = self
            .execute(async |pool| {
                let row = query_as::<_, RelationshipRow>(&format!(
                    "
                    SELECT
                        {RELATIONSHIP_COLUMNS}
                    FROM
                        relationships_v1 r
                    WHERE
                        r.id = ?
                    "
                ))
                .bind(id)
                .fetch_optional(pool)
                .await?;

                match row {
                    Some(row) => {
                        let links = load_links(pool, &[id]).await?;
                        Ok(Some((row, links)))
                    }
                    None => Ok(None),
                }
            })
            .await?;

        match result {
            Some((row, links)) => Ok(Some(row.into_relationship(&links)?)),
            None => Ok(None),
        }
    }

    async fn insert_document(&self, document: &Document) -> Result<bool, SqliteError> {
        self.insert_base_object(
            ObjectKind::Document,
            &document.id,
            &document.creator,
            document.is_public,
            false,
        )
        .await
    }

    async fn insert_corpus(&self, corpus: &Corpus) -> Result<bool, SqliteError> {
        self.insert_base_object(
            ObjectKind::Corpus,
            &corpus.id,
            &corpus.creator,
            corpus.is_public,
            corpus.allow_comments,
        )
        .await
    }

    async fn insert_analysis(&self, analysis: &Analysis) -> Result<bool, SqliteError> {
        self.insert_base_object(
            ObjectKind::Analysis,
            &analysis.id,
            &analysis.creator,
            analysis.is_public,
            false,
        )
        .await
    }

    async fn insert_extract(&self, extract: &Extract) -> Result<bool, SqliteError> {
        self.insert_base_object(
            ObjectKind::Extract,
            &extract.id,
            &extract.creator,
            extract.is_public,
            false,
        )
        .await
    }

    async fn insert_annotation(&self, annotation: &Annotation) -> Result<bool, SqliteError> {
        let embedding = match annotation.embedding {
            Some(ref embedding) => Some(
                encode_embedding(embedding)
                    .map_err(|err| SqliteError::Encode("embedding".to_string(), err))?,
            ),
            None => None,
        };

        let id = to_sql_id("id", annotation.id.as_u64())?;
        let document_id = to_sql_id("document_id", annotation.document_id.as_u64())?;
        let corpus_id = optional_sql_id("corpus_id", annotation.corpus_id)?;
        let parent_id = optional_sql_id("parent_id", annotation.parent_id)?;
        let creator = to_sql_id("creator", annotation.creator.as_u64())?;
        let analysis_id =
            optional_sql_id("created_by_analysis_id", annotation.origin.analysis_id())?;
        let extract_id = optional_sql_id("created_by_extract_id", annotation.origin.extract_id())?;

        let result = self
            .tx(async |tx| {
                query(
                    "
                    INSERT OR IGNORE
                    INTO
                        annotations_v1 (
                            id,
                            document_id,
                            corpus_id,
                            page,
                            parent_id,
                            structural,
                            creator,
                            created_by_analysis_id,
                            created_by_extract_id,
                            embedding
                        )
                    VALUES
                        (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ",
                )
                .bind(id)
                .bind(document_id)
                .bind(corpus_id)
                .bind(annotation.page as i64)
                .bind(parent_id)
                .bind(annotation.structural)
                .bind(creator)
                .bind(analysis_id)
                .bind(extract_id)
                .bind(embedding)
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_relationship(&self, relationship: &Relationship) -> Result<bool, SqliteError> {
        let id = to_sql_id("id", relationship.id.as_u64())?;
        let document_id = to_sql_id("document_id", relationship.document_id.as_u64())?;
        let corpus_id = optional_sql_id("corpus_id", relationship.corpus_id)?;
        let creator = to_sql_id("creator", relationship.creator.as_u64())?;
        let analysis_id =
            optional_sql_id("created_by_analysis_id", relationship.origin.analysis_id())?;
        let extract_id =
            optional_sql_id("created_by_extract_id", relationship.origin.extract_id())?;
        let source_ids = relationship
            .source_ids
            .iter()
            .map(|id| to_sql_id("source_id", id.as_u64()))
            .collect::<Result<Vec<_>, _>>()?;
        let target_ids = relationship
            .target_ids
            .iter()
            .map(|id| to_sql_id("target_id", id.as_u64()))
            .collect::<Result<Vec<_>, _>>()?;

        self.tx(async |tx| {
            let result = query(
                "
                INSERT OR IGNORE
                INTO
                    relationships_v1 (
                        id,
                        document_id,
                        corpus_id,
                        structural,
                        creator,
                        created_by_analysis_id,
                        created_by_extract_id
                    )
                VALUES
                    (?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(id)
            .bind(document_id)
            .bind(corpus_id)
            .bind(relationship.structural)
            .bind(creator)
            .bind(analysis_id)
            .bind(extract_id)
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() == 0 {
                return Ok(false);
            }

            insert_links(tx, id, "source", &source_ids).await?;
            insert_links(tx, id, "target", &target_ids).await?;

            Ok(true)
        })
        .await
    }
}
