//! Relation handles.
//!
//! Handles hold only keys and table names. Each read builds a fresh [`Query`],
//! so a handle stays valid and current however long it is kept around.

use ormlet_core::{JoinTable, ModelRef, Record, Value};

use crate::database::Database;
use crate::driver::Driver;
use crate::error::{Result, SqliteError};
use crate::query::Query;

/// Records whose foreign key points at one record.
#[derive(Debug)]
pub struct ReverseSet<'db, D: Driver> {
    query: Query<'db, D>,
}

impl<'db, D: Driver> ReverseSet<'db, D> {
    pub(crate) fn new(query: Query<'db, D>) -> Self {
        Self { query }
    }

    pub fn all(&self) -> Result<Vec<Record>> {
        self.query.all()
    }

    pub fn count(&self) -> Result<usize> {
        self.query.count()
    }

    /// The underlying query, for further filtering.
    pub fn query(&self) -> Query<'db, D> {
        self.query.clone()
    }
}

/// The targets linked to one owner record through a join table.
///
/// Adding and removing links only touches join rows, never the linked
/// records themselves.
#[derive(Debug)]
pub struct ManyToMany<'db, D: Driver> {
    db: &'db Database<D>,
    join: JoinTable,
    owner_id: i64,
    target: ModelRef,
}

impl<'db, D: Driver> ManyToMany<'db, D> {
    pub(crate) fn new(db: &'db Database<D>, join: JoinTable, owner_id: i64, target: ModelRef) -> Self {
        Self {
            db,
            join,
            owner_id,
            target,
        }
    }

    pub fn join_table(&self) -> &JoinTable {
        &self.join
    }

    /// Links `target`. Returns `false` if it was linked already.
    pub fn add(&self, target: &Record) -> Result<bool> {
        let target_id = self.target_id(target)?;
        if self.is_linked(target_id)? {
            return Ok(false);
        }
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
            self.join.name, self.join.owner_column, self.join.target_column
        );
        self.db
            .driver()
            .execute(&sql, &[Value::Integer(self.owner_id), Value::Integer(target_id)])?;
        Ok(true)
    }

    /// Unlinks `target`. Returns whether a link was removed.
    pub fn remove(&self, target: &Record) -> Result<bool> {
        let target_id = self.target_id(target)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
            self.join.name, self.join.owner_column, self.join.target_column
        );
        let removed = self
            .db
            .driver()
            .execute(&sql, &[Value::Integer(self.owner_id), Value::Integer(target_id)])?;
        Ok(removed > 0)
    }

    pub fn contains(&self, target: &Record) -> Result<bool> {
        let target_id = self.target_id(target)?;
        self.is_linked(target_id)
    }

    pub fn all(&self) -> Result<Vec<Record>> {
        self.query().all()
    }

    pub fn count(&self) -> Result<usize> {
        self.query().count()
    }

    /// Query over the linked targets.
    pub fn query(&self) -> Query<'db, D> {
        let subquery = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.join.target_column, self.join.name, self.join.owner_column, self.owner_id
        );
        self.db
            .select(&self.target)
            .filter_in(self.join.target_key.clone(), subquery)
    }

    fn is_linked(&self, target_id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1 AND {} = ?2",
            self.join.name, self.join.owner_column, self.join.target_column
        );
        let rows = self
            .db
            .driver()
            .query(&sql, &[Value::Integer(self.owner_id), Value::Integer(target_id)])?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count > 0)
    }

    fn target_id(&self, record: &Record) -> Result<i64> {
        if record.model() != &self.target {
            return Err(SqliteError::WrongModel {
                expected: self.target.table_name().to_string(),
                found: record.model().table_name().to_string(),
            });
        }
        record.id().ok_or_else(|| SqliteError::MissingPrimaryKey {
            table: record.schema().table_name().to_string(),
        })
    }
}

/// The owners linked to one target record through a join table.
#[derive(Debug)]
pub struct ManyToManyReverse<'db, D: Driver> {
    query: Query<'db, D>,
}

impl<'db, D: Driver> ManyToManyReverse<'db, D> {
    pub(crate) fn new(db: &'db Database<D>, owner: ModelRef, join: JoinTable, target_id: i64) -> Self {
        let subquery = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            join.owner_column, join.name, join.target_column, target_id
        );
        let query = db.select(owner).filter_in(join.owner_key, subquery);
        Self { query }
    }

    pub fn all(&self) -> Result<Vec<Record>> {
        self.query.all()
    }

    pub fn count(&self) -> Result<usize> {
        self.query.count()
    }
}

#[cfg(test)]
mod tests {
    use ormlet_core::{Field, ModelSchema};

    use super::*;

    fn models() -> (ModelRef, ModelRef) {
        let tag: ModelRef = ModelSchema::builder("tag")
            .field("label", Field::varchar(20))
            .build()
            .into();
        let post: ModelRef = ModelSchema::builder("post")
            .field("title", Field::text())
            .field("tags", Field::many_to_many(&tag))
            .build()
            .into();
        (post, tag)
    }

    fn setup() -> (Database, ModelRef, ModelRef) {
        let db = Database::open_in_memory().unwrap();
        let (post, tag) = models();
        db.create_table(tag.resolve()).unwrap();
        db.create_table(post.resolve()).unwrap();
        (db, post, tag)
    }

    #[test]
    fn test_add_is_idempotent_and_remove_reports() {
        let (db, post, tag) = setup();
        let mut p = Record::new(post.clone()).with("title", "hello").unwrap();
        db.save(&mut p).unwrap();
        let mut t = Record::new(tag.clone()).with("label", "rust").unwrap();
        db.save(&mut t).unwrap();

        let tags = db.many_to_many(&p, "tags").unwrap();
        assert!(tags.add(&t).unwrap());
        assert!(!tags.add(&t).unwrap());
        assert!(tags.contains(&t).unwrap());
        assert_eq!(tags.count().unwrap(), 1);

        assert!(tags.remove(&t).unwrap());
        assert!(!tags.remove(&t).unwrap());
        assert_eq!(tags.count().unwrap(), 0);

        // Endpoint rows survive unlinking.
        assert_eq!(db.select(&tag).count().unwrap(), 1);
    }

    #[test]
    fn test_add_rejects_other_models_and_unsaved_records() {
        let (db, post, tag) = setup();
        let mut p = Record::new(post.clone()).with("title", "hello").unwrap();
        db.save(&mut p).unwrap();
        let tags = db.many_to_many(&p, "tags").unwrap();

        assert!(matches!(tags.add(&p), Err(SqliteError::WrongModel { .. })));
        assert!(matches!(
            tags.add(&Record::new(tag)),
            Err(SqliteError::MissingPrimaryKey { .. })
        ));
    }

    #[test]
    fn test_linked_query_selects_through_join_table() {
        let (db, post, _) = setup();
        let mut p = Record::new(post).with("title", "hello").unwrap();
        db.save(&mut p).unwrap();
        let tags = db.many_to_many(&p, "tags").unwrap();
        assert_eq!(
            tags.query().to_sql(),
            "SELECT id, label FROM tag WHERE id IN (SELECT tag_id FROM post_tag WHERE post_id = 1) \
             ORDER BY id"
        );
    }
}
