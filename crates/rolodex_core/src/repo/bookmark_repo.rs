//! Bookmark repository contract and SQLite implementation.

use crate::model::bookmark::Bookmark;
use crate::model::EntityId;
use crate::repo::{
    ensure_connection_ready, ensure_transient, push_pagination, Entity, ListQuery, RepoResult,
    BOOKMARKS,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const BOOKMARK_SELECT_SQL: &str = "SELECT id, title, url FROM bookmarks";

/// Repository interface for bookmark persistence.
pub trait BookmarkRepository {
    /// Inserts a transient bookmark and assigns its identity.
    fn create_bookmark(&self, bookmark: &mut Bookmark) -> RepoResult<EntityId>;
    fn get_bookmark(&self, id: EntityId) -> RepoResult<Option<Bookmark>>;
    fn list_bookmarks(&self, query: &ListQuery) -> RepoResult<Vec<Bookmark>>;
}

/// SQLite-backed bookmark repository.
pub struct SqliteBookmarkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookmarkRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[BOOKMARKS])?;
        Ok(Self { conn })
    }

    pub(crate) fn on_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BookmarkRepository for SqliteBookmarkRepository<'_> {
    fn create_bookmark(&self, bookmark: &mut Bookmark) -> RepoResult<EntityId> {
        ensure_transient(Bookmark::NAME, bookmark.id)?;

        self.conn.execute(
            "INSERT INTO bookmarks (title, url) VALUES (?1, ?2);",
            params![bookmark.title.as_str(), bookmark.url.as_str()],
        )?;
        let id = self.conn.last_insert_rowid();
        bookmark.id = Some(id);

        debug!("event=entity_insert module=repo status=ok entity=bookmark id={id}");
        Ok(id)
    }

    fn get_bookmark(&self, id: EntityId) -> RepoResult<Option<Bookmark>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOOKMARK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_bookmark_row(row)?));
        }
        Ok(None)
    }

    fn list_bookmarks(&self, query: &ListQuery) -> RepoResult<Vec<Bookmark>> {
        let mut sql = BOOKMARK_SELECT_SQL.to_string();
        let mut bind_values: Vec<Value> = Vec::new();
        push_pagination(&mut sql, &mut bind_values, query);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut bookmarks = Vec::new();
        while let Some(row) = rows.next()? {
            bookmarks.push(parse_bookmark_row(row)?);
        }
        Ok(bookmarks)
    }
}

impl Entity for Bookmark {
    const NAME: &'static str = "bookmark";
    const TABLE: &'static str = "bookmarks";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn insert(conn: &Connection, entity: &mut Self) -> RepoResult<EntityId> {
        SqliteBookmarkRepository::on_ready(conn).create_bookmark(entity)
    }

    fn load(conn: &Connection, id: EntityId) -> RepoResult<Option<Self>> {
        SqliteBookmarkRepository::on_ready(conn).get_bookmark(id)
    }
}

/// Maps a row exposing `id`, `title` and `url` columns.
pub(crate) fn parse_bookmark_row(row: &Row<'_>) -> RepoResult<Bookmark> {
    Ok(Bookmark {
        id: Some(row.get("id")?),
        title: row.get("title")?,
        url: row.get("url")?,
    })
}
