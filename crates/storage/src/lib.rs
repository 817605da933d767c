use thiserror::Error;

pub mod db;
pub mod repositories;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("corrupt row in {table}: {detail}")]
    CorruptRow { table: &'static str, detail: String },
}

impl StorageError {
    pub(crate) fn corrupt(table: &'static str, detail: impl Into<String>) -> Self {
        StorageError::CorruptRow {
            table,
            detail: detail.into(),
        }
    }
}
