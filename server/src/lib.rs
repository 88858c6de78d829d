//! Commerce and accounting backend serving a generic model API over two SQLite databases.

pub mod backend;
