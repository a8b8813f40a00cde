pub mod app;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod model;
pub mod reactive;
pub mod search;
pub mod storage;
pub mod store;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use model::{NewNote, Note, NoteDraft};
pub use store::NoteStore;
