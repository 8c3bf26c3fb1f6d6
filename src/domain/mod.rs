pub mod comic;
pub mod credential;
pub mod source;

pub use comic::{ComicRecord, NewComic};
pub use credential::SessionCredential;
pub use source::{Source, SourceKind, SourceSeed};
