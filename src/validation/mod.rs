//! Input validation: the URL list file and the URLs inside it

pub mod file;
pub mod url;

pub use self::file::{FileValidationError, FileValidator};
pub use self::url::UrlValidator;
