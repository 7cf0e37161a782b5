use thiserror::Error;

/// Everything a filesystem operation can fail with. All façade operations
/// surface one of these; the shell prints it and returns to the menu.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("invalid image layout: {0}")]
    InvalidLayout(String),

    #[error("corrupt image: {0}")]
    CorruptImage(String),

    #[error("not enough free space in the data region")]
    OutOfSpace,

    #[error("no free catalog slot")]
    CatalogFull,

    #[error("an entry with that name already exists in the parent directory")]
    AlreadyExists,

    #[error("entry or parent path not found")]
    NotFound,

    #[error("entry is protected; toggle its protection off first")]
    ProtectedEntry,

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("directory is not empty")]
    DirectoryNotEmpty,

    #[error("host I/O error: {0}")]
    HostIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
