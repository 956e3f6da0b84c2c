mod bucket;

pub use bucket::{BlobEntry, BlobStorage, BlobStorageError, is_valid_blob_name};

/// Name of the single bucket this portal serves documents from.
pub const DOCUMENTS_BUCKET: &str = "documents";

/// Fixed page size for bucket listings.
pub const BLOB_LIST_LIMIT: usize = 100;
