/// Placeholder substituted for suppressed personal data.
pub const MASK_SENTINEL: &str = "****";

/// Extension of the columnar batch files on disk.
pub const PARQUET_EXT: &str = "parquet";

/// Sibling data areas under the pipeline root directory.
pub const RAW_DIR: &str = "data/raw";
pub const INTERMEDIATE_DIR: &str = "data/intermediate";
pub const MART_DIR: &str = "data/mart";

/// Default remote source for person records.
pub const DEFAULT_API_URL: &str = "https://fakerapi.it/api/v2/persons";

/// Pagination parameter names used by the remote source.
pub const OFFSET_PARAM: &str = "_offset";
pub const QUANTITY_PARAM: &str = "_quantity";
