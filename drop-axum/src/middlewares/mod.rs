pub mod cors;
pub mod multipart;

pub use cors::{OriginPolicy, OriginPolicyService};
pub use multipart::{spool_file_field, SpoolConfig, SpoolFile, SpooledUpload};
