pub mod s3_client;
pub mod s3_store;

pub use s3_client::{bucket_region, create_s3_client, S3Result};
pub use s3_store::S3Store;
