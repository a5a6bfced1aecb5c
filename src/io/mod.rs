mod fs_reader;
mod range_reader;
mod s3_reader;

pub use fs_reader::FsRangeReader;
pub use range_reader::RangeReader;
pub use s3_reader::{create_s3_client, S3RangeReader};
