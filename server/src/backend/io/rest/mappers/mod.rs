pub mod error_mapper;
pub mod record_mapper;

pub use error_mapper::ErrorMapper;
pub use record_mapper::RecordMapper;
