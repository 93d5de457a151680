pub mod bvalue;
pub mod decode;
pub mod error;
pub mod render;

pub use bvalue::{BValue, Dictionary};   // re-export
pub use decode::{
    decode, decode_bytes, decode_file, decode_file_with, decode_value, decode_value_with,
    decode_with, DecodeMode, DecodeOptions, DEFAULT_MAX_DEPTH,
};   // re-export
pub use error::DecodeError;   // re-export
pub use render::{bvalue_to_json, dict_to_json, dump, dump_dict};   // re-export
