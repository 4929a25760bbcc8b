//! HTTP support module
//!
//! Response builders, MIME detection, and conditional-request helpers
//! shared by all content handlers.

pub mod cache;
pub mod mime;
pub mod response;

pub use response::{
    build_400_response, build_403_response, build_404_response, build_500_response,
};
