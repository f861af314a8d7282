//! Types shared between the ClassWatch server and its consumers:
//! domain enums, REST DTOs and endpoint URL builders.

pub mod api;
pub mod domain;
