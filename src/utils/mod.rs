pub mod csv;
pub mod timezone;

pub use timezone::{now_in, parse_operation_day, sao_paulo_now, SAO_PAULO_TZ};
