//! Trait implementations using [`redis`](::redis)

const STREAM_ID_NEW: &str = "*";
const STREAM_ID_HEAD: &str = "0";
const STREAM_ID_TAIL: &str = "$";
const STREAM_ID_ADDITIONS: &str = ">";

const ERROR_CODE_BUSYGROUP: &str = "BUSYGROUP";
const ERROR_CODE_NOGROUP: &str = "NOGROUP";

mod broker;
mod factory;
mod reply;

pub use broker::*;
pub use factory::*;
