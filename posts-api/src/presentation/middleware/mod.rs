pub(crate) mod cors;
pub(crate) mod limits;
pub(crate) mod request_id;
pub(crate) mod trace;
