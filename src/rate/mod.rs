pub(crate) mod category;
pub(crate) mod coordinator;
