pub(crate) mod buffer;
pub(crate) mod pipeline;
pub(crate) mod scheduler;
