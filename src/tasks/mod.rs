pub(crate) mod reconciler;
pub(crate) mod scheduler;
