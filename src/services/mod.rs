pub(crate) mod announcer;
pub(crate) mod judge0;
pub(crate) mod mock_judge;
pub(crate) mod submission_store;
