mod commands;
mod queries;
mod types;

pub(crate) use commands::{
    create, mark_announced, record_submit_failure, update_result, update_status, update_token,
};
pub(crate) use queries::{find_by_id, list_pending, list_unannounced};
pub(crate) use types::{CreateCodeJudge, ResultUpdate};
