use time::PrimitiveDateTime;

pub(crate) const COLUMNS: &str = "\
    id, submission_id, language, source_code, test_arguments, test_results, status, token, \
    result_code, result_message, test_output, submit_attempts, next_attempt_at, last_error, \
    announced_at, created_at, updated_at";

pub(crate) struct CreateCodeJudge<'a> {
    pub(crate) id: &'a str,
    pub(crate) submission_id: i64,
    pub(crate) language: i32,
    pub(crate) source_code: &'a str,
    pub(crate) test_arguments: &'a str,
    pub(crate) test_results: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) struct ResultUpdate<'a> {
    pub(crate) result_code: i32,
    pub(crate) result_message: &'a str,
    pub(crate) test_output: Option<&'a str>,
    pub(crate) updated_at: PrimitiveDateTime,
}
