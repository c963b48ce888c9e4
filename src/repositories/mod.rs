pub(crate) mod code_judge;
