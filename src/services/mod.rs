pub(crate) mod join_codes;
pub(crate) mod live_session_policy;
pub(crate) mod quiz_grading;
pub(crate) mod quiz_normalize;
pub(crate) mod storage;
