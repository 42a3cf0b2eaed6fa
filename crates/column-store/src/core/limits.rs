/// Upper bound on records requested by a single list call.
pub const MAX_LIST_RECORDS: usize = 500;

pub fn effective_list_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(MAX_LIST_RECORDS).min(MAX_LIST_RECORDS).max(1)
}
