use crate::domain::entities::batch::CandidateSet;
use crate::domain::entities::dataset::is_blank_row;
use crate::domain::entities::mapping::HeaderMapping;

/// Projects candidate records onto the destination's physical column order.
/// Unmapped headers and missing or short columns produce empty cells; rows
/// left entirely empty are dropped.
pub fn build_record_set(
    headers: &[String],
    mapping: &HeaderMapping,
    candidates: &CandidateSet,
) -> Vec<Vec<String>> {
    let targets: Vec<Option<&str>> = headers
        .iter()
        .map(|header| mapping.target(header))
        .collect();

    (0..candidates.record_count())
        .map(|record_idx| {
            targets
                .iter()
                .map(|target| match target {
                    Some(column) => candidates.value(column, record_idx).to_string(),
                    None => String::new(),
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !is_blank_row(row))
        .collect()
}
